//! Skill data model
//!
//! Rows of the master and localized tables, and the structured data scraped
//! from one skill page.

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTableRegistry, FieldKind, UnknownLabelPolicy};
use crate::error::Result;
use crate::normalize::strip_type_tags;
use crate::serialize::{
    join_fields, parse_joined_fields, sanitize_cell, serialize_field, serialize_stats,
};

/// A `key=value` pair scraped from a skill page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub value: String,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Infobox entry: profession, attribute, type, campaign...
pub type SkillInfo = Field;

/// Stat line: energy, activation, recharge...
pub type Stat = Field;

/// Everything extracted from one skill page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedSkill {
    pub id: String,
    pub icon_url: String,
    pub skill_infos: Vec<SkillInfo>,
    pub stats: Vec<Stat>,
    pub description: String,
}

/// A table row that can be read from and written to semicolon cells.
pub trait TableRow: Sized {
    /// Column names written as the header line.
    const HEADER: &'static [&'static str];

    /// Parse cells, returning the reason on failure.
    fn from_cells(cells: Vec<String>) -> std::result::Result<Self, String>;

    fn to_cells(&self) -> Vec<String>;

    fn id(&self) -> &str;
}

/// One row of the master skill table.
///
/// Columns after the URL are optional so that early, narrower files survive
/// a rewrite; an unenriched record is written back with its original width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillRecord {
    pub id: String,
    pub url: String,
    pub icon_url: Option<String>,
    pub skill_infos: Option<String>,
    pub stats: Option<String>,
    pub pve_only: Option<bool>,
    pub elite: Option<bool>,
    width: usize,
}

const MASTER_WIDTH: usize = 7;

impl SkillRecord {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            icon_url: None,
            skill_infos: None,
            stats: None,
            pve_only: None,
            elite: None,
            width: 2,
        }
    }

    /// Whether every column has been filled by a scrape.
    pub fn is_enriched(&self) -> bool {
        self.width == MASTER_WIDTH
            && self.icon_url.is_some()
            && self.skill_infos.is_some()
            && self.stats.is_some()
    }

    /// Encode a scraped page into this record.
    ///
    /// Type labels lose their elite / PvE-only modifiers, which become flags.
    /// On error the record is left untouched, although new type labels seen
    /// before the failing field stay in the registry.
    pub fn enrich(
        &mut self,
        scraped: &ScrapedSkill,
        registry: &mut CodeTableRegistry,
        on_unknown: UnknownLabelPolicy,
    ) -> Result<()> {
        let mut elite = false;
        let mut pve_only = false;
        let mut parts = Vec::with_capacity(scraped.skill_infos.len());

        for info in &scraped.skill_infos {
            let part = if FieldKind::from_key(&info.key) == Some(FieldKind::Type) {
                let tags = strip_type_tags(&info.value);
                elite |= tags.elite;
                pve_only |= tags.pve_only;
                serialize_field(registry, &info.key, &tags.label, on_unknown)?
            } else {
                serialize_field(registry, &info.key, &info.value, on_unknown)?
            };
            parts.push(part);
        }

        self.icon_url = Some(sanitize_cell(&scraped.icon_url));
        self.skill_infos = Some(join_fields(&parts));
        self.stats = Some(serialize_stats(&scraped.stats));
        self.elite = Some(elite);
        self.pve_only = Some(pve_only);
        self.width = MASTER_WIDTH;
        Ok(())
    }

    /// Decode the `skillInfos` column into `(key, code)` pairs.
    ///
    /// `Special*` entries and non-numeric values are not codes and are skipped.
    pub fn skill_info_codes(&self) -> Vec<(String, u32)> {
        let Some(cell) = self.skill_infos.as_deref() else {
            return Vec::new();
        };
        parse_joined_fields(cell)
            .into_iter()
            .filter(|f| !f.key.starts_with("Special"))
            .filter_map(|f| f.value.parse().ok().map(|code| (f.key, code)))
            .collect()
    }
}

fn parse_flag(cell: &str) -> std::result::Result<Option<bool>, String> {
    match cell.to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        other => Err(format!("invalid flag value {other:?}")),
    }
}

fn non_empty(cell: String) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell)
    }
}

impl TableRow for SkillRecord {
    const HEADER: &'static [&'static str] =
        &["id", "url", "iconUrl", "skillInfos", "stats", "onlyPve", "elite"];

    fn from_cells(cells: Vec<String>) -> std::result::Result<Self, String> {
        if cells.len() < 2 {
            return Err(format!("expected at least 2 columns (id, url), found {}", cells.len()));
        }
        if cells.len() > MASTER_WIDTH {
            return Err(format!("expected at most {MASTER_WIDTH} columns, found {}", cells.len()));
        }

        let width = cells.len();
        let pve_only = cells.get(5).map(|c| parse_flag(c)).transpose()?.flatten();
        let elite = cells.get(6).map(|c| parse_flag(c)).transpose()?.flatten();

        let mut cells = cells.into_iter();
        let id = cells.next().unwrap_or_default();
        let url = cells.next().unwrap_or_default();
        if id.is_empty() {
            return Err("empty id".to_string());
        }

        Ok(Self {
            id,
            url,
            icon_url: cells.next().and_then(non_empty),
            skill_infos: cells.next().and_then(non_empty),
            stats: cells.next().and_then(non_empty),
            pve_only,
            elite,
            width,
        })
    }

    fn to_cells(&self) -> Vec<String> {
        let flag = |f: Option<bool>| f.map(|b| b.to_string()).unwrap_or_default();
        let all = [
            self.id.clone(),
            self.url.clone(),
            self.icon_url.clone().unwrap_or_default(),
            self.skill_infos.clone().unwrap_or_default(),
            self.stats.clone().unwrap_or_default(),
            flag(self.pve_only),
            flag(self.elite),
        ];
        all.into_iter().take(self.width).collect()
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// One row of a localized names table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl LocalizedRow {
    /// Set the description unless one is already present.
    pub fn fill_description(&mut self, description: &str) {
        if self.description.as_deref().map_or(true, str::is_empty) {
            self.set_description(description);
        }
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = Some(sanitize_cell(description));
    }
}

impl TableRow for LocalizedRow {
    const HEADER: &'static [&'static str] = &["id", "name", "description"];

    fn from_cells(cells: Vec<String>) -> std::result::Result<Self, String> {
        if cells.len() < 2 || cells.len() > 3 {
            return Err(format!("expected 2 or 3 columns (id, name, description), found {}", cells.len()));
        }
        let mut cells = cells.into_iter();
        let id = cells.next().unwrap_or_default();
        if id.is_empty() {
            return Err("empty id".to_string());
        }
        Ok(Self {
            id,
            name: cells.next().unwrap_or_default(),
            description: cells.next(),
        })
    }

    fn to_cells(&self) -> Vec<String> {
        let mut cells = vec![self.id.clone(), self.name.clone()];
        if let Some(description) = &self.description {
            cells.push(description.clone());
        }
        cells
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(row: &str) -> Vec<String> {
        crate::serialize::split_row(row)
    }

    fn scraped(type_label: &str) -> ScrapedSkill {
        ScrapedSkill {
            id: "35".into(),
            icon_url: "https://wiki.example/images/Mind_Blast.jpg".into(),
            skill_infos: vec![
                Field::new("Campaign", "Core"),
                Field::new("Profession", "Elementalist"),
                Field::new("Attribute", "Fire Magic"),
                Field::new("Type", type_label),
            ],
            stats: vec![Field::new("Energy", "10"), Field::new("Recharge time", "20")],
            description: "Deal fire damage.".into(),
        }
    }

    #[test]
    fn test_narrow_master_row_round_trip() {
        let record = SkillRecord::from_cells(cells("35;https://wiki.example/wiki/Mind_Blast")).unwrap();
        assert_eq!(record.icon_url, None);
        assert!(!record.is_enriched());
        assert_eq!(
            record.to_cells(),
            vec!["35".to_string(), "https://wiki.example/wiki/Mind_Blast".to_string()]
        );
    }

    #[test]
    fn test_full_master_row_round_trip() {
        let row = "35;https://wiki.example/wiki/Mind_Blast;https://wiki.example/i.jpg;Profession=6|Type=16;Energy=10;false;true";
        let record = SkillRecord::from_cells(cells(row)).unwrap();
        assert_eq!(record.elite, Some(true));
        assert_eq!(record.pve_only, Some(false));
        assert!(record.is_enriched());
        assert_eq!(crate::serialize::serialize_row(&record.to_cells()), row);
    }

    #[test]
    fn test_master_row_errors() {
        assert!(SkillRecord::from_cells(cells("35")).is_err());
        assert!(SkillRecord::from_cells(cells(";url")).is_err());
        assert!(SkillRecord::from_cells(cells("35;url;;;;maybe;false")).is_err());
    }

    #[test]
    fn test_enrich_strips_type_tags() {
        let mut registry = CodeTableRegistry::default();
        let mut record = SkillRecord::new("35", "https://wiki.example/wiki/Mind_Blast");
        record
            .enrich(&scraped("  elite   Hex Spell  "), &mut registry, UnknownLabelPolicy::Fail)
            .unwrap();

        assert!(record.is_enriched());
        assert_eq!(record.elite, Some(true));
        assert_eq!(record.pve_only, Some(false));
        assert_eq!(
            record.skill_infos.as_deref(),
            Some("Campaign=Core|Profession=6|Attribute=10|Type=2")
        );
        assert_eq!(record.stats.as_deref(), Some("Energy=10|Recharge time=20"));
        assert_eq!(record.to_cells().len(), 7);
    }

    #[test]
    fn test_enrich_sanitizes_icon_url() {
        let mut registry = CodeTableRegistry::default();
        let mut record = SkillRecord::new("35", "https://wiki.example/wiki/Mind_Blast");
        let mut page = scraped("Spell");
        page.icon_url = "https://wiki.example/images/a;b.jpg".into();
        record.enrich(&page, &mut registry, UnknownLabelPolicy::Fail).unwrap();

        assert_eq!(record.icon_url.as_deref(), Some("https://wiki.example/images/a,b.jpg"));
        let row = crate::serialize::serialize_row(&record.to_cells());
        assert_eq!(cells(&row).len(), 7);
    }

    #[test]
    fn test_enrich_failure_leaves_record_untouched() {
        let mut registry = CodeTableRegistry::default();
        let mut record = SkillRecord::new("35", "https://wiki.example/wiki/Mind_Blast");
        let mut page = scraped("Spell");
        page.skill_infos[1] = Field::new("Profession", "Paladin");

        assert!(record.enrich(&page, &mut registry, UnknownLabelPolicy::Fail).is_err());
        assert_eq!(record, SkillRecord::new("35", "https://wiki.example/wiki/Mind_Blast"));
    }

    #[test]
    fn test_skill_info_codes() {
        let mut record = SkillRecord::new("1", "u");
        record.skill_infos = Some("Campaign=Core|Profession=6|Special=x|Type=16".into());
        assert_eq!(
            record.skill_info_codes(),
            vec![("Profession".to_string(), 6), ("Type".to_string(), 16)]
        );
    }

    #[test]
    fn test_localized_row() {
        let mut row = LocalizedRow::from_cells(cells("35;Mind Blast")).unwrap();
        assert_eq!(row.description, None);
        row.fill_description("Deal fire damage;\nand more");
        assert_eq!(row.description.as_deref(), Some("Deal fire damage, and more"));

        row.fill_description("Ignored");
        assert_eq!(row.description.as_deref(), Some("Deal fire damage, and more"));
        assert_eq!(row.to_cells().len(), 3);

        assert!(LocalizedRow::from_cells(cells("35")).is_err());
    }
}
