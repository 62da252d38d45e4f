//! Scrape run
//!
//! Fetches every master record's page with a bounded number of requests in
//! flight, waits for all of them, then encodes the successes in input order
//! and writes the three output tables once. Encoding after the join keeps new
//! type codes independent of network completion order.

use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use url::Url;

use crate::codes::{CodeTableRegistry, FieldKind, UnknownLabelPolicy};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extractors::extract_skill;
use crate::fetch::HttpClient;
use crate::record::{LocalizedRow, ScrapedSkill, SkillRecord};
use crate::table::Table;

/// A record that could not be enriched.
#[derive(Debug)]
pub struct RecordFailure {
    pub id: String,
    pub url: String,
    pub error: Error,
}

/// Outcome of one scrape run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub total: usize,
    pub enriched: usize,
    pub failures: Vec<RecordFailure>,
    /// Type labels first seen during this run, with their new codes.
    pub new_type_labels: Vec<(String, u32)>,
    pub outputs: Vec<PathBuf>,
}

/// The master table and its two localized companions.
#[derive(Debug)]
pub struct SkillTables {
    pub master: Table<SkillRecord>,
    pub english: Table<LocalizedRow>,
    pub french: Table<LocalizedRow>,
}

impl SkillTables {
    pub fn read(config: &Config) -> Result<Self> {
        Ok(Self {
            master: Table::read(&config.master_path())?,
            english: Table::read(&config.english_path())?,
            french: Table::read(&config.french_path())?,
        })
    }

    /// Write all three tables next to their inputs.
    pub fn write(&self, config: &Config) -> Result<Vec<PathBuf>> {
        let outputs = vec![
            config.output_for(&config.french_path()),
            config.output_for(&config.english_path()),
            config.output_for(&config.master_path()),
        ];
        self.french.write(&outputs[0], config.write_header)?;
        self.english.write(&outputs[1], config.write_header)?;
        self.master.write(&outputs[2], config.write_header)?;
        Ok(outputs)
    }

    /// Encode scraped pages into the tables, in the order given.
    ///
    /// The English description is replaced; the French table only receives it
    /// where it has none of its own.
    pub fn apply(
        &mut self,
        scraped: &[ScrapedSkill],
        registry: &mut CodeTableRegistry,
        on_unknown: UnknownLabelPolicy,
    ) -> (usize, Vec<RecordFailure>) {
        let mut enriched = 0;
        let mut failures = Vec::new();

        for skill in scraped {
            let Some(record) = self.master.get_mut(&skill.id) else {
                warn!(id = %skill.id, "scraped skill has no master record");
                continue;
            };
            if let Err(error) = record.enrich(skill, registry, on_unknown) {
                warn!(id = %record.id, url = %record.url, %error, "could not encode record");
                failures.push(RecordFailure {
                    id: record.id.clone(),
                    url: record.url.clone(),
                    error,
                });
                continue;
            }
            enriched += 1;

            match self.english.get_mut(&skill.id) {
                Some(row) => row.set_description(&skill.description),
                None => debug!(id = %skill.id, "no English row"),
            }
            match self.french.get_mut(&skill.id) {
                Some(row) => row.fill_description(&skill.description),
                None => debug!(id = %skill.id, "no French row"),
            }
        }

        (enriched, failures)
    }
}

/// Fetch and extract every record's page.
///
/// Successes come back in the order of `records`, whatever order the
/// responses arrived in.
pub async fn scrape_pages(
    client: &HttpClient,
    records: &[SkillRecord],
    base_url: &Url,
    concurrency: usize,
) -> (Vec<ScrapedSkill>, Vec<RecordFailure>) {
    let mut results: Vec<(usize, Result<ScrapedSkill>)> = stream::iter(records.iter().enumerate())
        .map(|(position, record)| async move { (position, scrape_page(client, record, base_url).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(position, _)| *position);

    let mut scraped = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (position, result) in results {
        let record = &records[position];
        match result {
            Ok(skill) => scraped.push(skill),
            Err(error) => {
                warn!(id = %record.id, url = %record.url, %error, "skipping record");
                failures.push(RecordFailure {
                    id: record.id.clone(),
                    url: record.url.clone(),
                    error,
                });
            }
        }
    }
    (scraped, failures)
}

async fn scrape_page(client: &HttpClient, record: &SkillRecord, base_url: &Url) -> Result<ScrapedSkill> {
    let html = client.get_text(&record.url).await?;
    let skill = extract_skill(&html, &record.id, &record.url, base_url)?;
    debug!(id = %record.id, infos = skill.skill_infos.len(), stats = skill.stats.len(), "extracted");
    Ok(skill)
}

/// Registry for a run: the persisted type table when configured, the seed otherwise.
pub fn load_registry(config: &Config) -> Result<CodeTableRegistry> {
    match &config.code_table {
        Some(path) => CodeTableRegistry::load_or_seed(config.normalization, path),
        None => Ok(CodeTableRegistry::new(config.normalization)),
    }
}

/// Read the tables, scrape every record, write the outputs once.
pub async fn run(config: &Config) -> Result<RunSummary> {
    config.validate()?;
    let base_url = config.base_url()?;
    let mut tables = SkillTables::read(config)?;
    let mut registry = load_registry(config)?;
    let first_new_code = registry.table(FieldKind::Type).next_code();
    let client = HttpClient::new(&config.user_agent, config.timeout_secs)?;

    let total = tables.master.len();
    info!(total, concurrency = config.concurrency, "fetching skill pages");

    let (scraped, mut failures) =
        scrape_pages(&client, &tables.master.rows, &base_url, config.concurrency).await;
    let (enriched, encode_failures) = tables.apply(&scraped, &mut registry, config.on_unknown_label);
    failures.extend(encode_failures);

    // Codes must be persisted before any table refers to them
    if let Some(path) = &config.code_table {
        registry.save(path)?;
        debug!(path = %path.display(), "saved type table");
    }
    let outputs = tables.write(config)?;

    let new_type_labels: Vec<(String, u32)> = registry
        .table(FieldKind::Type)
        .entries()
        .into_iter()
        .filter(|(_, code)| *code >= first_new_code)
        .map(|(label, code)| (label.to_string(), code))
        .collect();
    for (label, code) in &new_type_labels {
        info!(label = %label, code, "new skill type");
    }

    info!(total, enriched, failed = failures.len(), "scrape finished");
    Ok(RunSummary {
        total,
        enriched,
        failures,
        new_type_labels,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;
    use std::path::Path;

    fn tables() -> SkillTables {
        SkillTables {
            master: Table::parse(
                Path::new("skills.csv"),
                "id;url\n1;https://w/1\n2;https://w/2\n3;https://w/3\n",
            )
            .unwrap(),
            english: Table::parse(Path::new("en.csv"), "id;name\n1;One\n2;Two\n3;Three\n").unwrap(),
            french: Table::parse(
                Path::new("fr.csv"),
                "id;name;description\n1;Un;Description un\n2;Deux;\n3;Trois;\n",
            )
            .unwrap(),
        }
    }

    fn skill(id: &str, profession: &str, type_label: &str) -> ScrapedSkill {
        ScrapedSkill {
            id: id.to_string(),
            icon_url: format!("https://w/{id}.jpg"),
            skill_infos: vec![
                Field::new("Profession", profession),
                Field::new("Type", type_label),
            ],
            stats: vec![Field::new("Energy", "5")],
            description: format!("Description {id}"),
        }
    }

    #[test]
    fn test_apply_enriches_and_collects_failures() {
        let mut tables = tables();
        let mut registry = CodeTableRegistry::default();
        let scraped = vec![
            skill("1", "Monk", "Elite Spell"),
            skill("2", "Paladin", "Spell"),
            skill("3", "Ranger", "Spell (PvE-only)"),
        ];

        let (enriched, failures) = tables.apply(&scraped, &mut registry, UnknownLabelPolicy::Fail);
        assert_eq!(enriched, 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, "2");
        assert!(matches!(failures[0].error, Error::UnknownLabel { .. }));

        let one = tables.master.get("1").unwrap();
        assert_eq!(one.skill_infos.as_deref(), Some("Profession=3|Type=8"));
        assert_eq!(one.elite, Some(true));
        let three = tables.master.get("3").unwrap();
        assert_eq!(three.skill_infos.as_deref(), Some("Profession=2|Type=8"));
        assert_eq!(three.pve_only, Some(true));
        assert!(!tables.master.get("2").unwrap().is_enriched());

        assert_eq!(tables.english.get("1").unwrap().description.as_deref(), Some("Description 1"));
        assert_eq!(tables.english.get("2").unwrap().description, None);
        // French keeps its own text, gains the scraped one only when empty
        assert_eq!(tables.french.get("1").unwrap().description.as_deref(), Some("Description un"));
        assert_eq!(tables.french.get("3").unwrap().description.as_deref(), Some("Description 3"));
    }

    #[test]
    fn test_apply_assigns_new_codes_in_input_order() {
        let mut tables = tables();
        let mut registry = CodeTableRegistry::default();
        let scraped = vec![skill("1", "Monk", "Form"), skill("2", "Monk", "Ritual"), skill("3", "Monk", "form")];

        tables.apply(&scraped, &mut registry, UnknownLabelPolicy::Fail);
        assert_eq!(tables.master.get("1").unwrap().skill_infos.as_deref(), Some("Profession=3|Type=91"));
        assert_eq!(tables.master.get("2").unwrap().skill_infos.as_deref(), Some("Profession=3|Type=92"));
        assert_eq!(tables.master.get("3").unwrap().skill_infos.as_deref(), Some("Profession=3|Type=91"));
    }

    #[test]
    fn test_apply_sentinel_policy_keeps_record() {
        let mut tables = tables();
        let mut registry = CodeTableRegistry::default();
        let (enriched, failures) =
            tables.apply(&[skill("2", "Paladin", "Spell")], &mut registry, UnknownLabelPolicy::Sentinel);
        assert_eq!(enriched, 1);
        assert!(failures.is_empty());
        assert_eq!(tables.master.get("2").unwrap().skill_infos.as_deref(), Some("Profession=999|Type=8"));
    }

    #[test]
    fn test_apply_ignores_unknown_ids() {
        let mut tables = tables();
        let mut registry = CodeTableRegistry::default();
        let (enriched, failures) = tables.apply(&[skill("42", "Monk", "Spell")], &mut registry, UnknownLabelPolicy::Fail);
        assert_eq!(enriched, 0);
        assert!(failures.is_empty());
    }
}
