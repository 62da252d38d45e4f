//! Categorical code tables
//!
//! Profession, attribute and skill-type labels are stored in the CSV output as
//! small integers. Profession and attribute come from fixed enumerations
//! (closed tables); skill types grow as new labels are observed (open table).
//!
//! A label keeps its code for the lifetime of a [`CodeTableRegistry`]; codes
//! are never reused or renumbered. The type table can be persisted so that
//! codes also stay stable across runs.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::normalize::{normalize_label, NormalizationPolicy};

/// Code written in place of a closed-table miss under [`UnknownLabelPolicy::Sentinel`].
pub const UNKNOWN_CODE: u32 = 999;

/// Format version of [`TypeTableSnapshot`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Profession enumeration.
pub const PROFESSIONS: &[(&str, u32)] = &[
    ("None", 0),
    ("Warrior", 1),
    ("Ranger", 2),
    ("Monk", 3),
    ("Necromancer", 4),
    ("Mesmer", 5),
    ("Elementalist", 6),
    ("Assassin", 7),
    ("Ritualist", 8),
    ("Paragon", 9),
    ("Dervish", 10),
];

/// Attribute enumeration. Codes 26 to 28 are unassigned.
pub const ATTRIBUTES: &[(&str, u32)] = &[
    ("Fast Casting", 0),
    ("Illusion Magic", 1),
    ("Domination Magic", 2),
    ("Inspiration Magic", 3),
    ("Blood Magic", 4),
    ("Death Magic", 5),
    ("Soul Reaping", 6),
    ("Curses", 7),
    ("Air Magic", 8),
    ("Earth Magic", 9),
    ("Fire Magic", 10),
    ("Water Magic", 11),
    ("Energy Storage", 12),
    ("Healing Prayers", 13),
    ("Smiting Prayers", 14),
    ("Protection Prayers", 15),
    ("Divine Favor", 16),
    ("Strength", 17),
    ("Axe Mastery", 18),
    ("Hammer Mastery", 19),
    ("Swordsmanship", 20),
    ("Tactics", 21),
    ("Beast Mastery", 22),
    ("Expertise", 23),
    ("Wilderness Survival", 24),
    ("Marksmanship", 25),
    ("Dagger Mastery", 29),
    ("Deadly Arts", 30),
    ("Shadow Arts", 31),
    ("Communing", 32),
    ("Restoration Magic", 33),
    ("Channeling Magic", 34),
    ("Critical Strikes", 35),
    ("Spawning Power", 36),
    ("Spear Mastery", 37),
    ("Command", 38),
    ("Motivation", 39),
    ("Leadership", 40),
    ("Scythe Mastery", 41),
    ("Wind Prayers", 42),
    ("Earth Prayers", 43),
    ("Mysticism", 44),
];

/// Skill types observed before the first persisted table, in code order from 0.
pub const SEED_TYPES: &[&str] = &[
    "Signet",
    "Stance",
    "Hex spell",
    "Snow fighting skill",
    "Shout",
    "Skill",
    "Dual attack",
    "Duplicate skill",
    "Spell",
    "Off-hand attack",
    "Lead attack",
    "Enchantment spell",
    "Elite enchantment spell",
    "Elite hex spell",
    "Elite stance",
    "Elite touch skill",
    "Elite spell",
    "Touch skill",
    "Ward spell",
    "Glyph",
    "Resurrection skill",
    "Melee attack",
    "Sword attack",
    "Axe attack",
    "Hammer attack",
    "Celestial skill",
    "Skill (PvE-only)",
    "Elite skill",
    "Bow attack",
    "Elite bow attack",
    "Elite preparation",
    "Elite signet",
    "Pet attack",
    "Elite pet attack",
    "Trap",
    "Elite nature ritual",
    "Nature ritual",
    "Item spell",
    "Elite item spell",
    "Binding ritual",
    "Elite binding ritual",
    "Elite weapon spell",
    "Weapon spell",
    "Well spell",
    "Elite shout",
    "Elite sword attack",
    "Preparation",
    "Scythe attack",
    "Flash enchantment spell",
    "Elite flash enchantment spell",
    "Elite form",
    "Elite scythe attack",
    "Spear attack",
    "Elite spear attack",
    "Elite chant",
    "Chant",
    "Echo",
    "Elite dual attack",
    "Elite off-hand attack",
    "Elite melee attack",
    "Elite axe attack",
    "Elite hammer attack",
    "Elite trap",
    "Elite echo",
    "Signet (PvE-only)",
    "Elite glyph",
    "Enchantment spell (PvE-only)",
    "Spell (PvE-only)",
    "Melee attack (PvE-only)",
    "Binding ritual (PvE-only)",
    "Shout (PvE-only)",
    "Touch skill (PvE-only)",
    "Stance (PvE-only)",
    "Weapon spell (PvE-only)",
    "Trap (PvE-only)",
    "Ranged attack (PvE-only)",
    "Ward spell (PvE-only)",
    "Hex spell (PvE-only)",
    "Elite form (PvE-only)",
    "Elite ward spell",
    "Ebon vanguard ritual (PvE-only)",
    "Bonus Mission Pack skill",
    "Elite ward spell (PvE-only)",
    "Elite enchantment spell (PvE-only)",
    "Elite melee attack (PvE-only)",
    "Elite stance (PvE-only)",
    "Elite shout (PvE-only)",
    "Elite skill (PvE-only)",
    "Elite weapon spell (PvE-only)",
    "Elite echo (PvE-only)",
    "Elite well spell",
];

/// Categorical field encoded through a code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Profession,
    Attribute,
    Type,
}

impl FieldKind {
    /// Map a skill-info key (`"Profession"`, `"Attribute"`, `"Type"`) to its kind.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Profession" => Some(FieldKind::Profession),
            "Attribute" => Some(FieldKind::Attribute),
            "Type" => Some(FieldKind::Type),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            FieldKind::Profession => "Profession",
            FieldKind::Attribute => "Attribute",
            FieldKind::Type => "Type",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What to do when a closed table does not know a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownLabelPolicy {
    /// Propagate [`Error::UnknownLabel`]; the record is dropped.
    #[default]
    Fail,
    /// Substitute [`UNKNOWN_CODE`].
    Sentinel,
}

/// One label to code mapping.
#[derive(Debug)]
pub struct CodeTable {
    kind: FieldKind,
    open: bool,
    codes: HashMap<String, u32>,
    next: u32,
}

impl CodeTable {
    /// Build a fixed table from an enumeration.
    pub fn closed(kind: FieldKind, entries: &[(&str, u32)]) -> Self {
        let codes: HashMap<String, u32> = entries
            .iter()
            .map(|(label, code)| (label.to_string(), *code))
            .collect();
        let next = next_after(codes.values().copied(), 0);
        Self {
            kind,
            open: false,
            codes,
            next,
        }
    }

    /// Build a growable table. New labels start at `base`, or after the
    /// highest seeded code if that is larger.
    pub fn open(kind: FieldKind, seed: impl IntoIterator<Item = (String, u32)>, base: u32) -> Self {
        let codes: HashMap<String, u32> = seed.into_iter().collect();
        let next = next_after(codes.values().copied(), base);
        Self {
            kind,
            open: true,
            codes,
            next,
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code the next unseen label would receive.
    pub fn next_code(&self) -> u32 {
        self.next
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }

    /// Look a normalized label up, assigning the next code if the table is open.
    pub fn get_or_assign(&mut self, label: &str) -> Result<u32> {
        if let Some(code) = self.get(label) {
            return Ok(code);
        }
        if !self.open {
            return Err(Error::UnknownLabel {
                kind: self.kind,
                label: label.to_string(),
            });
        }

        let code = self.next;
        self.next = code
            .checked_add(1)
            .ok_or_else(|| Error::config(format!("{} code table is full", self.kind)))?;
        self.codes.insert(label.to_string(), code);
        debug!(kind = %self.kind, label, code, "assigned new code");
        Ok(code)
    }

    /// Entries sorted by code.
    pub fn entries(&self) -> Vec<(&str, u32)> {
        let mut entries: Vec<(&str, u32)> = self
            .codes
            .iter()
            .map(|(label, code)| (label.as_str(), *code))
            .collect();
        entries.sort_by_key(|(_, code)| *code);
        entries
    }
}

fn next_after(codes: impl Iterator<Item = u32>, base: u32) -> u32 {
    codes.map(|c| c.saturating_add(1)).max().map_or(base, |n| n.max(base))
}

/// Persisted form of the open type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTableSnapshot {
    pub version: u32,
    pub normalization: NormalizationPolicy,
    pub next: u32,
    pub labels: Vec<LabelCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCode {
    pub label: String,
    pub code: u32,
}

/// Owner of all code tables used by one scrape run.
#[derive(Debug)]
pub struct CodeTableRegistry {
    policy: NormalizationPolicy,
    profession: CodeTable,
    attribute: CodeTable,
    skill_type: CodeTable,
}

impl CodeTableRegistry {
    /// Registry with the built-in enumerations and the seed type snapshot.
    pub fn new(policy: NormalizationPolicy) -> Self {
        let seed = SEED_TYPES
            .iter()
            .zip(0u32..)
            .map(|(label, code)| (policy.apply(label), code));

        Self {
            policy,
            profession: CodeTable::closed(FieldKind::Profession, PROFESSIONS),
            attribute: CodeTable::closed(FieldKind::Attribute, ATTRIBUTES),
            skill_type: CodeTable::open(FieldKind::Type, seed, 0),
        }
    }

    /// Registry whose type table is restored from a snapshot instead of the seed.
    pub fn from_snapshot(policy: NormalizationPolicy, snapshot: TypeTableSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::config(format!(
                "unsupported code table version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        if snapshot.normalization != policy {
            return Err(Error::config(format!(
                "code table was built with {} normalization, configured policy is {}",
                snapshot.normalization, policy
            )));
        }

        let mut seen_codes = HashMap::with_capacity(snapshot.labels.len());
        let mut seen_labels = HashMap::with_capacity(snapshot.labels.len());
        for entry in &snapshot.labels {
            if entry.code == u32::MAX {
                return Err(Error::config(format!("code {} for {:?} is out of range", entry.code, entry.label)));
            }
            let normalized = policy.apply(&entry.label);
            if normalized != entry.label {
                return Err(Error::config(format!(
                    "label {:?} is not in {} form (expected {:?})",
                    entry.label, policy, normalized
                )));
            }
            if let Some(previous) = seen_codes.insert(entry.code, entry.label.as_str()) {
                return Err(Error::config(format!(
                    "code {} assigned to both {:?} and {:?}",
                    entry.code, previous, entry.label
                )));
            }
            if let Some(previous) = seen_labels.insert(entry.label.as_str(), entry.code) {
                return Err(Error::config(format!(
                    "label {:?} listed with both code {} and code {}",
                    entry.label, previous, entry.code
                )));
            }
        }

        let seed = snapshot.labels.into_iter().map(|e| (e.label, e.code));
        Ok(Self {
            policy,
            profession: CodeTable::closed(FieldKind::Profession, PROFESSIONS),
            attribute: CodeTable::closed(FieldKind::Attribute, ATTRIBUTES),
            skill_type: CodeTable::open(FieldKind::Type, seed, snapshot.next),
        })
    }

    /// Load a persisted type table, or fall back to the seed when `path` does not exist.
    pub fn load_or_seed(policy: NormalizationPolicy, path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no persisted code table, using seed");
            return Ok(Self::new(policy));
        }
        let text = std::fs::read_to_string(path)?;
        let snapshot: TypeTableSnapshot = serde_json::from_str(&text)?;
        Self::from_snapshot(policy, snapshot)
    }

    /// Write the type table as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn snapshot(&self) -> TypeTableSnapshot {
        TypeTableSnapshot {
            version: SNAPSHOT_VERSION,
            normalization: self.policy,
            next: self.skill_type.next_code(),
            labels: self
                .skill_type
                .entries()
                .into_iter()
                .map(|(label, code)| LabelCode {
                    label: label.to_string(),
                    code,
                })
                .collect(),
        }
    }

    pub fn policy(&self) -> NormalizationPolicy {
        self.policy
    }

    pub fn table(&self, kind: FieldKind) -> &CodeTable {
        match kind {
            FieldKind::Profession => &self.profession,
            FieldKind::Attribute => &self.attribute,
            FieldKind::Type => &self.skill_type,
        }
    }

    fn table_mut(&mut self, kind: FieldKind) -> &mut CodeTable {
        match kind {
            FieldKind::Profession => &mut self.profession,
            FieldKind::Attribute => &mut self.attribute,
            FieldKind::Type => &mut self.skill_type,
        }
    }

    /// Code for a raw label. Open-table misses grow the table; closed-table
    /// misses are [`Error::UnknownLabel`].
    pub fn resolve(&mut self, kind: FieldKind, raw: &str) -> Result<u32> {
        let label = normalize_label(kind, raw, self.policy);
        self.table_mut(kind).get_or_assign(&label)
    }

    /// [`resolve`](Self::resolve), substituting [`UNKNOWN_CODE`] for closed-table
    /// misses when the policy asks for it.
    pub fn resolve_with(&mut self, kind: FieldKind, raw: &str, on_unknown: UnknownLabelPolicy) -> Result<u32> {
        match self.resolve(kind, raw) {
            Err(Error::UnknownLabel { kind, label }) if on_unknown == UnknownLabelPolicy::Sentinel => {
                warn!(%kind, label = %label, code = UNKNOWN_CODE, "unknown label, using sentinel");
                Ok(UNKNOWN_CODE)
            }
            other => other,
        }
    }

    /// Code for a raw label without growing any table.
    pub fn lookup(&self, kind: FieldKind, raw: &str) -> Option<u32> {
        let label = normalize_label(kind, raw, self.policy);
        self.table(kind).get(&label)
    }
}

impl Default for CodeTableRegistry {
    fn default() -> Self {
        Self::new(NormalizationPolicy::default())
    }
}
