//! Label canonicalization
//!
//! Free-text category labels scraped from the wiki are canonicalized before
//! they reach a code table, so that labels differing only in spacing or case
//! share one code.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::codes::FieldKind;

static ELITE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\belite\b").expect("elite tag pattern"));

static PVE_ONLY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(?\s*\bpve[- ]only\b\s*\)?").expect("pve-only tag pattern"));

/// Case policy applied to open-table labels.
///
/// The policy is part of the output contract: codes in a persisted type
/// table are only meaningful under the policy they were assigned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationPolicy {
    /// First character upper-cased, the rest lower-cased: `"Hex spell"`.
    #[default]
    SentenceCase,
    /// Whole label lower-cased: `"hex spell"`.
    LowerCase,
}

impl NormalizationPolicy {
    /// Trim, collapse whitespace runs and apply the case policy.
    pub fn apply(self, label: &str) -> String {
        let collapsed = collapse_whitespace(label);
        match self {
            NormalizationPolicy::SentenceCase => sentence_case(&collapsed),
            NormalizationPolicy::LowerCase => collapsed.to_lowercase(),
        }
    }
}

impl std::fmt::Display for NormalizationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizationPolicy::SentenceCase => f.write_str("sentence-case"),
            NormalizationPolicy::LowerCase => f.write_str("lower-case"),
        }
    }
}

/// Canonical lookup key for a label of the given kind.
///
/// Closed-table labels come from a hand-authored set and must match exactly.
pub fn normalize_label(kind: FieldKind, raw: &str, policy: NormalizationPolicy) -> String {
    match kind {
        FieldKind::Profession | FieldKind::Attribute => raw.to_string(),
        FieldKind::Type => policy.apply(raw),
    }
}

/// Trim and replace every internal whitespace run with a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn sentence_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// A type label with its modifiers split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTags {
    pub label: String,
    pub elite: bool,
    pub pve_only: bool,
}

/// Remove the `elite` and `PvE-only` modifiers from a type label.
///
/// The remaining label keeps its case; case folding happens at lookup time.
pub fn strip_type_tags(raw: &str) -> TypeTags {
    let elite = ELITE_TAG.is_match(raw);
    let pve_only = PVE_ONLY_TAG.is_match(raw);

    let stripped = ELITE_TAG.replace_all(raw, " ");
    let stripped = PVE_ONLY_TAG.replace_all(&stripped, " ");
    let mut label = collapse_whitespace(&stripped);

    // A bare modifier is still a label
    if label.is_empty() {
        label = collapse_whitespace(raw);
    }

    TypeTags {
        label,
        elite,
        pve_only,
    }
}
