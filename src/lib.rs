//! Skill wiki scraper
//!
//! Enriches a semicolon-delimited skill table with data scraped from wiki
//! pages:
//! - Icon URL, infobox fields and stat lines from each skill page
//! - Profession, attribute and type labels encoded through code tables
//! - English description, French description when missing
//! - Icon download into a local cache

pub mod codes;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod icons;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod serialize;
pub mod table;

pub use codes::{CodeTableRegistry, FieldKind, UnknownLabelPolicy, UNKNOWN_CODE};
pub use config::Config;
pub use error::{Error, Result};
pub use normalize::NormalizationPolicy;
pub use pipeline::{RecordFailure, RunSummary};
pub use record::{Field, LocalizedRow, ScrapedSkill, SkillRecord};
