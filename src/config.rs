//! Run configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::codes::UnknownLabelPolicy;
use crate::error::{Error, Result};
use crate::normalize::NormalizationPolicy;
use crate::table::output_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the input tables.
    pub data_dir: PathBuf,
    pub master_file: String,
    pub english_file: String,
    pub french_file: String,
    /// Appended to each input file stem to name its output.
    pub output_suffix: String,
    /// Icon download directory.
    pub cache_dir: PathBuf,
    /// Persisted type table, loaded before and saved after a scrape.
    pub code_table: Option<PathBuf>,
    /// Origin that relative icon paths are resolved against.
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Maximum requests in flight.
    pub concurrency: usize,
    pub normalization: NormalizationPolicy,
    pub on_unknown_label: UnknownLabelPolicy,
    pub write_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("datas"),
            master_file: "skills.csv".to_string(),
            english_file: "skills_en_US.csv".to_string(),
            french_file: "skills_fr_FR.csv".to_string(),
            output_suffix: "_bis".to_string(),
            cache_dir: PathBuf::from("cache"),
            code_table: None,
            base_url: "https://wiki.guildwars.com".to_string(),
            user_agent: concat!("skill_fetch/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            concurrency: 16,
            normalization: NormalizationPolicy::default(),
            on_unknown_label: UnknownLabelPolicy::default(),
            write_header: true,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be at least 1"));
        }
        if self.output_suffix.is_empty() {
            return Err(Error::config("output_suffix must not be empty, inputs would be overwritten"));
        }
        self.base_url()?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn master_path(&self) -> PathBuf {
        self.data_dir.join(&self.master_file)
    }

    pub fn english_path(&self) -> PathBuf {
        self.data_dir.join(&self.english_file)
    }

    pub fn french_path(&self) -> PathBuf {
        self.data_dir.join(&self.french_file)
    }

    /// Output path for one of the input files.
    pub fn output_for(&self, input: &Path) -> PathBuf {
        output_path(input, &self.output_suffix)
    }
}
