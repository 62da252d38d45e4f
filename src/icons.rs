//! Icon cache
//!
//! Downloads the icon of every enriched master record into a flat directory,
//! one `<id>.jpg` per skill.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::HttpClient;
use crate::pipeline::RecordFailure;
use crate::record::SkillRecord;
use crate::table::Table;

/// Outcome of an icon download run.
#[derive(Debug, Default)]
pub struct IconSummary {
    pub downloaded: usize,
    /// Records without an icon URL.
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
}

/// Cache location of a skill's icon. The id must be a plain file name.
pub fn icon_path(cache_dir: &Path, id: &str) -> Result<PathBuf> {
    let invalid = |reason: &str| Error::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    };
    if id.is_empty() || id == "." || id == ".." {
        return Err(invalid("not a file name"));
    }
    if id.contains(|c: char| c == '/' || c == '\\') || Path::new(id).is_absolute() {
        return Err(invalid("contains a path separator"));
    }
    Ok(cache_dir.join(format!("{id}.jpg")))
}

/// Download every record's icon into `cache_dir`, overwriting earlier copies.
pub async fn download_icons(
    client: &HttpClient,
    records: &[SkillRecord],
    cache_dir: &Path,
    concurrency: usize,
) -> Result<IconSummary> {
    tokio::fs::create_dir_all(cache_dir).await?;

    let targets: Vec<&SkillRecord> = records
        .iter()
        .filter(|r| r.icon_url.as_deref().is_some_and(|u| !u.is_empty()))
        .collect();
    let mut summary = IconSummary {
        skipped: records.len() - targets.len(),
        ..IconSummary::default()
    };

    let results: Vec<(&SkillRecord, Result<()>)> = stream::iter(targets)
        .map(|record| async move { (record, download_icon(client, record, cache_dir).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (record, result) in results {
        match result {
            Ok(()) => summary.downloaded += 1,
            Err(error) => {
                let url = record.icon_url.clone().unwrap_or_default();
                warn!(id = %record.id, url = %url, %error, "icon download failed");
                summary.failures.push(RecordFailure {
                    id: record.id.clone(),
                    url,
                    error,
                });
            }
        }
    }
    summary.failures.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(summary)
}

async fn download_icon(client: &HttpClient, record: &SkillRecord, cache_dir: &Path) -> Result<()> {
    let path = icon_path(cache_dir, &record.id)?;
    let url = record.icon_url.as_deref().unwrap_or_default();
    let bytes = client.get_bytes(url).await?;
    tokio::fs::write(&path, &bytes).await?;
    debug!(id = %record.id, path = %path.display(), size = bytes.len(), "saved icon");
    Ok(())
}

/// Read a master table and cache its icons.
///
/// `input` defaults to the configured master file.
pub async fn run(config: &Config, input: Option<&Path>) -> Result<IconSummary> {
    config.validate()?;
    let path = input.map(Path::to_path_buf).unwrap_or_else(|| config.master_path());
    let master: Table<SkillRecord> = Table::read(&path)?;
    let client = HttpClient::new(&config.user_agent, config.timeout_secs)?;

    info!(records = master.len(), cache = %config.cache_dir.display(), "downloading icons");
    let summary = download_icons(&client, &master.rows, &config.cache_dir, config.concurrency).await?;
    info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        failed = summary.failures.len(),
        "icons finished"
    );
    Ok(summary)
}
