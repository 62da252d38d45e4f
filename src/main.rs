//! skill-fetch CLI
//!
//! - `scrape`: enrich the master and localized tables from the wiki
//! - `icons`: download skill icons into the cache directory
//! - `codes`: print the type code table as JSON

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use skill_fetch::codes::FieldKind;
use skill_fetch::{icons, pipeline, Config, NormalizationPolicy, Result, UnknownLabelPolicy};

#[derive(Parser)]
#[command(name = "skill-fetch", version, about = "Scrape skill data from the wiki into CSV tables")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags applied on top of the config file.
#[derive(Args)]
struct Overrides {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the input tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Icon cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Persisted type code table (JSON)
    #[arg(long, global = true)]
    code_table: Option<PathBuf>,

    /// Maximum requests in flight
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Type label normalization: sentence-case or lower-case
    #[arg(long, global = true)]
    normalization: Option<NormalizationPolicy>,

    /// Closed-table misses: fail or sentinel
    #[arg(long, global = true)]
    on_unknown_label: Option<UnknownLabelPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every skill page and write the `_bis` tables
    Scrape,

    /// Download the icon of every record into the cache directory
    Icons {
        /// Master table to read icon URLs from (defaults to the configured one)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Print the type code table
    Codes,
}

impl Overrides {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = self.cache_dir {
            config.cache_dir = dir;
        }
        if let Some(path) = self.code_table {
            config.code_table = Some(path);
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(policy) = self.normalization {
            config.normalization = policy;
        }
        if let Some(policy) = self.on_unknown_label {
            config.on_unknown_label = policy;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "skill_fetch=debug" } else { "skill_fetch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Scrape => {
            let summary = pipeline::run(&config).await?;
            println!(
                "{} of {} records enriched, {} failed, {} new type labels",
                summary.enriched,
                summary.total,
                summary.failures.len(),
                summary.new_type_labels.len()
            );
            for failure in &summary.failures {
                println!("  {} {}: {}", failure.id, failure.url, failure.error);
            }
        }
        Commands::Icons { input } => {
            let summary = icons::run(&config, input.as_deref()).await?;
            println!(
                "{} icons downloaded, {} records without icon, {} failed",
                summary.downloaded,
                summary.skipped,
                summary.failures.len()
            );
        }
        Commands::Codes => {
            let registry = pipeline::load_registry(&config)?;
            let snapshot = registry.snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            tracing::debug!(
                labels = registry.table(FieldKind::Type).len(),
                next = snapshot.next,
                "type table"
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.overrides.into_config() {
        Ok(config) => execute(cli.command, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
