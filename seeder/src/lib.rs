//! Command-line surface for the storefront catalog sync engine.
//!
//! Every command works against a SQLite catalog database and prints JSON:
//! the snapshot for `export`, the operation list for `plan`, and the sync
//! report for `sync` and `seed`.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storefront_storage::SqliteStore;
use storefront_sync::{
    CancellationToken, CategoryPolicy, RunOutcome, SyncConfig, SyncEngine, SyncMode, SyncReport,
    SyncSource, export_snapshot_with_timeout,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storefront-seeder")]
#[command(about = "Export, seed and sync the storefront product catalog")]
pub struct Cli {
    /// Path to the SQLite catalog database
    #[arg(long, global = true, default_value = "catalog.db")]
    pub db: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the catalog to a snapshot file (stdout when no file is given)
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Timeout for each store call, in milliseconds
        #[arg(long, default_value_t = 30_000)]
        timeout_ms: u64,
    },
    /// Show the operations a sync would apply, without writing
    Plan {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        options: SyncOptions,
    },
    /// Sync the catalog from a snapshot, a records file or another database
    Sync {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        options: SyncOptions,
    },
    /// Seed the catalog from a file of raw product records
    Seed {
        file: PathBuf,
        #[command(flatten)]
        options: SyncOptions,
    },
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Snapshot file to sync from
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// File of raw product records to sync from
    #[arg(long)]
    pub records: Option<PathBuf>,

    /// Another catalog database to sync from
    #[arg(long)]
    pub from_db: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SyncOptions {
    /// `merge` keeps products missing from the source, `full-replace` deletes them
    #[arg(long, default_value = "merge")]
    pub mode: SyncMode,

    /// Fail products whose category does not exist instead of creating it
    #[arg(long)]
    pub strict_categories: bool,

    /// Timeout for each store call, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,
}

impl SyncOptions {
    pub fn config(&self) -> SyncConfig {
        SyncConfig {
            mode: self.mode,
            category_policy: if self.strict_categories {
                CategoryPolicy::Require
            } else {
                CategoryPolicy::Create
            },
            store_timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// What a command printed, and whether it fully succeeded.
#[derive(Debug)]
pub struct CommandOutput {
    pub json: String,
    pub success: bool,
}

impl CommandOutput {
    fn ok(json: String) -> Self {
        Self { json, success: true }
    }

    fn report(report: &SyncReport) -> Result<Self> {
        let success = matches!(report.outcome(), RunOutcome::NoChanges | RunOutcome::Applied);
        Ok(Self {
            json: serde_json::to_string_pretty(report)?,
            success,
        })
    }
}

/// Source catalog loaded from disk, owned for the duration of a command.
enum Input {
    Snapshot(Vec<u8>),
    Records(Vec<Value>),
    Store(SqliteStore),
}

impl Input {
    fn load(args: &SourceArgs) -> Result<Self> {
        if let Some(path) = &args.snapshot {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            return Ok(Input::Snapshot(bytes));
        }
        if let Some(path) = &args.records {
            return Ok(Input::Records(read_records(path)?));
        }
        if let Some(path) = &args.from_db {
            let store = SqliteStore::open(path)
                .with_context(|| format!("Failed to open source database {}", path.display()))?;
            return Ok(Input::Store(store));
        }
        bail!("no sync source given")
    }

    fn source(&self) -> SyncSource<'_> {
        match self {
            Input::Snapshot(bytes) => SyncSource::Snapshot(bytes),
            Input::Records(records) => SyncSource::Records(records.clone()),
            Input::Store(store) => SyncSource::Store(store),
        }
    }
}

/// Log filter for a run. `--verbose` forces debug output; otherwise
/// `RUST_LOG` applies, falling back to `info`.
pub fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Reads raw product records: either a JSON array or an object with a
/// `products` array.
pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file {}", path.display()))?;
    let doc: Value = serde_json::from_str(&text)
        .with_context(|| format!("Records file {} is not valid JSON", path.display()))?;

    match doc {
        Value::Array(records) => Ok(records),
        Value::Object(mut obj) => match obj.remove("products") {
            Some(Value::Array(records)) => Ok(records),
            _ if obj.contains_key("formatVersion") => {
                bail!("{} is a snapshot; use `sync --snapshot` instead", path.display())
            }
            _ => bail!("{} has no `products` array", path.display()),
        },
        _ => bail!("{} must hold an array of product records", path.display()),
    }
}

/// Runs one command against the database named on the command line.
pub async fn execute(cli: &Cli, cancel: &CancellationToken) -> Result<CommandOutput> {
    let store = SqliteStore::open(&cli.db)
        .with_context(|| format!("Failed to open catalog database {}", cli.db.display()))?;

    match &cli.command {
        Command::Export { out, timeout_ms } => {
            let snapshot =
                export_snapshot_with_timeout(&store, Duration::from_millis(*timeout_ms)).await?;
            let json = snapshot.to_json()?;
            match out {
                Some(path) => {
                    fs::write(path, &json)
                        .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
                    info!(
                        "Exported {} products to {}",
                        snapshot.records.len(),
                        path.display()
                    );
                    let summary = serde_json::json!({
                        "exported": snapshot.records.len(),
                        "categories": snapshot.categories.len(),
                        "path": path.display().to_string(),
                    });
                    Ok(CommandOutput::ok(serde_json::to_string_pretty(&summary)?))
                }
                None => Ok(CommandOutput::ok(json)),
            }
        }
        Command::Plan { source, options } => {
            let input = Input::load(source)?;
            let plan = SyncEngine::new(options.config())
                .plan(&store, input.source())
                .await?;
            Ok(CommandOutput::ok(serde_json::to_string_pretty(&plan)?))
        }
        Command::Sync { source, options } => {
            let input = Input::load(source)?;
            let report = SyncEngine::new(options.config())
                .run(&store, input.source(), cancel)
                .await?;
            CommandOutput::report(&report)
        }
        Command::Seed { file, options } => {
            let records = read_records(file)?;
            info!("Seeding {} records from {}", records.len(), file.display());
            let report = SyncEngine::new(options.config())
                .run(&store, SyncSource::Records(records), cancel)
                .await?;
            CommandOutput::report(&report)
        }
    }
}
