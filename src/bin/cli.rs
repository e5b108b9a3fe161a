//! Wellswitch CLI
//!
//! Maintenance operations on the usage log:
//! - Show the latest snapshot
//! - Export or rotate on demand
//! - Fill the log with dummy rows for testing
//! - Generate a config file
//!
//! The log is single-writer; stop the daemon before changing it from here.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wellswitch::config::{generate_default_config, Config};
use wellswitch::storage::{
    minutes_as_hours_mins, FieldKind, FieldMapping, TimeSeriesStore, Value,
};

#[derive(Parser)]
#[command(name = "wellswitch-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Maintenance tool for the Wellswitch usage log")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the latest snapshot and file locations
    Status,

    /// Append the latest snapshot to the CSV export
    Export,

    /// Archive the store and export and start fresh
    Rotate {
        /// Archive date (default: today), YYYY-MM-DD
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Append dummy rows, each exported, for testing
    Fill {
        /// Number of rows
        #[arg(short, long, default_value = "10")]
        rows: usize,
        /// Rotate once the rows are written
        #[arg(long)]
        rotate: bool,
    },

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::from_env(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    wellswitch::logging::init(&config.logging);

    match cli.command {
        Commands::Status => {
            let store = open(&config, false)?;
            let snapshot = store.snapshot();

            if cli.format == "json" {
                let fields: serde_json::Map<String, serde_json::Value> = snapshot
                    .iter()
                    .map(|(key, value)| {
                        Ok::<_, serde_json::Error>((key.to_string(), serde_json::to_value(value)?))
                    })
                    .collect::<Result<_, _>>()?;
                let status = serde_json::json!({
                    "store": store.config().store_path(),
                    "export": store.export().path(),
                    "rows": store.row_count(),
                    "exported_rows": store.export().data_row_count()?,
                    "snapshot": fields,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            println!("Wellswitch v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Store:   {:?} ({} rows)", store.config().store_path(), store.row_count());
            println!(
                "Export:  {:?} ({} rows)",
                store.export().path(),
                store.export().data_row_count()?
            );
            println!("Archive: {:?}", store.config().archive_dir);
            println!();
            println!("Latest snapshot:");
            for field in store.mapping().fields() {
                let rendered = match (field.kind, snapshot.get(&field.key)) {
                    (FieldKind::Duration, Some(value)) => value
                        .as_counter()
                        .map(minutes_as_hours_mins)
                        .unwrap_or_else(|| value.to_string()),
                    (_, Some(value)) => value.to_string(),
                    (_, None) => "-".to_string(),
                };
                println!("  {:<24} {}", field.label, rendered);
            }
        }

        Commands::Export => {
            let store = open(&config, false)?;
            store.export_row().context("Export failed")?;
            println!("Exported snapshot to {:?}", store.export().path());
        }

        Commands::Rotate { date } => {
            let mut store = open(&config, false)?;
            let report = match date {
                Some(date) => store.rotate_on(date),
                None => store.rotate(),
            }
            .context("Rotation failed")?;
            print_rotation(&report);
        }

        Commands::Fill { rows, rotate } => {
            let mut store = open(&config, true)?;
            let mut snapshot = store.snapshot();

            for _ in 0..rows {
                for field in store.mapping().fields() {
                    if field.kind == FieldKind::Timestamp {
                        continue;
                    }
                    let next = snapshot.counter(&field.key) + 1;
                    snapshot.set(&field.key, Value::Integer(next));
                }
                store.append(&snapshot).context("Append failed")?;
            }
            println!("Appended {} rows ({} total)", rows, store.row_count());

            if rotate {
                let report = store.rotate().context("Rotation failed")?;
                print_rotation(&report);
            }
        }

        Commands::InitConfig { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn open(config: &Config, test_mode: bool) -> anyhow::Result<TimeSeriesStore> {
    let store_config = config.storage.store_config();
    let data_dir = store_config.data_dir.clone();
    TimeSeriesStore::initialize(
        store_config,
        FieldMapping::standard(),
        test_mode || config.storage.test_mode,
    )
    .with_context(|| format!("Failed to open the usage log in {:?}", data_dir))
}

fn print_rotation(report: &wellswitch::RotationReport) {
    println!("Rotation complete");
    match &report.store_archive {
        Some(path) => println!("  Store archived to  {:?}", path),
        None => println!("  Store archive discarded"),
    }
    match &report.export_archive {
        Some(path) => println!("  Export archived to {:?}", path),
        None => println!("  Export archive discarded"),
    }
}
