//! Wellswitch controller daemon
//!
//! Run with: cargo run --bin wellswitch -- --config /etc/wellswitch/config.toml
//!
//! Inputs are read as console lines on stdin (`pressure 1`, `boiler 0`,
//! `override 1`, `well 1`, `status`, `quit`, ...). Outputs and the
//! dashboard are simulated and logged.
//!
//! # Configuration
//!
//! Environment variables:
//! - `WELLSWITCH_DATA_DIR`: Directory holding Data.json and Data.csv
//! - `WELLSWITCH_ARCHIVE_DIR`: Directory receiving rotated archives
//! - `WELLSWITCH_LOG_LEVEL`: Log level (default: info)
//! - `WELLSWITCH_LOG_FORMAT`: pretty or json
//! - `RUST_LOG`: Full filter, overrides the log level

use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use wellswitch::event::{channel, Event, Task};
use wellswitch::runtime::{read_console, App, InputRouter, Outputs};
use wellswitch::schedule::Scheduler;
use wellswitch::sim::{SimDashboard, SimPin};
use wellswitch::storage::{FieldMapping, TimeSeriesStore};
use wellswitch::Config;

#[derive(Parser)]
#[command(name = "wellswitch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dual-source water heating controller")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Export every appended row
    #[arg(long)]
    test_mode: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    config.storage.test_mode |= args.test_mode;

    wellswitch::logging::init(&config.logging);
    tracing::info!("Starting Wellswitch v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build the async runtime")?;
    let result = runtime.block_on(run(config));

    // A pending stdin read would otherwise hold the runtime open
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store_config = config.storage.store_config();
    tracing::info!("Data directory: {:?}", store_config.data_dir);

    let store = TimeSeriesStore::initialize(
        store_config,
        FieldMapping::standard(),
        config.storage.test_mode,
    )
    .context("Failed to open the usage log")?;

    let (events, rx) = channel();
    let outputs = Outputs {
        well_valve: Box::new(SimPin::new("well valve")),
        columbia_valve: Box::new(SimPin::new("columbia valve")),
        boiler_start: Box::new(SimPin::new("boiler start")),
    };
    let mut app = App::new(
        store,
        Box::new(SimDashboard::new()),
        outputs,
        &config.control,
        events.clone(),
    );

    let mut scheduler = Scheduler::new(events.clone());
    scheduler.schedule(Task::Export, config.schedule.export.clone());
    scheduler.schedule(Task::Rotate, config.schedule.rotate.clone());

    let interrupt = events.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            let _ = interrupt.send(Event::Shutdown);
        }
    });

    let router = InputRouter::new(events, config.control.debounce());
    let console = async {
        if let Err(e) = read_console(&router).await {
            tracing::warn!(error = %e, "Console input failed");
        }
        // Keep running headless once stdin closes
        std::future::pending::<()>().await
    };

    tokio::select! {
        result = app.run(rx) => result.context("Controller stopped")?,
        _ = console => {}
    }

    scheduler.stop();
    tracing::info!("Wellswitch shutdown complete");
    Ok(())
}
