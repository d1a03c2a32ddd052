#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone prediction engine.
//!
//! ```text
//! zone_forecast_predictor              # run now, then daily until Ctrl-C
//! zone_forecast_predictor once         # single run and exit
//! zone_forecast_predictor preview --limit 10
//! ```
//!
//! Store settings come from `DB_HOST`, `DB_USER`, `DB_PASSWORD` and
//! `DB_NAME`.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use zone_forecast_database::db::StoreSettings;
use zone_forecast_database::zones::display_zone_id;
use zone_forecast_pipeline::{MySqlConnector, Pipeline, RunOutcome};
use zone_forecast_scheduler::clock::SystemClock;
use zone_forecast_scheduler::driver::{DriverState, RecurrenceDriver};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(
    name = "zone_forecast_predictor",
    about = "Project next-month dog population and risk radius for every zone"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Run immediately, then once per day until interrupted
    Run,
    /// Run a single prediction update and exit
    Once,
    /// Print predictions without writing them
    Preview {
        /// Maximum number of zones to print
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let pipeline = Pipeline::new(StoreSettings::from_env(), Arc::new(MySqlConnector));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(pipeline).await?,
        Commands::Once => {
            let outcome = pipeline.run_once().await;
            if matches!(outcome, RunOutcome::Failed { .. } | RunOutcome::Skipped { .. }) {
                std::process::exit(1);
            }
        }
        Commands::Preview { limit } => {
            let updates = pipeline.preview(limit).await?;
            if updates.is_empty() {
                println!("No zones found.");
            }
            for update in &updates {
                println!(
                    "zone {:>8}  population {:>6}  risk radius {:>7.2}",
                    display_zone_id(&update.zone_id),
                    update.projection.predicted_population,
                    update.projection.predicted_risk_radius,
                );
            }
        }
    }

    Ok(())
}

async fn run_daemon(pipeline: Pipeline) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Zone prediction engine starting");

    let driver = RecurrenceDriver::new(Arc::new(pipeline), Arc::new(SystemClock));
    let state = driver.state();
    let schedule = driver.run_until(wait_for_interrupt(state)).await?;

    match schedule.last_fired() {
        Some(at) => log::info!(
            "Zone prediction engine stopped (last scheduled run at {})",
            at.to_rfc3339()
        ),
        None => log::info!("Zone prediction engine stopped"),
    }

    Ok(())
}

/// Resolves on Ctrl-C, logging a heartbeat while waiting.
async fn wait_for_interrupt(state: watch::Receiver<DriverState>) {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    log::error!("Failed to listen for Ctrl-C: {e}");
                }
                break;
            }
            _ = heartbeat.tick() => {
                log::debug!("Engine alive, driver {}", *state.borrow());
            }
        }
    }

    log::info!("Interrupt received, stopping zone prediction engine");
}
