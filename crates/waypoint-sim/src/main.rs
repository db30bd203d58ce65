//! Waypoint AR scenario replay
//!
//! Drives the session controller against a scripted device and writes the
//! saved markers the way the browser's download button would.

#![allow(clippy::print_stdout)]

mod console;
mod replay;
mod scenario;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use waypoint_core::{Config, Database, ExportFile, WaypointArchive};

use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(name = "waypoint-sim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Scenario file: device profile and frame steps
    #[arg(short, long)]
    scenario: PathBuf,

    /// Controller configuration (JSON); defaults apply when omitted
    #[arg(short, long, env = "WAYPOINT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the export file is written to
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    waypoint_core::init_logging();

    let scenario = Scenario::load(&cli.scenario)?;
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    let archive = match &config.database_path {
        Some(path) => Some(WaypointArchive::new(Database::open(path)?)),
        None => None,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(replay::run(scenario, config, archive))?;

    tracing::info!(
        state = %outcome.final_state,
        sessions = outcome.device_log.session_requests,
        "Replay finished"
    );

    match &outcome.export {
        Some(file) => {
            let path = file.write_to(&cli.out)?;
            println!("Wrote {} ({})", path.display(), ExportFile::MIME_TYPE);
        }
        None => println!("Nothing saved"),
    }

    Ok(())
}
