//! Headless battle runner.
//!
//! Runs battles without graphics and prints a JSON report per run.
//!
//! # Usage
//!
//! ```bash
//! # Run a built-in scenario
//! cargo run -p tactics_headless -- run --preset forest_ambush
//!
//! # Run a scenario file with a tick-budget override
//! cargo run -p tactics_headless -- run --scenario my_battle.ron --ticks 6000
//!
//! # List built-in scenarios
//! cargo run -p tactics_headless -- list
//! ```
//!
//! Output (stdout): JSON report. Logs (stderr): human-readable.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tactics_headless::{run_scenario, Scenario};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless squad-tactics battle runner for CI and balance checks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one battle and print its report as JSON
    Run {
        /// Scenario file (RON) to run
        #[arg(long, conflicts_with = "preset")]
        scenario: Option<PathBuf>,

        /// Built-in scenario name
        #[arg(long, default_value = "meeting_engagement")]
        preset: String,

        /// Override the scenario's tick budget
        #[arg(long)]
        ticks: Option<u64>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },
    /// List built-in scenarios
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging goes to stderr; stdout carries the JSON report.
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            preset,
            ticks,
            pretty,
        } => run_command(scenario, &preset, ticks, pretty),
        Commands::List => {
            for name in Scenario::builtin_names() {
                if let Some(scenario) = Scenario::builtin(name) {
                    println!("{name}: {}", scenario.description);
                }
            }
            ExitCode::SUCCESS
        }
    }
}

fn run_command(
    scenario_path: Option<PathBuf>,
    preset: &str,
    ticks: Option<u64>,
    pretty: bool,
) -> ExitCode {
    let scenario = match scenario_path {
        Some(path) => match Scenario::load(&path) {
            Ok(scenario) => scenario,
            Err(error) => {
                eprintln!("error: {error}");
                return ExitCode::FAILURE;
            }
        },
        None => match Scenario::builtin(preset) {
            Some(scenario) => scenario,
            None => {
                eprintln!(
                    "error: unknown preset '{preset}' (try: {})",
                    Scenario::builtin_names().join(", ")
                );
                return ExitCode::FAILURE;
            }
        },
    };

    let mut scenario = scenario;
    if let Some(ticks) = ticks {
        scenario.max_ticks = ticks;
    }

    let report = match run_scenario(&scenario) {
        Ok(report) => report,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match json {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: failed to encode report: {error}");
            ExitCode::FAILURE
        }
    }
}
