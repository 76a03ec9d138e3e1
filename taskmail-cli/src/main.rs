//! Taskmail CLI - queued command demos and tools

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "taskmail")]
#[command(about = "Queued commands and task mailboxes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, env = "TASKMAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller/device demo
    Run {
        /// Number of controller cycles (overrides the config file)
        #[arg(long)]
        requests: Option<usize>,

        /// Cycle period in milliseconds (overrides the config file)
        #[arg(long)]
        cycle_ms: Option<u64>,
    },

    /// Hammer one mailbox from several producer threads
    Stress {
        /// Number of producer threads
        #[arg(short, long, default_value = "4")]
        producers: usize,

        /// Calls per producer
        #[arg(short, long, default_value = "10000")]
        calls: usize,
    },

    /// Print the effective configuration
    Config {
        /// Write the configuration to this file instead
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.debug);

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { requests, cycle_ms } => {
            if let Some(requests) = requests {
                config.demo.requests = requests;
            }
            if let Some(cycle_ms) = cycle_ms {
                config.demo.cycle_ms = cycle_ms;
            }
            let summary = commands::run::run_demo(&config)?;
            commands::print_report(&summary, cli.json)?;
        }
        Commands::Stress { producers, calls } => {
            let report = commands::stress::run_stress(&config, producers, calls)?;
            commands::print_report(&report, cli.json)?;
            anyhow::ensure!(
                report.is_ordered(),
                "{} calls ran out of order",
                report.order_violations
            );
        }
        Commands::Config { output } => {
            commands::config::show_config(&config, output.as_deref())?;
        }
    }

    Ok(())
}
