//! DAL CLI - Headless Player Harness
//!
//! Features:
//! - Simulated playback of a player configuration, ads included
//! - Configuration validation with an ad schedule summary

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

/// DAL CLI - Headless media player harness
#[derive(Parser)]
#[command(name = "dal-cli")]
#[command(author = "DAL Player Developers")]
#[command(version)]
#[command(about = "Simulate and validate DAL player configurations", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Log format (text, json)
    #[arg(long, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a configuration on a headless surface and print the event log
    Simulate {
        /// Path to the player configuration (JSON)
        config: PathBuf,

        /// Simulated seconds per wall-clock second
        #[arg(short, long, default_value = "1.0")]
        speed: f64,

        /// Stop after this many simulated seconds
        #[arg(short, long, default_value = "3600")]
        max_seconds: f64,

        /// Skip ads as soon as they become skippable
        #[arg(long)]
        skip: bool,

        /// Position step between time updates (seconds)
        #[arg(short, long, default_value = "0.25")]
        tick: f64,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the player configuration (JSON)
        config: PathBuf,
    },
}

fn init_tracing(verbose: bool, log_format: &str) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so stdout only carries command output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match log_format {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, &cli.log_format);
    dal_core::init();

    match cli.command {
        Commands::Simulate { config, speed, max_seconds, skip, tick } => {
            let options = commands::SimulateOptions {
                speed,
                max_seconds,
                skip,
                tick,
            };
            commands::simulate(&config, &options, &cli.format).await?;
        }
        Commands::Validate { config } => {
            commands::validate(&config, &cli.format)?;
        }
    }

    Ok(())
}
