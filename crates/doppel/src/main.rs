// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Doppel, a style-routing conversational agent.
//!
//! Binary entry point: config loading, tracing setup, and the `shell`,
//! `check`, and `state` subcommands.

mod console;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use doppel_config::DoppelConfig;
use doppel_core::DoppelError;
use tracing_subscriber::EnvFilter;

/// Doppel, a style-routing conversational agent.
#[derive(Parser, Debug)]
#[command(name = "doppel", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the standard hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive REPL wired to the full pipeline.
    Shell,
    /// Load and validate the configuration, then report.
    Check,
    /// Print the persisted runtime state.
    State,
}

fn load(cli: &Cli) -> Result<DoppelConfig, DoppelError> {
    let config = match &cli.config {
        Some(path) => doppel_config::load_config_from_path(path)
            .map_err(|e| DoppelError::Config(e.to_string()))?,
        None => doppel_config::load_config().map_err(|e| DoppelError::Config(e.to_string()))?,
    };
    doppel_config::validate_config(&config)
        .map_err(|errors| DoppelError::Config(errors.join("\n")))?;
    Ok(config)
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn state_path(config: &DoppelConfig) -> PathBuf {
    PathBuf::from(&config.app.data_dir).join("runtime_state.json")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("doppel: invalid configuration:\n{e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level);

    let result = match cli.command {
        Some(Commands::Shell) | None => shell::run_shell(config).await,
        Some(Commands::Check) => {
            println!(
                "config ok: {} styles, default={}, model endpoint {}",
                config.styles.len(),
                config.router.default_style,
                config.ollama.base_url
            );
            Ok(())
        }
        Some(Commands::State) => print_state(&config).await,
    };

    if let Err(e) = result {
        eprintln!("doppel: {e}");
        std::process::exit(1);
    }
}

async fn print_state(config: &DoppelConfig) -> Result<(), DoppelError> {
    let store = doppel_state::StateStore::new(state_path(config))?;
    let state = store.load().await?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
