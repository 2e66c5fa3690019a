//! # Ronin
//!
//! Runs a level headlessly and prints the outcome as JSON.
//!
//! Usage: `ronin [config.toml] [--init]`. With `--init` the default
//! configuration is written to the given path and nothing is simulated.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ronin_engine::{EngineConfig, Session, CONFIG_FILE};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

/// Tracing filter for `config`, honouring `RUST_LOG`.
fn log_filter(config: &EngineConfig) -> Result<EnvFilter> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    config
        .env_filter(env.as_deref())
        .with_context(|| format!("parsing log filter '{}'", config.log_filter))
}

/// Main entry point.
fn main() -> Result<()> {
    let mut init = false;
    let mut config_path = PathBuf::from(CONFIG_FILE);
    for arg in std::env::args().skip(1) {
        if arg == "--init" {
            init = true;
        } else {
            config_path = PathBuf::from(arg);
        }
    }

    // Tracing goes to stderr; stdout carries the report. The filter starts
    // from the default and is swapped once the config names its own.
    let (filter, filter_handle) = reload::Layer::new(log_filter(&EngineConfig::default())?);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if init {
        EngineConfig::default()
            .save_to(&config_path)
            .with_context(|| format!("writing {}", config_path.display()))?;
        return Ok(());
    }

    let config = EngineConfig::load_from(&config_path);
    filter_handle
        .reload(log_filter(&config)?)
        .context("applying configured log filter")?;

    info!("Project Ronin starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut session = Session::load(&config)?;
    let report = session.run();
    info!(
        "Finished '{}' with {:?} after {} frames",
        report.level, report.status, report.frames
    );

    let json = if config.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    match &config.output_path {
        Some(path) => fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?,
        None => writeln!(std::io::stdout().lock(), "{json}")?,
    }

    Ok(())
}
