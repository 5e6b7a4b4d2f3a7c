//! # Animator
//!
//! Command-line front end for animation files:
//! - `check`: load a file and list every recoverable problem
//! - `print`: re-encode a file at a chosen compression level
//! - `stats`: summarize what a file contains

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use animator_model::AnimatorError;
use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::Command;
use crate::config::AnimatorConfig;

#[derive(Debug, Parser)]
#[command(name = "animator", version, about = "Check, re-encode and inspect animation files")]
struct Cli {
    /// Configuration file (defaults to ./animator.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Main entry point.
fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_deref()
        .map_or_else(AnimatorConfig::load, AnimatorConfig::load_from);

    let directive = config
        .log_filter
        .parse()
        .map_err(|e| AnimatorError::Config(format!("invalid log_filter {:?}: {e}", config.log_filter)))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(directive))
        .init();

    debug!("Animator {} with {:?}", env!("CARGO_PKG_VERSION"), config);

    if app::run(cli.command, &config)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
