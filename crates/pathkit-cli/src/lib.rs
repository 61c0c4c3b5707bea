//! pathkit CLI library

pub mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use pathkit_core::{IfExists, Settings};

// Re-export CLI types for testing
pub use clap::{Parser, Subcommand};
pub use commands::Commands;

#[derive(Parser)]
#[command(name = "pathkit")]
#[command(about = "Synchronized filesystem handles from the command line")]
#[command(version, long_about = None)]
pub struct Cli {
    /// JSON settings file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Collision policy: fail, allow, trash or make-copy
    #[arg(long, global = true, value_name = "POLICY")]
    pub if_exists: Option<IfExists>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings from `--config`, with `--if-exists` layered on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::default(),
        };
        if let Some(policy) = self.if_exists {
            settings.if_exists = policy;
        }
        Ok(settings)
    }
}
