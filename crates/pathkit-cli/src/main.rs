use std::io;

use anyhow::Result;
use pathkit_cli::{Cli, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let settings = cli.settings()?;
    debug!(?settings, "starting");

    let stdout = io::stdout();
    cli.command.run(settings, &mut stdout.lock())
}
