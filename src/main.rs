use clap::Parser;
use tracing_subscriber::EnvFilter;

mod aws;
mod cli;
mod config;
mod error;
mod hosts;
mod inventory;

pub use error::{Ec2SshConfigError, Result};

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the generated config, diagnostics go to stderr
    let default_level = if cli.verbose { "warn,ec2_ssh_config=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    cli::generate::execute(cli).await?;

    Ok(())
}
