//! `toolhome` command-line entry point.

mod cli;
mod commands;
mod errors;
mod tracing;

use crate::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = cli::parse();

    init_tracing(TracingConfig {
        format: cli.tracing_format(),
        level: cli.level.into(),
        ..Default::default()
    })?;

    commands::execute(cli).await?;
    Ok(())
}
