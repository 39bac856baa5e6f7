mod cli;
mod config;
mod decision;
mod error;
mod output;
mod resolver;
mod runner;
mod vcs;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting docgate - documentation build gate");
    let code = cli.execute().await?;

    // Statuses outside 0..=255 cannot be forwarded as-is
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
