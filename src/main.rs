mod cli;
mod commands;
mod config;
mod error;
mod export;
mod extract;
mod grid;
mod mcp;
mod page_range;
mod pdf;
mod retry;
mod store;
mod upload;
mod validate;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, GridCommand};
use config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::resolve(cli.base_dir, cli.max_retries)?;

    match cli.command {
        Commands::Mcp => {
            mcp::run_server(config).await?;
        }
        Commands::Validate => {
            if !commands::validate::run(&config)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Extract { retry } => {
            commands::extract::run(&config, retry)?;
        }
        Commands::Retry => {
            commands::retry::run(&config)?;
        }
        Commands::Pull {
            source_pdf,
            pages,
            output,
        } => {
            commands::extract::run_one(&config, &source_pdf, &pages, &output)?;
        }
        Commands::Info { path } => {
            commands::info::run(&config, &path)?;
        }
        Commands::Export { destination, mode } => {
            commands::export::run(&config, &destination, mode)?;
        }
        Commands::Upload { files } => {
            commands::upload::run(&config, &files)?;
        }
        Commands::Grid { action } => match action {
            GridCommand::Save => commands::grid::save(&config)?,
            GridCommand::Load => commands::grid::load(&config)?,
            GridCommand::Set { column } => commands::grid::set(&config, column)?,
        },
    }

    Ok(ExitCode::SUCCESS)
}
