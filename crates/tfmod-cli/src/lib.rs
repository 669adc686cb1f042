//! CLI wiring for the `tfmod` binary.
//!
//! Parses arguments, bootstraps logging, and dispatches to the command
//! implementations in [`commands`].

mod cli;
mod commands;
mod utils;

use anyhow::Result;
use clap::Parser;

pub use cli::{Cli, Commands};

/// Parse arguments, initialize logging, and run the selected command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    utils::logging::init(&cli)?;

    let working_dir = match &cli.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    match &cli.command {
        Commands::Catalog { repo_url } => {
            commands::browse_catalog(&cli, &working_dir, repo_url.as_deref()).await
        },
        Commands::AwsProviderPatch { override_attrs } => {
            commands::patch_aws_provider(&working_dir, override_attrs)
        },
    }
}
