//! Command-line interface definition for `tfmod`.
//!
//! Global options apply to every subcommand; the `aws-provider-patch`
//! subcommand is hidden from help because it exists for the orchestrator's
//! internal use rather than day-to-day invocation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI for the `tfmod` binary.
#[derive(Parser, Debug)]
#[command(name = "tfmod")]
#[command(version)]
#[command(
    about = "Module catalog browsing and provider patching for Terraform stacks",
    long_about = None
)]
pub struct Cli {
    /// Working directory used to resolve configuration and module paths
    #[arg(long, global = true, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Explicit path to the root configuration file (default: tfmod.hcl,
    /// discovered upward from the working directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable a named experiment (repeatable): symlinks, cas
    #[arg(long = "experiment", global = true, value_name = "NAME")]
    pub experiments: Vec<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands of the `tfmod` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Browse modules across the configured catalog repositories
    Catalog {
        /// Single repository URL or local path overriding the configuration
        #[arg(value_name = "REPO_URL")]
        repo_url: Option<String>,
    },

    /// Override attributes inside provider "aws" blocks of fetched modules
    #[command(name = "aws-provider-patch", hide = true)]
    AwsProviderPatch {
        /// Attribute override as KEY=JSON_VALUE; dots in KEY address nested
        /// blocks (repeatable)
        #[arg(long = "override-attr", value_name = "KEY=VALUE")]
        override_attrs: Vec<String>,
    },
}
