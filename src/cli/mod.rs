//! CLI module for the knowledge base builder.

pub mod commands;
pub mod output;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::{DEFAULT_CONFIG_PATH, OutputFormat};

pub use progress::SpinnerReporter;

/// Build a vector knowledge base from a source tree.
#[derive(Debug, Parser)]
#[command(name = "codekb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "CODEKB_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to configuration file (YAML or TOML)"
    )]
    pub config: PathBuf,

    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Chunk, embed and export the configured source tree
    Build(commands::BuildArgs),

    /// List the local embedding models
    Models,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
