//! Command-line definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ODIN mobility survey ETL
///
/// Loads the survey's dimension metadata and fact table into a PostgreSQL
/// star schema. Configuration is read from the environment and `.env`.
#[derive(Parser, Debug)]
#[command(name = "odin-etl")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read environment variables from this file instead of `.env`
    #[arg(long, value_name = "PATH", global = true)]
    pub env_file: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Extract, transform, validate and load into the database
    Run {
        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Extract, transform and validate only; nothing is written
    Check,
}
