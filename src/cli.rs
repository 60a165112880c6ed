//! CLI definitions for Wayline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Wayline CLI.
#[derive(Parser)]
#[command(name = "wayline")]
#[command(about = "Agentic journey orchestration platform")]
#[command(version)]
pub(crate) struct Cli {
    /// Ledger storage directory (in-memory when omitted)
    #[arg(short, long, global = true)]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Execute a journey from a contract file
    Run {
        /// Path to the contract (Solution) JSON file
        contract: PathBuf,

        /// Journey id (defaults to the solution's first journey)
        #[arg(long)]
        journey: Option<String>,

        /// Input payload as JSON
        #[arg(long, default_value = "{}")]
        input: String,

        /// Execution deadline in seconds
        #[arg(long, default_value_t = 300)]
        deadline: u64,
    },

    /// Validate a contract file
    Validate {
        /// Path to the contract (Solution) JSON file
        contract: PathBuf,
    },

    /// Print a sample contract
    Sample,
}
