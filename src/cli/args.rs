//! Command-line argument parsing for matquery
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::retriever::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// matquery - search materials databases in plain language
#[derive(Parser, Debug)]
#[command(name = "matquery")]
#[command(version)]
#[command(about = "Resolve a free-text materials query against several structure databases", long_about = None)]
pub struct Args {
    /// Free-text materials query
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Number of structures to return (1-20, config default when omitted)
    #[arg(short = 'n', long = "n-results")]
    pub n_results: Option<usize>,

    /// Structure file format requested from backends
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Cif)]
    pub format: OutputFormat,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON catalog served as local backends
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only on stderr)
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List registered databases
    Databases,

    /// Display effective configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check that exactly one of query / subcommand is given
    pub fn validate(&self) -> Result<(), String> {
        match (&self.command, &self.query) {
            (None, None) => Err(
                "Query required. Use 'matquery <QUERY>' or run a subcommand.".to_string(),
            ),
            (Some(_), Some(_)) => Err("Cannot specify a query with a subcommand.".to_string()),
            _ => Ok(()),
        }
    }
}

impl Verbosity {
    /// Log filter used when RUST_LOG is unset
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "matquery=info",
            Verbosity::VeryVerbose => "matquery=debug",
        }
    }

    /// Show per-backend outcome lines in human output
    pub fn show_backends(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
