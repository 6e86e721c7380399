//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;

/// chat-roster - Extract participant rosters from chat export files.
#[derive(Parser, Debug)]
#[command(name = "chat-roster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract the roster from one or more export files.
    Extract {
        /// Export files (result.json from the desktop export).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output path for the workbook document.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: auto, list, or workbook.
        #[arg(short, long, default_value = "auto")]
        format: String,
    },

    /// Show extraction statistics without emitting the roster.
    Stats {
        /// Export files to analyze.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Check that a workbook document carries all roster sections.
    Validate {
        /// Workbook document to check.
        file: PathBuf,
    },
}

/// Parses the `--format` argument; `auto` defers to the configured
/// participant threshold.
pub fn parse_format(format: &str) -> Result<Option<OutputFormat>, String> {
    if format.eq_ignore_ascii_case("auto") {
        Ok(None)
    } else {
        format.parse().map(Some)
    }
}
