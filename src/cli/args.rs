//! Command-line argument parsing for RagBuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RagBuddy - question answering over your documents
#[derive(Parser, Debug)]
#[command(name = "ragbuddy")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Agentic retrieval-augmented answers from a local document corpus", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.ragbuddy/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress everything except the answer)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question
    Ask {
        /// The question
        #[arg(value_name = "QUERY")]
        query: String,

        /// Continue an existing conversation
        #[arg(long)]
        conversation: Option<String>,

        /// Single retrieval pass instead of the agent loop
        #[arg(long)]
        simple: bool,

        /// Print the answer only after generation finishes
        #[arg(long)]
        no_stream: bool,

        /// Emit raw stream events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Search documents without generating an answer
    Search {
        /// Search text
        #[arg(value_name = "QUERY")]
        query: String,

        /// Number of documents to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Interactive conversation (/history, /clear, /exit)
    Chat {
        /// Single retrieval pass instead of the agent loop
        #[arg(long)]
        simple: bool,
    },

    /// Show size and status of a document collection
    Collection {
        /// Collection name (default: the configured collection)
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Check that the collaborators are reachable
    Doctor,

    /// Display current configuration
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
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default `tracing` filter for this verbosity (overridden by RUST_LOG)
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "ragbuddy=info",
            Verbosity::VeryVerbose => "ragbuddy=debug",
        }
    }

    /// Check if should show the thought trail as it happens
    pub fn show_thoughts(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show thought results and source previews
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
