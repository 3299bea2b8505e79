//! CLI arguments module
//!
//! Defines command-line argument parsing using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::torrent::DEFAULT_WORKERS;

/// CLI arguments for the torrent maker
#[derive(Debug, Parser)]
#[command(name = "rust-torrent-maker")]
#[command(about = "Create, edit and inspect BitTorrent metainfo files", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a .torrent file from a file or directory
    Create(CreateArgs),
    /// Create one .torrent per path using a named configuration profile
    Profile(ProfileArgs),
    /// Change trackers, name, source or privacy of an existing .torrent
    Edit(EditArgs),
    /// Print the content of a .torrent file
    Show(ShowArgs),
}

/// Arguments of `create`
#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    /// File or directory to describe
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Tracker announce URL (repeatable, one tier each)
    #[arg(short, long = "announce", value_name = "URL")]
    pub announce: Vec<String>,

    /// Source tag
    #[arg(short, long)]
    pub source: Option<String>,

    /// Mark the torrent as private
    #[arg(short, long)]
    pub private: bool,

    /// Fixed piece length in bytes (default: chosen from the content size)
    #[arg(short = 'l', long, value_name = "BYTES")]
    pub piece_length: Option<u64>,

    /// Number of hash workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Comment
    #[arg(short, long)]
    pub comment: Option<String>,

    /// Output file (default: PATH.torrent)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments of `profile`
#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    /// Profile name in the configuration file
    #[arg(value_name = "PROFILE")]
    pub profile: String,

    /// Files or directories to describe
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Configuration file (default: ~/.config/autotorrent.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of hash workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
}

/// Arguments of `edit`
#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    /// Torrent file to edit
    #[arg(value_name = "TORRENT")]
    pub torrent: PathBuf,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New source tag (empty string removes it)
    #[arg(long)]
    pub source: Option<String>,

    /// Replacement tracker URLs (repeatable)
    #[arg(short, long = "announce", value_name = "URL")]
    pub announce: Vec<String>,

    /// New private flag
    #[arg(long, value_name = "BOOL")]
    pub private: Option<bool>,

    /// Output file (default: overwrite TORRENT)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments of `show`
#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Torrent file to print
    #[arg(value_name = "TORRENT")]
    pub torrent: PathBuf,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Get the log level based on verbosity settings
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}
