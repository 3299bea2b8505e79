//! CLI module
//!
//! Command-line interface for the torrent maker.

pub mod args;
pub mod config;
pub mod progress;

pub use args::{CliArgs, Command, CreateArgs, EditArgs, ProfileArgs, ShowArgs};
pub use config::{default_output_path, Config, Profile, ProfileConfig};
pub use progress::{HashStats, ProgressDisplay};
