//! Storage module
//!
//! Enumerates the files that make up a torrent's content.

pub mod walker;

pub use walker::{walk, ContentWalk};
