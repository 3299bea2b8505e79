//! Torrent descriptor module
//!
//! Building, encoding, decoding and editing of .torrent files.

pub mod info;
pub mod parser;
pub mod piece_length;
pub mod builder;
pub mod edit;

pub use info::{FileEntry, Info, Metainfo};
pub use parser::TorrentParser;
pub use piece_length::{piece_count, PieceLengthPolicy, MAX_PIECE_LENGTH, MIN_PIECE_LENGTH};
pub use builder::{build_descriptor, TorrentBuilder, DEFAULT_WORKERS};
pub use edit::{MetainfoEdit, MetainfoValues};
