//! rust-torrent-maker
//!
//! Creates BitTorrent metainfo (.torrent) files with parallel SHA-1 piece
//! hashing, and edits or inspects existing ones.

pub mod torrent;
pub mod hash;
pub mod storage;
pub mod cli;
pub mod error;

pub use error::TorrentError;

pub use torrent::{
    build_descriptor, piece_count, FileEntry, Info, Metainfo, MetainfoEdit, MetainfoValues,
    PieceLengthPolicy, TorrentBuilder, TorrentParser, DEFAULT_WORKERS, MAX_PIECE_LENGTH,
    MIN_PIECE_LENGTH,
};
pub use hash::{hash_piece, HashProgress, NoProgress, PieceDigest, PieceHash, HASH_SIZE};
pub use storage::{walk, ContentWalk};
pub use cli::{
    default_output_path, CliArgs, Command, Config, CreateArgs, EditArgs, HashStats, Profile, ProfileArgs,
    ProfileConfig, ProgressDisplay, ShowArgs,
};
