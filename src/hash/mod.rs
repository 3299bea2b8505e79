//! Hashing module
//!
//! Piece hashing and the streaming, parallel piece digest engine.

pub mod piece;
pub mod digest;

pub use piece::{hash_piece, PieceHash, HASH_SIZE};
pub use digest::{PieceDigest, HashProgress, NoProgress};
