//! Piece hasher
//!
//! SHA-1 digest of a single piece buffer.

use sha1::{Digest, Sha1};

/// Size in bytes of a piece digest
pub const HASH_SIZE: usize = 20;

/// Digest of one piece
pub type PieceHash = [u8; HASH_SIZE];

/// Hash a piece buffer
pub fn hash_piece(data: &[u8]) -> PieceHash {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}
