//! Torrent descriptor structures
//!
//! One `Metainfo` type covers both single-file and multi-file torrents. The
//! bencode shape (`length` vs `files`) is chosen when the descriptor is
//! encoded, from the number of file entries.

use std::io::Write;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::{debug, error};

use crate::error::{Result, TorrentError};
use crate::hash::{PieceHash, HASH_SIZE};
use crate::torrent::parser::TorrentParser;

/// A file in the torrent, relative to the content root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File size in bytes
    pub length: u64,
    /// File path components (e.g., ["folder", "subfolder", "file.txt"])
    pub path: Vec<String>,
}

/// The `info` dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    /// Torrent name (file name, or root directory name)
    pub name: String,
    /// Size of each piece in bytes
    pub piece_length: u64,
    /// Concatenated SHA-1 digests of every piece
    pub pieces: Vec<u8>,
    /// Private flag
    pub private: bool,
    /// Source tag
    pub source: Option<String>,
    /// Files in piece-stream order
    pub files: Vec<FileEntry>,
    /// Sum of every file length
    pub total_length: u64,
}

/// A complete torrent descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metainfo {
    /// Tracker tiers; tiers built by this crate hold exactly one URL
    pub announce_list: Vec<Vec<String>>,
    /// Creation time in Unix seconds
    pub creation_date: Option<i64>,
    /// Free-form comment
    pub comment: Option<String>,
    /// Program that created the torrent
    pub created_by: Option<String>,
    /// The info dictionary
    pub info: Info,
}

/// Bencode shape of the top-level dictionary
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawMetainfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce: Option<String>,
    #[serde(rename = "announce-list", default, skip_serializing_if = "Option::is_none")]
    pub announce_list: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "created by", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(rename = "creation date", default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<i64>,
    pub info: RawInfo,
}

/// Bencode shape of the info dictionary
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    pub name: String,
    #[serde(rename = "piece length")]
    pub piece_length: u64,
    #[serde(with = "serde_bytes")]
    pub pieces: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Info {
    pub(crate) fn to_raw(&self) -> Result<RawInfo> {
        let (length, files) = match self.files.len() {
            0 => {
                return Err(TorrentError::encoding_error("Descriptor has no files to encode"));
            }
            1 => (Some(self.files[0].length), None),
            _ => (None, Some(self.files.clone())),
        };

        Ok(RawInfo {
            files,
            length,
            name: self.name.clone(),
            piece_length: self.piece_length,
            pieces: self.pieces.clone(),
            private: self.private.then_some(1),
            source: self.source.clone().filter(|s| !s.is_empty()),
        })
    }
}

impl Metainfo {
    /// Primary tracker: the first URL of the first tier
    pub fn announce(&self) -> Option<&str> {
        self.announce_list
            .iter()
            .flat_map(|tier| tier.iter())
            .map(String::as_str)
            .next()
    }

    /// All tracker URLs, tier by tier
    pub fn announce_urls(&self) -> Vec<String> {
        self.announce_list.iter().flatten().cloned().collect()
    }

    /// Replace the trackers with one single-URL tier per URL
    pub fn set_announce_urls(&mut self, urls: &[String]) {
        self.announce_list = urls.iter().map(|url| vec![url.clone()]).collect();
    }

    /// Calculate total size of all files in torrent
    pub fn total_size(&self) -> u64 {
        self.info.total_length
    }

    /// Get number of pieces in torrent
    pub fn piece_count(&self) -> usize {
        self.info.pieces.len() / HASH_SIZE
    }

    /// Get piece hash for a specific piece index
    pub fn piece_hash(&self, index: usize) -> Option<PieceHash> {
        let start = index.checked_mul(HASH_SIZE)?;
        let slot = self.info.pieces.get(start..start + HASH_SIZE)?;
        slot.try_into().ok()
    }

    /// Get byte range for a specific piece
    pub fn piece_range(&self, index: usize) -> Option<(u64, u64)> {
        if index >= self.piece_count() {
            return None;
        }

        let start = (index as u64) * self.info.piece_length;
        let end = std::cmp::min(start + self.info.piece_length, self.total_size());

        Some((start, end))
    }

    /// Check if this torrent is encoded with a `files` list
    pub fn is_multi_file(&self) -> bool {
        self.info.files.len() > 1
    }

    /// SHA-1 of the bencoded info dictionary
    pub fn info_hash(&self) -> Result<[u8; 20]> {
        let info_bytes = serde_bencode::to_bytes(&self.info.to_raw()?).map_err(|e| {
            TorrentError::encoding_error_with_source("Failed to encode info dictionary", e.to_string())
        })?;

        let mut hasher = Sha1::new();
        hasher.update(&info_bytes);
        Ok(hasher.finalize().into())
    }

    /// Get info hash as a hex string
    pub fn info_hash_hex(&self) -> Result<String> {
        Ok(hex::encode(self.info_hash()?))
    }

    pub(crate) fn to_raw(&self) -> Result<RawMetainfo> {
        let announce_list = if self.announce_list.is_empty() {
            None
        } else {
            Some(self.announce_list.clone())
        };

        Ok(RawMetainfo {
            announce: self.announce().map(str::to_string),
            announce_list,
            comment: self.comment.clone().filter(|c| !c.is_empty()),
            created_by: self.created_by.clone().filter(|c| !c.is_empty()),
            creation_date: self.creation_date,
            info: self.info.to_raw()?,
        })
    }

    /// Encode the descriptor to bencode
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_bencode::to_bytes(&self.to_raw()?).map_err(|e| {
            error!("Failed to encode torrent '{}': {}", self.info.name, e);
            TorrentError::encoding_error_with_source("Failed to encode torrent", e.to_string())
        })
    }

    /// Encode the descriptor and write it to `writer`.
    ///
    /// Nothing is written if encoding fails.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        let data = self.to_bytes()?;
        writer.write_all(&data)?;
        writer.flush()?;
        debug!("Wrote {} bytes of torrent '{}'", data.len(), self.info.name);
        Ok(())
    }

    /// Decode a descriptor from bencode
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        TorrentParser::parse_bytes(data)
    }
}
