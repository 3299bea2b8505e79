//! Torrent file parser
//!
//! Decodes existing .torrent files back into a [`Metainfo`].

use std::path::Path;

use tracing::{debug, error, info, trace};

use crate::error::{Result, TorrentError};
use crate::hash::HASH_SIZE;
use crate::torrent::info::{FileEntry, Info, Metainfo, RawMetainfo};

/// Parser for .torrent files
pub struct TorrentParser;

impl TorrentParser {
    /// Parse a .torrent file from bytes
    pub fn parse_bytes(data: &[u8]) -> Result<Metainfo> {
        debug!("Parsing torrent file from {} bytes", data.len());
        trace!("Torrent data (first 100 bytes): {:?}", &data[..data.len().min(100)]);

        let raw: RawMetainfo = serde_bencode::from_bytes(data).map_err(|e| {
            TorrentError::parse_error_with_source("Failed to decode bencode data", e.to_string())
        })?;

        Self::convert_to_metainfo(raw)
    }

    /// Parse a .torrent file from a file path
    pub fn parse_file(path: &Path) -> Result<Metainfo> {
        info!("Loading torrent file from: {}", path.display());

        let data = std::fs::read(path).map_err(|e| {
            error!("Failed to read torrent file '{}': {}", path.display(), e);
            TorrentError::filesystem_error_full("Failed to read torrent file", path.display().to_string(), e.to_string())
        })?;

        debug!("Read {} bytes from torrent file", data.len());
        Self::parse_bytes(&data).map_err(|e| e.with_context(path.display().to_string()))
    }

    fn convert_to_metainfo(raw: RawMetainfo) -> Result<Metainfo> {
        let info = raw.info;

        if info.pieces.len() % HASH_SIZE != 0 {
            return Err(TorrentError::parse_error(format!(
                "Pieces field length must be a multiple of {}, got {}",
                HASH_SIZE,
                info.pieces.len()
            )));
        }

        let files = match (info.files, info.length) {
            (Some(files), _) if !files.is_empty() => files,
            (_, Some(length)) => vec![FileEntry {
                length,
                path: vec![info.name.clone()],
            }],
            _ => {
                return Err(TorrentError::parse_error("Neither length nor files found in info dict"));
            }
        };
        let total_length = files.iter().map(|f| f.length).sum();

        let announce_list = match (raw.announce_list, raw.announce) {
            (Some(tiers), _) if !tiers.is_empty() => tiers,
            (_, Some(announce)) if !announce.is_empty() => vec![vec![announce]],
            _ => Vec::new(),
        };

        debug!("Decoded torrent '{}' with {} files", info.name, files.len());
        Ok(Metainfo {
            announce_list,
            creation_date: raw.creation_date,
            comment: raw.comment,
            created_by: raw.created_by,
            info: Info {
                name: info.name,
                piece_length: info.piece_length,
                pieces: info.pieces,
                private: info.private.unwrap_or(0) == 1,
                source: info.source,
                files,
                total_length,
            },
        })
    }
}
