//! Metainfo builder
//!
//! Walks a content root, picks a piece length, streams every file through
//! the piece digest engine and assembles the resulting [`Metainfo`].
//!
//! ```no_run
//! use rust_torrent_maker::{PieceLengthPolicy, TorrentBuilder};
//!
//! # async fn run() -> rust_torrent_maker::error::Result<()> {
//! let torrent = TorrentBuilder::new("path/to/content")
//!     .piece_length_policy(PieceLengthPolicy::Auto)
//!     .announce("http://tracker.example.com/announce")
//!     .private(true)
//!     .workers(4)
//!     .build()
//!     .await?;
//!
//! let mut out = std::fs::File::create("content.torrent")?;
//! torrent.serialize(&mut out)?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info};

use crate::error::{Result, TorrentError};
use crate::hash::{HashProgress, NoProgress, PieceDigest};
use crate::storage::walker::{self, ContentWalk};
use crate::torrent::info::{Info, Metainfo};
use crate::torrent::piece_length::{piece_count, PieceLengthPolicy};

/// Default number of hash workers
pub const DEFAULT_WORKERS: usize = 4;

/// Builder for torrent descriptors
pub struct TorrentBuilder {
    /// Content root (file or directory)
    path: PathBuf,
    /// Piece length selection
    policy: PieceLengthPolicy,
    /// Tracker URLs, one tier each
    announce: Vec<String>,
    /// Source tag
    source: Option<String>,
    /// Private flag
    private: bool,
    /// Number of hash workers
    workers: usize,
    /// Name override (defaults to the root's file name)
    name: Option<String>,
    /// Optional comment
    comment: Option<String>,
    /// Creator string
    created_by: Option<String>,
    /// Creation timestamp (defaults to now)
    creation_date: Option<i64>,
    /// Receives one notification per hashed piece
    progress: Arc<dyn HashProgress>,
}

impl TorrentBuilder {
    /// Creates a builder for the content at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: PieceLengthPolicy::Auto,
            announce: Vec::new(),
            source: None,
            private: false,
            workers: DEFAULT_WORKERS,
            name: None,
            comment: None,
            created_by: Some(format!("rust-torrent-maker/{}", env!("CARGO_PKG_VERSION"))),
            creation_date: None,
            progress: Arc::new(NoProgress),
        }
    }

    /// Sets how the piece length is chosen
    pub fn piece_length_policy(mut self, policy: PieceLengthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Adds a tracker in its own tier
    pub fn announce(mut self, url: impl Into<String>) -> Self {
        self.announce.push(url.into());
        self
    }

    /// Adds several trackers, one tier each
    pub fn announce_list<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.announce.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Sets the source tag. An empty tag is dropped.
    pub fn source(mut self, source: Option<String>) -> Self {
        self.source = source.filter(|s| !s.is_empty());
        self
    }

    /// Marks the torrent as private
    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Sets the number of hash workers. Zero means one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Overrides the torrent name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the comment. An empty comment is dropped.
    pub fn comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment.filter(|c| !c.is_empty());
        self
    }

    /// Sets the creator string
    pub fn created_by(mut self, created_by: Option<String>) -> Self {
        self.created_by = created_by;
        self
    }

    /// Sets the creation timestamp in Unix seconds
    pub fn creation_date(mut self, timestamp: i64) -> Self {
        self.creation_date = Some(timestamp);
        self
    }

    /// Sets the progress sink
    pub fn progress(mut self, progress: Arc<dyn HashProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Build the descriptor.
    ///
    /// Nothing is written anywhere: the descriptor is fully assembled in memory.
    pub async fn build(self) -> Result<Metainfo> {
        self.policy.validate()?;

        let name = match &self.name {
            Some(name) => name.clone(),
            None => root_name(&self.path)?,
        };

        info!("Building torrent '{}' from {}", name, self.path.display());
        let content = self.walk_content().await?;

        if content.is_empty() {
            error!("No files found under '{}'", self.path.display());
            return Err(TorrentError::validation_error_with_field(
                "No content to hash",
                self.path.display().to_string(),
            ));
        }

        let piece_length = self.policy.piece_length(content.total_length);
        let pieces = piece_count(content.total_length, piece_length);
        info!(
            "{} files, {} bytes, {} pieces of {} bytes",
            content.file_count(),
            content.total_length,
            pieces,
            piece_length
        );

        let pieces = self.hash_content(&content, piece_length, pieces).await?;

        Ok(Metainfo {
            announce_list: self.announce.iter().map(|url| vec![url.clone()]).collect(),
            creation_date: Some(self.creation_date.unwrap_or_else(unix_now)),
            comment: self.comment,
            created_by: self.created_by,
            info: Info {
                name,
                piece_length,
                pieces,
                private: self.private,
                source: self.source,
                files: content.files,
                total_length: content.total_length,
            },
        })
    }

    async fn walk_content(&self) -> Result<ContentWalk> {
        let root = self.path.clone();
        tokio::task::spawn_blocking(move || walker::walk(&root))
            .await
            .map_err(|e| {
                TorrentError::filesystem_error_full("Walker task failed", self.path.display().to_string(), e.to_string())
            })?
    }

    async fn hash_content(&self, content: &ContentWalk, piece_length: u64, piece_count: u64) -> Result<Vec<u8>> {
        let mut digest = PieceDigest::new(piece_length, piece_count, self.workers, Arc::clone(&self.progress))?;

        for (entry, real_path) in content.files.iter().zip(&content.real_paths) {
            if let Err(e) = hash_file(&mut digest, real_path, entry.length).await {
                error!("Hashing failed at '{}': {}", real_path.display(), e);
                digest.abandon();
                return Err(e.with_path(real_path.display().to_string()));
            }
        }

        digest
            .finish()
            .await
            .map_err(|e| e.with_path(self.path.display().to_string()))
    }
}

/// Build a descriptor with the most common options
pub async fn build_descriptor(
    path: impl AsRef<Path>,
    policy: PieceLengthPolicy,
    source: Option<String>,
    private: bool,
    announce_list: Vec<String>,
    workers: usize,
) -> Result<Metainfo> {
    TorrentBuilder::new(path.as_ref())
        .piece_length_policy(policy)
        .source(source)
        .private(private)
        .announce_list(announce_list)
        .workers(workers)
        .build()
        .await
}

async fn hash_file(digest: &mut PieceDigest, path: &Path, expected_length: u64) -> Result<()> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        TorrentError::filesystem_error_full("Failed to open file", path.display().to_string(), e.to_string())
    })?;

    let read = digest.read_from(&mut file).await?;
    if read != expected_length {
        return Err(TorrentError::consistency_error_with_counts(
            "File changed size while hashing",
            expected_length,
            read,
        ));
    }

    debug!("Hashed {} ({} bytes)", path.display(), read);
    Ok(())
}

/// Last component of `path`, resolving `.` and `..` if needed
fn root_name(path: &Path) -> Result<String> {
    let resolved;
    let name = match path.file_name() {
        Some(name) => name,
        None => {
            resolved = path.canonicalize().map_err(|e| {
                TorrentError::filesystem_error_full("Failed to resolve content root", path.display().to_string(), e.to_string())
            })?;
            resolved.file_name().ok_or_else(|| {
                TorrentError::filesystem_error_with_path("Content root has no name", path.display().to_string())
            })?
        }
    };

    name.to_str()
        .map(str::to_string)
        .ok_or_else(|| TorrentError::filesystem_error_with_path("Path is not valid UTF-8", path.display().to_string()))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
