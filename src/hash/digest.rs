//! Streaming piece digest engine
//!
//! Re-chunks an arbitrary sequence of writes into fixed-size pieces and
//! hashes them on a pool of dedicated worker threads. Piece boundaries depend
//! only on the cumulative byte count, never on how the bytes were written.
//!
//! The workers never occupy the runtime's blocking pool, which stays free for
//! the file reads that feed them.

use std::sync::Arc;
use std::thread;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{Result, TorrentError};
use crate::hash::piece::{hash_piece, PieceHash, HASH_SIZE};

/// Size of the scratch buffer used by [`PieceDigest::read_from`]
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Queued pieces allowed per worker before `feed` blocks
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Receives a notification every time a worker finishes a piece
pub trait HashProgress: Send + Sync {
    /// Called once before any piece is dispatched
    fn start(&self, _piece_count: u64, _piece_length: u64) {}

    /// Called once per hashed piece, from a worker thread
    fn piece_hashed(&self);
}

/// Progress sink that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl HashProgress for NoProgress {
    fn piece_hashed(&self) {}
}

/// A filled piece buffer and the slot its digest belongs to
struct PieceJob {
    index: u64,
    data: Bytes,
}

/// Digests computed by one worker, tagged with their piece index
type WorkerOutput = Vec<(u64, PieceHash)>;

enum DigestState {
    Running {
        sender: mpsc::Sender<PieceJob>,
        workers: Vec<oneshot::Receiver<WorkerOutput>>,
    },
    Complete(Vec<u8>),
    Abandoned,
}

/// Streaming, parallel piece hasher.
///
/// Each worker is an OS thread named `hash-worker-N` that exits once the
/// queue closes, whether by `finish`, `abandon` or drop.
pub struct PieceDigest {
    /// Target size of every piece but the last
    piece_length: usize,
    /// Number of pieces the input is expected to produce
    piece_count: u64,
    /// Bytes of the piece currently being filled
    buffer: BytesMut,
    /// Pieces handed to the workers so far
    dispatched: u64,
    /// Output blob, one `HASH_SIZE` slot per piece
    blob: Vec<u8>,
    state: DigestState,
}

impl PieceDigest {
    /// Create a digest engine and start `workers` hash workers.
    ///
    /// A worker count of zero is treated as one.
    pub fn new(
        piece_length: u64,
        piece_count: u64,
        workers: usize,
        progress: Arc<dyn HashProgress>,
    ) -> Result<Self> {
        if piece_length == 0 && piece_count > 0 {
            return Err(TorrentError::config_error_with_field(
                format!("Piece length must be at least 1 byte to hash {} pieces", piece_count),
                "piece_length",
            ));
        }

        let piece_length = usize::try_from(piece_length).map_err(|_| {
            TorrentError::config_error_with_field("Piece length does not fit in memory", "piece_length")
        })?;
        let blob_len = usize::try_from(piece_count)
            .ok()
            .and_then(|count| count.checked_mul(HASH_SIZE))
            .ok_or_else(|| TorrentError::config_error("Piece count is too large"))?;

        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel(workers * QUEUE_DEPTH_PER_WORKER);
        let receiver = Arc::new(Mutex::new(receiver));

        debug!(
            "Starting piece digest: {} pieces of {} bytes on {} workers",
            piece_count, piece_length, workers
        );

        progress.start(piece_count, piece_length as u64);

        let mut results = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = Arc::clone(&receiver);
            let progress = Arc::clone(&progress);
            let (result_tx, result_rx) = oneshot::channel();

            thread::Builder::new()
                .name(format!("hash-worker-{}", id))
                .spawn(move || {
                    let output = hash_worker(id, receiver, progress);
                    let _ = result_tx.send(output);
                })
                .map_err(|e| TorrentError::config_error(format!("Failed to start hash worker {}: {}", id, e)))?;

            results.push(result_rx);
        }

        Ok(Self {
            piece_length,
            piece_count,
            buffer: BytesMut::with_capacity(piece_length),
            dispatched: 0,
            blob: vec![0u8; blob_len],
            state: DigestState::Running {
                sender,
                workers: results,
            },
        })
    }

    /// Feed bytes into the engine.
    ///
    /// Every time the piece buffer fills up it is handed to the workers. This
    /// waits while the work queue is full.
    pub async fn feed(&mut self, mut data: &[u8]) -> Result<()> {
        self.ensure_running()?;
        if data.is_empty() {
            return Ok(());
        }

        loop {
            if self.buffer.is_empty() {
                self.buffer.reserve(self.piece_length);
            }
            let take = (self.piece_length - self.buffer.len()).min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.buffer.len() == self.piece_length {
                self.dispatch().await?;
            }
            if data.is_empty() {
                break;
            }
        }

        Ok(())
    }

    /// Feed everything `reader` yields until EOF.
    ///
    /// Returns the number of bytes read.
    pub async fn read_from<R>(&mut self, reader: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            self.feed(&chunk[..n]).await?;
        }

        Ok(total)
    }

    /// Hash the irregular last piece, wait for every worker and return the
    /// digest blob.
    ///
    /// Calling this again after it succeeded returns the same blob.
    pub async fn finish(&mut self) -> Result<Vec<u8>> {
        match &self.state {
            DigestState::Complete(blob) => {
                debug!("Piece digest already complete, returning cached blob");
                return Ok(blob.clone());
            }
            DigestState::Abandoned => {
                return Err(TorrentError::consistency_error("Piece digest was abandoned"));
            }
            DigestState::Running { .. } => {}
        }

        if !self.buffer.is_empty() {
            trace!("Dispatching irregular final piece of {} bytes", self.buffer.len());
            self.dispatch().await?;
        }

        let workers = match std::mem::replace(&mut self.state, DigestState::Abandoned) {
            DigestState::Running { sender, workers } => {
                drop(sender);
                workers
            }
            other => {
                self.state = other;
                return Err(TorrentError::consistency_error("Piece digest is not running"));
            }
        };

        let mut hashed = 0u64;
        for (id, result) in workers.into_iter().enumerate() {
            let output = result
                .await
                .map_err(|_| TorrentError::consistency_error(format!("Hash worker {} died before reporting", id)))?;
            for (index, hash) in output {
                let offset = index as usize * HASH_SIZE;
                self.blob[offset..offset + HASH_SIZE].copy_from_slice(&hash);
                hashed += 1;
            }
        }

        if self.dispatched != self.piece_count || hashed != self.piece_count {
            return Err(TorrentError::consistency_error_with_counts(
                "Input ended before every expected piece was hashed",
                self.piece_count,
                hashed,
            ));
        }

        let blob = std::mem::take(&mut self.blob);
        debug!("Piece digest complete: {} pieces, {} bytes", self.piece_count, blob.len());
        self.state = DigestState::Complete(blob.clone());
        Ok(blob)
    }

    /// Stop accepting work without waiting for the workers.
    ///
    /// Queued pieces are still drained in the background. Later calls to
    /// `feed` or `finish` fail.
    pub fn abandon(&mut self) {
        if let DigestState::Running { workers, .. } = &self.state {
            warn!(
                "Abandoning piece digest after {} of {} pieces ({} workers draining)",
                self.dispatched,
                self.piece_count,
                workers.len()
            );
            self.state = DigestState::Abandoned;
            self.buffer.clear();
        }
    }

    /// Get the piece length
    pub fn piece_length(&self) -> u64 {
        self.piece_length as u64
    }

    /// Get the expected number of pieces
    pub fn piece_count(&self) -> u64 {
        self.piece_count
    }

    /// Get the number of pieces handed to the workers so far
    pub fn pieces_dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Check if the digest blob has been produced
    pub fn is_complete(&self) -> bool {
        matches!(self.state, DigestState::Complete(_))
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state {
            DigestState::Running { .. } => Ok(()),
            DigestState::Complete(_) => Err(TorrentError::consistency_error("Piece digest is already complete")),
            DigestState::Abandoned => Err(TorrentError::consistency_error("Piece digest was abandoned")),
        }
    }

    async fn dispatch(&mut self) -> Result<()> {
        if self.dispatched >= self.piece_count {
            return Err(TorrentError::consistency_error_with_counts(
                "More pieces fed than expected",
                self.piece_count,
                self.dispatched + 1,
            ));
        }

        let sender = match &self.state {
            DigestState::Running { sender, .. } => sender,
            _ => return Err(TorrentError::consistency_error("Piece digest is not running")),
        };

        let job = PieceJob {
            index: self.dispatched,
            data: self.buffer.split().freeze(),
        };
        trace!("Dispatching piece {} ({} bytes)", job.index, job.data.len());

        sender
            .send(job)
            .await
            .map_err(|_| TorrentError::consistency_error("Hash workers stopped accepting pieces"))?;
        self.dispatched += 1;
        Ok(())
    }
}

fn hash_worker(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<PieceJob>>>,
    progress: Arc<dyn HashProgress>,
) -> WorkerOutput {
    let mut output = Vec::new();

    loop {
        let job = receiver.blocking_lock().blocking_recv();
        let Some(job) = job else {
            break;
        };
        output.push((job.index, hash_piece(&job.data)));
        progress.piece_hashed();
    }

    trace!("Hash worker {} exiting after {} pieces", id, output.len());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn digest(piece_length: u64, piece_count: u64, workers: usize) -> PieceDigest {
        PieceDigest::new(piece_length, piece_count, workers, Arc::new(NoProgress)).unwrap()
    }

    fn expected(pieces: &[&[u8]]) -> Vec<u8> {
        pieces.iter().flat_map(|p| hash_piece(p)).collect()
    }

    fn sample_data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_zero_pieces() {
        let mut d = digest(1, 0, 1);
        assert!(d.finish().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_irregular_piece() {
        let mut d = digest(30, 1, 1);
        d.feed(b"12").await.unwrap();
        assert_eq!(d.finish().await.unwrap(), expected(&[b"12"]));
    }

    #[tokio::test]
    async fn test_irregular_last_piece() {
        let mut d = digest(2, 3, 1);
        d.feed(b"11").await.unwrap();
        d.feed(b"22").await.unwrap();
        d.feed(b"3").await.unwrap();
        assert_eq!(d.finish().await.unwrap(), expected(&[b"11", b"22", b"3"]));
    }

    #[tokio::test]
    async fn test_regular_pieces_across_writes() {
        let mut d = digest(2, 2, 1);
        d.feed(b"1").await.unwrap();
        d.feed(b"2").await.unwrap();
        d.feed(b"34").await.unwrap();
        assert_eq!(d.finish().await.unwrap(), expected(&[b"12", b"34"]));
    }

    #[tokio::test]
    async fn test_piece_spanning_two_sources() {
        // 2-byte file followed by a 3-byte file
        let mut d = digest(2, 3, 2);
        d.feed(b"ab").await.unwrap();
        d.feed(b"cde").await.unwrap();
        assert_eq!(d.finish().await.unwrap(), expected(&[b"ab", b"cd", b"e"]));
    }

    #[tokio::test]
    async fn test_zero_workers_normalized() {
        let mut d = digest(1, 1, 0);
        d.feed(b"1").await.unwrap();
        assert_eq!(d.finish().await.unwrap(), expected(&[b"1"]));
    }

    #[tokio::test]
    async fn test_overflow_is_consistency_error() {
        let mut d = digest(0, 0, 1);
        let err = d.feed(b"1").await.unwrap_err();
        assert!(matches!(err, TorrentError::ConsistencyError { .. }));
    }

    #[tokio::test]
    async fn test_too_many_pieces_rejected() {
        let mut d = digest(2, 1, 1);
        let err = d.feed(b"1234").await.unwrap_err();
        assert!(matches!(err, TorrentError::ConsistencyError { expected: Some(1), actual: Some(2), .. }));
    }

    #[tokio::test]
    async fn test_short_input_rejected() {
        let mut d = digest(2, 3, 1);
        d.feed(b"123").await.unwrap();
        let err = d.finish().await.unwrap_err();
        assert!(matches!(err, TorrentError::ConsistencyError { .. }));
    }

    #[tokio::test]
    async fn test_zero_piece_length_is_config_error() {
        let result = PieceDigest::new(0, 4, 1, Arc::new(NoProgress));
        assert!(matches!(result, Err(TorrentError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_chunk_boundary_independence() {
        let data = sample_data(1000);
        let piece_length = 7u64;
        let piece_count = (data.len() as u64).div_ceil(piece_length);

        let mut whole = digest(piece_length, piece_count, 3);
        whole.feed(&data).await.unwrap();
        let whole = whole.finish().await.unwrap();

        let mut bytewise = digest(piece_length, piece_count, 3);
        for b in &data {
            bytewise.feed(std::slice::from_ref(b)).await.unwrap();
        }
        let bytewise = bytewise.finish().await.unwrap();

        let mut chunked = digest(piece_length, piece_count, 3);
        for chunk in data.chunks(13) {
            chunked.feed(chunk).await.unwrap();
        }
        let chunked = chunked.finish().await.unwrap();

        assert_eq!(whole.len(), piece_count as usize * HASH_SIZE);
        assert_eq!(whole, bytewise);
        assert_eq!(whole, chunked);
        let reference: Vec<&[u8]> = data.chunks(piece_length as usize).collect();
        assert_eq!(whole, expected(&reference));
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_blob() {
        let data = sample_data(64 * 1024 + 17);
        let piece_length = 1024u64;
        let piece_count = (data.len() as u64).div_ceil(piece_length);

        let mut blobs = Vec::new();
        for workers in [1, 2, 8] {
            let mut d = digest(piece_length, piece_count, workers);
            d.feed(&data).await.unwrap();
            blobs.push(d.finish().await.unwrap());
        }

        assert_eq!(blobs[0], blobs[1]);
        assert_eq!(blobs[0], blobs[2]);
    }

    #[tokio::test]
    async fn test_finish_twice_returns_cached_blob() {
        let mut d = digest(2, 2, 2);
        d.feed(b"abc").await.unwrap();
        let first = d.finish().await.unwrap();
        let second = d.finish().await.unwrap();
        assert_eq!(first, second);
        assert!(d.is_complete());
        assert_eq!(d.pieces_dispatched(), 2);
    }

    #[tokio::test]
    async fn test_feed_after_finish_fails() {
        let mut d = digest(2, 1, 1);
        d.feed(b"ab").await.unwrap();
        d.finish().await.unwrap();
        assert!(d.feed(b"c").await.is_err());
    }

    #[tokio::test]
    async fn test_abandon_does_not_block() {
        let mut d = digest(1, 100, 1);
        d.feed(b"abc").await.unwrap();
        d.abandon();
        assert!(d.feed(b"d").await.is_err());
        assert!(matches!(d.finish().await, Err(TorrentError::ConsistencyError { .. })));
    }

    #[tokio::test]
    async fn test_read_from_reader() {
        let data = sample_data(200_000);
        let piece_length = 16384u64;
        let piece_count = (data.len() as u64).div_ceil(piece_length);

        let mut d = digest(piece_length, piece_count, 4);
        let mut reader: &[u8] = &data;
        let read = d.read_from(&mut reader).await.unwrap();
        assert_eq!(read, data.len() as u64);

        let reference: Vec<&[u8]> = data.chunks(piece_length as usize).collect();
        assert_eq!(d.finish().await.unwrap(), expected(&reference));
    }

    #[test]
    fn test_workers_leave_blocking_pool_free() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .max_blocking_threads(1)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let data = sample_data(4096);
            let mut d = digest(16, 256, 8);

            // A single blocking thread must still be available to file reads
            let blocking = tokio::task::spawn_blocking(|| 7u8);
            let value = tokio::time::timeout(Duration::from_secs(10), blocking).await;
            assert_eq!(value.unwrap().unwrap(), 7);

            let path = tempfile::NamedTempFile::new().unwrap();
            tokio::fs::write(path.path(), &data).await.unwrap();
            let mut file = tokio::fs::File::open(path.path()).await.unwrap();
            let read = tokio::time::timeout(Duration::from_secs(10), d.read_from(&mut file)).await;
            assert_eq!(read.unwrap().unwrap(), 4096);

            let reference: Vec<&[u8]> = data.chunks(16).collect();
            assert_eq!(d.finish().await.unwrap(), expected(&reference));
        });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hundreds_of_workers() {
        let data = sample_data(100_000);
        let piece_length = 128u64;
        let piece_count = (data.len() as u64).div_ceil(piece_length);

        let run = async {
            let mut d = digest(piece_length, piece_count, 600);
            for chunk in data.chunks(4096) {
                d.feed(chunk).await.unwrap();
            }
            d.finish().await.unwrap()
        };
        let blob = tokio::time::timeout(Duration::from_secs(30), run).await.unwrap();

        let reference: Vec<&[u8]> = data.chunks(piece_length as usize).collect();
        assert_eq!(blob, expected(&reference));
    }

    #[tokio::test]
    async fn test_progress_counts_every_piece() {
        struct Counter(AtomicUsize);
        impl HashProgress for Counter {
            fn piece_hashed(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let mut d = PieceDigest::new(4, 5, 2, counter.clone()).unwrap();
        d.feed(b"0123456789abcdefghi").await.unwrap();
        d.finish().await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 5);
    }
}
