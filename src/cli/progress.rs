//! Progress display module
//!
//! Handles displaying hashing progress in the CLI.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::hash::HashProgress;

/// Hashing statistics for progress display
#[derive(Debug, Clone, Default)]
pub struct HashStats {
    /// Pieces hashed so far
    pub hashed: u64,
    /// Pieces expected
    pub total: u64,
    /// Piece length in bytes
    pub piece_length: u64,
    /// Time spent so far
    pub elapsed: Duration,
}

impl HashStats {
    /// Hashing progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.hashed as f64 / self.total as f64
        }
    }

    /// Approximate hashing throughput in bytes per second
    pub fn speed(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            (self.hashed * self.piece_length) as f64 / secs
        }
    }

    /// Format bytes to human readable string
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_index])
    }

    /// Format speed to human readable string
    pub fn format_speed(bytes_per_sec: f64) -> String {
        format!("{}/s", Self::format_bytes(bytes_per_sec as u64))
    }

    /// Format duration to human readable string
    pub fn format_duration(duration: Duration) -> String {
        let total_secs = duration.as_secs();
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Estimated time left at the current rate
    pub fn eta(&self) -> Option<Duration> {
        if self.hashed == 0 || self.hashed >= self.total {
            return None;
        }

        let per_piece = self.elapsed.as_secs_f64() / self.hashed as f64;
        Some(Duration::from_secs_f64(per_piece * (self.total - self.hashed) as f64))
    }
}

/// Progress bar for piece hashing.
///
/// Receives notifications from the hash workers, so every field is shared.
pub struct ProgressDisplay {
    start_time: Instant,
    last_update: Mutex<Instant>,
    update_interval: Duration,
    quiet: bool,
    total: AtomicU64,
    piece_length: AtomicU64,
    hashed: AtomicU64,
}

impl ProgressDisplay {
    /// Create a new progress display
    pub fn new(quiet: bool) -> Self {
        Self::with_interval(quiet, Duration::from_millis(500))
    }

    /// Create a progress display with custom update interval
    pub fn with_interval(quiet: bool, interval: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            last_update: Mutex::new(Instant::now()),
            update_interval: interval,
            quiet,
            total: AtomicU64::new(0),
            piece_length: AtomicU64::new(0),
            hashed: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current statistics
    pub fn stats(&self) -> HashStats {
        HashStats {
            hashed: self.hashed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
            piece_length: self.piece_length.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }

    /// Print progress bar
    pub fn print_progress(&self, stats: &HashStats) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let progress_percent = stats.progress() * 100.0;

        let bar_width: usize = 40;
        let filled = (progress_percent / 100.0 * bar_width as f64) as usize;
        let empty = bar_width.saturating_sub(filled);
        let bar: String = "=".repeat(filled) + &" ".repeat(empty);

        let eta_str = stats
            .eta()
            .map(HashStats::format_duration)
            .unwrap_or_else(|| "-".to_string());

        let mut stdout = io::stdout().lock();
        write!(
            stdout,
            "\r\x1b[2K[{}] {:.1}% | {}/{} pieces | {} | ETA: {}",
            bar,
            progress_percent,
            stats.hashed,
            stats.total,
            HashStats::format_speed(stats.speed()),
            eta_str,
        )?;
        stdout.flush()
    }

    /// Print a status message
    pub fn print_status(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        println!("\r\x1b[2K{}", message);
        Ok(())
    }

    /// Print an error message
    pub fn print_error(&self, message: &str) -> io::Result<()> {
        eprintln!("\r\x1b[2KError: {}", message);
        Ok(())
    }

    /// Print completion message
    pub fn print_complete(&self, output: &std::path::Path, total_bytes: u64) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let stats = self.stats();
        println!("\r\x1b[2KTorrent written: {}", output.display());
        println!("  Content: {}", HashStats::format_bytes(total_bytes));
        println!("  Pieces: {} x {}", stats.total, HashStats::format_bytes(stats.piece_length));
        println!("  Elapsed Time: {}", HashStats::format_duration(stats.elapsed));
        Ok(())
    }

    /// Get the elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn should_redraw(&self, done: bool) -> bool {
        let Ok(mut last) = self.last_update.lock() else {
            return false;
        };
        if done || last.elapsed() >= self.update_interval {
            *last = Instant::now();
            true
        } else {
            false
        }
    }
}

impl HashProgress for ProgressDisplay {
    fn start(&self, piece_count: u64, piece_length: u64) {
        self.total.store(piece_count, Ordering::Relaxed);
        self.piece_length.store(piece_length, Ordering::Relaxed);
        self.hashed.store(0, Ordering::Relaxed);
    }

    fn piece_hashed(&self) {
        let hashed = self.hashed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.quiet {
            return;
        }

        let done = hashed >= self.total.load(Ordering::Relaxed);
        if self.should_redraw(done) {
            let _ = self.print_progress(&self.stats());
        }
    }
}
