//! Create a torrent with the library API
//!
//! Hashes a file or directory, prints a short summary and writes
//! `<path>.torrent` next to it.
//!
//! Run this example with:
//! ```bash
//! cargo run --example create_torrent -- <path> [announce-url]
//! ```

use std::sync::Arc;

use anyhow::Context;
use rust_torrent_maker::{default_output_path, HashStats, PieceLengthPolicy, ProgressDisplay, TorrentBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file-or-directory> [announce-url]", args[0]);
        std::process::exit(1);
    }

    let path = std::path::PathBuf::from(&args[1]);
    let progress = Arc::new(ProgressDisplay::new(false));

    let mut builder = TorrentBuilder::new(&path)
        .piece_length_policy(PieceLengthPolicy::Auto)
        .workers(4)
        .comment(Some("created by the create_torrent example".to_string()))
        .progress(progress.clone());
    if let Some(url) = args.get(2) {
        builder = builder.announce(url.as_str());
    }

    let torrent = builder.build().await.context("Failed to build torrent")?;

    println!();
    println!("Name: {}", torrent.info.name);
    println!("Files: {}", torrent.info.files.len());
    println!("Size: {}", HashStats::format_bytes(torrent.total_size()));
    println!("Pieces: {} x {}", torrent.piece_count(), HashStats::format_bytes(torrent.info.piece_length));
    println!("Info hash: {}", torrent.info_hash_hex()?);

    let output = default_output_path(&path);
    let mut file = std::fs::File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    torrent.serialize(&mut file)?;
    println!("Written to {}", output.display());

    Ok(())
}
