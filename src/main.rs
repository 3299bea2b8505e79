//! rust-torrent-maker - Main entry point
//!
//! Creates, edits and inspects BitTorrent metainfo files.

use anyhow::{Context, Result};
use rust_torrent_maker::{
    CliArgs, Command, Config, CreateArgs, EditArgs, ProfileArgs, ShowArgs,
    HashStats, Metainfo, MetainfoEdit, ProfileConfig, ProgressDisplay, TorrentParser,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Set up panic handler for unexpected errors
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();

        if let Some(location) = panic_info.location() {
            error!(
                "PANIC occurred at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            );
        }
        let payload = panic_info.payload();
        if let Some(s) = payload.downcast_ref::<&str>() {
            error!("Panic message: {}", s);
        } else if let Some(s) = payload.downcast_ref::<String>() {
            error!("Panic message: {}", s);
        } else {
            error!("Panic message: unknown");
        }
        error!("Backtrace:\n{:?}", backtrace);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_panic_handler();

    let args = CliArgs::parse_args();
    init_logging(&args);
    info!("rust-torrent-maker starting");
    debug!("CLI arguments: {:?}", args);

    let quiet = args.is_quiet();
    let result = match &args.command {
        Command::Create(create) => run_create(create, quiet).await,
        Command::Profile(profile) => run_profile(profile, quiet).await,
        Command::Edit(edit) => run_edit(edit).await,
        Command::Show(show) => run_show(show),
    };

    if let Err(e) = &result {
        error!("Failed: {:#}", e);
    }
    result
}

/// Initialize logging based on verbosity settings
fn init_logging(args: &CliArgs) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if args.is_verbose() {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    debug!("Logging initialized successfully");
}

/// Build one torrent from explicit arguments
async fn run_create(args: &CreateArgs, quiet: bool) -> Result<()> {
    let config = Config::from_args(args);
    config.validate().context("Invalid configuration")?;
    make_torrent(&config, quiet).await
}

/// Build one torrent per path with the settings of a profile
async fn run_profile(args: &ProfileArgs, quiet: bool) -> Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => ProfileConfig::default_path().context("Cannot locate configuration: HOME is not set")?,
    };

    let profiles = ProfileConfig::load(&config_path)
        .await
        .context("Failed to load configuration")?;
    let profile = profiles.profile(&args.profile)?;

    info!("Profile: {}", args.profile);
    debug!("Announce: {:?}", profile.announce);
    debug!("Source: {:?}, private: {}", profile.source, profile.private);

    for path in &args.paths {
        let config = Config::from_profile(profile, path, args.workers);
        config
            .validate()
            .with_context(|| format!("Invalid configuration for {}", path.display()))?;
        make_torrent(&config, quiet)
            .await
            .with_context(|| format!("{}", path.display()))?;
    }

    Ok(())
}

/// Hash the content described by `config` and write the .torrent file
async fn make_torrent(config: &Config, quiet: bool) -> Result<()> {
    let progress = Arc::new(ProgressDisplay::new(quiet));
    progress.print_status(&format!("Hashing {}", config.path.display()))?;

    let torrent = match config.builder(progress.clone()).build().await {
        Ok(torrent) => torrent,
        Err(e) => {
            progress.print_error(&e.to_string())?;
            return Err(anyhow::Error::from(e)).context("Can't make torrent");
        }
    };

    write_torrent(&torrent, &config.output)
        .await
        .context("Can't save torrent")?;

    progress.print_complete(&config.output, torrent.total_size())?;
    info!("Torrent for '{}' written to {}", torrent.info.name, config.output.display());
    Ok(())
}

/// Load, edit and re-save an existing .torrent file
async fn run_edit(args: &EditArgs) -> Result<()> {
    let mut torrent = TorrentParser::parse_file(&args.torrent).context("Failed to load torrent file")?;

    for url in &args.announce {
        url::Url::parse(url).with_context(|| format!("Invalid announce URL: {}", url))?;
    }

    let edit = MetainfoEdit {
        name: args.name.clone(),
        source: args.source.clone(),
        announce: (!args.announce.is_empty()).then(|| args.announce.clone()),
        private: args.private,
    };
    if edit.is_empty() {
        warn!("Nothing to edit in {}", args.torrent.display());
        return Ok(());
    }

    torrent.apply_edit(&edit);

    let output = args.output.as_deref().unwrap_or(&args.torrent);
    write_torrent(&torrent, output).await.context("Can't save torrent")?;
    info!("Edited torrent written to {}", output.display());
    Ok(())
}

/// Print a .torrent file
fn run_show(args: &ShowArgs) -> Result<()> {
    let torrent = TorrentParser::parse_file(&args.torrent).context("Failed to load torrent file")?;
    display_torrent_info(&torrent)
}

/// Encode fully in memory, write to a temporary file, then rename into place
async fn write_torrent(torrent: &Metainfo, output: &Path) -> Result<()> {
    let data = torrent.to_bytes()?;

    let mut tmp = output.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    debug!("Writing {} bytes to {}", data.len(), tmp.display());
    if let Err(e) = tokio::fs::write(&tmp, &data).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("Failed to write {}", tmp.display()));
    }

    tokio::fs::rename(&tmp, output)
        .await
        .with_context(|| format!("Failed to move {} to {}", tmp.display(), output.display()))?;
    Ok(())
}

/// Display torrent information
fn display_torrent_info(torrent: &Metainfo) -> Result<()> {
    println!("Torrent Information:");
    println!("  Name: {}", torrent.info.name);
    println!("  Size: {} ({})",
        torrent.total_size(),
        HashStats::format_bytes(torrent.total_size())
    );
    println!("  Pieces: {}", torrent.piece_count());
    println!("  Piece length: {}",
        HashStats::format_bytes(torrent.info.piece_length)
    );
    println!("  Info hash: {}", torrent.info_hash_hex()?);
    println!("  Private: {}", if torrent.info.private { "yes" } else { "no" });
    if let Some(source) = &torrent.info.source {
        println!("  Source: {}", source);
    }
    if let Some(comment) = &torrent.comment {
        println!("  Comment: {}", comment);
    }
    if let Some(created_by) = &torrent.created_by {
        println!("  Created by: {}", created_by);
    }
    println!();
    println!("Trackers:");
    for (tier, urls) in torrent.announce_list.iter().enumerate() {
        println!("  [{}] {}", tier, urls.join(", "));
    }
    println!();
    println!("Files:");
    for file in &torrent.info.files {
        println!("  {} ({})", file.path.join("/"), HashStats::format_bytes(file.length));
    }

    Ok(())
}
