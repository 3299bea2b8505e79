//! CLI configuration module
//!
//! Turns command-line arguments and configuration profiles into validated
//! build settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::cli::args::CreateArgs;
use crate::error::{Result, TorrentError};
use crate::hash::HashProgress;
use crate::torrent::{PieceLengthPolicy, TorrentBuilder};

/// File name of the profile configuration under `~/.config`
pub const PROFILE_CONFIG_FILE: &str = "autotorrent.json";

/// A named set of tracker defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Tracker announce URLs
    #[serde(default)]
    pub announce: Vec<String>,
    /// Source tag
    #[serde(default)]
    pub source: Option<String>,
    /// Private flag
    #[serde(default)]
    pub private: bool,
    /// Upper bound for the automatic piece length
    #[serde(default)]
    pub max_piece_length: Option<u64>,
}

impl Profile {
    /// Piece length policy implied by the profile
    pub fn policy(&self) -> PieceLengthPolicy {
        match self.max_piece_length {
            Some(max) => PieceLengthPolicy::Capped { max },
            None => PieceLengthPolicy::Auto,
        }
    }
}

/// Collection of profiles keyed by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileConfig {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileConfig {
    /// Default location: `$HOME/.config/autotorrent.json`
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join(PROFILE_CONFIG_FILE))
    }

    /// Parse profiles from JSON
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Load profiles from a JSON file
    pub async fn load(path: &Path) -> Result<Self> {
        info!("Loading profiles from: {}", path.display());

        let data = tokio::fs::read_to_string(path).await.map_err(|e| {
            error!("Failed to read configuration '{}': {}", path.display(), e);
            TorrentError::filesystem_error_full("Failed to read configuration", path.display().to_string(), e.to_string())
        })?;

        let config = Self::from_json(&data)?;
        debug!("Loaded {} profiles", config.profiles.len());
        Ok(config)
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| TorrentError::config_error_with_field("Profile not found", name))
    }

    /// Get the profile names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

/// Settings for one torrent build
#[derive(Debug, Clone)]
pub struct Config {
    /// Content root
    pub path: PathBuf,
    /// Where the .torrent is written
    pub output: PathBuf,
    /// Tracker URLs
    pub announce: Vec<String>,
    /// Source tag
    pub source: Option<String>,
    /// Private flag
    pub private: bool,
    /// Piece length policy
    pub policy: PieceLengthPolicy,
    /// Number of hash workers
    pub workers: usize,
    /// Comment
    pub comment: Option<String>,
}

impl Config {
    /// Create configuration from `create` arguments
    pub fn from_args(args: &CreateArgs) -> Self {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&args.path));

        Self {
            path: args.path.clone(),
            output,
            announce: args.announce.clone(),
            source: args.source.clone(),
            private: args.private,
            policy: args
                .piece_length
                .map(PieceLengthPolicy::Fixed)
                .unwrap_or_default(),
            workers: args.workers.max(1),
            comment: args.comment.clone(),
        }
    }

    /// Create configuration for `path` from a profile
    pub fn from_profile(profile: &Profile, path: &Path, workers: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            output: default_output_path(path),
            announce: profile.announce.clone(),
            source: profile.source.clone(),
            private: profile.private,
            policy: profile.policy(),
            workers: workers.max(1),
            comment: None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(TorrentError::config_error_with_field("path cannot be empty", "path"));
        }

        self.policy.validate()?;

        for url in &self.announce {
            url::Url::parse(url).map_err(|e| TorrentError::from(e).with_context(url.clone()))?;
        }

        Ok(())
    }

    /// Builder configured from these settings
    pub fn builder(&self, progress: Arc<dyn HashProgress>) -> TorrentBuilder {
        TorrentBuilder::new(&self.path)
            .piece_length_policy(self.policy)
            .announce_list(self.announce.iter().cloned())
            .source(self.source.clone())
            .private(self.private)
            .workers(self.workers)
            .comment(self.comment.clone())
            .progress(progress)
    }
}

/// `PATH.torrent`, ignoring trailing separators in `PATH`
pub fn default_output_path(path: &Path) -> PathBuf {
    let normalized: PathBuf = path.components().collect();
    match normalized.file_name() {
        Some(name) => {
            let mut file = name.to_os_string();
            file.push(".torrent");
            normalized.with_file_name(file)
        }
        None => PathBuf::from("content.torrent"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILES: &str = r#"{
        "green": {
            "announce": ["http://tracker.org:2710/announce", "udp://tracker.it:80"],
            "source": "GREEN",
            "private": true,
            "max_piece_length": 1048576
        },
        "open": {}
    }"#;

    fn create_args() -> CreateArgs {
        CreateArgs {
            path: PathBuf::from("/data/content/"),
            announce: vec!["http://tracker.example.com/announce".to_string()],
            source: None,
            private: false,
            piece_length: None,
            workers: 0,
            comment: None,
            output: None,
        }
    }

    #[test]
    fn test_profile_lookup() {
        let config = ProfileConfig::from_json(PROFILES).unwrap();
        let green = config.profile("green").unwrap();
        assert_eq!(green.announce.len(), 2);
        assert_eq!(green.source.as_deref(), Some("GREEN"));
        assert!(green.private);
        assert_eq!(green.policy(), PieceLengthPolicy::Capped { max: 1048576 });

        let open = config.profile("open").unwrap();
        assert_eq!(open, &Profile::default());
        assert_eq!(open.policy(), PieceLengthPolicy::Auto);
        assert_eq!(config.names().collect::<Vec<_>>(), vec!["green", "open"]);
    }

    #[test]
    fn test_missing_profile() {
        let config = ProfileConfig::from_json(PROFILES).unwrap();
        match config.profile("blue") {
            Err(TorrentError::ConfigError { field, .. }) => assert_eq!(field.as_deref(), Some("blue")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(ProfileConfig::from_json("{"), Err(TorrentError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROFILE_CONFIG_FILE);
        tokio::fs::write(&path, PROFILES).await.unwrap();

        let config = ProfileConfig::load(&path).await.unwrap();
        assert!(config.profile("green").is_ok());

        let missing = ProfileConfig::load(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(TorrentError::FilesystemError { .. })));
    }

    #[test]
    fn test_config_from_args() {
        let config = Config::from_args(&create_args());
        assert_eq!(config.output, PathBuf::from("/data/content.torrent"));
        assert_eq!(config.workers, 1);
        assert_eq!(config.policy, PieceLengthPolicy::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_profile() {
        let profiles = ProfileConfig::from_json(PROFILES).unwrap();
        let config = Config::from_profile(profiles.profile("green").unwrap(), Path::new("movie.mkv"), 2);
        assert_eq!(config.output, PathBuf::from("movie.mkv.torrent"));
        assert!(config.private);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_bad_url() {
        let mut args = create_args();
        args.announce.push("not a url".to_string());
        let config = Config::from_args(&args);
        assert!(matches!(config.validate(), Err(TorrentError::ValidationError { .. })));
    }

    #[test]
    fn test_config_validate_piece_length_override() {
        let mut args = create_args();
        args.piece_length = Some(crate::torrent::MAX_PIECE_LENGTH * 2);
        let config = Config::from_args(&args);
        assert!(matches!(config.validate(), Err(TorrentError::ConfigError { .. })));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output_path(Path::new("dir/")), PathBuf::from("dir.torrent"));
        assert_eq!(default_output_path(Path::new("./a/b.iso")), PathBuf::from("./a/b.iso.torrent"));
    }
}
