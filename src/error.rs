//! Error types for the torrent maker
//!
//! This module defines the error taxonomy shared by the walker, the
//! piece digest engine, the metainfo builder and the descriptor codec.

use std::fmt;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TorrentError>;

/// Comprehensive error type for torrent authoring operations
#[derive(Debug, Clone)]
pub enum TorrentError {
    /// Invalid configuration (piece length override, missing profile, ...)
    ConfigError {
        message: String,
        field: Option<String>,
    },

    /// Filesystem errors (unreadable root, vanished file, ...)
    FilesystemError {
        message: String,
        path: Option<String>,
        source: Option<String>,
    },

    /// Bencode serialization errors
    EncodingError {
        message: String,
        source: Option<String>,
    },

    /// Errors decoding an existing .torrent file
    ParseError {
        message: String,
        source: Option<String>,
    },

    /// Piece accounting mismatch between declared and actual byte counts
    ConsistencyError {
        message: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// Validation errors
    ValidationError {
        message: String,
        field: Option<String>,
    },
}

impl TorrentError {
    /// Create a new ConfigError
    pub fn config_error(message: impl Into<String>) -> Self {
        TorrentError::ConfigError {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new ConfigError with field
    pub fn config_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        TorrentError::ConfigError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new FilesystemError with path
    pub fn filesystem_error_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        TorrentError::FilesystemError {
            message: message.into(),
            path: Some(path.into()),
            source: None,
        }
    }

    /// Create a new FilesystemError with path and source
    pub fn filesystem_error_full(message: impl Into<String>, path: impl Into<String>, source: impl Into<String>) -> Self {
        TorrentError::FilesystemError {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source.into()),
        }
    }

    /// Create a new EncodingError
    pub fn encoding_error(message: impl Into<String>) -> Self {
        TorrentError::EncodingError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new EncodingError with source
    pub fn encoding_error_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        TorrentError::EncodingError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new ParseError
    pub fn parse_error(message: impl Into<String>) -> Self {
        TorrentError::ParseError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new ParseError with source
    pub fn parse_error_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        TorrentError::ParseError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new ConsistencyError
    pub fn consistency_error(message: impl Into<String>) -> Self {
        TorrentError::ConsistencyError {
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Create a new ConsistencyError with expected and actual counts
    pub fn consistency_error_with_counts(message: impl Into<String>, expected: u64, actual: u64) -> Self {
        TorrentError::ConsistencyError {
            message: message.into(),
            expected: Some(expected),
            actual: Some(actual),
        }
    }

    /// Create a new ValidationError
    pub fn validation_error(message: impl Into<String>) -> Self {
        TorrentError::ValidationError {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new ValidationError with field
    pub fn validation_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        TorrentError::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Tag a filesystem or consistency error with the path it concerns.
    ///
    /// Errors that already carry a path keep it.
    pub fn with_path(self, path: impl Into<String>) -> Self {
        match self {
            TorrentError::FilesystemError { message, path: None, source } => TorrentError::FilesystemError {
                message,
                path: Some(path.into()),
                source,
            },
            TorrentError::ConsistencyError { message, expected, actual } => TorrentError::ConsistencyError {
                message: format!("{} (path: {})", message, path.into()),
                expected,
                actual,
            },
            other => other,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match &mut self {
            TorrentError::FilesystemError { source, .. }
            | TorrentError::EncodingError { source, .. }
            | TorrentError::ParseError { source, .. } => {
                *source = Some(source.as_ref().map_or_else(|| ctx.clone(), |s| format!("{}: {}", s, ctx)));
            }
            TorrentError::ConfigError { message, .. }
            | TorrentError::ConsistencyError { message, .. }
            | TorrentError::ValidationError { message, .. } => {
                *message = format!("{}: {}", message, ctx);
            }
        }
        self
    }
}

impl fmt::Display for TorrentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorrentError::ConfigError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Config error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Config error: {}", message)
                }
            }
            TorrentError::FilesystemError { message, path, source } => {
                match (path, source) {
                    (Some(p), Some(s)) => write!(f, "Filesystem error: {} (path: {}, source: {})", message, p, s),
                    (Some(p), None) => write!(f, "Filesystem error: {} (path: {})", message, p),
                    (None, Some(s)) => write!(f, "Filesystem error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Filesystem error: {}", message),
                }
            }
            TorrentError::EncodingError { message, source } => {
                if let Some(src) = source {
                    write!(f, "Encoding error: {} (source: {})", message, src)
                } else {
                    write!(f, "Encoding error: {}", message)
                }
            }
            TorrentError::ParseError { message, source } => {
                if let Some(src) = source {
                    write!(f, "Parse error: {} (source: {})", message, src)
                } else {
                    write!(f, "Parse error: {}", message)
                }
            }
            TorrentError::ConsistencyError { message, expected, actual } => {
                match (expected, actual) {
                    (Some(e), Some(a)) => write!(f, "Consistency error: {} (expected: {}, actual: {})", message, e, a),
                    _ => write!(f, "Consistency error: {}", message),
                }
            }
            TorrentError::ValidationError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Validation error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Validation error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for TorrentError {}

// Implement From traits for common error types

impl From<std::io::Error> for TorrentError {
    fn from(err: std::io::Error) -> Self {
        TorrentError::FilesystemError {
            message: err.to_string(),
            path: None,
            source: Some(err.kind().to_string()),
        }
    }
}

impl From<walkdir::Error> for TorrentError {
    fn from(err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        TorrentError::filesystem_error_full("Failed to walk directory", path, err.to_string())
    }
}

impl From<serde_json::Error> for TorrentError {
    fn from(err: serde_json::Error) -> Self {
        TorrentError::ConfigError {
            message: format!("Failed to parse configuration: {}", err),
            field: None,
        }
    }
}

impl From<url::ParseError> for TorrentError {
    fn from(err: url::ParseError) -> Self {
        TorrentError::validation_error_with_field(format!("Invalid announce URL: {}", err), "announce")
    }
}
