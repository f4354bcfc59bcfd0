use std::path::PathBuf;
use thiserror::Error;

/// Core error type for emitall operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid ignore pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    #[error("Failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read module source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Stable SCREAMING_SNAKE_CASE code for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "EMIT_PARSE_ERROR",
            Self::Io { .. } => "EMIT_IO_ERROR",
            Self::ConfigRead { .. } | Self::ConfigNotFound { .. } => "EMIT_CONFIG_READ_ERROR",
            Self::ConfigParse { .. } => "EMIT_CONFIG_PARSE_ERROR",
            Self::InvalidPattern { .. } => "EMIT_INVALID_PATTERN",
            Self::ManifestRead { .. } | Self::SourceRead { .. } => "EMIT_MANIFEST_READ_ERROR",
            Self::ManifestParse { .. } => "EMIT_MANIFEST_PARSE_ERROR",
            Self::Task(_) => "EMIT_TASK_ERROR",
        }
    }

    /// Path the error is about, if any.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Parse { path, .. }
            | Self::Io { path, .. }
            | Self::ConfigRead { path, .. }
            | Self::ConfigParse { path, .. }
            | Self::ConfigNotFound { path }
            | Self::ManifestRead { path, .. }
            | Self::ManifestParse { path, .. }
            | Self::SourceRead { path, .. } => Some(path),
            Self::InvalidPattern { .. } | Self::Task(_) => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
