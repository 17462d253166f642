// src/error.rs
//! Run-level error type. Every variant names the pipeline stage that failed.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::db::merge::MergePolicy;
use crate::remote::RemoteError;

/// Pipeline stage, used to tag log lines and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Connect,
    Fetch,
    Staging,
    Merge,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Config => "config",
            Stage::Connect => "connect",
            Stage::Fetch => "fetch",
            Stage::Staging => "staging",
            Stage::Merge => "merge",
            Stage::Report => "report",
        })
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("connection failed: {0}")]
    Connect(#[source] RemoteError),

    #[error("transfer of {path} failed: {source}")]
    Transfer {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("staged snapshot {} is missing", .0.display())]
    MissingSnapshot(PathBuf),

    #[error("staging failed: {context}: {source}")]
    Staging {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("staged snapshot failed integrity check: {0}")]
    Corrupt(String),

    #[error("SQL artifact '{name}' could not be read: {source}")]
    Artifact {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{policy} merge failed, transaction rolled back: {source}")]
    Merge {
        policy: MergePolicy,
        #[source]
        source: rusqlite::Error,
    },

    #[error("watermark query failed: {0}")]
    Report(#[source] rusqlite::Error),

    #[error("timestamp {0} is outside the representable range")]
    TimestampRange(f64),

    #[error("closing the warehouse failed: {0}")]
    Close(#[source] rusqlite::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// Stage in which the error surfaced.
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::Config(_) => Stage::Config,
            IngestError::Connect(_) => Stage::Connect,
            IngestError::Transfer { .. } => Stage::Fetch,
            IngestError::MissingSnapshot(_)
            | IngestError::Staging { .. }
            | IngestError::Corrupt(_)
            | IngestError::Artifact { .. }
            | IngestError::Io { .. } => Stage::Staging,
            IngestError::Merge { .. } => Stage::Merge,
            IngestError::Report(_) | IngestError::TimestampRange(_) | IngestError::Close(_) => Stage::Report,
        }
    }

    pub(crate) fn staging(context: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let context = context.into();
        move |source| IngestError::Staging { context, source }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
