//! GRP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, GroupingError>;

/// Top-level error type for event grouping.
#[derive(Debug, Error)]
pub enum GroupingError {
    #[error("[GRP-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[GRP-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[GRP-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[GRP-2001] empty hash at path position {position}")]
    EmptyHash { position: usize },

    #[error("[GRP-2002] node {index} does not belong to this tree")]
    UnknownNode { index: usize },

    #[error("[GRP-2101] invalid event record on line {line}: {details}")]
    InvalidRecord { line: usize, details: String },

    #[error("[GRP-2102] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[GRP-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GroupingError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "GRP-1001",
            Self::MissingConfig { .. } => "GRP-1002",
            Self::ConfigParse { .. } => "GRP-1003",
            Self::EmptyHash { .. } => "GRP-2001",
            Self::UnknownNode { .. } => "GRP-2002",
            Self::InvalidRecord { .. } => "GRP-2101",
            Self::Serialization { .. } => "GRP-2102",
            Self::Io { .. } => "GRP-3002",
        }
    }

    /// Whether the failure stems from caller input rather than the environment.
    ///
    /// Caller errors are rejected before any tree mutation and will fail the
    /// same way on every attempt.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyHash { .. } | Self::UnknownNode { .. } | Self::InvalidRecord { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for GroupingError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for GroupingError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
