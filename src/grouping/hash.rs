//! Fingerprint hash entries: one contributing hash plus an optional tree label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::{GroupingError, Result};

/// One fingerprint component produced by the external hash producer.
///
/// The hash is opaque and never empty. The label is a display hint for
/// intermediate tree nodes only; it never takes part in identity or merge
/// decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawHashEntry")]
pub struct HashEntry {
    hash: String,
    label: Option<String>,
}

#[derive(Deserialize)]
struct RawHashEntry {
    hash: String,
    #[serde(default)]
    label: Option<String>,
}

impl TryFrom<RawHashEntry> for HashEntry {
    type Error = GroupingError;

    fn try_from(raw: RawHashEntry) -> Result<Self> {
        Self::new(raw.hash, raw.label)
    }
}

impl HashEntry {
    /// Build an entry, rejecting an empty hash.
    pub fn new(hash: impl Into<String>, label: Option<String>) -> Result<Self> {
        let hash = hash.into();
        if hash.is_empty() {
            return Err(GroupingError::EmptyHash { position: 0 });
        }
        Ok(Self { hash, label })
    }

    /// Build an unlabeled entry.
    pub fn unlabeled(hash: impl Into<String>) -> Result<Self> {
        Self::new(hash, None)
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Display for HashEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({label})", self.hash),
            None => f.write_str(&self.hash),
        }
    }
}

/// Build an unlabeled hash path from plain strings.
///
/// The reported position on failure is the index of the first empty hash.
pub fn hash_path<I, S>(hashes: I) -> Result<Vec<HashEntry>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    hashes
        .into_iter()
        .enumerate()
        .map(|(position, hash)| {
            HashEntry::unlabeled(hash).map_err(|_| GroupingError::EmptyHash { position })
        })
        .collect()
}

/// Check that every hash in a path is non-empty.
pub(crate) fn validate_path(path: &[HashEntry]) -> Result<()> {
    match path.iter().position(|entry| entry.hash.is_empty()) {
        Some(position) => Err(GroupingError::EmptyHash { position }),
        None => Ok(()),
    }
}
