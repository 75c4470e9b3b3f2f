//! Run metadata written next to a report as `meta.json`.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::errors::{GroupingError, Result};
use crate::ingest::records::IngestStats;
use crate::logger::jsonl::format_utc_now;

/// Conventional file name for [`RunMetadata::write_to`] targets.
pub const METADATA_FILE: &str = "meta.json";

/// What produced a report, and from which inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// RFC 3339 UTC generation time.
    pub generated: String,
    pub crate_version: String,
    pub config_hash: String,
    pub config: serde_json::Value,
    /// Sorted, deduplicated project ids.
    pub projects: Vec<String>,
    #[serde(default)]
    pub stats: IngestStats,
}

impl RunMetadata {
    pub fn new<I, S>(config: &Config, projects: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projects: Vec<String> = projects.into_iter().map(Into::into).collect();
        projects.sort();
        projects.dedup();

        Ok(Self {
            generated: format_utc_now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: config.stable_hash()?,
            config: serde_json::to_value(config)?,
            projects,
            stats: IngestStats::default(),
        })
    }

    #[must_use]
    pub fn with_stats(mut self, stats: IngestStats) -> Self {
        self.stats = stats;
        self
    }

    /// Write pretty-printed JSON to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| GroupingError::io(parent, source))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| GroupingError::io(path, source))
    }
}
