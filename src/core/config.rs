//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::{GroupingError, Result};
use crate::grouping::diagnostics::{DiagnosticSink, FanoutSink, StderrSink};
use crate::logger::jsonl::{DEFAULT_FSYNC_INTERVAL_SECS, JsonlConfig, JsonlSink};

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "event_grouping.toml";

/// Full configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub grouping: GroupingConfig,
    pub diagnostics: DiagnosticsConfig,
    pub report: ReportConfig,
}

/// How each event picks between its flat and hierarchical hash lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingMode {
    /// Hierarchical when available, otherwise flat.
    #[default]
    Auto,
    Flat,
    Hierarchical,
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Flat => f.write_str("flat"),
            Self::Hierarchical => f.write_str("hierarchical"),
        }
    }
}

impl FromStr for GroupingMode {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "flat" => Ok(Self::Flat),
            "hierarchical" => Ok(Self::Hierarchical),
            other => Err(format!(
                "unknown grouping mode {other:?} (expected auto, flat or hierarchical)"
            )),
        }
    }
}

/// Grouping behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct GroupingConfig {
    pub mode: GroupingMode,
    /// Single-hash path used for events with no hierarchical hashes in
    /// hierarchical mode. Unset means such events land on the project root.
    pub empty_hierarchical_placeholder: Option<String>,
}

/// Where diagnostics go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub stderr: bool,
    pub jsonl_path: Option<PathBuf>,
    pub jsonl_fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

/// Report-side knobs used by the consumer views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Prefix for per-event JSON links; unset leaves links empty.
    pub events_base_url: Option<String>,
    pub shard_prefix_length: usize,
    pub shard_levels: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            stderr: true,
            jsonl_path: None,
            jsonl_fallback_path: None,
            max_size_bytes: 64 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            events_base_url: None,
            shard_prefix_length: 2,
            shard_levels: 2,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf)
                .map_err(|source| GroupingError::io(&path_buf, source))?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(GroupingError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for run metadata.
    ///
    /// FNV-1a over the canonical JSON, stable across processes and releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// JSONL writer settings derived from `[diagnostics]`, if a path is set.
    #[must_use]
    pub fn jsonl_config(&self) -> Option<JsonlConfig> {
        let path = self.diagnostics.jsonl_path.clone()?;
        Some(JsonlConfig {
            path,
            fallback_path: self.diagnostics.jsonl_fallback_path.clone(),
            max_size_bytes: self.diagnostics.max_size_bytes,
            max_rotated_files: self.diagnostics.max_rotated_files,
            fsync_interval_secs: DEFAULT_FSYNC_INTERVAL_SECS,
        })
    }

    /// Build the configured diagnostic sink.
    ///
    /// Returns `None` when stderr output is off and no JSONL path is set.
    #[must_use]
    pub fn diagnostic_sink(&self) -> Option<Arc<dyn DiagnosticSink>> {
        let mut sinks: Vec<Arc<dyn DiagnosticSink>> = Vec::new();
        if self.diagnostics.stderr {
            sinks.push(Arc::new(StderrSink));
        }
        if let Some(jsonl) = self.jsonl_config() {
            sinks.push(Arc::new(JsonlSink::open(jsonl)));
        }

        match sinks.len() {
            0 => None,
            1 => sinks.pop(),
            _ => Some(Arc::new(FanoutSink::new(sinks))),
        }
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // grouping
        if let Some(raw) = lookup("GRP_GROUPING_MODE") {
            self.grouping.mode = parse_env("GRP_GROUPING_MODE", &raw)?;
        }
        if let Some(raw) = lookup("GRP_EMPTY_HIERARCHICAL_PLACEHOLDER") {
            self.grouping.empty_hierarchical_placeholder = Some(raw);
        }

        // diagnostics
        if let Some(raw) = lookup("GRP_DIAGNOSTICS_STDERR") {
            self.diagnostics.stderr = parse_env("GRP_DIAGNOSTICS_STDERR", &raw)?;
        }
        if let Some(raw) = lookup("GRP_DIAGNOSTICS_JSONL_PATH") {
            self.diagnostics.jsonl_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("GRP_DIAGNOSTICS_MAX_SIZE_BYTES") {
            self.diagnostics.max_size_bytes = parse_env("GRP_DIAGNOSTICS_MAX_SIZE_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("GRP_DIAGNOSTICS_MAX_ROTATED_FILES") {
            self.diagnostics.max_rotated_files =
                parse_env("GRP_DIAGNOSTICS_MAX_ROTATED_FILES", &raw)?;
        }

        // report
        if let Some(raw) = lookup("GRP_REPORT_EVENTS_BASE_URL") {
            self.report.events_base_url = Some(raw);
        }
        if let Some(raw) = lookup("GRP_REPORT_SHARD_PREFIX_LENGTH") {
            self.report.shard_prefix_length = parse_env("GRP_REPORT_SHARD_PREFIX_LENGTH", &raw)?;
        }
        if let Some(raw) = lookup("GRP_REPORT_SHARD_LEVELS") {
            self.report.shard_levels = parse_env("GRP_REPORT_SHARD_LEVELS", &raw)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(placeholder) = &self.grouping.empty_hierarchical_placeholder
            && placeholder.is_empty()
        {
            return Err(GroupingError::InvalidConfig {
                details: "grouping.empty_hierarchical_placeholder must not be empty".to_string(),
            });
        }

        if self.diagnostics.max_size_bytes == 0 {
            return Err(GroupingError::InvalidConfig {
                details: "diagnostics.max_size_bytes must be > 0".to_string(),
            });
        }

        if self.report.shard_prefix_length == 0 {
            return Err(GroupingError::InvalidConfig {
                details: "report.shard_prefix_length must be >= 1".to_string(),
            });
        }
        if self.report.shard_levels == 0 {
            return Err(GroupingError::InvalidConfig {
                details: "report.shard_levels must be >= 1".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| GroupingError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
