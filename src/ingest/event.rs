//! Event payload carried by grouping trees, and on-disk event sharding.

#![allow(missing_docs)]

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Separator between an event title's head and its subtitle.
pub const TITLE_SEPARATOR: &str = ": ";

/// Display data for one event. Trees never inspect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventItem {
    pub event_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,
    /// Location of the event's JSON document, relative to the events base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
}

impl EventItem {
    /// Build an item from a raw event title such as `"KeyError: 'user'"`.
    ///
    /// The title is split at the first `": "`. Without a separator the
    /// subtitle falls back to `metadata_value`.
    pub fn from_raw_title(
        event_id: impl Into<String>,
        raw_title: &str,
        metadata_value: Option<&str>,
    ) -> Self {
        let (title, subtitle) = match raw_title.split_once(TITLE_SEPARATOR) {
            Some((head, tail)) => (head.to_string(), Some(tail.to_string())),
            None => (raw_title.to_string(), metadata_value.map(str::to_string)),
        };
        Self {
            event_id: event_id.into(),
            title,
            subtitle,
            culprit: None,
            json_url: None,
        }
    }

    #[must_use]
    pub fn with_culprit(mut self, culprit: Option<String>) -> Self {
        self.culprit = culprit;
        self
    }

    #[must_use]
    pub fn with_json_url(mut self, json_url: Option<String>) -> Self {
        self.json_url = json_url;
        self
    }
}

impl fmt::Display for EventItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event_id)
    }
}

/// Directory chunks of an event id: `("abcdef", 2, 2)` gives `["ab", "cd"]`.
fn shard_dirs(event_id: &str, prefix_length: usize, levels: usize) -> Vec<String> {
    let chars: Vec<char> = event_id.chars().collect();
    chars
        .chunks(prefix_length.max(1))
        .take(levels)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Relative path of an event file, spread over directories by id prefix.
///
/// `event_path("abcdef", ".json", 2, 2)` is `ab/cd/event_abcdef.json`. Ids
/// shorter than `prefix_length * levels` use as many chunks as they have.
pub fn event_path(event_id: &str, extension: &str, prefix_length: usize, levels: usize) -> PathBuf {
    let mut path: PathBuf = shard_dirs(event_id, prefix_length, levels).into_iter().collect();
    path.push(format!("event_{event_id}{extension}"));
    path
}

/// Same layout as [`event_path`], always `/`-separated for use in URLs.
pub fn event_url_path(
    event_id: &str,
    extension: &str,
    prefix_length: usize,
    levels: usize,
) -> String {
    let mut parts = shard_dirs(event_id, prefix_length, levels);
    parts.push(format!("event_{event_id}{extension}"));
    parts.join("/")
}
