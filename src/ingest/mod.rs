//! Event records: payloads, JSONL input, and per-project grouping.

pub mod event;
pub mod records;
