//! Diagnostics logging: JSONL append-only output with graceful degradation.

pub mod jsonl;
