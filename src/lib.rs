#![forbid(unsafe_code)]

//! Event grouping trees for inspecting fingerprint-based grouping of
//! error-tracking events.
//!
//! Each project's events are inserted into a [`GroupTree`](grouping::tree::GroupTree)
//! using one of two strategies:
//! 1. **Hierarchical**: the hash list is a path, most general first; every
//!    node on the path counts the event.
//! 2. **Flat**: events sharing any hash land in the same group below the root,
//!    linked transitively through shared hashes.
//!
//! Finished trees are read through depth-first traversal and the report views.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use event_grouping::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use event_grouping::core::config::Config;
//! use event_grouping::ingest::records::ProjectForest;
//! ```

pub mod prelude;

pub mod core;
pub mod grouping;
pub mod ingest;
pub mod logger;
pub mod report;
