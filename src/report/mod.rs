//! Consumer views over finished trees: titles and links, chart data, run metadata.

pub mod chart;
pub mod metadata;
pub mod summary;
