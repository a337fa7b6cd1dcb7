//! Data layer for the water demand pipeline.
//!
//! Discovers and reads raw billing CSVs, normalizes them into typed records,
//! spreads billing totals over days, attributes them to trailing months per
//! client, and writes the results.

pub mod daily;
pub mod monthly;
pub mod normalizer;
pub mod pipeline;
pub mod reader;
pub mod writer;
