//! Domain model for the water demand pipeline.
//!
//! Billing records, the feature configuration, per-unit allocation results,
//! the daily series and client snapshots, plus the value parsers and the
//! forecast contract shared by the data crate and the binary.

pub mod allocation;
pub mod calendar;
pub mod config;
pub mod error;
pub mod forecast;
pub mod models;
pub mod parsers;
pub mod series;
