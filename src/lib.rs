//! FloodReport - flood impact aggregation and reporting
//!
//! Loads a multi-year flood dataset and an optional crisis-period dataset,
//! aggregates impacts along time, region and city, computes correlation
//! and outlier statistics, and assembles a numbered report.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod report;

pub use error::{FloodError, Result};
