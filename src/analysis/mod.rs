//! Analysis modules.
//!
//! Aggregation, statistics and crisis reconciliation all take a loaded
//! dataset by reference and return new values.

pub mod aggregator;
pub mod reconcile;
pub mod stats;
pub mod views;

pub use aggregator::*;
pub use reconcile::*;
pub use stats::*;
