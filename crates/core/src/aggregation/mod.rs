//! Monthly worklog aggregation domain

pub mod aggregator;

pub use aggregator::*;
