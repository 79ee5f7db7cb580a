//! Tracker reconciliation domain

pub mod coordinator;

pub use coordinator::*;
