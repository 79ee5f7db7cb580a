//! # Tempora Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite implementations of the entry and invoice stores
//! - The HTTP client for the issue-tracker bridge
//! - Configuration loading (environment variables, config files)
//!
//! ## Architecture
//! - Implements traits defined in `tempora-core`
//! - Depends on `tempora-domain` and `tempora-core`
//! - Contains all "impure" code (I/O, external services)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod tracker;

// Re-export commonly used items
pub use database::*;
pub use errors::*;
pub use http::*;
pub use tracker::*;
