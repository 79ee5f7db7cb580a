//! Shared test helpers for `tempora-core` integration tests.
//!
//! These helpers provide reusable fixtures and in-memory mocks so the flow
//! tests can focus on behaviour instead of boilerplate.

pub mod fixtures;
pub mod stores;
pub mod tracker;
