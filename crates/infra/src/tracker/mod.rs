//! Issue tracker bridge client

pub mod client;

pub use client::*;
