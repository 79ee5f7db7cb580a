//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Database configuration
pub const DEFAULT_DB_POOL_SIZE: u32 = 8;

// Tracker client configuration
pub const DEFAULT_TRACKER_TIMEOUT_SECS: u64 = 30;

// Billing configuration
pub const DEFAULT_PAYMENT_TERMS_DAYS: u32 = 30;
pub const MONEY_SCALE: u32 = 2;
pub const INVOICE_NUMBER_PREFIX: &str = "INV";
pub const INVOICE_COUNTER_WIDTH: usize = 4;

// Entry versions start at 1; 0 never appears in a stored row
pub const INITIAL_ENTRY_VERSION: i64 = 1;
