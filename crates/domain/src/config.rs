//! Configuration structures
//!
//! Plain data filled by the infra config loader (environment variables first,
//! config file fallback). The domain crate only defines the shapes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_PAYMENT_TERMS_DAYS, DEFAULT_TRACKER_TIMEOUT_SECS,
};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporaConfig {
    pub database: DatabaseConfig,
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

/// SQLite database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Issue-tracker API settings
///
/// The token is pre-issued; no authentication flow happens in this codebase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub base_url: String,
    pub api_token: String,
    #[serde(default = "default_tracker_timeout")]
    pub timeout_seconds: u64,
}

/// Billing defaults applied by the invoice builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Fallback hourly rate for entries that carry none. When this is also
    /// unset, building an invoice from such an entry fails with
    /// `InvalidInput`.
    #[serde(default)]
    pub default_hourly_rate: Option<Decimal>,
    #[serde(default = "default_payment_terms")]
    pub payment_terms_days: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self { default_hourly_rate: None, payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS }
    }
}

fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

fn default_tracker_timeout() -> u64 {
    DEFAULT_TRACKER_TIMEOUT_SECS
}

fn default_payment_terms() -> u32 {
    DEFAULT_PAYMENT_TERMS_DAYS
}
