//! # Tempora Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The time entry lifecycle and its sync state transitions
//! - Worklog aggregation into monthly invoice datasets
//! - Invoice building with transactional entry consumption
//! - Port/adapter interfaces (traits) for store and tracker
//!
//! ## Architecture Principles
//! - Only depends on `tempora-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod aggregation;
pub mod entries;
pub mod invoicing;
pub mod reconcile;

// Infrastructure ports
pub mod tracker_ports;

// Re-export specific items to avoid ambiguity
pub use aggregation::WorklogAggregator;
pub use entries::ports::{EntryStore, StoreTransaction, TxWork};
pub use entries::TimeEntryService;
pub use invoicing::ports::{InvoiceNumberSequence, InvoiceStore};
pub use invoicing::InvoiceBuilder;
pub use reconcile::{MonthlyReport, ReconcileConfig, ReconcileCoordinator};
pub use tracker_ports::TrackerClient;
