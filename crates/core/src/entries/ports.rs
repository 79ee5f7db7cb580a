//! Port interfaces for time entry persistence

use async_trait::async_trait;
use tempora_domain::{EntryFilter, Invoice, Result, TimeEntry};
use uuid::Uuid;

/// Work executed inside a single store transaction.
///
/// The closure runs on whatever thread the adapter dedicates to the
/// transaction, so it is synchronous by design. Returning an error rolls the
/// whole transaction back.
pub type TxWork = Box<dyn FnOnce(&mut dyn StoreTransaction) -> Result<()> + Send>;

/// Trait for the store backing time entries
///
/// `save_entry` is the single write path and carries the optimistic lock:
/// `expected_version = None` inserts a new row, `Some(v)` updates only if the
/// stored version still equals `v` and fails with `Conflict` otherwise. On a
/// committed save the store bumps `version` and refreshes `updated_at`; the
/// returned entry is the stored copy.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Load an entry by id
    async fn get_entry(&self, id: Uuid) -> Result<Option<TimeEntry>>;

    /// Load the entry holding a tracker worklog reference, if any
    async fn find_entry_by_worklog(&self, worklog_id: &str) -> Result<Option<TimeEntry>>;

    /// Insert (`expected_version = None`) or compare-and-swap update an entry
    async fn save_entry(&self, entry: &TimeEntry, expected_version: Option<i64>)
        -> Result<TimeEntry>;

    /// Delete an entry by id
    async fn delete_entry(&self, id: Uuid) -> Result<()>;

    /// List entries matching a filter, ordered by date then creation time
    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<TimeEntry>>;

    /// Run `work` inside one transaction; all writes commit or none do
    async fn with_transaction(&self, work: TxWork) -> Result<()>;
}

/// Operations available inside a store transaction
///
/// Spans entries and invoices because invoice creation and the entry flips it
/// implies must commit as one unit.
pub trait StoreTransaction {
    fn get_entry(&mut self, id: Uuid) -> Result<Option<TimeEntry>>;

    /// Same contract as [`EntryStore::save_entry`], inside the transaction
    fn save_entry(&mut self, entry: &TimeEntry, expected_version: Option<i64>)
        -> Result<TimeEntry>;

    fn save_invoice(&mut self, invoice: &Invoice) -> Result<()>;

    fn delete_invoice(&mut self, id: Uuid) -> Result<()>;
}
