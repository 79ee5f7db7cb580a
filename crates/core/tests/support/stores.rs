//! In-memory store mocks with real compare-and-swap semantics
//!
//! The mocks enforce the same version discipline the SQLite adapter does:
//! inserts reject duplicate ids, updates compare the expected version and
//! bump it on success, and transactions commit all-or-nothing against a
//! cloned snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tempora_core::entries::ports::{EntryStore, StoreTransaction, TxWork};
use tempora_core::invoicing::ports::{InvoiceNumberSequence, InvoiceStore};
use tempora_domain::{EntryFilter, Invoice, Result, TemporaError, TimeEntry};
use tokio::sync::{Barrier, Mutex as TokioMutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type EntryMap = Arc<TokioMutex<HashMap<Uuid, TimeEntry>>>;
type InvoiceMap = Arc<TokioMutex<HashMap<Uuid, Invoice>>>;

/// Insert or compare-and-swap an entry into a map, mirroring the adapter
/// contract: the store bumps the version and refreshes `updated_at`.
fn cas_save(
    entries: &mut HashMap<Uuid, TimeEntry>,
    entry: &TimeEntry,
    expected_version: Option<i64>,
) -> Result<TimeEntry> {
    match expected_version {
        None => {
            if entries.contains_key(&entry.id) {
                return Err(TemporaError::Conflict(format!("entry {} already exists", entry.id)));
            }
            entries.insert(entry.id, entry.clone());
            Ok(entry.clone())
        }
        Some(version) => {
            let current = entries.get(&entry.id).ok_or_else(|| {
                TemporaError::NotFound(format!("time entry {}", entry.id))
            })?;
            if current.version != version {
                return Err(TemporaError::Conflict(format!(
                    "entry {} expected version {version}, stored version {}",
                    entry.id, current.version
                )));
            }
            let mut stored = entry.clone();
            stored.version = version + 1;
            stored.updated_at = Utc::now();
            entries.insert(stored.id, stored.clone());
            Ok(stored)
        }
    }
}

/// In-memory mock for `EntryStore`.
#[derive(Default)]
pub struct MockEntryStore {
    entries: EntryMap,
    invoices: InvoiceMap,
    fail_save_invoice: bool,
    read_barrier: Option<Arc<Barrier>>,
    cancel_after_saves: Option<(CancellationToken, usize)>,
    save_calls: Arc<AtomicUsize>,
}

impl MockEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make transactional invoice saves fail, for atomicity tests.
    pub fn with_fail_save_invoice(mut self) -> Self {
        self.fail_save_invoice = true;
        self
    }

    /// Hold every `get_entry` on the barrier after reading, so two sessions
    /// can be forced to read the same version before either writes.
    pub fn with_read_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.read_barrier = Some(barrier);
        self
    }

    /// Cancel the token once `saves` successful saves have happened.
    pub fn with_cancel_after_saves(mut self, token: CancellationToken, saves: usize) -> Self {
        self.cancel_after_saves = Some((token, saves));
        self
    }

    /// Insert an entry directly, bypassing validation and version checks.
    pub async fn seed_entry(&self, entry: TimeEntry) {
        self.entries.lock().await.insert(entry.id, entry);
    }

    pub async fn entry(&self, id: Uuid) -> Option<TimeEntry> {
        self.entries.lock().await.get(&id).cloned()
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// The invoice map shared with [`MockInvoiceStore::sharing`].
    pub fn invoice_map(&self) -> InvoiceMap {
        self.invoices.clone()
    }
}

#[async_trait]
impl EntryStore for MockEntryStore {
    async fn get_entry(&self, id: Uuid) -> Result<Option<TimeEntry>> {
        let entry = self.entries.lock().await.get(&id).cloned();
        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        Ok(entry)
    }

    async fn find_entry_by_worklog(&self, worklog_id: &str) -> Result<Option<TimeEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .values()
            .find(|entry| entry.jira_worklog_id.as_deref() == Some(worklog_id))
            .cloned())
    }

    async fn save_entry(
        &self,
        entry: &TimeEntry,
        expected_version: Option<i64>,
    ) -> Result<TimeEntry> {
        let mut entries = self.entries.lock().await;
        let saved = cas_save(&mut entries, entry, expected_version)?;
        let calls = self.save_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((token, after)) = &self.cancel_after_saves {
            if calls >= *after {
                token.cancel();
            }
        }
        Ok(saved)
    }

    async fn delete_entry(&self, id: Uuid) -> Result<()> {
        self.entries
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| TemporaError::NotFound(format!("time entry {id}")))
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<TimeEntry>> {
        let entries = self.entries.lock().await;
        let mut rows: Vec<TimeEntry> =
            entries.values().filter(|entry| filter.matches(entry)).cloned().collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));

        let offset = filter.offset.unwrap_or(0) as usize;
        let mut rows: Vec<TimeEntry> = rows.into_iter().skip(offset).collect();
        if let Some(limit) = filter.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn with_transaction(&self, work: TxWork) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut invoices = self.invoices.lock().await;
        let mut tx = MockTransaction {
            entries: entries.clone(),
            invoices: invoices.clone(),
            fail_save_invoice: self.fail_save_invoice,
        };
        work(&mut tx)?;
        *entries = tx.entries;
        *invoices = tx.invoices;
        Ok(())
    }
}

/// Snapshot-based transaction: writes land in the clones and only replace
/// the shared maps when the work closure returns `Ok`.
struct MockTransaction {
    entries: HashMap<Uuid, TimeEntry>,
    invoices: HashMap<Uuid, Invoice>,
    fail_save_invoice: bool,
}

impl StoreTransaction for MockTransaction {
    fn get_entry(&mut self, id: Uuid) -> Result<Option<TimeEntry>> {
        Ok(self.entries.get(&id).cloned())
    }

    fn save_entry(
        &mut self,
        entry: &TimeEntry,
        expected_version: Option<i64>,
    ) -> Result<TimeEntry> {
        cas_save(&mut self.entries, entry, expected_version)
    }

    fn save_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        if self.fail_save_invoice {
            return Err(TemporaError::Database("simulated invoice write failure".to_string()));
        }
        self.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    fn delete_invoice(&mut self, id: Uuid) -> Result<()> {
        self.invoices
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| TemporaError::NotFound(format!("invoice {id}")))
    }
}

/// In-memory mock for `InvoiceStore`, sharing its map with a
/// `MockEntryStore` so transactional invoice writes are visible here.
pub struct MockInvoiceStore {
    invoices: InvoiceMap,
}

impl MockInvoiceStore {
    pub fn sharing(invoices: InvoiceMap) -> Self {
        Self { invoices }
    }

    pub async fn invoice_count(&self) -> usize {
        self.invoices.lock().await.len()
    }
}

#[async_trait]
impl InvoiceStore for MockInvoiceStore {
    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        Ok(self.invoices.lock().await.get(&id).cloned())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        let invoices = self.invoices.lock().await;
        let mut rows: Vec<Invoice> = invoices.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn save_invoice(&self, invoice: &Invoice) -> Result<()> {
        self.invoices.lock().await.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<()> {
        self.invoices
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| TemporaError::NotFound(format!("invoice {id}")))
    }
}

/// Deterministic numbering sequence issuing `TEST-0001`, `TEST-0002`, ...
#[derive(Default)]
pub struct FixedSequence {
    issued: AtomicUsize,
}

impl FixedSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvoiceNumberSequence for FixedSequence {
    async fn next_invoice_number(&self) -> Result<String> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("TEST-{n:04}"))
    }
}
