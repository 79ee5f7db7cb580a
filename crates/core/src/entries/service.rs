//! Time entry service - lifecycle and sync state transitions
//!
//! All writes go through [`EntryStore::save_entry`] with the version read at
//! the start of the operation, so two sessions racing on the same entry
//! resolve to exactly one winner and one `Conflict`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempora_domain::constants::{DEFAULT_TRACKER_TIMEOUT_SECS, INITIAL_ENTRY_VERSION};
use tempora_domain::{
    EntryFilter, Result, TemporaError, TimeEntry, TimeEntryDraft, TimeEntryPatch,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::ports::EntryStore;
use super::validate::{validate_create, validate_update};
use crate::tracker_ports::TrackerClient;

/// Time entry service
pub struct TimeEntryService {
    store: Arc<dyn EntryStore>,
    tracker: Arc<dyn TrackerClient>,
    push_timeout: Duration,
}

impl TimeEntryService {
    /// Create a new entry service
    pub fn new(store: Arc<dyn EntryStore>, tracker: Arc<dyn TrackerClient>) -> Self {
        Self { store, tracker, push_timeout: Duration::from_secs(DEFAULT_TRACKER_TIMEOUT_SECS) }
    }

    /// Override the timeout applied to tracker pushes
    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// Create a local entry from validated input
    pub async fn create(&self, user_id: &str, draft: TimeEntryDraft) -> Result<TimeEntry> {
        validate_create(&draft)?;

        let now = Utc::now();
        let entry = TimeEntry {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            invoice_id: None,
            description: draft.description,
            duration: draft.duration,
            hourly_rate: draft.hourly_rate,
            date: draft.date,
            jira_issue_key: draft.jira_issue_key,
            jira_worklog_id: None,
            billable: draft.billable,
            invoiced: false,
            jira_synced_at: None,
            version: INITIAL_ENTRY_VERSION,
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.save_entry(&entry, None).await?;
        debug!(entry_id = %saved.id, "created time entry");
        Ok(saved)
    }

    /// Load an entry, failing with `NotFound` when absent
    pub async fn get(&self, id: Uuid) -> Result<TimeEntry> {
        self.store
            .get_entry(id)
            .await?
            .ok_or_else(|| TemporaError::NotFound(format!("time entry {id}")))
    }

    /// List entries matching a filter
    pub async fn list(&self, filter: &EntryFilter) -> Result<Vec<TimeEntry>> {
        self.store.list_entries(filter).await
    }

    /// Apply a partial update to an entry
    ///
    /// An empty patch returns the stored entry without writing.
    pub async fn update(&self, id: Uuid, patch: TimeEntryPatch) -> Result<TimeEntry> {
        let existing = self.get(id).await?;
        validate_update(&existing, &patch)?;

        if patch.is_empty() {
            return Ok(existing);
        }

        let expected = existing.version;
        let mut entry = existing;
        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(duration) = patch.duration {
            entry.duration = duration;
        }
        if let Some(date) = patch.date {
            entry.date = date;
        }
        if let Some(billable) = patch.billable {
            entry.billable = billable;
        }
        if let Some(hourly_rate) = patch.hourly_rate {
            entry.hourly_rate = Some(hourly_rate);
        }
        if let Some(issue_key) = patch.jira_issue_key {
            entry.jira_issue_key = Some(issue_key);
        }

        self.store.save_entry(&entry, Some(expected)).await
    }

    /// Delete an entry; invoiced entries cannot be deleted
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let entry = self.get(id).await?;
        if entry.invoiced {
            return Err(TemporaError::Immutable(format!(
                "entry {id} is attached to an invoice and cannot be deleted"
            )));
        }
        self.store.delete_entry(id).await
    }

    /// Set the billable flag; idempotent on already-billable entries
    pub async fn mark_billable(&self, id: Uuid) -> Result<TimeEntry> {
        let entry = self.get(id).await?;
        if entry.invoiced {
            return Err(TemporaError::Immutable(format!(
                "entry {id} is attached to an invoice"
            )));
        }
        if entry.billable {
            return Ok(entry);
        }

        let expected = entry.version;
        let mut entry = entry;
        entry.billable = true;
        self.store.save_entry(&entry, Some(expected)).await
    }

    /// Push the entry to the tracker as a worklog on `issue_key`
    ///
    /// Already-synced entries are a no-op when the key matches the stored
    /// one; a different key overwrites the old worklog reference with a
    /// fresh push. A failed push leaves the entry exactly as it was.
    pub async fn sync_to_tracker(&self, id: Uuid, issue_key: &str) -> Result<TimeEntry> {
        let issue_key = issue_key.trim();
        if issue_key.is_empty() {
            return Err(TemporaError::InvalidInput("issue key must not be empty".to_string()));
        }

        let entry = self.get(id).await?;
        if entry.invoiced {
            return Err(TemporaError::Immutable(format!(
                "entry {id} is attached to an invoice and cannot be re-synced"
            )));
        }

        if entry.jira_worklog_id.is_some() && entry.jira_issue_key.as_deref() == Some(issue_key) {
            debug!(entry_id = %id, issue_key, "entry already synced to this issue");
            return Ok(entry);
        }

        let worklog_id = tokio::time::timeout(
            self.push_timeout,
            self.tracker.push_worklog(&entry, issue_key),
        )
        .await
        .map_err(|_| {
            TemporaError::Timeout(format!(
                "tracker push for entry {id} exceeded {:?}",
                self.push_timeout
            ))
        })??;

        let expected = entry.version;
        let mut entry = entry;
        entry.jira_issue_key = Some(issue_key.to_string());
        entry.jira_worklog_id = Some(worklog_id);
        entry.jira_synced_at = Some(Utc::now());

        let saved = self.store.save_entry(&entry, Some(expected)).await?;
        info!(entry_id = %id, issue_key, "entry synced to tracker");
        Ok(saved)
    }

    /// Attach a billable entry to an invoice
    ///
    /// The entry must be billable and not yet invoiced. The invoice builder
    /// uses its own transactional path; this operation exists for attaching
    /// a single entry to an existing invoice.
    pub async fn attach_to_invoice(&self, id: Uuid, invoice_id: Uuid) -> Result<TimeEntry> {
        let entry = self.get(id).await?;
        if !entry.billable {
            return Err(TemporaError::NotBillable(format!("entry {id} is not billable")));
        }
        if entry.invoiced {
            return Err(TemporaError::AlreadyInvoiced(format!(
                "entry {id} is already on invoice {:?}",
                entry.invoice_id
            )));
        }

        let expected = entry.version;
        let mut entry = entry;
        entry.invoiced = true;
        entry.invoice_id = Some(invoice_id);
        self.store.save_entry(&entry, Some(expected)).await
    }

    /// Detach an invoiced entry, returning it to its prior sync state
    pub async fn detach_from_invoice(&self, id: Uuid) -> Result<TimeEntry> {
        let entry = self.get(id).await?;
        if !entry.invoiced {
            return Err(TemporaError::InvalidInput(format!("entry {id} is not invoiced")));
        }

        let expected = entry.version;
        let mut entry = entry;
        entry.invoiced = false;
        entry.invoice_id = None;
        self.store.save_entry(&entry, Some(expected)).await
    }
}
