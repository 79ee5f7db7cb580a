//! Issue tracker port interface
//!
//! Shared by the entry service (push on sync) and the reconciliation
//! coordinator (pull), so it lives at the crate root rather than under
//! either module.

use async_trait::async_trait;
use tempora_domain::{DateRange, Result, TimeEntry, WorklogBatch};

/// Trait for the external issue tracker
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Fetch worklogs for a date range, optionally restricted to issue keys
    ///
    /// Per-record problems arrive inside the batch; an `Err` means the pull
    /// as a whole failed and nothing was fetched.
    async fn pull_worklogs(
        &self,
        range: &DateRange,
        issue_keys: Option<&[String]>,
    ) -> Result<WorklogBatch>;

    /// Record the entry as a worklog on the given issue
    ///
    /// Returns the tracker-assigned worklog id.
    async fn push_worklog(&self, entry: &TimeEntry, issue_key: &str) -> Result<String>;
}
