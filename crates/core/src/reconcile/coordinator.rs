//! Reconciliation coordinator - pull-then-merge of tracker worklogs
//!
//! The tracker is authoritative for synced fields. Local entries are matched
//! by worklog id; unmatched worklogs become new entries that are synced from
//! birth. Per-worklog problems are collected into the summary instead of
//! aborting the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempora_domain::constants::{DEFAULT_TRACKER_TIMEOUT_SECS, INITIAL_ENTRY_VERSION};
use tempora_domain::{
    DateRange, EpicMeta, Month, MonthlyInvoiceDataResponse, PullSummary, Result, TemporaError,
    TimeEntry, TrackerWorklog, WorklogEntry, WorklogFailure,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregation::WorklogAggregator;
use crate::entries::ports::EntryStore;
use crate::tracker_ports::TrackerClient;

/// Coordinator tuning knobs
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Timeout applied to each tracker pull
    pub tracker_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { tracker_timeout: Duration::from_secs(DEFAULT_TRACKER_TIMEOUT_SECS) }
    }
}

/// Monthly dataset plus the per-epic problems hit while assembling it
///
/// Epics that could not be fetched are absent from `data` and explained in
/// `failures`; partial months are an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub data: MonthlyInvoiceDataResponse,
    pub failures: Vec<WorklogFailure>,
}

enum Applied {
    Created,
    Updated,
    Skipped,
}

/// Reconciliation coordinator
pub struct ReconcileCoordinator {
    store: Arc<dyn EntryStore>,
    tracker: Arc<dyn TrackerClient>,
    aggregator: WorklogAggregator,
    config: ReconcileConfig,
}

impl ReconcileCoordinator {
    /// Create a coordinator with default aggregation and timeouts
    pub fn new(store: Arc<dyn EntryStore>, tracker: Arc<dyn TrackerClient>) -> Self {
        Self {
            store,
            tracker,
            aggregator: WorklogAggregator::default(),
            config: ReconcileConfig::default(),
        }
    }

    /// Replace the aggregator (bucket granularity)
    pub fn with_aggregator(mut self, aggregator: WorklogAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Override the coordinator configuration
    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Pull tracker worklogs for a range and merge them into local entries
    ///
    /// Cancellation is honored between worklogs; whatever was already
    /// applied stays applied and is reported in the returned summary.
    pub async fn pull(
        &self,
        range: &DateRange,
        issue_keys: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> Result<PullSummary> {
        let batch = tokio::time::timeout(
            self.config.tracker_timeout,
            self.tracker.pull_worklogs(range, issue_keys),
        )
        .await
        .map_err(|_| {
            TemporaError::Timeout(format!(
                "tracker pull for {} .. {} exceeded {:?}",
                range.from, range.to, self.config.tracker_timeout
            ))
        })??;

        let mut summary = PullSummary { failures: batch.failures, ..Default::default() };

        for worklog in &batch.worklogs {
            if cancel.is_cancelled() {
                info!(
                    processed = summary.processed(),
                    "pull cancelled, keeping progress so far"
                );
                break;
            }

            match self.apply_worklog(worklog).await {
                Ok(Applied::Created) => summary.created += 1,
                Ok(Applied::Updated) => summary.updated += 1,
                Ok(Applied::Skipped) => summary.skipped += 1,
                Err(err) => {
                    warn!(worklog_id = %worklog.worklog_id, error = %err, "worklog not applied");
                    summary.failures.push(WorklogFailure::for_worklog(worklog, err.to_string()));
                }
            }
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failures.len(),
            "reconciliation pull finished"
        );
        Ok(summary)
    }

    /// Assemble the monthly invoice dataset for the requested epics
    ///
    /// Each epic is fetched separately; epics whose fetch fails or times out
    /// are left out of the dataset and reported as failures. Duplicate epic
    /// keys are rejected before anything is fetched.
    pub async fn monthly_invoice_data(
        &self,
        month: Month,
        epics: &[EpicMeta],
        cancel: &CancellationToken,
    ) -> Result<MonthlyReport> {
        let mut seen = HashSet::new();
        for meta in epics {
            if !seen.insert(meta.epic_key.as_str()) {
                return Err(TemporaError::DuplicateEpic(meta.epic_key.clone()));
            }
        }

        let range = month.date_range();
        let mut failures = Vec::new();
        let mut fetched: Vec<(EpicMeta, Vec<WorklogEntry>)> = Vec::with_capacity(epics.len());

        for meta in epics {
            if cancel.is_cancelled() {
                info!(
                    month = %month,
                    fetched = fetched.len(),
                    requested = epics.len(),
                    "monthly aggregation cancelled, aggregating fetched epics only"
                );
                break;
            }

            let keys = std::slice::from_ref(&meta.epic_key);
            let pulled = tokio::time::timeout(
                self.config.tracker_timeout,
                self.tracker.pull_worklogs(&range, Some(keys)),
            )
            .await;

            match pulled {
                Err(_) => {
                    failures.push(WorklogFailure {
                        worklog_id: None,
                        issue_key: Some(meta.epic_key.clone()),
                        reason: format!(
                            "tracker pull exceeded {:?}",
                            self.config.tracker_timeout
                        ),
                    });
                }
                Ok(Err(err)) => {
                    warn!(epic = %meta.epic_key, error = %err, "epic fetch failed");
                    failures.push(WorklogFailure {
                        worklog_id: None,
                        issue_key: Some(meta.epic_key.clone()),
                        reason: err.to_string(),
                    });
                }
                Ok(Ok(batch)) => {
                    failures.extend(batch.failures);
                    let worklogs =
                        batch.worklogs.iter().map(TrackerWorklog::to_worklog_entry).collect();
                    fetched.push((meta.clone(), worklogs));
                }
            }
        }

        let data = self.aggregator.aggregate(month, fetched)?;
        Ok(MonthlyReport { data, failures })
    }

    /// Merge one tracker worklog into the local store
    async fn apply_worklog(&self, worklog: &TrackerWorklog) -> Result<Applied> {
        let existing = self.store.find_entry_by_worklog(&worklog.worklog_id).await?;

        let Some(entry) = existing else {
            let now = Utc::now();
            let entry = TimeEntry {
                id: Uuid::now_v7(),
                user_id: worklog.author.clone(),
                invoice_id: None,
                description: worklog.description.clone(),
                duration: worklog.hours,
                hourly_rate: None,
                date: worklog.date,
                jira_issue_key: Some(worklog.issue_key.clone()),
                jira_worklog_id: Some(worklog.worklog_id.clone()),
                billable: true,
                invoiced: false,
                jira_synced_at: Some(now),
                version: INITIAL_ENTRY_VERSION,
                created_at: now,
                updated_at: now,
            };
            self.store.save_entry(&entry, None).await?;
            debug!(worklog_id = %worklog.worklog_id, "created entry from tracker worklog");
            return Ok(Applied::Created);
        };

        let identical = entry.duration == worklog.hours
            && entry.description == worklog.description
            && entry.date == worklog.date;
        if identical {
            return Ok(Applied::Skipped);
        }

        if entry.invoiced {
            return Err(TemporaError::Immutable(format!(
                "entry {} differs from tracker worklog {} but is invoiced",
                entry.id, worklog.worklog_id
            )));
        }

        let expected = entry.version;
        let mut entry = entry;
        entry.duration = worklog.hours;
        entry.description = worklog.description.clone();
        entry.date = worklog.date;
        entry.jira_issue_key = Some(worklog.issue_key.clone());

        self.store.save_entry(&entry, Some(expected)).await?;
        debug!(worklog_id = %worklog.worklog_id, entry_id = %entry.id, "entry updated from tracker");
        Ok(Applied::Updated)
    }
}
