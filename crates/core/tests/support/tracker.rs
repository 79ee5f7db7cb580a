//! In-memory mock for the issue tracker port

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempora_core::tracker_ports::TrackerClient;
use tempora_domain::{DateRange, Result, TemporaError, TimeEntry, TrackerWorklog, WorklogBatch};
use tokio::sync::Mutex as TokioMutex;
use uuid::Uuid;

/// Scripted tracker: returns configured batches on pull and hands out
/// sequential worklog ids (`wl-1`, `wl-2`, ...) on push.
#[derive(Default)]
pub struct MockTrackerClient {
    batch: WorklogBatch,
    epic_worklogs: HashMap<String, Vec<TrackerWorklog>>,
    failing_epics: HashSet<String>,
    pushed: Arc<TokioMutex<Vec<(Uuid, String)>>>,
    next_worklog_id: AtomicUsize,
    pull_calls: AtomicUsize,
    fail_push: bool,
    push_delay: Option<Duration>,
    pull_delay: Option<Duration>,
}

impl MockTrackerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch returned by pulls without an issue key filter.
    pub fn with_batch(mut self, batch: WorklogBatch) -> Self {
        self.batch = batch;
        self
    }

    /// Worklogs returned when `key` appears in the pull's issue key filter.
    pub fn with_epic_worklogs(mut self, key: &str, worklogs: Vec<TrackerWorklog>) -> Self {
        self.epic_worklogs.insert(key.to_string(), worklogs);
        self
    }

    /// Make any filtered pull naming `key` fail with a network error.
    pub fn with_failing_epic(mut self, key: &str) -> Self {
        self.failing_epics.insert(key.to_string());
        self
    }

    pub fn with_fail_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn with_push_delay(mut self, delay: Duration) -> Self {
        self.push_delay = Some(delay);
        self
    }

    pub fn with_pull_delay(mut self, delay: Duration) -> Self {
        self.pull_delay = Some(delay);
        self
    }

    pub async fn push_count(&self) -> usize {
        self.pushed.lock().await.len()
    }

    pub async fn pushed(&self) -> Vec<(Uuid, String)> {
        self.pushed.lock().await.clone()
    }

    pub fn pull_calls(&self) -> usize {
        self.pull_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackerClient for MockTrackerClient {
    async fn pull_worklogs(
        &self,
        _range: &DateRange,
        issue_keys: Option<&[String]>,
    ) -> Result<WorklogBatch> {
        self.pull_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.pull_delay {
            tokio::time::sleep(delay).await;
        }

        let Some(keys) = issue_keys else {
            return Ok(self.batch.clone());
        };

        if let Some(key) = keys.iter().find(|key| self.failing_epics.contains(key.as_str())) {
            return Err(TemporaError::Network(format!("epic {key} unavailable")));
        }

        let worklogs = keys
            .iter()
            .flat_map(|key| self.epic_worklogs.get(key).cloned().unwrap_or_default())
            .collect();
        Ok(WorklogBatch { worklogs, failures: Vec::new() })
    }

    async fn push_worklog(&self, entry: &TimeEntry, issue_key: &str) -> Result<String> {
        if let Some(delay) = self.push_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_push {
            return Err(TemporaError::Network("tracker rejected worklog".to_string()));
        }

        let n = self.next_worklog_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.pushed.lock().await.push((entry.id, issue_key.to_string()));
        Ok(format!("wl-{n}"))
    }
}
