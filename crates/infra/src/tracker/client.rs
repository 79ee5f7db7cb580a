//! HTTP implementation of the issue tracker port
//!
//! Talks to the tracker bridge API: one endpoint to pull worklogs for a date
//! range and one to record a local entry as a new worklog. Pulls are
//! idempotent and retried; pushes create a new worklog on every accepted
//! request, so they are sent exactly once.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tempora_domain::{
    DateRange, Result, TemporaError, TimeEntry, TrackerConfig, WorklogBatch,
};
use tracing::{debug, info};
use uuid::Uuid;

use tempora_core::TrackerClient;

use crate::http::HttpClient;

/// Tracker client backed by the HTTP bridge API
pub struct HttpTrackerClient {
    http: HttpClient,
    base_url: String,
    api_token: String,
}

impl HttpTrackerClient {
    /// Build a client from tracker configuration
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .max_attempts(3)
            .user_agent(format!("tempora/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn post_json<T: Serialize>(&self, url: &str, body: &T) -> reqwest::RequestBuilder {
        self.http
            .request(Method::POST, url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(body)
    }
}

#[async_trait]
impl TrackerClient for HttpTrackerClient {
    async fn pull_worklogs(
        &self,
        range: &DateRange,
        issue_keys: Option<&[String]>,
    ) -> Result<WorklogBatch> {
        let url = format!("{}/jira/pull-worklogs", self.base_url);
        debug!(url = %url, from = %range.from, to = %range.to, "pulling worklogs");

        let body = PullWorklogsBody { start_date: range.from, end_date: range.to, issue_keys };

        let response = self.http.send(self.post_json(&url, &body)).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &url, body));
        }

        let batch: WorklogBatch = response
            .json()
            .await
            .map_err(|e| TemporaError::Network(format!("failed to parse tracker response: {e}")))?;

        info!(
            worklogs = batch.worklogs.len(),
            failures = batch.failures.len(),
            "worklog pull complete"
        );
        Ok(batch)
    }

    async fn push_worklog(&self, entry: &TimeEntry, issue_key: &str) -> Result<String> {
        let url = format!("{}/jira/push-worklog", self.base_url);
        debug!(url = %url, entry_id = %entry.id, issue_key = %issue_key, "pushing worklog");

        let body = PushWorklogBody {
            time_entry_id: entry.id,
            issue_key,
            date: entry.date,
            hours: entry.duration,
            description: &entry.description,
        };

        // The tracker records a new worklog for every accepted request, so a
        // replayed push would double-book the hours. One attempt only.
        let response = self.http.send_once(self.post_json(&url, &body)).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &url, body));
        }

        let pushed: PushWorklogResponse = response
            .json()
            .await
            .map_err(|e| TemporaError::Network(format!("failed to parse tracker response: {e}")))?;

        info!(entry_id = %entry.id, worklog_id = %pushed.worklog_id, "worklog push complete");
        Ok(pushed.worklog_id)
    }
}

#[derive(Serialize)]
struct PullWorklogsBody<'a> {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue_keys: Option<&'a [String]>,
}

#[derive(Serialize)]
struct PushWorklogBody<'a> {
    time_entry_id: Uuid,
    issue_key: &'a str,
    date: NaiveDate,
    hours: Decimal,
    description: &'a str,
}

#[derive(Deserialize)]
struct PushWorklogResponse {
    worklog_id: String,
}

fn map_status_error(status: StatusCode, url: &str, body: String) -> TemporaError {
    let message = if body.is_empty() {
        format!("{url} returned status {status}")
    } else {
        format!("{url} returned status {status}: {body}")
    };

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        // The token is static operator configuration, not a negotiated
        // credential, so a rejection is a config problem.
        TemporaError::Config(message)
    } else if status == StatusCode::NOT_FOUND {
        TemporaError::NotFound(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        TemporaError::Network(message)
    } else if status.is_client_error() {
        TemporaError::InvalidInput(message)
    } else {
        TemporaError::Network(message)
    }
}
