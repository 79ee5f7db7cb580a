//! Worklog shapes exchanged with the issue tracker

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

/// One tracker worklog line as it appears inside a monthly dataset
///
/// Read-only snapshot data; identity is not carried here because the monthly
/// dataset is regenerated wholesale rather than diffed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct WorklogEntry {
    pub date: NaiveDate,
    pub author: String,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub hours: Decimal,
    pub description: String,
    pub issue_key: String,
}

/// A worklog as fetched from the tracker, including its external identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct TrackerWorklog {
    pub worklog_id: String,
    pub issue_key: String,
    pub author: String,
    pub description: String,
    pub date: NaiveDate,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub hours: Decimal,
}

impl TrackerWorklog {
    /// Strip the external identity down to the aggregation shape
    pub fn to_worklog_entry(&self) -> WorklogEntry {
        WorklogEntry {
            date: self.date,
            author: self.author.clone(),
            hours: self.hours,
            description: self.description.clone(),
            issue_key: self.issue_key.clone(),
        }
    }
}

/// A page of worklogs returned by one tracker pull
///
/// Records the tracker could not return cleanly travel as `failures` next to
/// the ones it could, so a single bad record never poisons the whole pull.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct WorklogBatch {
    pub worklogs: Vec<TrackerWorklog>,
    #[serde(default)]
    pub failures: Vec<WorklogFailure>,
}

/// One worklog that could not be fetched, parsed or applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct WorklogFailure {
    pub worklog_id: Option<String>,
    pub issue_key: Option<String>,
    pub reason: String,
}

impl WorklogFailure {
    pub fn for_worklog(worklog: &TrackerWorklog, reason: impl Into<String>) -> Self {
        Self {
            worklog_id: Some(worklog.worklog_id.clone()),
            issue_key: Some(worklog.issue_key.clone()),
            reason: reason.into(),
        }
    }
}

/// Outcome of a reconciliation pull
///
/// Partial failure is an expected steady-state outcome, so it travels as
/// data in `failures` rather than as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct PullSummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failures: Vec<WorklogFailure>,
}

impl PullSummary {
    /// Total number of worklogs that produced any outcome
    pub fn processed(&self) -> u32 {
        self.created + self.updated + self.skipped + self.failures.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_to_worklog_entry_drops_identity() {
        let worklog = TrackerWorklog {
            worklog_id: "10001".to_string(),
            issue_key: "PROJ-42".to_string(),
            author: "dana@example.com".to_string(),
            description: "Fix flaky pipeline".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
            hours: Decimal::from_str("2.25").unwrap(),
        };

        let entry = worklog.to_worklog_entry();
        assert_eq!(entry.issue_key, "PROJ-42");
        assert_eq!(entry.hours, worklog.hours);
        assert_eq!(entry.date, worklog.date);
    }

    #[test]
    fn test_pull_summary_processed() {
        let summary = PullSummary {
            created: 2,
            updated: 1,
            skipped: 3,
            failures: vec![WorklogFailure {
                worklog_id: Some("10002".to_string()),
                issue_key: None,
                reason: "malformed date".to_string(),
            }],
        };
        assert_eq!(summary.processed(), 7);
    }
}
