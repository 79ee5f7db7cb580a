//! Entry and worklog fixtures shared across the flow tests

use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tempora_domain::{ClientDetails, EpicMeta, TimeEntry, TimeEntryDraft, TrackerWorklog};
use uuid::Uuid;

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("decimal literal should parse")
}

pub fn march_day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).expect("valid day in March 2025")
}

pub fn draft(description: &str, hours: &str) -> TimeEntryDraft {
    TimeEntryDraft {
        description: description.to_string(),
        duration: dec(hours),
        date: march_day(10),
        jira_issue_key: None,
        billable: false,
        hourly_rate: None,
    }
}

/// A stored billable entry in the `Billable` state, version 1.
pub fn billable_entry(hours: &str) -> TimeEntry {
    let now = Utc::now();
    TimeEntry {
        id: Uuid::now_v7(),
        user_id: "dana@example.com".to_string(),
        invoice_id: None,
        description: "Implement CSV export".to_string(),
        duration: dec(hours),
        hourly_rate: None,
        date: march_day(10),
        jira_issue_key: None,
        jira_worklog_id: None,
        billable: true,
        invoiced: false,
        jira_synced_at: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

/// A stored entry already synced to the tracker under `worklog_id`.
pub fn synced_entry(worklog_id: &str, hours: &str) -> TimeEntry {
    let mut entry = billable_entry(hours);
    entry.jira_issue_key = Some("PROJ-7".to_string());
    entry.jira_worklog_id = Some(worklog_id.to_string());
    entry.jira_synced_at = Some(Utc::now());
    entry
}

pub fn tracker_worklog(
    worklog_id: &str,
    day: u32,
    hours: &str,
    description: &str,
) -> TrackerWorklog {
    TrackerWorklog {
        worklog_id: worklog_id.to_string(),
        issue_key: "PROJ-7".to_string(),
        author: "dana@example.com".to_string(),
        description: description.to_string(),
        date: march_day(day),
        hours: dec(hours),
    }
}

pub fn epic(key: &str) -> EpicMeta {
    EpicMeta {
        epic_key: key.to_string(),
        epic_name: format!("Epic {key}"),
        project_id: "PROJ".to_string(),
        status: "active".to_string(),
    }
}

pub fn client() -> ClientDetails {
    ClientDetails {
        name: "Acme GmbH".to_string(),
        email: "billing@acme.example".to_string(),
        address: Some("Musterstrasse 1, Berlin".to_string()),
    }
}
