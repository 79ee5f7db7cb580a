//! Time entry model and its derived lifecycle state
//!
//! A `TimeEntry` moves through four states derived from its fields, never
//! stored separately: local draft, billable, synced to the external tracker,
//! and invoiced. Once invoiced an entry is immutable except for detaching it
//! from the invoice again.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;
use uuid::Uuid;

use crate::errors::{Result, TemporaError};

/// A single unit of billable work, dated to a calendar day
///
/// Field names follow the canonical model: `duration` in decimal hours,
/// `billable`/`invoiced` flags. The older wire names `hours`, `is_billable`
/// and `is_invoiced` are accepted on input as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct TimeEntry {
    pub id: Uuid,
    pub user_id: String,
    pub invoice_id: Option<Uuid>,
    pub description: String,
    /// Decimal hours, never negative
    #[serde(alias = "hours")]
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub duration: Decimal,
    #[cfg_attr(feature = "ts-gen", ts(type = "number", optional))]
    pub hourly_rate: Option<Decimal>,
    /// Calendar date only (`YYYY-MM-DD`), no time-of-day
    pub date: NaiveDate,
    pub jira_issue_key: Option<String>,
    pub jira_worklog_id: Option<String>,
    #[serde(alias = "is_billable")]
    pub billable: bool,
    #[serde(alias = "is_invoiced")]
    pub invoiced: bool,
    pub jira_synced_at: Option<DateTime<Utc>>,
    /// Optimistic-lock counter, starts at 1, bumped by every committed save
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state derived from entry fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Local,
    Billable,
    Synced,
    Invoiced,
}

crate::impl_domain_status_conversions!(SyncState {
    Local => "local",
    Billable => "billable",
    Synced => "synced",
    Invoiced => "invoiced"
});

impl TimeEntry {
    /// Derive the lifecycle state from the stored fields
    ///
    /// Precedence: invoiced > synced > billable > local. An invoiced entry
    /// keeps its tracker reference, so after detaching the state falls back
    /// to whatever the remaining fields imply.
    pub fn sync_state(&self) -> SyncState {
        if self.invoiced {
            SyncState::Invoiced
        } else if self.jira_worklog_id.is_some() {
            SyncState::Synced
        } else if self.billable {
            SyncState::Billable
        } else {
            SyncState::Local
        }
    }

    /// Check the cross-field invariants that every stored entry must satisfy
    ///
    /// - `invoiced` implies `billable`
    /// - a tracker worklog reference implies a sync timestamp
    /// - `duration` is never negative
    pub fn validate_invariants(&self) -> Result<()> {
        if self.invoiced && !self.billable {
            return Err(TemporaError::Internal(format!(
                "entry {} is invoiced but not billable",
                self.id
            )));
        }
        if self.jira_worklog_id.is_some() && self.jira_synced_at.is_none() {
            return Err(TemporaError::Internal(format!(
                "entry {} has a worklog reference but no sync timestamp",
                self.id
            )));
        }
        if self.duration < Decimal::ZERO {
            return Err(TemporaError::Internal(format!(
                "entry {} has negative duration {}",
                self.id, self.duration
            )));
        }
        Ok(())
    }
}

/// Create-time input for a new entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct TimeEntryDraft {
    pub description: String,
    #[serde(alias = "hours")]
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub duration: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub jira_issue_key: Option<String>,
    #[serde(default, alias = "is_billable")]
    pub billable: bool,
    #[serde(default)]
    #[cfg_attr(feature = "ts-gen", ts(type = "number", optional))]
    pub hourly_rate: Option<Decimal>,
}

/// Partial update for an existing entry; absent fields stay untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct TimeEntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "hours", skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts-gen", ts(type = "number", optional))]
    pub duration: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "is_billable", skip_serializing_if = "Option::is_none")]
    pub billable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts-gen", ts(type = "number", optional))]
    pub hourly_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_issue_key: Option<String>,
}

impl TimeEntryPatch {
    /// True when no field is present, making the update a no-op
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.duration.is_none()
            && self.date.is_none()
            && self.billable.is_none()
            && self.hourly_rate.is_none()
            && self.jira_issue_key.is_none()
    }
}

/// Inclusive calendar-date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting inverted bounds
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(TemporaError::InvalidInput(format!(
                "date range start {from} is after end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// Query filter for entry listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct EntryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub billable: Option<bool>,
    pub invoiced: Option<bool>,
    pub user_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EntryFilter {
    /// Whether an entry passes the filter predicates (paging excluded)
    pub fn matches(&self, entry: &TimeEntry) -> bool {
        if let Some(from) = self.from {
            if entry.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.date > to {
                return false;
            }
        }
        if let Some(billable) = self.billable {
            if entry.billable != billable {
                return false;
            }
        }
        if let Some(invoiced) = self.invoiced {
            if entry.invoiced != invoiced {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if &entry.user_id != user_id {
                return false;
            }
        }
        true
    }
}
