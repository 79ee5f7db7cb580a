//! Monthly invoice dataset shapes
//!
//! The dataset is immutable once generated; a new month view is produced by
//! re-running the aggregation, never by patching an old one. Buckets use a
//! `BTreeMap` so serialized output has a stable key order.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use crate::types::month::Month;
use crate::types::worklog::WorklogEntry;

/// Epic descriptor supplied to the aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct EpicMeta {
    pub epic_key: String,
    pub epic_name: String,
    pub project_id: String,
    pub status: String,
}

/// One epic's bucketed worklogs within a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct MonthlyInvoiceEpic {
    pub epic_key: String,
    pub epic_name: String,
    pub project_id: String,
    pub status: String,
    /// Bucket label to worklogs, input order preserved within each bucket
    pub buckets: BTreeMap<String, Vec<WorklogEntry>>,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub total_hours: Decimal,
}

impl MonthlyInvoiceEpic {
    /// Recompute the total from bucket contents
    ///
    /// The stored `total_hours` must always equal this sum; presentation
    /// layers can call it on demand instead of trusting the field.
    pub fn computed_total_hours(&self) -> Decimal {
        self.buckets.values().flatten().map(|worklog| worklog.hours).sum()
    }
}

/// Complete monthly billing dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct MonthlyInvoiceDataResponse {
    #[cfg_attr(feature = "ts-gen", ts(type = "string"))]
    pub month: Month,
    /// Unique by epic key, in input order
    pub epics: Vec<MonthlyInvoiceEpic>,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub grand_total_hours: Decimal,
    /// Set at aggregation time, not at request time
    pub generated_at: DateTime<Utc>,
}

/// Bucket labeling scheme used when grouping worklogs inside a month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum BucketGranularity {
    /// `YYYY-MM-DD`, one bucket per day
    Day,
    /// `YYYY-Www` ISO week labels, may span month boundaries
    IsoWeek,
    /// `Week 1` .. `Week 5`, days 1-7 are week 1 and so on
    #[default]
    WeekOfMonth,
}

impl BucketGranularity {
    /// Bucket label for a worklog date
    pub fn bucket_key(&self, date: NaiveDate) -> String {
        match self {
            Self::Day => date.format("%Y-%m-%d").to_string(),
            Self::IsoWeek => {
                let week = date.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            Self::WeekOfMonth => format!("Week {}", (date.day() - 1) / 7 + 1),
        }
    }
}
