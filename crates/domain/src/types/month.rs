//! Calendar-month value type
//!
//! Parsed and displayed as `YYYY-MM`. Both day bounds are computed at
//! construction so the accessors stay infallible.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Result, TemporaError};
use crate::types::entry::DateRange;

/// A calendar month (`YYYY-MM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    first: NaiveDate,
    last: NaiveDate,
}

impl Month {
    /// Build a month from numeric parts
    ///
    /// # Errors
    /// Returns `TemporaError::InvalidInput` when `month` is out of `1..=12`
    /// or the year cannot carry a four-digit representation.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(TemporaError::InvalidInput(format!("year out of range: {year}")));
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            TemporaError::InvalidInput(format!("invalid month: {year:04}-{month:02}"))
        })?;
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| {
                TemporaError::InvalidInput(format!("month out of range: {year:04}-{month:02}"))
            })?;
        Ok(Self { first, last })
    }

    /// The month a given date falls in
    pub fn containing(date: NaiveDate) -> Self {
        // A valid NaiveDate always has day 1 in its month and a successor
        // month within chrono's range, so the fallbacks cannot trigger.
        let first = date.with_day(1).unwrap_or(date);
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date);
        Self { first, last }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last
    }

    /// Inclusive range covering every day of the month
    pub fn date_range(&self) -> DateRange {
        DateRange { from: self.first, to: self.last }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = TemporaError;

    fn from_str(s: &str) -> Result<Self> {
        let (year_part, month_part) = s
            .split_once('-')
            .ok_or_else(|| TemporaError::InvalidInput(format!("invalid month format: {s}")))?;
        let all_digits =
            |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        if year_part.len() != 4
            || month_part.len() != 2
            || !all_digits(year_part)
            || !all_digits(month_part)
        {
            return Err(TemporaError::InvalidInput(format!(
                "invalid month format: {s} (expected YYYY-MM)"
            )));
        }
        let year: i32 = year_part
            .parse()
            .map_err(|_| TemporaError::InvalidInput(format!("invalid year in month: {s}")))?;
        let month: u32 = month_part
            .parse()
            .map_err(|_| TemporaError::InvalidInput(format!("invalid month number in: {s}")))?;
        Self::new(year, month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
