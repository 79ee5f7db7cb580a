//! Monthly worklog aggregation
//!
//! Pure computation: tracker worklogs in, bucketed monthly dataset out. No
//! store or tracker access happens here, which keeps the totals reproducible
//! for identical inputs (modulo `generated_at`).

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use tempora_domain::{
    BucketGranularity, EpicMeta, Month, MonthlyInvoiceDataResponse, MonthlyInvoiceEpic, Result,
    TemporaError, WorklogEntry,
};
use tracing::warn;

/// Groups per-epic worklogs into labeled time buckets for one month
#[derive(Debug, Clone, Default)]
pub struct WorklogAggregator {
    granularity: BucketGranularity,
}

impl WorklogAggregator {
    /// Create an aggregator with the given bucket granularity
    pub fn new(granularity: BucketGranularity) -> Self {
        Self { granularity }
    }

    pub fn granularity(&self) -> BucketGranularity {
        self.granularity
    }

    /// Aggregate worklogs into the monthly dataset
    ///
    /// Epics come out in input order; worklogs keep their input order within
    /// each bucket. Hours are summed exactly, never rounded. Fails with
    /// `DuplicateEpic` when two inputs share an epic key.
    ///
    /// Worklogs dated outside `month` are kept; the caller controls the
    /// fetch range and the tracker is authoritative. They are logged so a
    /// mis-scoped fetch is visible.
    pub fn aggregate(
        &self,
        month: Month,
        epics: Vec<(EpicMeta, Vec<WorklogEntry>)>,
    ) -> Result<MonthlyInvoiceDataResponse> {
        let mut seen = HashSet::new();
        for (meta, _) in &epics {
            if !seen.insert(meta.epic_key.as_str()) {
                return Err(TemporaError::DuplicateEpic(meta.epic_key.clone()));
            }
        }

        let mut out_of_month = 0u32;
        let mut aggregated = Vec::with_capacity(epics.len());

        for (meta, worklogs) in epics {
            let mut epic = MonthlyInvoiceEpic {
                epic_key: meta.epic_key,
                epic_name: meta.epic_name,
                project_id: meta.project_id,
                status: meta.status,
                buckets: Default::default(),
                total_hours: Decimal::ZERO,
            };

            for worklog in worklogs {
                if !month.contains(worklog.date) {
                    out_of_month += 1;
                }
                epic.total_hours += worklog.hours;
                let key = self.granularity.bucket_key(worklog.date);
                epic.buckets.entry(key).or_default().push(worklog);
            }

            aggregated.push(epic);
        }

        if out_of_month > 0 {
            warn!(
                count = out_of_month,
                month = %month,
                "worklogs dated outside the month were included"
            );
        }

        let grand_total_hours = aggregated.iter().map(|epic| epic.total_hours).sum();
        Ok(MonthlyInvoiceDataResponse {
            month,
            epics: aggregated,
            grand_total_hours,
            generated_at: Utc::now(),
        })
    }
}
