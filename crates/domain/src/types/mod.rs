//! Domain types and models

pub mod entry;
pub mod invoice;
pub mod month;
pub mod monthly;
pub mod worklog;

pub use entry::{DateRange, EntryFilter, SyncState, TimeEntry, TimeEntryDraft, TimeEntryPatch};
pub use invoice::{ClientDetails, Invoice, InvoiceLineItem, InvoiceStatus};
pub use month::Month;
pub use monthly::{BucketGranularity, EpicMeta, MonthlyInvoiceDataResponse, MonthlyInvoiceEpic};
pub use worklog::{PullSummary, TrackerWorklog, WorklogBatch, WorklogEntry, WorklogFailure};
