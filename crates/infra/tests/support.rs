use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;
use tempora_domain::TimeEntry;
use tempora_infra::database::DbManager;
use uuid::Uuid;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with migrations applied.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal should parse")
}

/// Construct a billable entry on the given day of March 2025.
///
/// `created_at` is spaced a whole second apart per day so listings ordered by
/// creation time are deterministic.
pub fn make_entry(day: u32, hours: &str, rate: Option<&str>) -> TimeEntry {
    let created_at = Utc
        .with_ymd_and_hms(2025, 3, day, 9, 0, 0)
        .single()
        .expect("fixture timestamp should be valid");
    TimeEntry {
        id: Uuid::new_v4(),
        user_id: "user-1".to_string(),
        invoice_id: None,
        description: format!("Work on day {day}"),
        duration: dec(hours),
        hourly_rate: rate.map(dec),
        date: NaiveDate::from_ymd_opt(2025, 3, day).expect("fixture date should be valid"),
        jira_issue_key: None,
        jira_worklog_id: None,
        billable: true,
        invoiced: false,
        jira_synced_at: None,
        version: 1,
        created_at,
        updated_at: created_at,
    }
}

/// Construct an entry carrying a tracker worklog reference.
pub fn make_synced_entry(day: u32, hours: &str, worklog_id: &str) -> TimeEntry {
    let mut entry = make_entry(day, hours, None);
    entry.jira_issue_key = Some("PROJ-7".to_string());
    entry.jira_worklog_id = Some(worklog_id.to_string());
    entry.jira_synced_at = Some(entry.created_at);
    entry
}
