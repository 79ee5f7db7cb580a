//! SQLite-backed implementation of the entry store port.
//!
//! `save_entry` carries the optimistic lock: inserts are guarded by a
//! pre-check on the primary key and updates by a `WHERE version = ?` clause,
//! so a concurrent writer surfaces as `Conflict` rather than a lost update.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tempora_core::{EntryStore, StoreTransaction, TxWork};
use tempora_domain::{EntryFilter, Invoice, Result, TemporaError, TimeEntry};
use tokio::task;
use uuid::Uuid;

use super::invoice_store::{remove_invoice, upsert_invoice};
use super::manager::{map_sql_error, DbManager};

/// SQLite-backed entry store.
pub struct SqliteEntryStore {
    db: Arc<DbManager>,
}

impl SqliteEntryStore {
    /// Construct a store backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn get_entry(&self, id: Uuid) -> Result<Option<TimeEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Option<TimeEntry>> {
            let conn = db.get_connection()?;
            fetch_entry(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_entry_by_worklog(&self, worklog_id: &str) -> Result<Option<TimeEntry>> {
        let db = Arc::clone(&self.db);
        let worklog_id = worklog_id.to_string();

        task::spawn_blocking(move || -> Result<Option<TimeEntry>> {
            let conn = db.get_connection()?;
            conn.query_row(ENTRY_SELECT_BY_WORKLOG_SQL, params![worklog_id], map_entry_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_entry(
        &self,
        entry: &TimeEntry,
        expected_version: Option<i64>,
    ) -> Result<TimeEntry> {
        let db = Arc::clone(&self.db);
        let to_save = entry.clone();

        task::spawn_blocking(move || -> Result<TimeEntry> {
            let conn = db.get_connection()?;
            save_entry_on(&conn, &to_save, expected_version)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_entry(&self, id: Uuid) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let affected = conn
                .execute("DELETE FROM time_entries WHERE id = ?1", params![id.to_string()])
                .map_err(map_sql_error)?;
            if affected == 0 {
                return Err(TemporaError::NotFound(format!("time entry {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<TimeEntry>> {
        let db = Arc::clone(&self.db);
        let filter = filter.clone();

        task::spawn_blocking(move || -> Result<Vec<TimeEntry>> {
            let conn = db.get_connection()?;
            query_entries(&conn, &filter)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn with_transaction(&self, work: TxWork) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            let mut scope = SqliteStoreTransaction { tx };
            // An error from the closure drops the transaction, rolling back
            // everything written inside it.
            work(&mut scope)?;
            scope.tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Transaction scope handed to [`TxWork`] closures.
///
/// Spans entries and invoices so invoice creation and the entry flips it
/// implies commit as one unit.
struct SqliteStoreTransaction<'c> {
    tx: rusqlite::Transaction<'c>,
}

impl StoreTransaction for SqliteStoreTransaction<'_> {
    fn get_entry(&mut self, id: Uuid) -> Result<Option<TimeEntry>> {
        fetch_entry(&self.tx, id)
    }

    fn save_entry(
        &mut self,
        entry: &TimeEntry,
        expected_version: Option<i64>,
    ) -> Result<TimeEntry> {
        save_entry_on(&self.tx, entry, expected_version)
    }

    fn save_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        upsert_invoice(&self.tx, invoice)
    }

    fn delete_invoice(&mut self, id: Uuid) -> Result<()> {
        remove_invoice(&self.tx, id)
    }
}

const ENTRY_COLUMNS: &str = "id, user_id, invoice_id, description, duration, hourly_rate, date,
        jira_issue_key, jira_worklog_id, billable, invoiced, jira_synced_at, version,
        created_at, updated_at";

const ENTRY_SELECT_BY_ID_SQL: &str = "SELECT
        id, user_id, invoice_id, description, duration, hourly_rate, date,
        jira_issue_key, jira_worklog_id, billable, invoiced, jira_synced_at, version,
        created_at, updated_at
    FROM time_entries
    WHERE id = ?1";

const ENTRY_SELECT_BY_WORKLOG_SQL: &str = "SELECT
        id, user_id, invoice_id, description, duration, hourly_rate, date,
        jira_issue_key, jira_worklog_id, billable, invoiced, jira_synced_at, version,
        created_at, updated_at
    FROM time_entries
    WHERE jira_worklog_id = ?1";

const ENTRY_INSERT_SQL: &str = "INSERT INTO time_entries (
        id, user_id, invoice_id, description, duration, hourly_rate, date,
        jira_issue_key, jira_worklog_id, billable, invoiced, jira_synced_at, version,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const ENTRY_UPDATE_CAS_SQL: &str = "UPDATE time_entries SET
        user_id = ?1, invoice_id = ?2, description = ?3, duration = ?4, hourly_rate = ?5,
        date = ?6, jira_issue_key = ?7, jira_worklog_id = ?8, billable = ?9, invoiced = ?10,
        jira_synced_at = ?11, version = version + 1, updated_at = ?12
    WHERE id = ?13 AND version = ?14";

pub(crate) fn fetch_entry(conn: &Connection, id: Uuid) -> Result<Option<TimeEntry>> {
    conn.query_row(ENTRY_SELECT_BY_ID_SQL, params![id.to_string()], map_entry_row)
        .optional()
        .map_err(map_sql_error)
}

/// Insert (`expected_version = None`) or compare-and-swap update an entry.
pub(crate) fn save_entry_on(
    conn: &Connection,
    entry: &TimeEntry,
    expected_version: Option<i64>,
) -> Result<TimeEntry> {
    match expected_version {
        None => insert_entry(conn, entry),
        Some(expected) => update_entry_cas(conn, entry, expected),
    }
}

fn insert_entry(conn: &Connection, entry: &TimeEntry) -> Result<TimeEntry> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM time_entries WHERE id = ?1",
            params![entry.id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sql_error)?;
    if exists.is_some() {
        return Err(TemporaError::Conflict(format!("time entry {} already exists", entry.id)));
    }

    conn.execute(
        ENTRY_INSERT_SQL,
        params![
            entry.id.to_string(),
            entry.user_id,
            entry.invoice_id.map(|id| id.to_string()),
            entry.description,
            entry.duration.to_string(),
            entry.hourly_rate.map(|rate| rate.to_string()),
            entry.date,
            entry.jira_issue_key,
            entry.jira_worklog_id,
            bool_to_int(entry.billable),
            bool_to_int(entry.invoiced),
            entry.jira_synced_at,
            entry.version,
            entry.created_at,
            entry.updated_at,
        ],
    )
    .map_err(map_sql_error)?;

    Ok(entry.clone())
}

fn update_entry_cas(conn: &Connection, entry: &TimeEntry, expected: i64) -> Result<TimeEntry> {
    let now = Utc::now();

    let affected = conn
        .execute(
            ENTRY_UPDATE_CAS_SQL,
            params![
                entry.user_id,
                entry.invoice_id.map(|id| id.to_string()),
                entry.description,
                entry.duration.to_string(),
                entry.hourly_rate.map(|rate| rate.to_string()),
                entry.date,
                entry.jira_issue_key,
                entry.jira_worklog_id,
                bool_to_int(entry.billable),
                bool_to_int(entry.invoiced),
                entry.jira_synced_at,
                now,
                entry.id.to_string(),
                expected,
            ],
        )
        .map_err(map_sql_error)?;

    if affected == 0 {
        // Zero rows means either the entry is gone or the version moved.
        return match fetch_entry(conn, entry.id)? {
            None => Err(TemporaError::NotFound(format!("time entry {}", entry.id))),
            Some(found) => Err(TemporaError::Conflict(format!(
                "time entry {} is at version {}, expected {}",
                entry.id, found.version, expected
            ))),
        };
    }

    let mut stored = entry.clone();
    stored.version = expected + 1;
    stored.updated_at = now;
    Ok(stored)
}

fn query_entries(conn: &Connection, filter: &EntryFilter) -> Result<Vec<TimeEntry>> {
    let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM time_entries");
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(from) = filter.from {
        clauses.push("date >= ?");
        values.push(Value::Text(from.to_string()));
    }
    if let Some(to) = filter.to {
        clauses.push("date <= ?");
        values.push(Value::Text(to.to_string()));
    }
    if let Some(billable) = filter.billable {
        clauses.push("billable = ?");
        values.push(Value::Integer(bool_to_int(billable)));
    }
    if let Some(invoiced) = filter.invoiced {
        clauses.push("invoiced = ?");
        values.push(Value::Integer(bool_to_int(invoiced)));
    }
    if let Some(user_id) = &filter.user_id {
        clauses.push("user_id = ?");
        values.push(Value::Text(user_id.clone()));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    sql.push_str(" ORDER BY date ASC, created_at ASC");

    // SQLite requires LIMIT before OFFSET; -1 means unbounded.
    match (filter.limit, filter.offset) {
        (Some(limit), Some(offset)) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::Integer(i64::from(limit)));
            values.push(Value::Integer(i64::from(offset)));
        }
        (Some(limit), None) => {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::from(limit)));
        }
        (None, Some(offset)) => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            values.push(Value::Integer(i64::from(offset)));
        }
        (None, None) => {}
    }

    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let rows = stmt.query_map(params_from_iter(values), map_entry_row).map_err(map_sql_error)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
}

fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<TimeEntry> {
    let id: String = row.get(0)?;
    let invoice_id: Option<String> = row.get(2)?;
    let duration: String = row.get(4)?;
    let hourly_rate: Option<String> = row.get(5)?;

    Ok(TimeEntry {
        id: parse_uuid(0, &id)?,
        user_id: row.get(1)?,
        invoice_id: invoice_id.as_deref().map(|raw| parse_uuid(2, raw)).transpose()?,
        description: row.get(3)?,
        duration: parse_decimal(4, &duration)?,
        hourly_rate: hourly_rate.as_deref().map(|raw| parse_decimal(5, raw)).transpose()?,
        date: row.get(6)?,
        jira_issue_key: row.get(7)?,
        jira_worklog_id: row.get(8)?,
        billable: int_to_bool(row.get(9)?),
        invoiced: int_to_bool(row.get(10)?),
        jira_synced_at: row.get(11)?,
        version: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub(crate) fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_decimal(idx: usize, raw: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str_exact(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn map_join_error(err: task::JoinError) -> TemporaError {
    if err.is_cancelled() {
        TemporaError::Internal("database task cancelled".into())
    } else {
        TemporaError::Internal(format!("database task panic: {err}"))
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64) -> bool {
    value != 0
}
