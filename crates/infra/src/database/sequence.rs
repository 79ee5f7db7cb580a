//! SQLite-backed invoice number sequence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use rusqlite::{params, TransactionBehavior};
use tempora_core::InvoiceNumberSequence;
use tempora_domain::constants::{INVOICE_COUNTER_WIDTH, INVOICE_NUMBER_PREFIX};
use tempora_domain::Result;
use tokio::task;

use super::entry_store::map_join_error;
use super::manager::{map_sql_error, DbManager};

/// Issues `INV-<year>-<counter>` numbers from a per-year counter table.
///
/// The counter is bumped inside an immediate transaction, so two concurrent
/// callers can never observe the same value. Counters only move forward;
/// numbers issued for builds that later fail stay burned.
pub struct SqliteInvoiceSequence {
    db: Arc<DbManager>,
}

impl SqliteInvoiceSequence {
    /// Construct a sequence backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InvoiceNumberSequence for SqliteInvoiceSequence {
    async fn next_invoice_number(&self) -> Result<String> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<String> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            let year = Utc::now().year();
            tx.execute(
                "INSERT INTO invoice_counters (year, counter) VALUES (?1, 0)
                 ON CONFLICT(year) DO NOTHING",
                params![year],
            )
            .map_err(map_sql_error)?;
            tx.execute(
                "UPDATE invoice_counters SET counter = counter + 1 WHERE year = ?1",
                params![year],
            )
            .map_err(map_sql_error)?;
            let counter: i64 = tx
                .query_row(
                    "SELECT counter FROM invoice_counters WHERE year = ?1",
                    params![year],
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;

            tx.commit().map_err(map_sql_error)?;

            Ok(format!(
                "{}-{}-{:0width$}",
                INVOICE_NUMBER_PREFIX,
                year,
                counter,
                width = INVOICE_COUNTER_WIDTH
            ))
        })
        .await
        .map_err(map_join_error)?
    }
}
