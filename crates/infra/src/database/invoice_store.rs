//! SQLite-backed implementation of the invoice store port.
//!
//! Line items live in their own table and are replaced wholesale on every
//! save; their `position` column preserves the order the builder produced.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tempora_core::InvoiceStore;
use tempora_domain::{Invoice, InvoiceLineItem, InvoiceStatus, Result, TemporaError};
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::entry_store::{map_join_error, parse_decimal, parse_uuid};
use super::manager::{map_sql_error, DbManager};

/// SQLite-backed invoice store.
pub struct SqliteInvoiceStore {
    db: Arc<DbManager>,
}

impl SqliteInvoiceStore {
    /// Construct a store backed by the shared database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InvoiceStore for SqliteInvoiceStore {
    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Option<Invoice>> {
            let conn = db.get_connection()?;
            fetch_invoice(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<Invoice>> {
            let conn = db.get_connection()?;

            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY created_at DESC"
                ))
                .map_err(map_sql_error)?;
            let rows = stmt.query_map([], map_invoice_row).map_err(map_sql_error)?;
            let mut invoices =
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)?;

            for invoice in &mut invoices {
                invoice.line_items = fetch_line_items(&conn, invoice.id)?;
            }
            Ok(invoices)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_invoice(&self, invoice: &Invoice) -> Result<()> {
        let db = Arc::clone(&self.db);
        let to_save = invoice.clone();

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db.get_connection()?;
            // Row and line items always change together.
            let tx = conn.transaction().map_err(map_sql_error)?;
            upsert_invoice(&tx, &to_save)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            remove_invoice(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }
}

const INVOICE_COLUMNS: &str = "id, invoice_number, client_name, client_email, client_address,
        issue_date, due_date, status, subtotal, tax_rate, tax_amount, total, notes,
        created_at, updated_at";

const INVOICE_UPSERT_SQL: &str = "INSERT OR REPLACE INTO invoices (
        id, invoice_number, client_name, client_email, client_address,
        issue_date, due_date, status, subtotal, tax_rate, tax_amount, total, notes,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const LINE_ITEM_INSERT_SQL: &str = "INSERT INTO invoice_line_items (
        id, invoice_id, position, description, quantity, rate, amount, entry_id
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const LINE_ITEM_SELECT_SQL: &str = "SELECT id, description, quantity, rate, amount, entry_id
    FROM invoice_line_items
    WHERE invoice_id = ?1
    ORDER BY position ASC";

pub(crate) fn fetch_invoice(conn: &Connection, id: Uuid) -> Result<Option<Invoice>> {
    let invoice = conn
        .query_row(
            &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"),
            params![id.to_string()],
            map_invoice_row,
        )
        .optional()
        .map_err(map_sql_error)?;

    match invoice {
        None => Ok(None),
        Some(mut invoice) => {
            invoice.line_items = fetch_line_items(conn, invoice.id)?;
            Ok(Some(invoice))
        }
    }
}

/// Insert or replace an invoice together with its line items.
pub(crate) fn upsert_invoice(conn: &Connection, invoice: &Invoice) -> Result<()> {
    conn.execute(
        INVOICE_UPSERT_SQL,
        params![
            invoice.id.to_string(),
            invoice.invoice_number,
            invoice.client_name,
            invoice.client_email,
            invoice.client_address,
            invoice.issue_date,
            invoice.due_date,
            invoice.status.to_string(),
            invoice.subtotal.to_string(),
            invoice.tax_rate.to_string(),
            invoice.tax_amount.to_string(),
            invoice.total.to_string(),
            invoice.notes,
            invoice.created_at,
            invoice.updated_at,
        ],
    )
    .map_err(map_sql_error)?;

    // REPLACE cascades the old line items away; the delete covers the plain
    // insert path.
    conn.execute(
        "DELETE FROM invoice_line_items WHERE invoice_id = ?1",
        params![invoice.id.to_string()],
    )
    .map_err(map_sql_error)?;

    for (position, line) in invoice.line_items.iter().enumerate() {
        conn.execute(
            LINE_ITEM_INSERT_SQL,
            params![
                line.id.to_string(),
                invoice.id.to_string(),
                position as i64,
                line.description,
                line.quantity.to_string(),
                line.rate.to_string(),
                line.amount.to_string(),
                line.entry_id.map(|id| id.to_string()),
            ],
        )
        .map_err(map_sql_error)?;
    }

    Ok(())
}

pub(crate) fn remove_invoice(conn: &Connection, id: Uuid) -> Result<()> {
    // Line items go with the invoice via ON DELETE CASCADE.
    let affected = conn
        .execute("DELETE FROM invoices WHERE id = ?1", params![id.to_string()])
        .map_err(map_sql_error)?;
    if affected == 0 {
        return Err(TemporaError::NotFound(format!("invoice {id}")));
    }
    Ok(())
}

fn fetch_line_items(conn: &Connection, invoice_id: Uuid) -> Result<Vec<InvoiceLineItem>> {
    let mut stmt = conn.prepare(LINE_ITEM_SELECT_SQL).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(params![invoice_id.to_string()], map_line_item_row)
        .map_err(map_sql_error)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
}

fn map_invoice_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    let id: String = row.get(0)?;
    let status_raw: String = row.get(7)?;
    let subtotal: String = row.get(8)?;
    let tax_rate: String = row.get(9)?;
    let tax_amount: String = row.get(10)?;
    let total: String = row.get(11)?;

    Ok(Invoice {
        id: parse_uuid(0, &id)?,
        invoice_number: row.get(1)?,
        client_name: row.get(2)?,
        client_email: row.get(3)?,
        client_address: row.get(4)?,
        issue_date: row.get(5)?,
        due_date: row.get(6)?,
        status: parse_status(&id, &status_raw),
        line_items: Vec::new(),
        subtotal: parse_decimal(8, &subtotal)?,
        tax_rate: parse_decimal(9, &tax_rate)?,
        tax_amount: parse_decimal(10, &tax_amount)?,
        total: parse_decimal(11, &total)?,
        notes: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn map_line_item_row(row: &Row<'_>) -> rusqlite::Result<InvoiceLineItem> {
    let id: String = row.get(0)?;
    let quantity: String = row.get(2)?;
    let rate: String = row.get(3)?;
    let amount: String = row.get(4)?;
    let entry_id: Option<String> = row.get(5)?;

    Ok(InvoiceLineItem {
        id: parse_uuid(0, &id)?,
        description: row.get(1)?,
        quantity: parse_decimal(2, &quantity)?,
        rate: parse_decimal(3, &rate)?,
        amount: parse_decimal(4, &amount)?,
        entry_id: entry_id.as_deref().map(|raw| parse_uuid(5, raw)).transpose()?,
    })
}

fn parse_status(id: &str, raw: &str) -> InvoiceStatus {
    match raw.parse::<InvoiceStatus>() {
        Ok(status) => status,
        Err(err) => {
            warn!(
                invoice_id = %id,
                raw_status = %raw,
                error = %err,
                "invalid invoice status returned by sqlite, defaulting to draft"
            );
            InvoiceStatus::Draft
        }
    }
}
