//! Port interfaces for invoice persistence and numbering

use async_trait::async_trait;
use tempora_domain::{Invoice, Result};
use uuid::Uuid;

/// Trait for the store backing invoices
///
/// Writes here are non-transactional; invoice creation goes through the
/// entry store transaction instead because it flips entries in the same
/// commit.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Load an invoice by id
    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>>;

    /// List all invoices, newest first
    async fn list_invoices(&self) -> Result<Vec<Invoice>>;

    /// Insert or replace an invoice
    async fn save_invoice(&self, invoice: &Invoice) -> Result<()>;

    /// Delete an invoice by id
    async fn delete_invoice(&self, id: Uuid) -> Result<()>;
}

/// Trait for the invoice numbering sequence
#[async_trait]
pub trait InvoiceNumberSequence: Send + Sync {
    /// Issue the next invoice number
    ///
    /// Numbers are unique and monotonically issued; a number handed out for
    /// a build that later fails is burned, never reused.
    async fn next_invoice_number(&self) -> Result<String>;
}
