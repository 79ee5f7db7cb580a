//! Invoice builder - turns billable entries into a draft invoice
//!
//! Creation is all-or-nothing: the invoice row and the `invoiced` flips on
//! its entries commit in one store transaction, each flip compare-and-swapped
//! against the version read during validation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Days, Utc};
use rust_decimal::Decimal;
use tempora_domain::constants::MONEY_SCALE;
use tempora_domain::{
    BillingConfig, ClientDetails, Invoice, InvoiceLineItem, InvoiceStatus, Result, TemporaError,
    TimeEntry,
};
use tracing::info;
use uuid::Uuid;

use super::ports::{InvoiceNumberSequence, InvoiceStore};
use crate::entries::ports::EntryStore;

/// Invoice builder service
pub struct InvoiceBuilder {
    entries: Arc<dyn EntryStore>,
    invoices: Arc<dyn InvoiceStore>,
    sequence: Arc<dyn InvoiceNumberSequence>,
    billing: BillingConfig,
}

impl InvoiceBuilder {
    /// Create a new builder with default billing settings
    pub fn new(
        entries: Arc<dyn EntryStore>,
        invoices: Arc<dyn InvoiceStore>,
        sequence: Arc<dyn InvoiceNumberSequence>,
    ) -> Self {
        Self { entries, invoices, sequence, billing: BillingConfig::default() }
    }

    /// Override the billing settings (default rate, payment terms)
    pub fn with_billing(mut self, billing: BillingConfig) -> Self {
        self.billing = billing;
        self
    }

    /// Build a draft invoice from the given entries
    ///
    /// Every entry must be billable and not yet invoiced; violations are
    /// rejected before the numbering sequence or the store is touched. On
    /// success each consumed entry is invoiced and points at the new
    /// invoice.
    pub async fn build(
        &self,
        entry_ids: &[Uuid],
        tax_rate: Decimal,
        client: ClientDetails,
    ) -> Result<Invoice> {
        if entry_ids.is_empty() {
            return Err(TemporaError::EmptySet("no entries given to invoice".to_string()));
        }
        let mut unique = HashSet::new();
        for id in entry_ids {
            if !unique.insert(id) {
                return Err(TemporaError::InvalidInput(format!("entry {id} listed twice")));
            }
        }
        if tax_rate < Decimal::ZERO {
            return Err(TemporaError::InvalidInput(format!(
                "tax rate must not be negative, got {tax_rate}"
            )));
        }

        let mut entries = Vec::with_capacity(entry_ids.len());
        for id in entry_ids {
            let entry = self
                .entries
                .get_entry(*id)
                .await?
                .ok_or_else(|| TemporaError::NotFound(format!("time entry {id}")))?;
            entries.push(entry);
        }

        for entry in &entries {
            if !entry.billable {
                return Err(TemporaError::NotBillable(format!(
                    "entry {} is not billable",
                    entry.id
                )));
            }
            if entry.invoiced {
                return Err(TemporaError::AlreadyInvoiced(format!(
                    "entry {} is already on invoice {:?}",
                    entry.id, entry.invoice_id
                )));
            }
        }

        let line_items = self.line_items(&entries)?;
        let subtotal: Decimal = line_items.iter().map(|line| line.amount).sum();
        let tax_amount = (subtotal * tax_rate).round_dp(MONEY_SCALE);
        let total = subtotal + tax_amount;

        // Validation is done; only now is a number burned from the sequence.
        let invoice_number = self.sequence.next_invoice_number().await?;

        let now = Utc::now();
        let issue_date = now.date_naive();
        let due_date = issue_date
            .checked_add_days(Days::new(u64::from(self.billing.payment_terms_days)))
            .ok_or_else(|| {
                TemporaError::Internal(format!(
                    "due date overflow from {issue_date} + {} days",
                    self.billing.payment_terms_days
                ))
            })?;

        let invoice = Invoice {
            id: Uuid::now_v7(),
            invoice_number,
            client_name: client.name,
            client_email: client.email,
            client_address: client.address,
            issue_date,
            due_date,
            status: InvoiceStatus::Draft,
            line_items,
            subtotal,
            tax_rate,
            tax_amount,
            total,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        invoice.validate_totals()?;

        let invoice_id = invoice.id;
        let to_save = invoice.clone();
        let flips = entries;
        self.entries
            .with_transaction(Box::new(move |tx| {
                tx.save_invoice(&to_save)?;
                for mut entry in flips {
                    let expected = entry.version;
                    entry.invoiced = true;
                    entry.invoice_id = Some(invoice_id);
                    tx.save_entry(&entry, Some(expected))?;
                }
                Ok(())
            }))
            .await?;

        info!(
            invoice_id = %invoice_id,
            invoice_number = %invoice.invoice_number,
            entries = entry_ids.len(),
            total = %invoice.total,
            "invoice created"
        );
        Ok(invoice)
    }

    /// Load an invoice, failing with `NotFound` when absent
    pub async fn get(&self, id: Uuid) -> Result<Invoice> {
        self.invoices
            .get_invoice(id)
            .await?
            .ok_or_else(|| TemporaError::NotFound(format!("invoice {id}")))
    }

    /// List all invoices
    pub async fn list(&self) -> Result<Vec<Invoice>> {
        self.invoices.list_invoices().await
    }

    /// Move a draft invoice to `sent`
    pub async fn send(&self, id: Uuid) -> Result<Invoice> {
        let mut invoice = self.get(id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(TemporaError::InvalidInput(format!(
                "invoice {} is {}, only drafts can be sent",
                invoice.invoice_number, invoice.status
            )));
        }
        invoice.status = InvoiceStatus::Sent;
        invoice.updated_at = Utc::now();
        self.invoices.save_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Record an externally driven status (`paid`, `overdue`, `cancelled`)
    ///
    /// The transition itself is decided outside; this only persists it.
    pub async fn set_status(&self, id: Uuid, status: InvoiceStatus) -> Result<Invoice> {
        let mut invoice = self.get(id).await?;
        invoice.status = status;
        invoice.updated_at = Utc::now();
        self.invoices.save_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Delete an invoice, reverting its entries to uninvoiced
    ///
    /// Entries survive invoice deletion; they drop back to their prior sync
    /// state in the same transaction that removes the invoice.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let invoice = self.get(id).await?;

        let entry_refs: Vec<Uuid> =
            invoice.line_items.iter().filter_map(|line| line.entry_id).collect();
        self.entries
            .with_transaction(Box::new(move |tx| {
                for entry_id in entry_refs {
                    let Some(mut entry) = tx.get_entry(entry_id)? else {
                        continue;
                    };
                    if entry.invoice_id != Some(id) {
                        continue;
                    }
                    let expected = entry.version;
                    entry.invoiced = false;
                    entry.invoice_id = None;
                    tx.save_entry(&entry, Some(expected))?;
                }
                tx.delete_invoice(id)?;
                Ok(())
            }))
            .await?;

        info!(invoice_id = %id, "invoice deleted, entries reverted");
        Ok(())
    }

    fn line_items(&self, entries: &[TimeEntry]) -> Result<Vec<InvoiceLineItem>> {
        entries
            .iter()
            .map(|entry| {
                let hourly = entry.hourly_rate.or(self.billing.default_hourly_rate).ok_or_else(
                    || {
                        TemporaError::InvalidInput(format!(
                            "entry {} has no hourly rate and no default rate is configured",
                            entry.id
                        ))
                    },
                )?;
                let rate = entry.duration * hourly;
                let quantity = Decimal::ONE;
                Ok(InvoiceLineItem {
                    id: Uuid::now_v7(),
                    description: entry.description.clone(),
                    quantity,
                    rate,
                    amount: (quantity * rate).round_dp(MONEY_SCALE),
                    entry_id: Some(entry.id),
                })
            })
            .collect()
    }
}
