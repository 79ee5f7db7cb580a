//! Invoice model and billing math
//!
//! All money is `Decimal`, rounded to cents where amounts are derived by
//! multiplication. Totals are redundant on the struct so stored invoices can
//! be checked against their own line items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;
use uuid::Uuid;

use crate::constants::MONEY_SCALE;
use crate::errors::{Result, TemporaError};

/// Invoice lifecycle status
///
/// `draft` is the only state the builder creates. `sent` is reached through
/// an explicit send. The remaining states are accepted from outside, never
/// computed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

crate::impl_domain_status_conversions!(InvoiceStatus {
    Draft => "draft",
    Sent => "sent",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled"
});

/// One line of an invoice, usually backed by a time entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct InvoiceLineItem {
    pub id: Uuid,
    pub description: String,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub quantity: Decimal,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub rate: Decimal,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub amount: Decimal,
    /// Back-reference to the consumed entry, used to revert the entry when
    /// the invoice is deleted
    pub entry_id: Option<Uuid>,
}

/// Client fields captured on the invoice at build time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct ClientDetails {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
}

/// An invoice with redundant, checkable totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct Invoice {
    pub id: Uuid,
    /// Unique, assigned once by the numbering sequence
    pub invoice_number: String,
    pub client_name: String,
    pub client_email: String,
    pub client_address: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub line_items: Vec<InvoiceLineItem>,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub subtotal: Decimal,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub tax_rate: Decimal,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub tax_amount: Decimal,
    #[cfg_attr(feature = "ts-gen", ts(type = "number"))]
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Verify the totals against the line items
    ///
    /// Derived amounts are compared after rounding to cents, matching how
    /// the builder computes them:
    /// - `line.amount == round(line.quantity * line.rate)`
    /// - `subtotal == Σ line.amount`
    /// - `tax_amount == round(subtotal * tax_rate)`
    /// - `total == subtotal + tax_amount`
    pub fn validate_totals(&self) -> Result<()> {
        for line in &self.line_items {
            let expected = (line.quantity * line.rate).round_dp(MONEY_SCALE);
            if line.amount != expected {
                return Err(TemporaError::Internal(format!(
                    "invoice {}: line {} amount {} != quantity {} * rate {}",
                    self.invoice_number, line.id, line.amount, line.quantity, line.rate
                )));
            }
        }

        let subtotal: Decimal = self.line_items.iter().map(|line| line.amount).sum();
        if self.subtotal != subtotal {
            return Err(TemporaError::Internal(format!(
                "invoice {}: subtotal {} != line sum {}",
                self.invoice_number, self.subtotal, subtotal
            )));
        }

        let tax_amount = (self.subtotal * self.tax_rate).round_dp(MONEY_SCALE);
        if self.tax_amount != tax_amount {
            return Err(TemporaError::Internal(format!(
                "invoice {}: tax amount {} != subtotal {} * tax rate {}",
                self.invoice_number, self.tax_amount, self.subtotal, self.tax_rate
            )));
        }

        if self.total != self.subtotal + self.tax_amount {
            return Err(TemporaError::Internal(format!(
                "invoice {}: total {} != subtotal {} + tax {}",
                self.invoice_number, self.total, self.subtotal, self.tax_amount
            )));
        }

        Ok(())
    }
}
