//! Boundary validation for entry inputs
//!
//! Inputs are rejected here, before any store or tracker call. Field types
//! already guarantee a parseable calendar date, so validation only covers
//! what the type system cannot express.

use rust_decimal::Decimal;
use tempora_domain::{Result, TemporaError, TimeEntry, TimeEntryDraft, TimeEntryPatch};

/// Validate input for creating a new entry
///
/// Fails with `InvalidInput` when the duration is negative or the
/// description is blank.
pub fn validate_create(draft: &TimeEntryDraft) -> Result<()> {
    if draft.duration < Decimal::ZERO {
        return Err(TemporaError::InvalidInput(format!(
            "duration must not be negative, got {}",
            draft.duration
        )));
    }
    if draft.description.trim().is_empty() {
        return Err(TemporaError::InvalidInput("description must not be empty".to_string()));
    }
    if let Some(rate) = draft.hourly_rate {
        if rate < Decimal::ZERO {
            return Err(TemporaError::InvalidInput(format!(
                "hourly rate must not be negative, got {rate}"
            )));
        }
    }
    Ok(())
}

/// Validate a partial update against the stored entry
///
/// Fails with `Immutable` when the entry is invoiced, regardless of which
/// fields the patch touches. Patched fields get the same checks as on
/// create.
pub fn validate_update(existing: &TimeEntry, patch: &TimeEntryPatch) -> Result<()> {
    if existing.invoiced {
        return Err(TemporaError::Immutable(format!(
            "entry {} is attached to an invoice",
            existing.id
        )));
    }
    if let Some(duration) = patch.duration {
        if duration < Decimal::ZERO {
            return Err(TemporaError::InvalidInput(format!(
                "duration must not be negative, got {duration}"
            )));
        }
    }
    if let Some(description) = &patch.description {
        if description.trim().is_empty() {
            return Err(TemporaError::InvalidInput("description must not be empty".to_string()));
        }
    }
    if let Some(rate) = patch.hourly_rate {
        if rate < Decimal::ZERO {
            return Err(TemporaError::InvalidInput(format!(
                "hourly rate must not be negative, got {rate}"
            )));
        }
    }
    Ok(())
}
