//! Error kinds surfaced to the cashier terminal.
//!
//! Every variant is a rejected operation on an otherwise intact shift; none
//! of them is fatal. The `Display` text is shown to the cashier as-is, so
//! each message names the precondition that was violated.

use thiserror::Error;

use crate::shifts::ShiftStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TillError {
    #[error("{field} must be {requirement} (got {value})")]
    InvalidAmount {
        field: &'static str,
        requirement: &'static str,
        value: i64,
    },

    #[error("A reason is required for a cash adjustment")]
    InvalidReason,

    #[error("An order reference is required to record a payment")]
    InvalidOrderReference,

    #[error("Shift is not open (current status: {0})")]
    ShiftNotOpen(ShiftStatus),

    #[error("Shift must be closed to generate the closing report (current status: {0})")]
    ShiftNotClosed(ShiftStatus),

    #[error("Order {0} already has a payment recorded in this shift")]
    DuplicatePayment(String),

    #[error("Cannot {action} a shift that is {from}")]
    InvalidTransition {
        action: &'static str,
        from: ShiftStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid request: {0}")]
    InvalidPayload(String),
}

pub type Result<T> = std::result::Result<T, TillError>;

/// Reject negative amounts (opening/closing cash).
pub(crate) fn ensure_non_negative(field: &'static str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(TillError::InvalidAmount {
            field,
            requirement: "zero or more",
            value,
        });
    }
    Ok(())
}

/// Reject zero and negative amounts (payments, adjustments).
pub(crate) fn ensure_positive(field: &'static str, value: i64) -> Result<()> {
    if value <= 0 {
        return Err(TillError::InvalidAmount {
            field,
            requirement: "greater than zero",
            value,
        });
    }
    Ok(())
}
