//! Append-only ledger of sale payments and petty-cash adjustments.
//!
//! The ledger is owned by its `ShiftSession`, which gates every append on the
//! shift being open. Entries are never edited or removed; all totals are
//! derived from these sequences by the reconciliation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ensure_positive, Result, TillError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "card" => Some(Self::Card),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    In,
    Out,
}

impl AdjustmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in" | "cash_in" => Some(Self::In),
            "out" | "cash_out" => Some(Self::Out),
            _ => None,
        }
    }
}

/// A completed sale as handed over by the order/payment workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmission {
    pub order_reference: String,
    pub amount: i64,
    pub method: PaymentMethod,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub order_reference: String,
    pub amount: i64,
    pub method: PaymentMethod,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CashAdjustment {
    pub id: String,
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub amount: i64,
    pub reason: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    payments: Vec<PaymentRecord>,
    adjustments: Vec<CashAdjustment>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payments in insertion order.
    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    /// Adjustments in insertion order.
    pub fn adjustments(&self) -> &[CashAdjustment] {
        &self.adjustments
    }

    pub fn find_payment(&self, order_reference: &str) -> Option<&PaymentRecord> {
        let order_reference = order_reference.trim();
        self.payments
            .iter()
            .find(|p| p.order_reference == order_reference)
    }

    /// Total number of entries of both kinds.
    pub fn len(&self) -> usize {
        self.payments.len() + self.adjustments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn append_payment(
        &mut self,
        submission: PaymentSubmission,
    ) -> Result<&PaymentRecord> {
        let order_reference = submission.order_reference.trim();
        if order_reference.is_empty() {
            return Err(TillError::InvalidOrderReference);
        }
        ensure_positive("Payment amount", submission.amount)?;
        if self.find_payment(order_reference).is_some() {
            return Err(TillError::DuplicatePayment(order_reference.to_string()));
        }

        let record = PaymentRecord {
            id: Uuid::new_v4().to_string(),
            order_reference: order_reference.to_string(),
            amount: submission.amount,
            method: submission.method,
            time: submission.time,
        };
        info!(
            payment_id = %record.id,
            order = %record.order_reference,
            method = record.method.as_str(),
            amount = record.amount,
            "Payment recorded"
        );
        self.payments.push(record);
        Ok(&self.payments[self.payments.len() - 1])
    }

    pub(crate) fn append_adjustment(
        &mut self,
        adjustment_type: AdjustmentType,
        amount: i64,
        reason: &str,
        time: DateTime<Utc>,
    ) -> Result<&CashAdjustment> {
        ensure_positive("Adjustment amount", amount)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TillError::InvalidReason);
        }

        let adjustment = CashAdjustment {
            id: Uuid::new_v4().to_string(),
            adjustment_type,
            amount,
            reason: reason.to_string(),
            time,
        };
        info!(
            adjustment_id = %adjustment.id,
            kind = adjustment_type.as_str(),
            amount,
            "Cash adjustment recorded"
        );
        self.adjustments.push(adjustment);
        Ok(&self.adjustments[self.adjustments.len() - 1])
    }
}
