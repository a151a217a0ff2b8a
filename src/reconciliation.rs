//! Interim (X) and closing (Z) reconciliation reports.
//!
//! Reports are projections of a `ShiftSession` and its ledger at call time.
//! Nothing here is cached or stored, so the same session always yields the
//! same figures:
//!
//! ```text
//! expected_cash = opening_cash + petty_cash_in - petty_cash_out + cash_sales
//! difference    = closing_cash - expected_cash
//! ```
//!
//! Card sales count towards `sales_total` but never towards expected cash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::denominations::DenominationLine;
use crate::error::{Result, TillError};
use crate::ledger::{AdjustmentType, Ledger, PaymentMethod};
use crate::shifts::{ClosingMethod, ShiftSession, ShiftStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Interim,
    Closing,
}

impl ReportType {
    /// Short label printed on the slip.
    pub fn label(self) -> &'static str {
        match self {
            Self::Interim => "X-REPORT",
            Self::Closing => "Z-REPORT",
        }
    }
}

/// Sums derived from the ledger. Every report is built from one of these.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTotals {
    pub petty_cash_in: i64,
    pub petty_cash_out: i64,
    pub cash_sales: i64,
    pub card_sales: i64,
    pub cash_payment_count: usize,
    pub card_payment_count: usize,
    pub adjustment_count: usize,
}

impl LedgerTotals {
    pub fn from_ledger(ledger: &Ledger) -> Result<Self> {
        let mut totals = Self::default();
        for payment in ledger.payments() {
            totals.add_payment(payment.method, payment.amount)?;
        }
        for adjustment in ledger.adjustments() {
            totals.add_adjustment(adjustment.adjustment_type, adjustment.amount)?;
        }
        Ok(totals)
    }

    pub(crate) fn add_payment(&mut self, method: PaymentMethod, amount: i64) -> Result<()> {
        match method {
            PaymentMethod::Cash => {
                self.cash_sales = checked_sum(self.cash_sales, amount)?;
                self.cash_payment_count += 1;
            }
            PaymentMethod::Card => {
                self.card_sales = checked_sum(self.card_sales, amount)?;
                self.card_payment_count += 1;
            }
        }
        Ok(())
    }

    pub(crate) fn add_adjustment(
        &mut self,
        adjustment_type: AdjustmentType,
        amount: i64,
    ) -> Result<()> {
        match adjustment_type {
            AdjustmentType::In => self.petty_cash_in = checked_sum(self.petty_cash_in, amount)?,
            AdjustmentType::Out => self.petty_cash_out = checked_sum(self.petty_cash_out, amount)?,
        }
        self.adjustment_count += 1;
        Ok(())
    }

    pub fn sales_total(&self) -> Result<i64> {
        checked_sum(self.cash_sales, self.card_sales)
    }

    pub fn expected_cash(&self, opening_cash: i64) -> Result<i64> {
        opening_cash
            .checked_add(self.petty_cash_in)
            .and_then(|v| v.checked_sub(self.petty_cash_out))
            .and_then(|v| v.checked_add(self.cash_sales))
            .ok_or_else(|| out_of_range(opening_cash))
    }
}

/// `closing_cash - expected_cash`, or an error if it does not fit.
pub(crate) fn closing_difference(closing_cash: i64, expected_cash: i64) -> Result<i64> {
    closing_cash
        .checked_sub(expected_cash)
        .ok_or_else(|| out_of_range(closing_cash))
}

fn checked_sum(total: i64, amount: i64) -> Result<i64> {
    total.checked_add(amount).ok_or_else(|| out_of_range(amount))
}

fn out_of_range(value: i64) -> TillError {
    TillError::InvalidAmount {
        field: "Amount",
        requirement: "small enough to keep the shift totals in range",
        value,
    }
}

/// Fields only present on a Z report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClosingFigures {
    pub shift_end: DateTime<Utc>,
    pub closing_cash: i64,
    /// Positive is an overage, negative a shortage.
    pub difference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denomination_breakdown: Option<Vec<DenominationLine>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub report_type: ReportType,
    pub shift_id: String,
    pub report_time: DateTime<Utc>,
    pub shift_start: DateTime<Utc>,
    pub opening_cash: i64,
    pub petty_cash_in: i64,
    pub petty_cash_out: i64,
    pub cash_sales: i64,
    pub card_sales: i64,
    pub sales_total: i64,
    pub expected_cash: i64,
    pub cash_payment_count: usize,
    pub card_payment_count: usize,
    pub adjustment_count: usize,
    #[serde(flatten)]
    pub closing: Option<ClosingFigures>,
}

/// Build the X report for an open shift. Changes nothing.
pub fn interim_report(session: &ShiftSession, now: DateTime<Utc>) -> Result<ReconciliationReport> {
    if session.status() != ShiftStatus::Open {
        return Err(TillError::ShiftNotOpen(session.status()));
    }
    let report = base_report(ReportType::Interim, session, now)?;
    debug!(
        shift_id = %report.shift_id,
        expected_cash = report.expected_cash,
        "Interim report generated"
    );
    Ok(report)
}

/// Build the Z report for a closed shift.
pub fn closing_report(session: &ShiftSession, now: DateTime<Utc>) -> Result<ReconciliationReport> {
    if session.status() != ShiftStatus::Closed {
        return Err(TillError::ShiftNotClosed(session.status()));
    }
    let (Some(shift_end), Some(closing_cash)) = (session.end_time(), session.closing_cash())
    else {
        return Err(TillError::ShiftNotClosed(session.status()));
    };

    let mut report = base_report(ReportType::Closing, session, now)?;
    let denomination_breakdown = match session.closing_method() {
        Some(ClosingMethod::BlindCount { breakdown }) => Some(breakdown.clone()),
        _ => None,
    };
    let difference = closing_difference(closing_cash, report.expected_cash)?;
    report.closing = Some(ClosingFigures {
        shift_end,
        closing_cash,
        difference,
        denomination_breakdown,
    });

    debug!(
        shift_id = %report.shift_id,
        expected_cash = report.expected_cash,
        closing_cash,
        difference,
        "Closing report generated"
    );
    Ok(report)
}

fn base_report(
    report_type: ReportType,
    session: &ShiftSession,
    now: DateTime<Utc>,
) -> Result<ReconciliationReport> {
    let (Some(shift_start), Some(opening_cash)) = (session.start_time(), session.opening_cash())
    else {
        return Err(TillError::ShiftNotOpen(session.status()));
    };
    let totals = LedgerTotals::from_ledger(session.ledger())?;

    Ok(ReconciliationReport {
        report_type,
        shift_id: session.id().to_string(),
        report_time: now,
        shift_start,
        opening_cash,
        petty_cash_in: totals.petty_cash_in,
        petty_cash_out: totals.petty_cash_out,
        cash_sales: totals.cash_sales,
        card_sales: totals.card_sales,
        sales_total: totals.sales_total()?,
        expected_cash: totals.expected_cash(opening_cash)?,
        cash_payment_count: totals.cash_payment_count,
        card_payment_count: totals.card_payment_count,
        adjustment_count: totals.adjustment_count,
        closing: None,
    })
}
