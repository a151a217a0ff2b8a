//! Shift lifecycle for a single till.
//!
//! A `ShiftSession` moves `NotStarted -> Open -> Closed` exactly once and owns
//! the ledger of everything recorded while it was open. Closing is a single
//! transition whether the counted cash was typed in directly or summed from a
//! blind denomination count. A closed session is never reopened; the next
//! shift is a new session.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::denominations::{DenominationCounter, DenominationLine};
use crate::error::{ensure_non_negative, Result, TillError};
use crate::ledger::{AdjustmentType, CashAdjustment, Ledger, PaymentRecord, PaymentSubmission};
use crate::reconciliation::{closing_difference, LedgerTotals};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    NotStarted,
    Open,
    Closed,
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

/// How the closing cash figure was obtained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClosingMethod {
    Direct,
    BlindCount { breakdown: Vec<DenominationLine> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSession {
    id: String,
    status: ShiftStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    opening_cash: Option<i64>,
    closing_cash: Option<i64>,
    closing_method: Option<ClosingMethod>,
    #[serde(default)]
    ledger: Ledger,
}

impl Default for ShiftSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ShiftSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: ShiftStatus::NotStarted,
            start_time: None,
            end_time: None,
            opening_cash: None,
            closing_cash: None,
            closing_method: None,
            ledger: Ledger::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> ShiftStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn opening_cash(&self) -> Option<i64> {
        self.opening_cash
    }

    pub fn closing_cash(&self) -> Option<i64> {
        self.closing_cash
    }

    pub fn closing_method(&self) -> Option<&ClosingMethod> {
        self.closing_method.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Elapsed shift time: up to `now` while open, up to close afterwards.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = match (self.status, self.start_time, self.end_time) {
            (ShiftStatus::Open, Some(start), _) => now - start,
            (ShiftStatus::Closed, Some(start), Some(end)) => end - start,
            _ => Duration::zero(),
        };
        elapsed.max(Duration::zero())
    }

    pub fn open(&mut self, opening_cash: i64, now: DateTime<Utc>) -> Result<()> {
        if self.status != ShiftStatus::NotStarted {
            return Err(TillError::InvalidTransition {
                action: "open",
                from: self.status,
            });
        }
        ensure_non_negative("Opening cash", opening_cash)?;

        self.ledger = Ledger::new();
        self.start_time = Some(now);
        self.opening_cash = Some(opening_cash);
        self.status = ShiftStatus::Open;

        info!(shift_id = %self.id, opening_cash, "Shift opened");
        Ok(())
    }

    /// Close with a directly entered cash figure.
    pub fn close(&mut self, closing_cash: i64, now: DateTime<Utc>) -> Result<()> {
        self.finish(closing_cash, ClosingMethod::Direct, now)
    }

    /// Close with the total of a blind count; the breakdown is kept for the Z report.
    pub fn close_counted(&mut self, counter: &DenominationCounter, now: DateTime<Utc>) -> Result<()> {
        let breakdown = counter.breakdown();
        self.finish(
            counter.total(),
            ClosingMethod::BlindCount { breakdown },
            now,
        )
    }

    pub fn record_payment(&mut self, submission: PaymentSubmission) -> Result<&PaymentRecord> {
        self.ensure_open()?;
        self.ensure_totals_in_range(submission.amount, |totals| {
            totals.add_payment(submission.method, submission.amount)
        })?;
        self.ledger.append_payment(submission)
    }

    pub fn record_adjustment(
        &mut self,
        adjustment_type: AdjustmentType,
        amount: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<&CashAdjustment> {
        self.ensure_open()?;
        self.ensure_totals_in_range(amount, |totals| {
            totals.add_adjustment(adjustment_type, amount)
        })?;
        self.ledger
            .append_adjustment(adjustment_type, amount, reason, now)
    }

    fn finish(
        &mut self,
        closing_cash: i64,
        method: ClosingMethod,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != ShiftStatus::Open {
            return Err(TillError::InvalidTransition {
                action: "close",
                from: self.status,
            });
        }
        ensure_non_negative("Closing cash", closing_cash)?;
        let expected = LedgerTotals::from_ledger(&self.ledger)?
            .expected_cash(self.opening_cash.unwrap_or_default())?;
        closing_difference(closing_cash, expected)?;

        // closing cash, end time and status change together
        self.closing_cash = Some(closing_cash);
        self.end_time = Some(now);
        self.closing_method = Some(method);
        self.status = ShiftStatus::Closed;

        info!(
            shift_id = %self.id,
            closing_cash,
            blind_count = matches!(self.closing_method, Some(ClosingMethod::BlindCount { .. })),
            "Shift closed"
        );
        Ok(())
    }

    /// Every report figure must stay representable once the entry is added.
    /// Non-positive amounts are left to the ledger's own validation.
    fn ensure_totals_in_range(
        &self,
        amount: i64,
        add: impl FnOnce(&mut LedgerTotals) -> Result<()>,
    ) -> Result<()> {
        if amount <= 0 {
            return Ok(());
        }
        let mut totals = LedgerTotals::from_ledger(&self.ledger)?;
        add(&mut totals)?;
        totals.sales_total()?;
        totals.expected_cash(self.opening_cash.unwrap_or_default())?;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.status != ShiftStatus::Open {
            return Err(TillError::ShiftNotOpen(self.status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PaymentMethod;
    use chrono::TimeZone;

    fn nine_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 9, 0, 0).unwrap()
    }

    fn cash_sale(order: &str, amount: i64) -> PaymentSubmission {
        PaymentSubmission {
            order_reference: order.to_string(),
            amount,
            method: PaymentMethod::Cash,
            time: nine_am(),
        }
    }

    #[test]
    fn lifecycle_not_started_open_closed() {
        let mut shift = ShiftSession::new();
        assert_eq!(shift.status(), ShiftStatus::NotStarted);

        shift.open(500_000, nine_am()).unwrap();
        assert!(shift.is_open());
        assert_eq!(shift.opening_cash(), Some(500_000));
        assert_eq!(shift.start_time(), Some(nine_am()));
        assert_eq!(shift.end_time(), None);

        let five_pm = nine_am() + Duration::hours(8);
        shift.close(760_000, five_pm).unwrap();
        assert_eq!(shift.status(), ShiftStatus::Closed);
        assert_eq!(shift.closing_cash(), Some(760_000));
        assert_eq!(shift.end_time(), Some(five_pm));
        assert_eq!(shift.closing_method(), Some(&ClosingMethod::Direct));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut shift = ShiftSession::new();
        assert_eq!(
            shift.close(0, nine_am()).unwrap_err(),
            TillError::InvalidTransition {
                action: "close",
                from: ShiftStatus::NotStarted
            }
        );

        shift.open(0, nine_am()).unwrap();
        assert!(matches!(
            shift.open(10, nine_am()),
            Err(TillError::InvalidTransition { action: "open", .. })
        ));

        shift.close(0, nine_am()).unwrap();
        assert!(matches!(
            shift.open(10, nine_am()),
            Err(TillError::InvalidTransition { .. })
        ));
        assert!(matches!(
            shift.close(10, nine_am()),
            Err(TillError::InvalidTransition { .. })
        ));
        assert_eq!(shift.closing_cash(), Some(0));
    }

    #[test]
    fn negative_cash_figures_are_rejected() {
        let mut shift = ShiftSession::new();
        assert!(matches!(
            shift.open(-1, nine_am()),
            Err(TillError::InvalidAmount { .. })
        ));
        assert_eq!(shift.status(), ShiftStatus::NotStarted);

        shift.open(100, nine_am()).unwrap();
        assert!(matches!(
            shift.close(-100, nine_am()),
            Err(TillError::InvalidAmount { .. })
        ));
        assert!(shift.is_open());
        assert_eq!(shift.end_time(), None);
        assert_eq!(shift.closing_cash(), None);
    }

    #[test]
    fn ledger_only_accepts_entries_while_open() {
        let mut shift = ShiftSession::new();
        assert_eq!(
            shift.record_payment(cash_sale("A", 10)).unwrap_err(),
            TillError::ShiftNotOpen(ShiftStatus::NotStarted)
        );

        shift.open(0, nine_am()).unwrap();
        shift.record_payment(cash_sale("A", 10)).unwrap();
        shift
            .record_adjustment(AdjustmentType::In, 5, "float", nine_am())
            .unwrap();
        shift.close(15, nine_am()).unwrap();

        assert_eq!(
            shift
                .record_adjustment(AdjustmentType::Out, 5, "late", nine_am())
                .unwrap_err(),
            TillError::ShiftNotOpen(ShiftStatus::Closed)
        );
        assert_eq!(shift.ledger().len(), 2);
    }

    #[test]
    fn blind_count_close_keeps_breakdown() {
        let mut shift = ShiftSession::new();
        shift.open(0, nine_am()).unwrap();

        let mut counter = DenominationCounter::default();
        counter.set_count(500_000, 1).unwrap();
        counter.set_count(200_000, 1).unwrap();
        counter.set_count(100_000, 1).unwrap();
        shift.close_counted(&counter, nine_am()).unwrap();

        assert_eq!(shift.closing_cash(), Some(800_000));
        match shift.closing_method() {
            Some(ClosingMethod::BlindCount { breakdown }) => assert_eq!(breakdown.len(), 3),
            other => panic!("unexpected closing method {other:?}"),
        }
    }

    #[test]
    fn duration_tracks_open_and_closed_shift() {
        let mut shift = ShiftSession::new();
        assert_eq!(shift.duration(nine_am()), Duration::zero());

        shift.open(0, nine_am()).unwrap();
        assert_eq!(
            shift.duration(nine_am() + Duration::minutes(45)),
            Duration::minutes(45)
        );
        // clock went backwards
        assert_eq!(
            shift.duration(nine_am() - Duration::minutes(5)),
            Duration::zero()
        );

        shift.close(0, nine_am() + Duration::hours(2)).unwrap();
        assert_eq!(
            shift.duration(nine_am() + Duration::hours(10)),
            Duration::hours(2)
        );
    }

    #[test]
    fn close_before_start_clamps_duration() {
        let mut shift = ShiftSession::new();
        shift.open(0, nine_am()).unwrap();
        shift.close(0, nine_am() - Duration::minutes(1)).unwrap();
        assert_eq!(shift.duration(nine_am()), Duration::zero());
    }

    #[test]
    fn snapshot_survives_json() {
        let mut shift = ShiftSession::new();
        shift.open(500_000, nine_am()).unwrap();
        shift.record_payment(cash_sale("ORD-1", 25_000)).unwrap();

        let json = serde_json::to_string(&shift).unwrap();
        let restored: ShiftSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, shift);
    }

    #[test]
    fn entries_that_would_overflow_totals_are_rejected() {
        let half = i64::MAX / 2 + 1;
        let mut shift = ShiftSession::new();
        shift.open(0, nine_am()).unwrap();
        shift.record_payment(cash_sale("BIG-1", half)).unwrap();

        assert!(matches!(
            shift.record_payment(cash_sale("BIG-2", half)),
            Err(TillError::InvalidAmount { value, .. }) if value == half
        ));
        assert!(matches!(
            shift.record_adjustment(AdjustmentType::In, half, "float", nine_am()),
            Err(TillError::InvalidAmount { .. })
        ));
        assert_eq!(shift.ledger().len(), 1);

        let report = crate::reconciliation::interim_report(&shift, nine_am()).unwrap();
        assert_eq!(report.expected_cash, half);
    }

    #[test]
    fn closing_figure_must_leave_a_representable_difference() {
        let mut shift = ShiftSession::new();
        shift.open(0, nine_am()).unwrap();
        shift
            .record_adjustment(AdjustmentType::Out, 10, "change run", nine_am())
            .unwrap();

        assert!(matches!(
            shift.close(i64::MAX, nine_am()),
            Err(TillError::InvalidAmount { .. })
        ));
        assert!(shift.is_open());

        shift.close(1_000, nine_am()).unwrap();
        let z = crate::reconciliation::closing_report(&shift, nine_am()).unwrap();
        assert_eq!(z.closing.unwrap().difference, 1_010);
    }

    #[test]
    fn huge_negative_adjustment_reports_the_sign_error() {
        let mut shift = ShiftSession::new();
        shift.open(1, nine_am()).unwrap();
        assert_eq!(
            shift
                .record_adjustment(AdjustmentType::Out, i64::MIN, "x", nine_am())
                .unwrap_err(),
            TillError::InvalidAmount {
                field: "Adjustment amount",
                requirement: "greater than zero",
                value: i64::MIN,
            }
        );
    }
}
