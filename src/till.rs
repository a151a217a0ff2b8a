//! The till: one shift session plus the ports it needs.
//!
//! Every mutation runs against a copy of the session, is saved through the
//! store, and only then replaces the live session. A rejected operation or a
//! failed save leaves both the live session and the stored snapshot as they
//! were.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::denominations::DenominationCounter;
use crate::error::{Result, TillError};
use crate::ledger::{AdjustmentType, CashAdjustment, PaymentRecord, PaymentSubmission};
use crate::reconciliation::{self, ReconciliationReport};
use crate::settings::TillSettings;
use crate::shifts::{ShiftSession, ShiftStatus};
use crate::store::ShiftStore;

pub struct Till {
    session: ShiftSession,
    store: Box<dyn ShiftStore>,
    clock: Arc<dyn Clock>,
    settings: TillSettings,
}

impl Till {
    /// Restore the last saved session, or start with a session that has not been opened.
    pub fn new(
        store: Box<dyn ShiftStore>,
        clock: Arc<dyn Clock>,
        settings: TillSettings,
    ) -> Result<Self> {
        let session = match store.load()? {
            Some(session) => {
                info!(
                    shift_id = %session.id(),
                    status = %session.status(),
                    entries = session.ledger().len(),
                    "Restored shift session"
                );
                session
            }
            None => ShiftSession::new(),
        };
        Ok(Self {
            session,
            store,
            clock,
            settings,
        })
    }

    pub fn session(&self) -> &ShiftSession {
        &self.session
    }

    pub fn settings(&self) -> &TillSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    pub fn duration(&self) -> Duration {
        self.session.duration(self.clock.now())
    }

    /// Open a shift. After a closed shift this starts a new, empty session.
    pub fn open_shift(&mut self, opening_cash: i64) -> Result<()> {
        let now = self.clock.now();
        self.commit("open shift", |session| {
            if session.status() == ShiftStatus::Closed {
                *session = ShiftSession::new();
            }
            session.open(opening_cash, now)
        })
    }

    pub fn close_shift(&mut self, closing_cash: i64) -> Result<()> {
        let now = self.clock.now();
        self.commit("close shift", |session| session.close(closing_cash, now))
    }

    /// A zeroed counter over the configured denominations. The shift must be open.
    pub fn begin_blind_count(&self) -> Result<DenominationCounter> {
        if !self.session.is_open() {
            return Err(TillError::ShiftNotOpen(self.session.status()));
        }
        Ok(self.settings.denomination_counter())
    }

    pub fn close_with_count(&mut self, counter: &DenominationCounter) -> Result<()> {
        let now = self.clock.now();
        self.commit("close shift by count", |session| {
            session.close_counted(counter, now)
        })
    }

    pub fn record_payment(&mut self, submission: PaymentSubmission) -> Result<PaymentRecord> {
        self.commit("record payment", |session| {
            session.record_payment(submission).cloned()
        })
    }

    pub fn record_adjustment(
        &mut self,
        adjustment_type: AdjustmentType,
        amount: i64,
        reason: &str,
    ) -> Result<CashAdjustment> {
        let now = self.clock.now();
        self.commit("record adjustment", |session| {
            session
                .record_adjustment(adjustment_type, amount, reason, now)
                .cloned()
        })
    }

    pub fn interim_report(&self) -> Result<ReconciliationReport> {
        reconciliation::interim_report(&self.session, self.clock.now())
    }

    pub fn closing_report(&self) -> Result<ReconciliationReport> {
        reconciliation::closing_report(&self.session, self.clock.now())
    }

    fn commit<T>(
        &mut self,
        operation: &'static str,
        apply: impl FnOnce(&mut ShiftSession) -> Result<T>,
    ) -> Result<T> {
        let mut next = self.session.clone();
        let out = apply(&mut next).map_err(|e| {
            warn!(operation, shift_id = %self.session.id(), error = %e, "Operation rejected");
            e
        })?;
        self.store.save(&next).map_err(|e| {
            warn!(operation, error = %e, "Failed to save shift snapshot");
            e
        })?;
        self.session = next;
        Ok(out)
    }
}
