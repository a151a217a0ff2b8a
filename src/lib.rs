//! The Small Till - cashier shift and cash reconciliation engine
//!
//! Tracks one cashier shift at a time: opening float, petty-cash movements and
//! sale payments, then reconciles the counted drawer against the expected cash
//! in X (interim) and Z (closing) reports.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod clock;
pub mod commands;
pub mod db;
pub mod denominations;
pub mod error;
pub mod ledger;
pub mod money;
pub mod reconciliation;
pub mod report_text;
pub mod settings;
pub mod shifts;
pub mod store;
pub mod till;

pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::TillState;
pub use denominations::{DenominationCounter, DenominationLine, DEFAULT_DENOMINATIONS};
pub use error::{Result, TillError};
pub use ledger::{
    AdjustmentType, CashAdjustment, Ledger, PaymentMethod, PaymentRecord, PaymentSubmission,
};
pub use money::CurrencyFormat;
pub use reconciliation::{ClosingFigures, ReconciliationReport, ReportType};
pub use settings::TillSettings;
pub use shifts::{ClosingMethod, ShiftSession, ShiftStatus};
pub use store::{MemoryShiftStore, ShiftStore, SqliteShiftStore};
pub use till::Till;

/// Install structured logging: console always, plus a daily rolling file in
/// `log_dir` when given. Keep the returned guard alive until exit so buffered
/// file output is flushed.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,the_small_till=debug"));

    let mut guard = None;
    let file_layer = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let file_appender = tracing_appender::rolling::daily(dir, "till");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);
        Some(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
    });
    let console_layer = fmt::layer().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    guard
}

/// Open the till stored under `data_dir`: database, settings and the last
/// saved shift session.
pub fn open_terminal(data_dir: &Path, clock: Arc<dyn Clock>) -> Result<TillState> {
    let db = Arc::new(db::init(data_dir)?);
    let settings = {
        let conn = db.lock()?;
        TillSettings::load(&conn)
    };
    info!(
        terminal_id = %settings.terminal_id,
        version = env!("CARGO_PKG_VERSION"),
        "Starting till"
    );
    let till = Till::new(Box::new(SqliteShiftStore::new(db)), clock, settings)?;
    Ok(TillState::new(till))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn terminal_survives_restart() {
        let dir = std::env::temp_dir().join(format!("till-{}", uuid::Uuid::new_v4()));
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 2, 16, 2, 0, 0).unwrap(),
        ));

        {
            let state = open_terminal(&dir, clock.clone()).unwrap();
            commands::shifts::shift_open(&state, Some(json!(200_000))).unwrap();
            commands::shifts::payment_record(
                &state,
                Some(json!({ "orderReference": "R-1", "amount": 45_000, "method": "cash" })),
            )
            .unwrap();
        }

        let state = open_terminal(&dir, clock).unwrap();
        let status = commands::shifts::shift_status(&state).unwrap();
        assert_eq!(status["status"], "open");
        assert_eq!(status["paymentCount"], 1);
        let x = commands::reports::report_interim(&state).unwrap();
        assert_eq!(x["report"]["expectedCash"], 245_000);

        drop(state);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn tracing_init_is_idempotent() {
        let _first = init_tracing(None);
        let _second = init_tracing(None);
    }
}
