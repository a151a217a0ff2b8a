//! Persistence port for the current shift session.
//!
//! The session is saved as one JSON snapshot after every successful mutation
//! and loaded once when the till starts. A snapshot that cannot be decoded is
//! reported and treated as absent rather than blocking the terminal.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::db::{self, DbState};
use crate::error::{Result, TillError};
use crate::settings::SETTINGS_CATEGORY;
use crate::shifts::ShiftSession;

const KEY_CURRENT_SESSION: &str = "current_session";

pub trait ShiftStore: Send + Sync {
    fn load(&self) -> Result<Option<ShiftSession>>;
    fn save(&self, session: &ShiftSession) -> Result<()>;
}

/// Keeps the encoded snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryShiftStore {
    snapshot: Mutex<Option<String>>,
}

impl MemoryShiftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON of the last saved snapshot.
    pub fn snapshot(&self) -> Option<String> {
        self.snapshot.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ShiftStore for MemoryShiftStore {
    fn load(&self) -> Result<Option<ShiftSession>> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|e| TillError::Storage(format!("snapshot lock poisoned: {e}")))?;
        Ok(guard.as_deref().and_then(decode_snapshot))
    }

    fn save(&self, session: &ShiftSession) -> Result<()> {
        let encoded = encode_snapshot(session)?;
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|e| TillError::Storage(format!("snapshot lock poisoned: {e}")))?;
        *guard = Some(encoded);
        Ok(())
    }
}

/// Keeps the snapshot in the local SQLite settings table.
pub struct SqliteShiftStore {
    db: Arc<DbState>,
}

impl SqliteShiftStore {
    pub fn new(db: Arc<DbState>) -> Self {
        Self { db }
    }
}

impl ShiftStore for SqliteShiftStore {
    fn load(&self) -> Result<Option<ShiftSession>> {
        let conn = self.db.lock()?;
        let raw = db::read_setting(&conn, SETTINGS_CATEGORY, KEY_CURRENT_SESSION)?;
        Ok(raw.as_deref().and_then(decode_snapshot))
    }

    fn save(&self, session: &ShiftSession) -> Result<()> {
        let encoded = encode_snapshot(session)?;
        let conn = self.db.lock()?;
        db::set_setting(&conn, SETTINGS_CATEGORY, KEY_CURRENT_SESSION, &encoded)
    }
}

impl<S: ShiftStore + ?Sized> ShiftStore for Arc<S> {
    fn load(&self) -> Result<Option<ShiftSession>> {
        (**self).load()
    }

    fn save(&self, session: &ShiftSession) -> Result<()> {
        (**self).save(session)
    }
}

fn encode_snapshot(session: &ShiftSession) -> Result<String> {
    serde_json::to_string(session)
        .map_err(|e| TillError::Storage(format!("encode shift snapshot: {e}")))
}

fn decode_snapshot(raw: &str) -> Option<ShiftSession> {
    match serde_json::from_str(raw) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(error = %e, "discarding unreadable shift snapshot");
            None
        }
    }
}
