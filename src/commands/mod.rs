//! JSON command surface for the cashier terminal.
//!
//! Each command takes the raw payload sent by the frontend (camelCase keys,
//! snake_case aliases accepted), runs one till operation and returns a JSON
//! document. Failures come back as the user-visible error message.

use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;

use crate::error::TillError;
use crate::till::Till;

pub mod reports;
pub mod shifts;

/// Shared handle to the single till of this terminal.
pub struct TillState {
    till: Mutex<Till>,
}

impl TillState {
    pub fn new(till: Till) -> Self {
        Self {
            till: Mutex::new(till),
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Till>, String> {
        self.till.lock().map_err(|e| e.to_string())
    }
}

/// Accept either an object payload or a bare scalar for `scalar_key`.
pub(crate) fn normalize_payload(
    arg0: Option<serde_json::Value>,
    scalar_key: &str,
) -> serde_json::Value {
    match arg0 {
        Some(serde_json::Value::Object(obj)) => serde_json::Value::Object(obj),
        Some(serde_json::Value::Null) | None => serde_json::json!({}),
        Some(v) => {
            let mut obj = serde_json::Map::new();
            obj.insert(scalar_key.to_string(), v);
            serde_json::Value::Object(obj)
        }
    }
}

pub(crate) fn parse_payload<T: DeserializeOwned>(
    arg0: Option<serde_json::Value>,
    scalar_key: &str,
    what: &str,
) -> Result<T, String> {
    serde_json::from_value(normalize_payload(arg0, scalar_key))
        .map_err(|e| TillError::InvalidPayload(format!("{what}: {e}")).to_string())
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| format!("encode response: {e}"))
}
