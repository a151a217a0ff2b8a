//! Till configuration kept in `local_settings` (category `till`).
//!
//! Missing keys fall back to defaults; unparsable values are logged and
//! ignored so a bad setting never blocks opening the till.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db;
use crate::denominations::{normalize_catalog, DenominationCounter, DEFAULT_DENOMINATIONS};
use crate::error::{Result, TillError};
use crate::money::CurrencyFormat;

pub(crate) const SETTINGS_CATEGORY: &str = "till";

const KEY_STORE_NAME: &str = "store_name";
const KEY_TERMINAL_ID: &str = "terminal_id";
const KEY_CURRENCY: &str = "currency";
const KEY_DENOMINATIONS: &str = "denominations";
const KEY_UTC_OFFSET: &str = "utc_offset_minutes";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TillSettings {
    pub store_name: String,
    pub terminal_id: String,
    pub currency: CurrencyFormat,
    pub denominations: Vec<i64>,
    pub utc_offset_minutes: i32,
}

impl Default for TillSettings {
    fn default() -> Self {
        Self {
            store_name: "The Small".to_string(),
            terminal_id: "till-1".to_string(),
            currency: CurrencyFormat::default(),
            denominations: DEFAULT_DENOMINATIONS.to_vec(),
            utc_offset_minutes: 7 * 60,
        }
    }
}

impl TillSettings {
    pub fn load(conn: &Connection) -> Self {
        let mut settings = Self::default();

        if let Some(name) = non_blank(db::get_setting(conn, SETTINGS_CATEGORY, KEY_STORE_NAME)) {
            settings.store_name = name;
        }
        if let Some(id) = non_blank(db::get_setting(conn, SETTINGS_CATEGORY, KEY_TERMINAL_ID)) {
            settings.terminal_id = id;
        }
        if let Some(raw) = db::get_setting(conn, SETTINGS_CATEGORY, KEY_CURRENCY) {
            match serde_json::from_str::<CurrencyFormat>(&raw) {
                Ok(currency) => settings.currency = currency,
                Err(e) => warn!(key = KEY_CURRENCY, error = %e, "ignoring unparsable setting"),
            }
        }
        if let Some(raw) = db::get_setting(conn, SETTINGS_CATEGORY, KEY_DENOMINATIONS) {
            match serde_json::from_str::<Vec<i64>>(&raw) {
                Ok(faces) if !normalize_catalog(&faces).is_empty() => {
                    settings.denominations = normalize_catalog(&faces);
                }
                Ok(_) => warn!(key = KEY_DENOMINATIONS, "denomination catalog has no positive values"),
                Err(e) => warn!(key = KEY_DENOMINATIONS, error = %e, "ignoring unparsable setting"),
            }
        }
        if let Some(raw) = db::get_setting(conn, SETTINGS_CATEGORY, KEY_UTC_OFFSET) {
            match raw.trim().parse::<i32>() {
                Ok(minutes) if minutes.abs() < 24 * 60 => settings.utc_offset_minutes = minutes,
                _ => warn!(key = KEY_UTC_OFFSET, value = %raw, "ignoring invalid UTC offset"),
            }
        }

        settings
    }

    pub fn save(&self, conn: &Connection) -> Result<()> {
        let currency = serde_json::to_string(&self.currency)
            .map_err(|e| TillError::Storage(format!("encode currency: {e}")))?;
        let denominations = serde_json::to_string(&normalize_catalog(&self.denominations))
            .map_err(|e| TillError::Storage(format!("encode denominations: {e}")))?;

        db::set_setting(conn, SETTINGS_CATEGORY, KEY_STORE_NAME, &self.store_name)?;
        db::set_setting(conn, SETTINGS_CATEGORY, KEY_TERMINAL_ID, &self.terminal_id)?;
        db::set_setting(conn, SETTINGS_CATEGORY, KEY_CURRENCY, &currency)?;
        db::set_setting(conn, SETTINGS_CATEGORY, KEY_DENOMINATIONS, &denominations)?;
        db::set_setting(
            conn,
            SETTINGS_CATEGORY,
            KEY_UTC_OFFSET,
            &self.utc_offset_minutes.to_string(),
        )?;
        Ok(())
    }

    /// A zeroed counter over the configured catalog.
    pub fn denomination_counter(&self) -> DenominationCounter {
        DenominationCounter::new(&self.denominations)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
