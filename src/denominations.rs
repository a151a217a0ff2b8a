//! Blind-count helper: per-denomination counts summed into a closing total.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TillError};

/// Standard notes for the default currency, largest first.
pub const DEFAULT_DENOMINATIONS: &[i64] = &[
    500_000, 200_000, 100_000, 50_000, 20_000, 10_000, 5_000, 2_000, 1_000,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DenominationLine {
    pub face_value: i64,
    pub count: i64,
    pub subtotal: i64,
}

/// Counts for a fixed catalog of face values, each starting at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenominationCounter {
    entries: Vec<(i64, i64)>,
}

impl DenominationCounter {
    /// Non-positive and repeated face values are dropped; order is largest first.
    pub fn new(catalog: &[i64]) -> Self {
        Self {
            entries: normalize_catalog(catalog)
                .into_iter()
                .map(|face| (face, 0))
                .collect(),
        }
    }

    pub fn face_values(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.iter().map(|(face, _)| *face)
    }

    pub fn count(&self, face_value: i64) -> Option<i64> {
        self.entries
            .iter()
            .find(|(face, _)| *face == face_value)
            .map(|(_, count)| *count)
    }

    /// Set the count for a face value. Negative counts are stored as zero.
    pub fn set_count(&mut self, face_value: i64, count: i64) -> Result<()> {
        let slot = self.slot_mut(face_value)?;
        *slot = count.max(0);
        Ok(())
    }

    pub fn increment(&mut self, face_value: i64) -> Result<()> {
        let slot = self.slot_mut(face_value)?;
        *slot = slot.saturating_add(1);
        Ok(())
    }

    /// Stops at zero.
    pub fn decrement(&mut self, face_value: i64) -> Result<()> {
        let slot = self.slot_mut(face_value)?;
        *slot = (*slot - 1).max(0);
        Ok(())
    }

    pub fn total(&self) -> i64 {
        self.entries
            .iter()
            .map(|(face, count)| face.saturating_mul(*count))
            .fold(0i64, i64::saturating_add)
    }

    /// Lines with a non-zero count, largest face value first.
    pub fn breakdown(&self) -> Vec<DenominationLine> {
        self.entries
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(face, count)| DenominationLine {
                face_value: *face,
                count: *count,
                subtotal: face.saturating_mul(*count),
            })
            .collect()
    }

    fn slot_mut(&mut self, face_value: i64) -> Result<&mut i64> {
        self.entries
            .iter_mut()
            .find(|(face, _)| *face == face_value)
            .map(|(_, count)| count)
            .ok_or(TillError::InvalidAmount {
                field: "Denomination",
                requirement: "one of the configured face values",
                value: face_value,
            })
    }
}

impl Default for DenominationCounter {
    fn default() -> Self {
        Self::new(DEFAULT_DENOMINATIONS)
    }
}

pub(crate) fn normalize_catalog(catalog: &[i64]) -> Vec<i64> {
    let mut faces: Vec<i64> = catalog.iter().copied().filter(|v| *v > 0).collect();
    faces.sort_unstable_by(|a, b| b.cmp(a));
    faces.dedup();
    faces
}
