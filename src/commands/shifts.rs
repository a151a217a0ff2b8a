use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use super::{parse_payload, to_json, TillState};
use crate::ledger::{AdjustmentType, PaymentMethod, PaymentSubmission};
use crate::money::{format_amount, format_signed};
use crate::till::Till;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShiftOpenPayload {
    #[serde(alias = "opening_cash", alias = "startingAmount", alias = "starting_amount")]
    opening_cash: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShiftClosePayload {
    #[serde(alias = "closing_cash")]
    closing_cash: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DenominationCountPayload {
    #[serde(alias = "face_value", alias = "denomination")]
    face_value: i64,
    count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShiftCloseCountedPayload {
    #[serde(default)]
    counts: Vec<DenominationCountPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRecordPayload {
    #[serde(alias = "order_reference", alias = "orderId", alias = "order_id")]
    order_reference: String,
    amount: i64,
    method: String,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdjustmentRecordPayload {
    #[serde(rename = "type", alias = "adjustmentType", alias = "adjustment_type")]
    adjustment_type: String,
    amount: i64,
    #[serde(default)]
    reason: String,
}

pub fn shift_open(
    state: &TillState,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: ShiftOpenPayload = parse_payload(arg0, "openingCash", "shift open payload")?;
    let mut till = state.lock()?;
    till.open_shift(payload.opening_cash)
        .map_err(|e| e.to_string())?;

    let session = till.session();
    Ok(serde_json::json!({
        "success": true,
        "shiftId": session.id(),
        "startTime": session.start_time(),
        "message": format!(
            "Shift opened with {}",
            format_amount(payload.opening_cash, &till.settings().currency)
        ),
    }))
}

pub fn shift_close(
    state: &TillState,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: ShiftClosePayload = parse_payload(arg0, "closingCash", "shift close payload")?;
    let mut till = state.lock()?;
    till.close_shift(payload.closing_cash)
        .map_err(|e| e.to_string())?;
    closed_response(&till)
}

/// Close from a blind count: `{ counts: [{ faceValue, count }, ...] }`.
pub fn shift_close_counted(
    state: &TillState,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: ShiftCloseCountedPayload =
        parse_payload(arg0, "counts", "blind count payload")?;
    let mut till = state.lock()?;

    let mut counter = till.begin_blind_count().map_err(|e| e.to_string())?;
    for entry in &payload.counts {
        counter
            .set_count(entry.face_value, entry.count)
            .map_err(|e| e.to_string())?;
    }
    info!(
        counted_total = counter.total(),
        lines = payload.counts.len(),
        "Blind count submitted"
    );
    till.close_with_count(&counter)
        .map_err(|e| e.to_string())?;
    closed_response(&till)
}

pub fn shift_status(state: &TillState) -> Result<serde_json::Value, String> {
    let till = state.lock()?;
    let session = till.session();
    Ok(serde_json::json!({
        "shiftId": session.id(),
        "status": session.status(),
        "isOpen": session.is_open(),
        "startTime": session.start_time(),
        "endTime": session.end_time(),
        "durationMinutes": till.duration().num_minutes(),
        "openingCash": session.opening_cash(),
        "closingCash": session.closing_cash(),
        "paymentCount": session.ledger().payments().len(),
        "adjustmentCount": session.ledger().adjustments().len(),
    }))
}

/// Full ordered ledger of the current shift.
pub fn shift_ledger(state: &TillState) -> Result<serde_json::Value, String> {
    let till = state.lock()?;
    let ledger = till.session().ledger();
    Ok(serde_json::json!({
        "shiftId": till.session().id(),
        "payments": to_json(&ledger.payments())?,
        "adjustments": to_json(&ledger.adjustments())?,
    }))
}

pub fn payment_record(
    state: &TillState,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: PaymentRecordPayload =
        parse_payload(arg0, "orderReference", "payment payload")?;
    let method = PaymentMethod::parse(&payload.method)
        .ok_or_else(|| format!("Unsupported payment method: {}", payload.method))?;

    let mut till = state.lock()?;
    let time = payload.time.unwrap_or_else(|| till.now());
    let record = till
        .record_payment(PaymentSubmission {
            order_reference: payload.order_reference,
            amount: payload.amount,
            method,
            time,
        })
        .map_err(|e| e.to_string())?;

    Ok(serde_json::json!({
        "success": true,
        "payment": to_json(&record)?,
    }))
}

pub fn adjustment_record(
    state: &TillState,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: AdjustmentRecordPayload =
        parse_payload(arg0, "amount", "cash adjustment payload")?;
    let adjustment_type = AdjustmentType::parse(&payload.adjustment_type)
        .ok_or_else(|| format!("Unsupported adjustment type: {}", payload.adjustment_type))?;

    let mut till = state.lock()?;
    let adjustment = till
        .record_adjustment(adjustment_type, payload.amount, &payload.reason)
        .map_err(|e| e.to_string())?;

    Ok(serde_json::json!({
        "success": true,
        "adjustment": to_json(&adjustment)?,
        "message": format!(
            "Cash {} of {} recorded",
            adjustment_type.as_str(),
            format_amount(adjustment.amount, &till.settings().currency)
        ),
    }))
}

fn closed_response(till: &Till) -> Result<serde_json::Value, String> {
    let report = till.closing_report().map_err(|e| e.to_string())?;
    let difference = report
        .closing
        .as_ref()
        .map(|c| c.difference)
        .unwrap_or_default();
    Ok(serde_json::json!({
        "success": true,
        "shiftId": report.shift_id,
        "expected": report.expected_cash,
        "closing": till.session().closing_cash(),
        "difference": difference,
        "message": format!(
            "Shift closed. Difference: {}",
            format_signed(difference, &till.settings().currency)
        ),
    }))
}
