use serde::Deserialize;
use tracing::info;

use super::{parse_payload, to_json, TillState};
use crate::reconciliation::ReportType;
use crate::report_text;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportPrintPayload {
    #[serde(default, alias = "report_type", alias = "type")]
    report_type: Option<String>,
}

fn parse_report_type(raw: Option<&str>) -> Result<ReportType, String> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("interim") | Some("x") | Some("x-report") => Ok(ReportType::Interim),
        Some("closing") | Some("z") | Some("z-report") => Ok(ReportType::Closing),
        Some(other) => Err(format!("Unsupported report type: {other}")),
    }
}

/// X-report: figures so far for the open shift.
pub fn report_interim(state: &TillState) -> Result<serde_json::Value, String> {
    let till = state.lock()?;
    let report = till.interim_report().map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "success": true,
        "report": to_json(&report)?,
    }))
}

/// Z-report: final figures for the closed shift. Regenerating it returns the same figures.
pub fn report_closing(state: &TillState) -> Result<serde_json::Value, String> {
    let till = state.lock()?;
    let report = till.closing_report().map_err(|e| e.to_string())?;
    Ok(serde_json::json!({
        "success": true,
        "report": to_json(&report)?,
    }))
}

pub fn report_print(
    state: &TillState,
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload: ReportPrintPayload = parse_payload(arg0, "reportType", "report print payload")?;
    let report_type = parse_report_type(payload.report_type.as_deref())?;

    let till = state.lock()?;
    let report = match report_type {
        ReportType::Interim => till.interim_report(),
        ReportType::Closing => till.closing_report(),
    }
    .map_err(|e| e.to_string())?;
    let text = report_text::render(&report, till.settings());

    info!(
        shift_id = %report.shift_id,
        report = report_type.label(),
        lines = text.lines().count(),
        "Report rendered for printing"
    );
    Ok(serde_json::json!({
        "success": true,
        "reportType": report_type,
        "text": text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::shifts::{payment_record, shift_close, shift_open, shift_status};
    use crate::commands::test_support::test_state;
    use serde_json::json;

    #[test]
    fn interim_then_closing() {
        let (state, clock) = test_state();
        assert!(report_interim(&state)
            .unwrap_err()
            .contains("Shift is not open"));

        shift_open(&state, Some(json!(100_000))).unwrap();
        payment_record(
            &state,
            Some(json!({ "orderReference": "A", "amount": 30_000, "method": "cash" })),
        )
        .unwrap();

        let x = report_interim(&state).unwrap();
        assert_eq!(x["report"]["reportType"], "interim");
        assert_eq!(x["report"]["expectedCash"], 130_000);
        assert!(x["report"].get("difference").is_none());
        assert!(report_closing(&state).unwrap_err().contains("must be closed"));

        clock.advance(chrono::Duration::hours(2));
        shift_close(&state, Some(json!({ "closingCash": 125_000 }))).unwrap();

        let z1 = report_closing(&state).unwrap();
        assert_eq!(z1["report"]["difference"], -5_000);
        assert_eq!(z1["report"]["closingCash"], 125_000);
        let z2 = report_closing(&state).unwrap();
        assert_eq!(z1, z2);
    }

    #[test]
    fn print_renders_requested_report() {
        let (state, clock) = test_state();
        shift_open(&state, Some(json!(0))).unwrap();

        let x = report_print(&state, None).unwrap();
        assert_eq!(x["reportType"], "interim");
        assert!(x["text"].as_str().unwrap().contains("X-REPORT"));

        assert!(report_print(&state, Some(json!("closing"))).is_err());
        clock.advance(chrono::Duration::minutes(30));
        shift_close(&state, Some(json!(0))).unwrap();

        let z = report_print(&state, Some(json!({ "type": "Z" }))).unwrap();
        let text = z["text"].as_str().unwrap();
        assert!(text.contains("Z-REPORT"));
        assert!(text.contains("BALANCED"));
    }

    #[test]
    fn report_type_names() {
        assert_eq!(parse_report_type(Some("X-Report")), Ok(ReportType::Interim));
        assert_eq!(parse_report_type(Some(" closing ")), Ok(ReportType::Closing));
        assert!(parse_report_type(Some("weekly")).is_err());
    }

    #[test]
    fn huge_payments_do_not_break_the_till() {
        let (state, _clock) = test_state();
        shift_open(&state, Some(json!(0))).unwrap();
        let half = i64::MAX / 2 + 1;

        payment_record(
            &state,
            Some(json!({ "orderReference": "BIG-1", "amount": half, "method": "cash" })),
        )
        .unwrap();
        let err = payment_record(
            &state,
            Some(json!({ "orderReference": "BIG-2", "amount": half, "method": "cash" })),
        )
        .unwrap_err();
        assert!(err.contains("shift totals in range"));

        let x = report_interim(&state).unwrap();
        assert_eq!(x["report"]["expectedCash"], half);
        assert_eq!(
            shift_status(&state).unwrap()["paymentCount"],
            1
        );
    }
}
