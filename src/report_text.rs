//! Plain-text rendering of X/Z reports for an 80mm slip (42 columns).

use crate::money::{format_amount, format_duration, format_signed, format_time};
use crate::reconciliation::ReconciliationReport;
use crate::settings::TillSettings;

pub const LINE_WIDTH: usize = 42;

/// Label for a closing difference.
pub fn variance_label(difference: i64) -> &'static str {
    match difference {
        d if d > 0 => "OVER",
        d if d < 0 => "SHORT",
        _ => "BALANCED",
    }
}

pub fn render(report: &ReconciliationReport, settings: &TillSettings) -> String {
    let currency = &settings.currency;
    let offset = settings.utc_offset_minutes;
    let amount = |value: i64| format_amount(value, currency);
    let mut out: Vec<String> = Vec::new();

    out.push(center(&settings.store_name));
    out.push(center(report.report_type.label()));
    out.push(rule());
    out.push(pair("Terminal", &settings.terminal_id));
    out.push(pair("Shift", short_id(&report.shift_id)));
    out.push(pair("Opened", &format_time(report.shift_start, offset)));
    if let Some(closing) = &report.closing {
        out.push(pair("Closed", &format_time(closing.shift_end, offset)));
        out.push(pair(
            "Duration",
            &format_duration(closing.shift_end - report.shift_start),
        ));
    }
    out.push(pair("Printed", &format_time(report.report_time, offset)));
    out.push(rule());

    out.push(pair("Opening cash", &amount(report.opening_cash)));
    out.push(pair("Petty cash in", &amount(report.petty_cash_in)));
    out.push(pair("Petty cash out", &amount(report.petty_cash_out)));
    out.push(pair(
        &format!("Cash sales ({})", report.cash_payment_count),
        &amount(report.cash_sales),
    ));
    out.push(pair(
        &format!("Card sales ({})", report.card_payment_count),
        &amount(report.card_sales),
    ));
    out.push(pair("Sales total", &amount(report.sales_total)));
    out.push(rule());
    out.push(pair("EXPECTED CASH", &amount(report.expected_cash)));

    if let Some(closing) = &report.closing {
        out.push(pair("COUNTED CASH", &amount(closing.closing_cash)));
        out.push(pair(
            &format!("DIFFERENCE ({})", variance_label(closing.difference)),
            &format_signed(closing.difference, currency),
        ));

        if let Some(lines) = &closing.denomination_breakdown {
            out.push(rule());
            out.push("Blind count".to_string());
            for line in lines {
                out.push(pair(
                    &format!("  {} x {}", amount(line.face_value), line.count),
                    &amount(line.subtotal),
                ));
            }
        }
    }
    out.push(rule());

    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn pair(label: &str, value: &str) -> String {
    let used = label.chars().count() + value.chars().count();
    let gap = LINE_WIDTH.saturating_sub(used).max(1);
    format!("{label}{}{value}", " ".repeat(gap))
}

fn center(text: &str) -> String {
    let len = text.chars().count();
    if len >= LINE_WIDTH {
        return text.to_string();
    }
    format!("{}{text}", " ".repeat((LINE_WIDTH - len) / 2))
}

fn rule() -> String {
    "-".repeat(LINE_WIDTH)
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denominations::DenominationCounter;
    use crate::ledger::{AdjustmentType, PaymentMethod, PaymentSubmission};
    use crate::reconciliation::{closing_report, interim_report};
    use crate::shifts::ShiftSession;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 2, 0, 0).unwrap()
    }

    fn busy_shift() -> ShiftSession {
        let mut shift = ShiftSession::new();
        shift.open(500_000, t0()).unwrap();
        shift
            .record_adjustment(AdjustmentType::In, 50_000, "float", t0())
            .unwrap();
        shift
            .record_adjustment(AdjustmentType::Out, 20_000, "herbs", t0())
            .unwrap();
        for (order, amount, method) in [
            ("A1", 225_000, PaymentMethod::Cash),
            ("A2", 140_000, PaymentMethod::Card),
        ] {
            shift
                .record_payment(PaymentSubmission {
                    order_reference: order.into(),
                    amount,
                    method,
                    time: t0(),
                })
                .unwrap();
        }
        shift
    }

    #[test]
    fn x_report_text() {
        let shift = busy_shift();
        let report = interim_report(&shift, t0() + Duration::hours(3)).unwrap();
        let text = render(&report, &TillSettings::default());

        assert!(text.contains("X-REPORT"));
        assert!(text.contains(&pair("Opened", "16/02/2026 09:00")));
        assert!(text.contains("Cash sales (1)"));
        assert!(text.contains(&pair("EXPECTED CASH", "755.000 ₫")));
        assert!(!text.contains("COUNTED CASH"));
        for line in text.lines() {
            assert!(line.chars().count() <= LINE_WIDTH, "line too wide: {line}");
        }
    }

    #[test]
    fn z_report_text_with_blind_count() {
        let mut shift = busy_shift();
        let mut counter = DenominationCounter::default();
        counter.set_count(500_000, 1).unwrap();
        counter.set_count(200_000, 1).unwrap();
        counter.set_count(50_000, 1).unwrap();
        counter.set_count(10_000, 1).unwrap();
        shift
            .close_counted(&counter, t0() + Duration::minutes(485))
            .unwrap();

        let report = closing_report(&shift, t0() + Duration::hours(9)).unwrap();
        let text = render(&report, &TillSettings::default());

        assert!(text.contains("Z-REPORT"));
        assert!(text.contains(&pair("Duration", "8h 05m")));
        assert!(text.contains(&pair("COUNTED CASH", "760.000 ₫")));
        assert!(text.contains(&pair("DIFFERENCE (OVER)", "+5.000 ₫")));
        assert!(text.contains(&pair("  500.000 ₫ x 1", "500.000 ₫")));
    }

    #[test]
    fn variance_labels() {
        assert_eq!(variance_label(1), "OVER");
        assert_eq!(variance_label(-1), "SHORT");
        assert_eq!(variance_label(0), "BALANCED");
    }

    #[test]
    fn long_labels_keep_a_gap() {
        let label = "x".repeat(50);
        assert_eq!(pair(&label, "1"), format!("{label} 1"));
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789"), "01234567");
    }
}
