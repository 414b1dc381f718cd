//! User-facing text for execution results and position listings.

use crate::domain::{ContractType, PositionRecord};

pub const RISK_WARNING: &str =
    "⚠️ WARNING: This is a high-risk strategy with unlimited loss potential!";

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━";

/// Dollar amount with thousands separators, e.g. `format_usd(67012.5, 2)` is `$67,012.50`.
pub fn format_usd(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}${}.{}", sign, grouped, frac),
        None => format!("{}${}", sign, grouped),
    }
}

pub fn executed_summary(record: &PositionRecord) -> String {
    let missing = missing_stops(record);
    let (headline, protection) = if missing.is_empty() {
        (
            "✅ Short Straddle Executed Successfully!".to_string(),
            "🛡️ Stop Loss Orders Placed".to_string(),
        )
    } else {
        (
            "✅ Short Straddle Executed (stop-loss incomplete)".to_string(),
            format!(
                "⚠️ Stop loss NOT placed for: {}. Position is not fully protected!",
                join_legs(&missing)
            ),
        )
    };

    format!(
        "{}\n\n\
         📊 Strike Price: {}\n\
         💰 Premium Collected: ~{}\n\
         📞 Call Order ID: {}\n\
         📞 Put Order ID: {}\n\
         {}\n\
         ⏰ Expiry: {}\n\n\
         {}",
        headline,
        format_usd(record.strike(), 0),
        format_usd(record.premium_collected, 2),
        record.call_order_id,
        record.put_order_id,
        protection,
        record.expiry_date,
        RISK_WARNING
    )
}

/// Open order note appended when a sell went through but the straddle did not.
pub fn open_leg_warning(order_id: &str) -> String {
    format!(
        "⚠️ Call order {} was filled and remains open without a stop-loss. Close it manually.",
        order_id
    )
}

pub fn render_positions(positions: &[(String, PositionRecord)]) -> String {
    if positions.is_empty() {
        return "📊 No active positions found.".to_string();
    }

    let mut text = String::from("📊 Active Positions:\n\n");
    for (_, record) in positions {
        text.push_str(&format!(
            "🎯 Strike: {}\n💰 Premium: {}\n⏰ Time: {}\n",
            format_usd(record.strike(), 0),
            format_usd(record.premium_collected, 2),
            record.created_at.format("%Y-%m-%dT%H:%M:%S"),
        ));
        if !record.fully_protected() {
            text.push_str("⚠️ Stop loss incomplete\n");
        }
        text.push_str(DIVIDER);
        text.push('\n');
    }
    text
}

fn missing_stops(record: &PositionRecord) -> Vec<ContractType> {
    let mut missing = Vec::new();
    if record.call_stop_order_id.is_none() {
        missing.push(ContractType::Call);
    }
    if record.put_stop_order_id.is_none() {
        missing.push(ContractType::Put);
    }
    missing
}

pub fn join_legs(legs: &[ContractType]) -> String {
    legs.iter()
        .map(|leg| leg.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Instrument;
    use chrono::{TimeZone, Utc};

    fn record(call_stop: Option<&str>, put_stop: Option<&str>) -> PositionRecord {
        let leg = |kind: ContractType, product_id: u64, mark_price: f64| Instrument {
            symbol: format!("{}-BTC-67000-181026", if kind == ContractType::Call { "C" } else { "P" }),
            strike_price: 67000.0,
            contract_type: kind,
            product_id,
            mark_price,
        };
        PositionRecord {
            session_id: "42".into(),
            call: leg(ContractType::Call, 101, 412.3),
            put: leg(ContractType::Put, 102, 388.1),
            call_order_id: "9001".into(),
            put_order_id: "9002".into(),
            call_stop_order_id: call_stop.map(String::from),
            put_stop_order_id: put_stop.map(String::from),
            premium_collected: 800.4,
            expiry_date: "18-10-2026".into(),
            needs_reconciliation: call_stop.is_none() || put_stop.is_none(),
            created_at: Utc.with_ymd_and_hms(2026, 10, 18, 9, 15, 42).unwrap(),
        }
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(67012.5, 2), "$67,012.50");
        assert_eq!(format_usd(67000.0, 0), "$67,000");
        assert_eq!(format_usd(999.0, 0), "$999");
        assert_eq!(format_usd(1234567.891, 2), "$1,234,567.89");
        assert_eq!(format_usd(0.0, 2), "$0.00");
        assert_eq!(format_usd(-1500.0, 0), "-$1,500");
    }

    #[test]
    fn test_full_summary_claims_protection() {
        let text = executed_summary(&record(Some("9003"), Some("9004")));
        assert!(text.starts_with("✅ Short Straddle Executed Successfully!"));
        assert!(text.contains("📊 Strike Price: $67,000"));
        assert!(text.contains("💰 Premium Collected: ~$800.40"));
        assert!(text.contains("📞 Call Order ID: 9001"));
        assert!(text.contains("📞 Put Order ID: 9002"));
        assert!(text.contains("🛡️ Stop Loss Orders Placed"));
        assert!(text.contains("⏰ Expiry: 18-10-2026"));
        assert!(text.ends_with(RISK_WARNING));
    }

    #[test]
    fn test_partial_summary_does_not_claim_protection() {
        let text = executed_summary(&record(Some("9003"), None));
        assert!(text.starts_with("✅"));
        assert!(!text.contains("Stop Loss Orders Placed"));
        assert!(text.contains("Stop loss NOT placed for: put"));
        assert!(text.contains(RISK_WARNING));
    }

    #[test]
    fn test_render_positions() {
        assert_eq!(render_positions(&[]), "📊 No active positions found.");

        let text = render_positions(&[("42_1792314942".into(), record(None, None))]);
        assert!(text.starts_with("📊 Active Positions:"));
        assert!(text.contains("🎯 Strike: $67,000"));
        assert!(text.contains("💰 Premium: $800.40"));
        assert!(text.contains("⏰ Time: 2026-10-18T09:15:42"));
        assert!(text.contains("⚠️ Stop loss incomplete"));
        assert!(text.contains(DIVIDER));
    }
}
