pub mod atm;

/// Mark price at which a short leg's stop fires.
pub fn stop_trigger_price(mark_price: f64, multiplier: f64) -> f64 {
    mark_price * multiplier
}

/// Shortest decimal that round-trips the price, always with a fractional part
/// (`150.0`, `515.375`). This is the form the exchange takes for `stop_price`.
pub fn format_price(price: f64) -> String {
    let rendered = price.to_string();
    if rendered.contains('.') || !price.is_finite() {
        rendered
    } else {
        format!("{}.0", rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_trigger_is_25_percent_above_mark() {
        assert_eq!(format_price(stop_trigger_price(120.0, 1.25)), "150.0");
        assert_eq!(format_price(stop_trigger_price(412.3, 1.25)), "515.375");
    }

    #[test]
    fn test_each_leg_uses_its_own_mark() {
        let call = format_price(stop_trigger_price(120.0, 1.25));
        let put = format_price(stop_trigger_price(80.0, 1.25));
        assert_eq!(call, "150.0");
        assert_eq!(put, "100.0");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.5), "0.5");
        assert_eq!(format_price(67000.0), "67000.0");
    }
}
