//! Numeric formatting helpers for metadata values.

/// Format a float with up to `digits` significant digits, trimming
/// trailing zeros, matching the C `%.Ng` conversion for the values that
/// appear in statistics and no-data metadata.
pub fn fmt_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }

    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= digits as i32 {
        // Scientific notation with a trimmed mantissa.
        let formatted = format!("{:.*e}", digits.saturating_sub(1), value);
        return trim_mantissa(&formatted);
    }

    let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
    let formatted = format!("{:.*}", decimals, value);
    trim_fraction(&formatted)
}

fn trim_fraction(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn trim_mantissa(s: &str) -> String {
    match s.split_once('e') {
        Some((mantissa, exp)) => format!("{}e{}", trim_fraction(mantissa), exp),
        None => s.to_string(),
    }
}
