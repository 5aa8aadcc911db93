/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use latency_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Half-ULP nudge so exact decimal midpoints round away from zero.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // `frac_str` looks like "0.50"; keep ".50".
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Fraction of `part` in `whole`, `0.0` when `whole` is zero.
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}

/// Render a fraction as a percentage with one decimal, without the `%` sign.
///
/// ```
/// use latency_core::formatting::format_rate;
///
/// assert_eq!(format_rate(0.6), "60.0");
/// assert_eq!(format_rate(1.0 / 3.0), "33.3");
/// ```
pub fn format_rate(fraction: f64) -> String {
    format!("{:.1}", fraction * 100.0)
}

/// Milliseconds rendered as seconds with one decimal, e.g. `5400.0` → `"5.4"`.
pub fn format_seconds(ms: f64) -> String {
    format!("{:.1}", ms / 1000.0)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_234_567.0, 0), "1,234,567");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_negative_rounding_to_zero_has_no_sign() {
        assert_eq!(format_number(-0.01, 0), "0");
    }

    #[test]
    fn test_format_number_rounds_up() {
        assert_eq!(format_number(1.005, 2), "1.01");
    }

    // ── ratio / format_rate ──────────────────────────────────────────────────

    #[test]
    fn test_ratio_zero_whole() {
        assert_eq!(ratio(3, 0), 0.0);
    }

    #[test]
    fn test_ratio_basic() {
        assert!((ratio(6, 10) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_format_rate_sixty_percent() {
        assert_eq!(format_rate(ratio(6, 10)), "60.0");
    }

    #[test]
    fn test_format_rate_small_fraction() {
        assert_eq!(format_rate(ratio(1, 1000)), "0.1");
    }

    // ── format_seconds ───────────────────────────────────────────────────────

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(21_000.0), "21.0");
        assert_eq!(format_seconds(5_340.0), "5.3");
    }
}
