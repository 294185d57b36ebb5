//! Numeric token grammar: `[+-]? digits [. digits]? ([eE] [+-]? digits)?`,
//! where at least one digit must appear in the mantissa.

/// Parse a float token, rejecting anything outside the grammar (`inf`, `nan`, hex, ...).
/// Tokens inside the grammar whose value overflows `f32` are rejected as well.
pub(crate) fn parse_float(token: &str) -> Option<f32> {
    let bytes = token.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        mantissa_digits += i - frac_start;
    }

    if mantissa_digits == 0 {
        return None;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    if i != bytes.len() {
        return None;
    }

    token.parse::<f32>().ok().filter(|value| value.is_finite())
}

/// Parse a 1-based index token (optional sign, digits only).
pub(crate) fn parse_index(token: &str) -> Option<i64> {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_grammar() {
        assert_eq!(parse_float("1"), Some(1.0));
        assert_eq!(parse_float("-0.5"), Some(-0.5));
        assert_eq!(parse_float("+.25"), Some(0.25));
        assert_eq!(parse_float("3."), Some(3.0));
        assert_eq!(parse_float("1e3"), Some(1000.0));
        assert_eq!(parse_float("2.5E-1"), Some(0.25));
    }

    #[test]
    fn test_rejects_outside_grammar() {
        let tokens = ["", "-", ".", "e5", "1e", "1e+", "inf", "NaN", "0x10", "1.2.3", "1,5", "abc"];
        for token in tokens {
            assert_eq!(parse_float(token), None, "token {token:?}");
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert_eq!(parse_float("1e40"), None);
        assert_eq!(parse_float("-1e40"), None);
        assert_eq!(parse_float("3.4e38"), Some(3.4e38));
        assert_eq!(parse_float("1e-50"), Some(0.0));
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("12"), Some(12));
        assert_eq!(parse_index("-3"), Some(-3));
        assert_eq!(parse_index("1.0"), None);
        assert_eq!(parse_index(""), None);
        assert_eq!(parse_index("x"), None);
    }
}
