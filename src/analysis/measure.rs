//! Measurement normalization.

/// A raw cell value before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Text(&'a str),
    Number(f64),
}

impl<'a> From<&'a str> for RawValue<'a> {
    fn from(text: &'a str) -> Self {
        RawValue::Text(text)
    }
}

impl<'a> From<&'a String> for RawValue<'a> {
    fn from(text: &'a String) -> Self {
        RawValue::Text(text.as_str())
    }
}

impl From<f64> for RawValue<'_> {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

/// Normalize a cell into a number.
///
/// Text keeps only ASCII digits and `.` before parsing, so `"1,234.5 톤"`
/// becomes `1234.5`. Nothing left after stripping is a failure, not zero.
pub fn normalize<'a>(value: impl Into<RawValue<'a>>) -> Option<f64> {
    match value.into() {
        RawValue::Number(number) => Some(number).filter(|n| n.is_finite()),
        RawValue::Text(text) => {
            let kept: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if kept.is_empty() {
                return None;
            }
            kept.parse::<f64>().ok().filter(|n| n.is_finite())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_units_and_separators() {
        assert_eq!(normalize("1,234.5 톤"), Some(1234.5));
        assert_eq!(normalize("  42 "), Some(42.0));
        assert_eq!(normalize("\"3,000\""), Some(3000.0));
    }

    #[test]
    fn test_failures_are_not_zero() {
        assert_eq!(normalize("N/A"), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("-"), None);
        assert_eq!(normalize("."), None);
        assert_eq!(normalize("1.2.3"), None);
    }

    #[test]
    fn test_numeric_pass_through() {
        assert_eq!(normalize(17.25), Some(17.25));
        assert_eq!(normalize(f64::NAN), None);
        assert_eq!(normalize(f64::INFINITY), None);
    }

    #[test]
    fn test_idempotent() {
        for text in ["1,234.5 톤", "0.001", "12345678", "007", "3.", ".5 kg"] {
            let once = normalize(text).unwrap();
            let twice = normalize(once.to_string().as_str()).unwrap();
            assert_eq!(once, twice, "{text:?}");
        }
    }
}
