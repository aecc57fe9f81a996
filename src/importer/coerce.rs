//! Defensive field coercion.
//!
//! The feed is loosely typed: numeric columns may be empty, `NA`, or carry a
//! trailing `.0`; boolean columns encode truth as the literal `1`. Absence of
//! data must never abort an otherwise-valid row, so every parse here is
//! total: failure yields `None` (or the caller's default), never an error.

/// Optional integer. Accepts plain integers and float renderings (`"12.0"`),
/// truncating toward zero like the previous importer's parseInt did.
pub fn opt_i32(value: Option<&str>) -> Option<i32> {
    let s = value?.trim();
    s.parse::<i32>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().map(|f| f as i32))
}

/// Optional float; unparseable values read as absent, never as 0.
pub fn opt_f64(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok()
}

/// Integer with a default for absent or unparseable values.
pub fn i32_or(value: Option<&str>, default: i32) -> i32 {
    opt_i32(value).unwrap_or(default)
}

/// Float with a default for absent or unparseable values.
pub fn f64_or(value: Option<&str>, default: f64) -> f64 {
    opt_f64(value).unwrap_or(default)
}

/// Non-nullable boolean: the source means true by the literal `1` (the
/// upstream cast sometimes renders it as `1.0` or `true`); everything else,
/// including absent, is false.
pub fn flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some("1") | Some("1.0") | Some("true") | Some("TRUE")
    )
}

/// Nullable boolean: absent stays absent, present values coerce per [`flag`].
pub fn opt_flag(value: Option<&str>) -> Option<bool> {
    value.map(|v| flag(Some(v)))
}

/// Owned copy of an optional string field.
pub fn opt_string(value: Option<&str>) -> Option<String> {
    value.map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_numeric_is_none_not_zero() {
        assert_eq!(opt_i32(None), None);
        assert_eq!(opt_i32(Some("")), None);
        assert_eq!(opt_f64(None), None);
    }

    #[test]
    fn garbage_numeric_is_none() {
        assert_eq!(opt_i32(Some("abc")), None);
        assert_eq!(opt_f64(Some("12,5")), None);
    }

    #[test]
    fn float_rendered_ints_truncate() {
        assert_eq!(opt_i32(Some("12.0")), Some(12));
        assert_eq!(opt_i32(Some("12.7")), Some(12));
        assert_eq!(opt_i32(Some("3")), Some(3));
    }

    #[test]
    fn defaults_apply_only_on_missing_or_bad() {
        assert_eq!(i32_or(Some("4"), 1), 4);
        assert_eq!(i32_or(Some("x"), 1), 1);
        assert_eq!(i32_or(None, 1), 1);
        assert_eq!(f64_or(Some("2.5"), 0.0), 2.5);
        assert_eq!(f64_or(None, 0.0), 0.0);
    }

    #[test]
    fn one_means_true_everything_else_false() {
        assert!(flag(Some("1")));
        assert!(flag(Some("1.0")));
        assert!(!flag(Some("0")));
        assert!(!flag(Some("")));
        assert!(!flag(Some("2")));
        assert!(!flag(None));
    }

    #[test]
    fn nullable_flag_keeps_absence() {
        assert_eq!(opt_flag(None), None);
        assert_eq!(opt_flag(Some("1")), Some(true));
        assert_eq!(opt_flag(Some("0")), Some(false));
    }
}
