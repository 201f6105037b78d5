//! Numeric and token helpers for attribute and element text.
//!
//! Values are deliberately lenient: [`parse_unsigned`] never fails, it yields
//! whatever prefix of the token converts (possibly zero). Range checks are the
//! caller's job.

use std::cmp::Ordering;

use crate::codec::CodecError;

/// Parse a decimal or hexadecimal unsigned integer.
///
/// The token is read as hexadecimal if it contains an `x` or `X` anywhere,
/// so `"0x10"` and `"10x"` both yield 16. Otherwise it is decimal. Leading
/// whitespace and an optional sign are skipped, conversion stops at the first
/// character that is not a digit of the base, and overflow saturates at
/// `u32::MAX`. A leading `-` negates with wrap-around.
pub fn parse_unsigned(text: &str) -> u32 {
    let hex = text.contains(['x', 'X']);
    let mut rest = text.trim_start();

    let negative = match rest.as_bytes().first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let radix = if hex {
        if let Some(stripped) = rest
            .strip_prefix("0x")
            .or_else(|| rest.strip_prefix("0X"))
        {
            // "0x" with no digit after it converts as a plain "0".
            if stripped.starts_with(|c: char| c.is_ascii_hexdigit()) {
                rest = stripped;
            }
        }
        16
    } else {
        10
    };

    let mut value: u32 = 0;
    for c in rest.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        value = value
            .checked_mul(radix)
            .and_then(|v| v.checked_add(digit))
            .unwrap_or(u32::MAX);
        if value == u32::MAX {
            break;
        }
    }

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Compare two optional strings ignoring ASCII case.
///
/// `None` sorts before any string.
pub fn compare_ignore_case(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a
            .bytes()
            .map(|c| c.to_ascii_lowercase())
            .cmp(b.bytes().map(|c| c.to_ascii_lowercase())),
    }
}

pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    compare_ignore_case(Some(a), Some(b)) == Ordering::Equal
}

/// Parse a `true`/`false` token, ignoring case.
pub fn parse_bool(text: &str) -> Result<bool, CodecError> {
    if eq_ignore_case(text, "true") {
        Ok(true)
    } else if eq_ignore_case(text, "false") {
        Ok(false)
    } else {
        Err(CodecError::InvalidBoolean(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_and_hex_literals() {
        assert_eq!(parse_unsigned("10"), 10);
        assert_eq!(parse_unsigned("0x10"), 16);
        assert_eq!(parse_unsigned("0X1a"), 0x1A);
        assert_eq!(parse_unsigned("  200"), 200);
    }

    #[test]
    fn x_anywhere_selects_hex() {
        // A trailing or embedded x still switches the whole token to base 16.
        assert_eq!(parse_unsigned("10x"), 16);
        assert_eq!(parse_unsigned("1A0x"), 0x1A0);
        assert_eq!(parse_unsigned("x"), 0);
    }

    #[test]
    fn lenient_conversion() {
        assert_eq!(parse_unsigned(""), 0);
        assert_eq!(parse_unsigned("abc"), 0);
        assert_eq!(parse_unsigned("12abc"), 12);
        assert_eq!(parse_unsigned("99999999999999"), u32::MAX);
        assert_eq!(parse_unsigned("-1"), u32::MAX);
        assert_eq!(parse_unsigned("-0"), 0);
    }

    #[test]
    fn case_insensitive_ordering() {
        assert_eq!(compare_ignore_case(Some("ROW"), Some("row")), Ordering::Equal);
        assert_eq!(compare_ignore_case(Some("abc"), Some("ABD")), Ordering::Less);
        assert_eq!(compare_ignore_case(Some("b"), Some("A")), Ordering::Greater);
        assert_eq!(compare_ignore_case(None, Some("a")), Ordering::Less);
        assert_eq!(compare_ignore_case(Some("a"), None), Ordering::Greater);
        assert_eq!(compare_ignore_case(None, None), Ordering::Equal);
        // A prefix is not equal.
        assert!(!eq_ignore_case("row", "rows"));
    }

    #[test]
    fn boolean_tokens() {
        assert!(parse_bool("TRUE").expect("true"));
        assert!(!parse_bool("False").expect("false"));
        assert!(matches!(
            parse_bool("yes"),
            Err(CodecError::InvalidBoolean(_))
        ));
    }
}
