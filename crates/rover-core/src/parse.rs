//! Small lenient value parsers used by the config codecs.
//!
//! These are deliberately lenient: booleans only look at the
//! first character and integers stop at the first non-digit.

use std::borrow::Cow;
use std::net::Ipv4Addr;

/// Parses a boolean by its first character.
///
/// `0`, `f`, `F`, `n` and `N` are false. Everything else, including an
/// empty string, is true.
pub fn parse_bool_fast(text: &str) -> bool {
    !matches!(
        text.as_bytes().first(),
        Some(b'0' | b'f' | b'F' | b'n' | b'N')
    )
}

/// Parses a leading decimal integer like `atoi`, returning 0 when none is present.
///
/// Leading whitespace and a single sign are accepted. Parsing stops at the
/// first non-digit and saturates instead of overflowing.
pub fn atoi(text: &str) -> i64 {
    let bytes = text.trim_start().as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let mut value: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Parses a dotted IPv4 address.
pub fn parse_ipv4(text: &str) -> Option<Ipv4Addr> {
    text.trim().parse().ok()
}

/// Longest accepted prefix length for a netmask given as a number.
pub const MAX_PREFIX_LEN: u32 = 30;

/// Converts a CIDR prefix length into a dotted netmask.
pub fn prefix_to_mask(prefix: u32) -> Option<Ipv4Addr> {
    match prefix {
        0 => Some(Ipv4Addr::UNSPECIFIED),
        1..=MAX_PREFIX_LEN => Some(Ipv4Addr::from(u32::MAX << (32 - prefix))),
        _ => None,
    }
}

/// Converts a netmask back into a prefix length, if it is one that
/// [`prefix_to_mask`] accepts.
pub fn mask_to_prefix(mask: Ipv4Addr) -> Option<u32> {
    let prefix = u32::from(mask).count_ones();
    (prefix_to_mask(prefix) == Some(mask)).then_some(prefix)
}

/// Parses a netmask given either as a dotted address or as a prefix length.
pub fn parse_netmask(text: &str) -> Option<Ipv4Addr> {
    if text.contains('.') {
        return parse_ipv4(text);
    }
    let prefix = atoi(text);
    u32::try_from(prefix).ok().and_then(prefix_to_mask)
}

/// Decodes JSON string escapes in a raw token slice.
///
/// Invalid escapes are kept verbatim; the tokenizer already rejects them
/// in well-formed input.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_fast() {
        assert!(!parse_bool_fast("0"));
        assert!(!parse_bool_fast("f"));
        assert!(!parse_bool_fast("F"));
        assert!(!parse_bool_fast("n"));
        assert!(!parse_bool_fast("N"));
        assert!(!parse_bool_fast("false"));
        assert!(!parse_bool_fast("null"));

        assert!(parse_bool_fast(""));
        assert!(parse_bool_fast("yes"));
        assert!(parse_bool_fast("anything-else"));
        assert!(parse_bool_fast("1"));
        assert!(parse_bool_fast("true"));
    }

    #[test]
    fn test_atoi() {
        assert_eq!(atoi("42"), 42);
        assert_eq!(atoi("  -7xyz"), -7);
        assert_eq!(atoi("+13"), 13);
        assert_eq!(atoi("abc"), 0);
        assert_eq!(atoi(""), 0);
        assert_eq!(atoi("true"), 0);
        assert_eq!(atoi("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_prefix_mask_conversion() {
        assert_eq!(prefix_to_mask(24), Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(prefix_to_mask(0), Some(Ipv4Addr::UNSPECIFIED));
        assert_eq!(prefix_to_mask(30), Some(Ipv4Addr::new(255, 255, 255, 252)));
        assert_eq!(prefix_to_mask(31), None);
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 255, 240, 0)), Some(20));
        assert_eq!(mask_to_prefix(Ipv4Addr::UNSPECIFIED), Some(0));
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 255, 255, 254)), None);
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 0, 255, 0)), None);
    }

    #[test]
    fn test_parse_netmask_both_forms() {
        assert_eq!(parse_netmask("255.255.255.0"), parse_netmask("24"));
        assert_eq!(parse_netmask("16"), Some(Ipv4Addr::new(255, 255, 0, 0)));
        assert_eq!(parse_netmask("32"), None);
        assert_eq!(parse_netmask("-1"), None);
        assert_eq!(parse_netmask("255.255.x.0"), None);
    }

    #[test]
    fn test_unescape() {
        assert!(matches!(unescape("plain"), Cow::Borrowed("plain")));
        assert_eq!(unescape(r#"a\"b\\c"#), "a\"b\\c");
        assert_eq!(unescape(r"café"), "café");
        assert_eq!(unescape(r"line\nbreak"), "line\nbreak");
    }
}
