//! Currency token normalization into unsigned fixed-point amounts.
//!
//! Accepts the notations seen on rupee and dollar statements:
//!   "$4,053.61"   "-$3,481.72"   "(3,481.72)"   "1,234.00 CR"   "₹20,089.00"   "Rs. 500"
//! The sign is never embedded in the result; callers use [`has_credit_marker`]
//! to decide the credit flag.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// Unsigned money value with exactly two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    cents: u64,
}

impl Amount {
    pub const ZERO: Amount = Amount { cents: 0 };

    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl FromStr for Amount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_amount(s).ok_or_else(|| format!("not an amount: {s}"))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl PartialEq<&str> for Amount {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

// Longest spellings first so "Rs." does not leave a stray dot behind.
const CURRENCY_WORDS: &[&str] = &["INR", "USD", "Rs.", "Rs", "₹", "$", "`", "\u{25a0}"];

fn credit_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*(?:CR|DR)\s*$").expect("credit suffix regex"))
}

fn credit_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bCR\s*$").expect("credit marker regex"))
}

/// Normalize a currency token into an unsigned two-decimal [`Amount`].
///
/// Returns `None` when nothing numeric survives stripping; never panics.
pub fn normalize_amount(token: &str) -> Option<Amount> {
    let mut s = token.trim().replace(['\u{2013}', '\u{2212}'], "-");
    for word in CURRENCY_WORDS {
        s = s.replace(word, "");
    }
    let mut s = credit_suffix_re().replace(&s, "").trim().to_string();
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        s = format!("-{}", &s[1..s.len() - 1]);
    }
    s.retain(|c| c != ',' && !c.is_whitespace());

    parse_cents(&s).or_else(|| {
        let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        parse_cents(&digits)
    })
}

/// True when the raw token marks a credit: leading minus (before or after the
/// currency symbol), enclosing parentheses, or a trailing `CR`.
pub fn has_credit_marker(raw: &str) -> bool {
    let t = raw.trim();
    if t.starts_with('-') || t.starts_with('(') || t.starts_with('\u{2212}') {
        return true;
    }
    if t.contains("-$") || t.contains("-₹") {
        return true;
    }
    let mut stripped = t.to_string();
    for word in CURRENCY_WORDS {
        stripped = stripped.replace(word, "");
    }
    stripped.trim_start().starts_with('-') || credit_marker_re().is_match(t)
}

/// Parse `[+-]digits[.digits]` into absolute cents, rounding half-up past
/// the second fractional digit.
fn parse_cents(s: &str) -> Option<Amount> {
    let s = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let whole: u64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let mut frac = frac_part.bytes().map(|b| u64::from(b - b'0'));
    let tenths = frac.next().unwrap_or(0);
    let hundredths = frac.next().unwrap_or(0);
    let round_up = frac.next().is_some_and(|d| d >= 5);

    let cents = whole
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths)?
        .checked_add(u64::from(round_up))?;
    Some(Amount::from_cents(cents))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> Option<String> {
        normalize_amount(s).map(|a| a.to_string())
    }

    #[test]
    fn test_dollar_tokens() {
        assert_eq!(norm("$4,053.61").as_deref(), Some("4053.61"));
        assert_eq!(norm("-$3,481.72").as_deref(), Some("3481.72"));
        assert_eq!(norm("(3,481.72)").as_deref(), Some("3481.72"));
        assert_eq!(norm("USD 12.00").as_deref(), Some("12.00"));
    }

    #[test]
    fn test_rupee_tokens() {
        assert_eq!(norm("₹20,089.00").as_deref(), Some("20089.00"));
        assert_eq!(norm("1,234.00 CR").as_deref(), Some("1234.00"));
        assert_eq!(norm("Rs. 500").as_deref(), Some("500.00"));
        assert_eq!(norm("INR 1,00,000.50 Dr").as_deref(), Some("100000.50"));
        assert_eq!(norm("`12,345.67").as_deref(), Some("12345.67"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in ["$4,053.61", "(3,481.72)", "1,234.00 CR", "₹20,089.00", "0.00"] {
            let once = norm(raw).unwrap();
            assert_eq!(norm(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_zero_is_present_not_absent() {
        assert_eq!(normalize_amount("0.00"), Some(Amount::ZERO));
        assert_eq!(normalize_amount("$0"), Some(Amount::ZERO));
    }

    #[test]
    fn test_garbage_is_absent() {
        assert_eq!(norm(""), None);
        assert_eq!(norm("-"), None);
        assert_eq!(norm("CR"), None);
        assert_eq!(norm("1.2.3"), None);
    }

    #[test]
    fn test_digit_only_retry() {
        // stray letters are dropped on the second attempt
        assert_eq!(norm("12a3.45").as_deref(), Some("123.45"));
    }

    #[test]
    fn test_extra_fraction_rounds_half_up() {
        assert_eq!(norm("1.005").as_deref(), Some("1.01"));
        assert_eq!(norm("1.004").as_deref(), Some("1.00"));
        assert_eq!(norm("7.5").as_deref(), Some("7.50"));
    }

    #[test]
    fn test_credit_markers() {
        assert!(has_credit_marker("-$3,481.72"));
        assert!(has_credit_marker("$-12.00"));
        assert!(has_credit_marker("(3,481.72)"));
        assert!(has_credit_marker("1,234.00 CR"));
        assert!(has_credit_marker("500.00 Cr"));
        assert!(!has_credit_marker("$4.99"));
        assert!(!has_credit_marker("1,234.00 Dr"));
    }

    #[test]
    fn test_serializes_as_string() {
        let a = normalize_amount("1,758.63").unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"1758.63\"");
        let back: Amount = serde_json::from_str("\"1758.63\"").unwrap();
        assert_eq!(back, a);
        assert!(a == "1758.63");
    }
}
