//! Bank profiles.
//!
//! Each profile turns the normalized text of one statement (plus page-one
//! geometry for the layout-driven banks) into a [`StatementRecord`]. Header
//! fields are resolved through [`cardstmt_core::Fallback`] chains and the
//! ledger through a per-bank [`crate::scanner::LedgerGrammar`].

pub mod amex;
pub mod hdfc;
pub mod icici;
pub mod kotak;
pub mod sbi;

use std::sync::OnceLock;

use cardstmt_core::{Amount, BankId, StatementRecord, TextFragment, normalize_amount, normalize_text, normalized_lines};
use regex::Regex;

use crate::locator::capture_token;

/// Loose rupee header amount: optional currency prefix, then either a
/// comma-grouped number or a plain digit run, each with optional paise.
pub(crate) const RUPEE_HEADER_AMOUNT: &str =
    r"(?:₹|Rs\.?|INR)?\s*-?([0-9]{1,3}(?:,[0-9]{3})+(?:\.\d{2})?|[0-9]+(?:\.\d{2})?)";

/// What a profile reads from a document.
#[derive(Debug, Clone, Default)]
pub struct StatementPages {
    /// Normalized text of every page, newline-joined
    pub text: String,
    /// Trimmed, non-empty lines of `text`
    pub lines: Vec<String>,
    /// Page-one fragments; empty unless the profile asked for layout
    pub fragments: Vec<TextFragment>,
}

impl StatementPages {
    pub fn from_text(raw: &str) -> Self {
        Self {
            text: normalize_text(raw),
            lines: normalized_lines(raw),
            fragments: Vec::new(),
        }
    }

    pub fn with_fragments(mut self, fragments: Vec<TextFragment>) -> Self {
        self.fragments = fragments;
        self
    }

    /// First `n` lines joined with `sep`.
    pub fn head(&self, n: usize, sep: &str) -> String {
        self.lines.iter().take(n).map(String::as_str).collect::<Vec<_>>().join(sep)
    }
}

pub trait StatementProfile: Sync {
    fn bank(&self) -> BankId;

    /// Whether the profile wants page-one fragments.
    fn uses_layout(&self) -> bool {
        false
    }

    fn parse(&self, pages: &StatementPages) -> StatementRecord;
}

/// The profile for `bank`.
pub fn profile(bank: BankId) -> &'static dyn StatementProfile {
    match bank {
        BankId::Icici => &icici::IciciProfile,
        BankId::Hdfc => &hdfc::HdfcProfile,
        BankId::Sbi => &sbi::SbiProfile,
        BankId::Kotak => &kotak::KotakProfile,
        BankId::Amex => &amex::AmexProfile,
    }
}

/// First match of `re` in `text`, normalized as an amount.
pub(crate) fn amount_in(re: &Regex, text: &str) -> Option<Amount> {
    normalize_amount(&capture_token(re, text)?)
}

/// First token in `text` matching any of `grammars`, tried in order.
pub(crate) fn date_in(grammars: &[Regex], text: &str) -> Option<String> {
    grammars.iter().find_map(|re| capture_token(re, text))
}

fn trailing_four_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})\s*$").expect("trailing digits regex"))
}

/// Trailing four-digit group of `text`.
pub(crate) fn trailing_last4(text: &str) -> Option<String> {
    capture_token(trailing_four_re(), text)
}

/// Distinct header amounts in ascending order, one candidate per line.
pub(crate) fn ranked_amounts<'l>(lines: impl IntoIterator<Item = &'l String>, re: &Regex) -> Vec<Amount> {
    let mut seen: Vec<Amount> = Vec::new();
    for line in lines {
        if let Some(amount) = amount_in(re, line) {
            if !seen.contains(&amount) {
                seen.push(amount);
            }
        }
    }
    seen.sort();
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_last4() {
        assert_eq!(trailing_last4("Card No: 4695 25XX XXXX 3458").as_deref(), Some("3458"));
        assert_eq!(trailing_last4("Primary Card Number 4111XXXXXXXX8314 ").as_deref(), Some("8314"));
        assert_eq!(trailing_last4("ends 123"), None);
        assert_eq!(trailing_last4("no digits"), None);
    }

    #[test]
    fn test_ranked_amounts_dedupes_and_sorts() {
        let re = Regex::new(RUPEE_HEADER_AMOUNT).unwrap();
        let lines: Vec<String> = ["Total 12,345.67", "Minimum 1,200.00", "again 1,200.00", "none"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let ranked = ranked_amounts(&lines, &re);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0] == "1200.00");
        assert!(ranked[1] == "12345.67");
    }

    #[test]
    fn test_rupee_header_amount_forms() {
        let re = Regex::new(RUPEE_HEADER_AMOUNT).unwrap();
        assert!(amount_in(&re, "Rs. 20,089.00").unwrap() == "20089.00");
        assert!(amount_in(&re, "12345.67").unwrap() == "12345.67");
        assert!(amount_in(&re, "₹500").unwrap() == "500.00");
    }

    #[test]
    fn test_every_bank_has_a_profile() {
        for bank in BankId::ALL {
            assert_eq!(profile(bank).bank(), bank);
        }
    }

    #[test]
    fn test_pages_from_text_normalizes() {
        let pages = StatementPages::from_text("a\r\n\u{2022}  b\t c\n\n");
        assert_eq!(pages.lines, vec!["a", "b c"]);
        assert_eq!(pages.head(5, " | "), "a | b c");
    }
}
