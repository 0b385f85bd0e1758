//! Text normalization for raw extracted statement text.

use std::sync::OnceLock;

use regex::Regex;

/// Bullet-like glyphs that PDF text extraction leaves between tokens.
/// U+25A0 is how some rupee statements render the currency sign.
const DECORATIVE_GLYPHS: &[char] = &['\u{2022}', '\u{f0b7}', '\u{25cf}', '\u{25a0}'];

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\u{00a0}]+").expect("horizontal whitespace regex"))
}

fn any_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Carriage returns become line feeds, decorative glyphs become spaces, and
/// runs of spaces/tabs collapse to one space. Line breaks are preserved.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.replace('\r', "\n").replace(DECORATIVE_GLYPHS, " ");
    horizontal_ws_re().replace_all(&text, " ").into_owned()
}

/// Normalized text split into trimmed, non-empty lines.
pub fn normalized_lines(raw: &str) -> Vec<String> {
    normalize_text(raw)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapse every whitespace run (including newlines) to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    any_ws_re().replace_all(s.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_keeps_line_breaks() {
        let raw = "Total\tAmount   Due\r12,345.67\n\u{2022} Minimum";
        assert_eq!(normalize_text(raw), "Total Amount Due\n12,345.67\n Minimum");
    }

    #[test]
    fn test_normalize_text_is_idempotent() {
        let raw = "a \u{f0b7}\u{f0b7} b\r\n\tc";
        let once = normalize_text(raw);
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn test_normalized_lines_drops_blanks() {
        let lines = normalized_lines("  05/15/24 \r\n\r\n DELTA AIR LINES ATLANTA\n \n$1,758.63  ");
        assert_eq!(lines, vec!["05/15/24", "DELTA AIR LINES ATLANTA", "$1,758.63"]);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  AMAZON   PAY\n INDIA "), "AMAZON PAY INDIA");
    }
}
