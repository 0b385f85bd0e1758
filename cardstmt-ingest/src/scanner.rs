//! Forward-only transaction scanner over normalized lines.
//!
//! At each cursor position the shapes are tried in order:
//!   1. `DATE  description  AMOUNT`                  (one line)
//!   2. `DATE` / `description` / … / `AMOUNT`        (split across lines)
//!   3. `DATE  description  123.45`                  (looser trailing amount)
//! Lines matching none of them are skipped.

use std::sync::OnceLock;

use cardstmt_core::{TransactionRecord, collapse_whitespace, has_credit_marker, normalize_amount};
use regex::{Captures, Regex};

/// Lines inspected after a split record's description for its amount.
const SPLIT_AMOUNT_LOOKAHEAD: usize = 3;

fn leading_cr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*CR\b").expect("leading cr regex"))
}

fn serial_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\s+|$)").expect("serial regex"))
}

fn cr_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bCR\b").expect("cr word regex"))
}

/// A bank's ledger row grammar, compiled once.
///
/// `amount` must contain a named group `amt` and may contain `cr` for a
/// trailing credit marker.
#[derive(Debug, Clone)]
pub struct LedgerGrammar {
    single: Regex,
    split: Option<SplitGrammar>,
    loose: Option<Regex>,
    strip_serial: bool,
    credit_word_anywhere: bool,
    max_records: Option<usize>,
}

#[derive(Debug, Clone)]
struct SplitGrammar {
    date_only: Regex,
    bare_amount: Regex,
    inline_amount: Regex,
}

impl LedgerGrammar {
    pub fn new(date: &str, amount: &str) -> Result<Self, regex::Error> {
        let single = Regex::new(&format!(
            r"^(?P<date>{date})(?:\s+(?P<desc>.*?))?\s+{amount}\s*$"
        ))?;
        Ok(Self {
            single,
            split: None,
            loose: None,
            strip_serial: false,
            credit_word_anywhere: false,
            max_records: None,
        })
    }

    /// Enable the split-record shape: a bare date line followed by a
    /// description line and an amount within a few lines.
    pub fn with_split_records(
        mut self,
        date: &str,
        bare_amount: &str,
        inline_amount: &str,
    ) -> Result<Self, regex::Error> {
        self.split = Some(SplitGrammar {
            date_only: Regex::new(&format!(r"^(?P<date>{date})\*?\s*$"))?,
            bare_amount: Regex::new(bare_amount)?,
            inline_amount: Regex::new(inline_amount)?,
        });
        Ok(self)
    }

    /// Enable the loose shape. `pattern` needs groups `date`, `desc`, `amt`
    /// and may carry a `rest` group appended to the description.
    pub fn with_loose(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.loose = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Drop a purely numeric reference token at the start of descriptions.
    pub fn strip_serial(mut self) -> Self {
        self.strip_serial = true;
        self
    }

    /// Treat a standalone `CR` anywhere on the line as a credit marker.
    pub fn credit_word_anywhere(mut self) -> Self {
        self.credit_word_anywhere = true;
        self
    }

    pub fn max_records(mut self, cap: usize) -> Self {
        self.max_records = Some(cap);
        self
    }

    /// Scan `lines` into records in document order.
    pub fn scan(&self, lines: &[String]) -> Vec<TransactionRecord> {
        let scanner = LineScanner::new(lines, self);
        match self.max_records {
            Some(cap) => scanner.take(cap).collect(),
            None => scanner.collect(),
        }
    }

    fn clean_description(&self, desc: &str) -> String {
        let desc = collapse_whitespace(desc);
        if self.strip_serial {
            serial_re().replace(&desc, "").trim().to_string()
        } else {
            desc
        }
    }

    /// Whether `line` opens a dated record of its own.
    fn starts_record(&self, line: &str) -> bool {
        let line = line.trim();
        self.single.is_match(line) || self.split.as_ref().is_some_and(|s| s.date_only.is_match(line))
    }

    fn is_credit(&self, line: &str, raw_amount: &str) -> bool {
        has_credit_marker(raw_amount) || (self.credit_word_anywhere && cr_word_re().is_match(line))
    }
}

/// Cursor over lines yielding one record per recognized shape.
pub struct LineScanner<'a> {
    lines: &'a [String],
    grammar: &'a LedgerGrammar,
    pos: usize,
}

impl<'a> LineScanner<'a> {
    pub fn new(lines: &'a [String], grammar: &'a LedgerGrammar) -> Self {
        Self {
            lines,
            grammar,
            pos: 0,
        }
    }

    /// Current cursor position (index of the next line to inspect).
    pub fn position(&self) -> usize {
        self.pos
    }

    fn single_line(&self, line: &str) -> Option<TransactionRecord> {
        let caps = self.grammar.single.captures(line)?;
        Some(self.record_from(line, &caps, ""))
    }

    fn loose_line(&self, line: &str) -> Option<TransactionRecord> {
        let caps = self.grammar.loose.as_ref()?.captures(line)?;
        let rest = caps.name("rest").map_or("", |m| m.as_str());
        let rest = leading_cr_re().replace(rest, "");
        Some(self.record_from(line, &caps, &rest))
    }

    fn record_from(&self, line: &str, caps: &Captures<'_>, rest: &str) -> TransactionRecord {
        let raw_amount = match (caps.name("amt"), caps.name("cr")) {
            (Some(a), Some(cr)) => format!("{} {}", a.as_str(), cr.as_str()),
            (Some(a), None) => a.as_str().to_string(),
            _ => String::new(),
        };
        let desc = format!("{} {}", caps.name("desc").map_or("", |m| m.as_str()), rest);
        TransactionRecord::new(
            &caps["date"],
            self.grammar.clean_description(&desc),
            normalize_amount(&raw_amount),
            self.grammar.is_credit(line, &raw_amount),
        )
    }

    /// Split-record shape starting at `self.pos`; returns the record and how
    /// many lines it consumed.
    fn split_record(&self, line: &str) -> Option<(TransactionRecord, usize)> {
        let split = self.grammar.split.as_ref()?;
        let date = split.date_only.captures(line)?["date"].to_string();

        let Some(next) = self.lines.get(self.pos + 1).filter(|l| !self.grammar.starts_record(l)) else {
            return Some((TransactionRecord::new(date, "", None, false), 1));
        };

        if split.bare_amount.is_match(next.trim()) {
            let credit = has_credit_marker(next);
            return Some((TransactionRecord::new(date, "", normalize_amount(next), credit), 2));
        }

        let description = self.grammar.clean_description(next);
        for offset in 2..2 + SPLIT_AMOUNT_LOOKAHEAD {
            let Some(candidate) = self.lines.get(self.pos + offset) else {
                break;
            };
            // the next dated row owns its own amount
            if self.grammar.starts_record(candidate) {
                break;
            }
            if let Some(m) = split.inline_amount.captures(candidate).and_then(|c| c.get(1)) {
                let raw = m.as_str();
                let record = TransactionRecord::new(
                    date,
                    description,
                    normalize_amount(raw),
                    has_credit_marker(raw),
                );
                return Some((record, offset + 1));
            }
        }
        Some((TransactionRecord::new(date, description, None, false), 2))
    }
}

impl Iterator for LineScanner<'_> {
    type Item = TransactionRecord;

    fn next(&mut self) -> Option<TransactionRecord> {
        let lines = self.lines;
        while self.pos < lines.len() {
            let line = lines[self.pos].trim();

            if let Some(record) = self.single_line(line) {
                self.pos += 1;
                return Some(record);
            }
            if let Some((record, consumed)) = self.split_record(line) {
                self.pos += consumed;
                return Some(record);
            }
            if let Some(record) = self.loose_line(line) {
                self.pos += 1;
                return Some(record);
            }
            self.pos += 1;
        }
        None
    }
}
