//! SBI Card statement profile.
//!
//! Labels are resolved on page-one geometry first (value to the right on
//! the same row, else the closest value below), then by searching lines
//! around label text in the header region, and finally by ranking every
//! amount in the header when the balance labels could not be read.

use std::sync::OnceLock;

use cardstmt_core::{Amount, BankId, Fallback, StatementRecord, TextFragment};
use regex::Regex;

use super::{
    RUPEE_HEADER_AMOUNT, StatementPages, StatementProfile, amount_in, date_in, ranked_amounts, trailing_last4,
};
use crate::locator::{
    ColumnTolerance, LineWindow, RowTolerance, ValueKind, band_text, find_label_fragment, find_near_line,
    nearest_below, same_row_right,
};
use crate::scanner::LedgerGrammar;

const HEADER_LINES: usize = 300;
const TXN_DATE: &str = r"\d{1,2}\s+[A-Za-z]{3}\s+\d{4}|\d{1,2}[/-]\d{1,2}[/-]\d{4}";
const NUMERIC_DATE: &str = r"\d{1,2}[/-]\d{1,2}[/-]\d{4}";
const DMY_DATE: &str = r"\d{1,2}\s+[A-Za-z]{3}\s+\d{4}";
const BELOW: ColumnTolerance = ColumnTolerance {
    max_vdist: 140.0,
    x_tol: 90.0,
};
const DATE_WINDOW: LineWindow = LineWindow::new(3, 2);
const AMOUNT_WINDOW: LineWindow = LineWindow::new(4, 2);
/// Lines after a card label inspected for the trailing digits.
const CARD_LOOKAHEAD: usize = 4;

struct Patterns {
    inline_due: Regex,
    card_label: Regex,
    statement_label: Regex,
    due_label: Regex,
    total_label: Regex,
    minimum_label: Regex,
    period_label: Regex,
    range: Regex,
    dates: Vec<Regex>,
    amount: Regex,
    ledger: LedgerGrammar,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("sbi regex");
        Patterns {
            inline_due: re(&format!(r"(?i)payment\s+due\s+date[:\s]*({DMY_DATE}|\d{{2}}[/-]\d{{2}}[/-]\d{{4}})")),
            card_label: re(r"(?i)primary\s+card\s+number|card\s+no|card\s+ending|card\s+number"),
            statement_label: re(r"(?i)statement\s+date|statement\s+generated"),
            due_label: re(r"(?i)payment\s+due|due\s+date"),
            total_label: re(r"(?i)\btotal\s+amount\s+due\b|\btotal\s+dues?\b"),
            minimum_label: re(r"(?i)\bminimum\s+amount\s+due\b|\bminimum\s+due\b|\bminimum\s+amount\b"),
            period_label: re(r"(?i)statement\s+period"),
            range: re(&format!(r"(?i)({NUMERIC_DATE}|{DMY_DATE})\s*(?:to|-)\s*(?:{NUMERIC_DATE}|{DMY_DATE})")),
            dates: vec![re(&format!("({NUMERIC_DATE})")), re(&format!("({DMY_DATE})"))],
            amount: re(RUPEE_HEADER_AMOUNT),
            ledger: LedgerGrammar::new(TXN_DATE, r"(?P<amt>[0-9][0-9,]*\.\d{2})(?:\s*(?P<cr>(?i:cr)))?")
                .expect("sbi ledger grammar"),
        }
    })
}

/// Same-row-right, then nearest-below, for the top-most `label` fragment.
fn span_value<'f>(frags: &'f [TextFragment], label: &Regex, kind: ValueKind<'_>) -> Option<&'f TextFragment> {
    let header = find_label_fragment(frags, label)?;
    same_row_right(frags, header, kind, RowTolerance::default())
        .or_else(|| nearest_below(frags, header, kind, BELOW))
}

fn span_date(frags: &[TextFragment], label: &Regex) -> Option<String> {
    let dates = &patterns().dates;
    span_value(frags, label, ValueKind::Date(dates)).and_then(|f| date_in(dates, &f.text))
}

fn span_amount(frags: &[TextFragment], label: &Regex) -> Option<Amount> {
    let amount = &patterns().amount;
    span_value(frags, label, ValueKind::Amount(amount)).and_then(|f| amount_in(amount, &f.text))
}

fn span_card(frags: &[TextFragment]) -> Option<String> {
    let header = find_label_fragment(frags, &patterns().card_label)?;
    same_row_right(frags, header, ValueKind::Any, RowTolerance::default())
        .and_then(|f| trailing_last4(&f.text))
        .or_else(|| trailing_last4(&band_text(frags, header.y0 - 3.0, header.y1 + 12.0)))
}

fn span_period(frags: &[TextFragment]) -> Option<String> {
    let p = patterns();
    let header = find_label_fragment(frags, &p.period_label)?;
    same_row_right(frags, header, ValueKind::Date(&p.dates), RowTolerance::default())
        .and_then(|f| date_in(&p.dates, &f.text))
}

fn card_from_lines(lines: &[String]) -> Option<String> {
    lines.iter().enumerate().find_map(|(i, line)| {
        let low = line.to_lowercase();
        let labelled = low.contains("card")
            && ["ending", "primary card", "card no", "card number"]
                .iter()
                .any(|w| low.contains(w));
        if !labelled {
            return None;
        }
        lines
            .iter()
            .skip(i)
            .take(CARD_LOOKAHEAD + 1)
            .find_map(|l| trailing_last4(l))
    })
}

/// Nearby value for the first line in `lines` for which `is_label` holds
/// and a value is found.
fn near_label<F>(lines: &[String], is_label: F, kind: ValueKind<'_>, window: LineWindow) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| is_label(&l.to_lowercase()))
        .find_map(|(i, _)| find_near_line(lines, i, kind, window))
}

fn is_total_label(low: &str) -> bool {
    low.contains("total amount due") || low.contains("total due")
}

fn is_minimum_label(low: &str) -> bool {
    low.contains("minimum amount due") || (low.contains("minimum") && low.contains("amount")) || low.contains("minimum due")
}

pub struct SbiProfile;

impl StatementProfile for SbiProfile {
    fn bank(&self) -> BankId {
        BankId::Sbi
    }

    fn uses_layout(&self) -> bool {
        true
    }

    fn parse(&self, pages: &StatementPages) -> StatementRecord {
        let p = patterns();
        let frags = pages.fragments.as_slice();
        let header: &[String] = &pages.lines[..pages.lines.len().min(HEADER_LINES)];
        let header_text = header.join("\n");
        let dates = ValueKind::Date(&p.dates);
        let amount = ValueKind::Amount(&p.amount);
        let mut record = StatementRecord::new(BankId::Sbi);

        record.due_date = Fallback::new("due_date")
            .or("inline", || p.inline_due.captures(&header_text).map(|c| c[1].to_string()))
            .or("span", || span_date(frags, &p.due_label))
            .resolve();

        record.card_last4 = Fallback::new("card_last4")
            .or("span", || span_card(frags))
            .or("lines", || card_from_lines(header))
            .resolve();

        record.statement_date = Fallback::new("statement_date")
            .or("span", || span_date(frags, &p.statement_label))
            .or("lines", || {
                near_label(
                    header,
                    |l| l.contains("statement date") || l.contains("statement generated"),
                    dates,
                    DATE_WINDOW,
                )
            })
            .resolve();

        record.statement_period = Fallback::new("statement_period")
            .or("span", || span_period(frags))
            .or("range", || p.range.captures(&pages.text).map(|c| c[1].to_string()))
            .or("lines", || near_label(header, |l| l.contains("statement period"), dates, DATE_WINDOW))
            .resolve();

        record.total_due = Fallback::new("total_due")
            .or("span", || span_amount(frags, &p.total_label))
            .or("lines", || {
                near_label(header, is_total_label, amount, AMOUNT_WINDOW).and_then(|t| amount_in(&p.amount, &t))
            })
            .resolve();

        record.minimum_due = Fallback::new("minimum_due")
            .or("span", || span_amount(frags, &p.minimum_label))
            .or("lines", || {
                near_label(header, is_minimum_label, amount, AMOUNT_WINDOW).and_then(|t| amount_in(&p.amount, &t))
            })
            .resolve();

        if record.total_due.is_none() || record.minimum_due.is_none() {
            let ranked = ranked_amounts(header, &p.amount);
            if record.minimum_due.is_none() {
                record.minimum_due = ranked.first().copied();
            }
            if record.total_due.is_none() && ranked.len() > 1 {
                record.total_due = ranked.last().copied();
            }
        }

        record.transactions = p.ledger.scan(&pages.lines);
        record
    }
}
