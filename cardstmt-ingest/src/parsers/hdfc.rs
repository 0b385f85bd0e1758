//! HDFC Bank statement profile.
//!
//! The header is a coloured band of table cells with no text order worth
//! trusting, so header fields come from page-one geometry: values sit in
//! the cell directly under their label. Transactions are scanned from text.

use std::sync::OnceLock;

use cardstmt_core::{BankId, Fallback, StatementRecord, TextFragment, card_last4};
use regex::Regex;

use super::{StatementPages, StatementProfile, amount_in, date_in, trailing_last4};
use crate::locator::{ColumnTolerance, ValueKind, band_text, find_label_fragment, nearest_below};
use crate::scanner::LedgerGrammar;

const TXN_DATE: &str = r"\d{2}/\d{2}/\d{4}";
/// Fragments scanned for any date when the statement-date label is missing.
const LOOSE_DATE_FRAGMENTS: usize = 120;
const ROW_TOL: f32 = 6.0;
const BELOW_LABEL: f32 = 20.0;
const HEADER_COLUMN: ColumnTolerance = ColumnTolerance {
    max_vdist: 60.0,
    x_tol: 25.0,
};

struct Patterns {
    statement_label: Regex,
    card_label: Regex,
    due_label: Regex,
    total_label: Regex,
    minimum_label: Regex,
    card_forms: Vec<Regex>,
    dates: Vec<Regex>,
    amount: Regex,
    ledger: LedgerGrammar,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("hdfc regex");
        Patterns {
            statement_label: re(r"(?i)statement date"),
            card_label: re(r"(?i)card no"),
            due_label: re(r"(?i)payment\s+due\s+date"),
            total_label: re(r"(?i)^total\s+dues$"),
            minimum_label: re(r"(?i)^minimum\s+amount\s+due$"),
            card_forms: vec![
                // 4695 XXXX XXXX 3458
                re(r"(?i)\d{4}\s*XX+.*?(\d{4})"),
                // 4695 25XX XXXX 3458
                re(r"(?i)\d{4}\s*\d{2}X{2}\s*X{3,}\s*(\d{4})"),
            ],
            dates: vec![re(r"(\d{2}/\d{2}/\d{4}|[A-Za-z]{3,}\s+\d{1,2},\s*\d{4})")],
            amount: re(r"(?i)^[₹\sRsINR\.,]*([0-9]{1,3}(?:,[0-9]{3})*(?:\.\d{2})?)\s*(?:CR|Dr)?$"),
            ledger: LedgerGrammar::new(TXN_DATE, r"(?P<amt>[0-9,]+\.\d{2})(?:\s*(?P<cr>(?i:cr)))?")
                .expect("hdfc ledger grammar"),
        }
    })
}

fn labels<'f>(frags: &'f [TextFragment], label: &'f Regex) -> impl Iterator<Item = &'f TextFragment> {
    frags.iter().filter(move |f| label.is_match(&f.text))
}

/// Date on the statement-date label's row or in the band just beneath it.
fn statement_date_near_label(frags: &[TextFragment]) -> Option<String> {
    let p = patterns();
    labels(frags, &p.statement_label).find_map(|label| {
        let band = band_text(frags, label.y0 - ROW_TOL, label.y1 + BELOW_LABEL);
        date_in(&p.dates, &band)
    })
}

fn first_header_date(frags: &[TextFragment]) -> Option<String> {
    let head = frags
        .iter()
        .take(LOOSE_DATE_FRAGMENTS)
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    date_in(&patterns().dates, &head)
}

/// Last four digits from the "Card No" row.
fn card_from_row(frags: &[TextFragment]) -> Option<String> {
    let p = patterns();
    labels(frags, &p.card_label).find_map(|label| {
        let row = band_text(frags, label.y0 - ROW_TOL, label.y0 + ROW_TOL);
        p.card_forms
            .iter()
            .find_map(|re| re.captures(&row).and_then(|c| card_last4(&c[1])))
            .or_else(|| trailing_last4(&row))
    })
}

fn value_below(frags: &[TextFragment], label: &Regex, kind: ValueKind<'_>) -> Option<String> {
    let header = find_label_fragment(frags, label)?;
    let cell = nearest_below(frags, header, kind, HEADER_COLUMN)?;
    kind.find(&cell.text)
}

pub struct HdfcProfile;

impl StatementProfile for HdfcProfile {
    fn bank(&self) -> BankId {
        BankId::Hdfc
    }

    fn uses_layout(&self) -> bool {
        true
    }

    fn parse(&self, pages: &StatementPages) -> StatementRecord {
        let p = patterns();
        let frags = pages.fragments.as_slice();
        let mut record = StatementRecord::new(BankId::Hdfc);

        record.statement_date = Fallback::new("statement_date")
            .or("label band", || statement_date_near_label(frags))
            .or("first date", || first_header_date(frags))
            .resolve();
        record.statement_period = record.statement_date.clone();

        record.card_last4 = card_from_row(frags);

        record.due_date = value_below(frags, &p.due_label, ValueKind::Date(&p.dates));
        record.total_due = value_below(frags, &p.total_label, ValueKind::Amount(&p.amount))
            .and_then(|raw| amount_in(&p.amount, &raw));
        record.minimum_due = value_below(frags, &p.minimum_label, ValueKind::Amount(&p.amount))
            .and_then(|raw| amount_in(&p.amount, &raw));

        record.transactions = p.ledger.scan(&pages.lines);
        record
    }
}
