//! Kotak Mahindra Bank statement profile (text only).
//!
//! Kotak prints header labels and their values in separate text runs, so
//! most fields are found by locating the label line and searching a few
//! lines around it.

use std::sync::OnceLock;

use cardstmt_core::{BankId, Fallback, StatementRecord, card_last4};
use regex::Regex;

use super::{RUPEE_HEADER_AMOUNT, StatementPages, StatementProfile, amount_in, date_in, ranked_amounts, trailing_last4};
use crate::locator::{LineWindow, ValueKind, find_near_line};
use crate::scanner::LedgerGrammar;

const HEADER_LINES: usize = 260;
const CARD_SCAN_LINES: usize = 200;
const TXN_DATE: &str = r"\d{2}[/-]\d{2}[/-]\d{4}";
/// A range endpoint: numeric, or day / month name / year with dash or space.
const RANGE_DATE: &str = r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{1,2}[-\s][A-Za-z]{3,9}[-\s]\d{2,4}";

const MINIMUM_LABELS: &[&str] = &["minimum amount due", "minimum amount", "minimum due"];
const TOTAL_LABELS: &[&str] = &["total amount due", "total amount", "total dues"];
const DUE_LABELS: &[&str] = &["remember to pay by", "remember to pay", "pay by"];

struct Patterns {
    card_tail: Regex,
    range: Regex,
    total_inline: Regex,
    minimum_inline: Regex,
    dates: Vec<Regex>,
    amount: Regex,
    ledger: LedgerGrammar,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("kotak regex");
        Patterns {
            card_tail: re(r"X{2,}\s*(\d{4})"),
            range: re(&format!(r"(?i)from\s+({RANGE_DATE})\s*(?:to|-)\s*(?:{RANGE_DATE})")),
            total_inline: re(r"(?i)Total Amount Due[^\d\n\r]*([0-9,]+\.\d{2})"),
            minimum_inline: re(r"(?i)Minimum Amount Due[^\d\n\r]*([0-9,]+\.\d{2})"),
            dates: vec![
                re(r"(\d{2}[/-]\d{2}[/-]\d{4})"),
                re(r"(\d{1,2}\s+[A-Za-z]{3,}\s+\d{4})"),
            ],
            amount: re(RUPEE_HEADER_AMOUNT),
            ledger: LedgerGrammar::new(TXN_DATE, r"(?P<amt>[0-9,]+\.\d{2})(?:\s*(?P<cr>(?i:cr)))?")
                .expect("kotak ledger grammar"),
        }
    })
}

/// Index of the first header line containing any of `labels`.
fn label_index(header: &[String], labels: &[&str]) -> Option<usize> {
    header.iter().position(|line| {
        let low = line.to_lowercase();
        labels.iter().any(|l| low.contains(l))
    })
}

fn card_from_label(lines: &[String]) -> Option<String> {
    let idx = lines
        .iter()
        .position(|l| l.to_lowercase().contains("primary card number"))?;
    lines.iter().skip(idx).take(4).find_map(|l| trailing_last4(l))
}

fn period_from_details_line(lines: &[String]) -> Option<String> {
    lines.iter().find_map(|line| {
        let low = line.to_lowercase();
        if low.contains("date transaction details") && (low.contains("to") || low.contains('-')) {
            date_in(&patterns().dates, line)
        } else {
            None
        }
    })
}

pub struct KotakProfile;

impl StatementProfile for KotakProfile {
    fn bank(&self) -> BankId {
        BankId::Kotak
    }

    fn parse(&self, pages: &StatementPages) -> StatementRecord {
        let p = patterns();
        let lines = pages.lines.as_slice();
        let header = &lines[..lines.len().min(HEADER_LINES)];
        let header_text = header.join("\n");
        let dates = ValueKind::Date(&p.dates);
        let amount = ValueKind::Amount(&p.amount);
        let near_amount = |labels: &[&str]| {
            let idx = label_index(header, labels)?;
            find_near_line(lines, idx, amount, LineWindow::new(4, 2)).and_then(|t| amount_in(&p.amount, &t))
        };
        let mut record = StatementRecord::new(BankId::Kotak);

        record.card_last4 = Fallback::new("card_last4")
            .or("primary card label", || card_from_label(lines))
            .or("x-run", || {
                lines
                    .iter()
                    .take(CARD_SCAN_LINES)
                    .find_map(|l| p.card_tail.captures(l).and_then(|c| card_last4(&c[1])))
            })
            .resolve();

        record.statement_date = label_index(&lines[..lines.len().min(CARD_SCAN_LINES)], &["statement date"])
            .and_then(|idx| find_near_line(lines, idx, dates, LineWindow::new(3, 2)));

        record.statement_period = Fallback::new("statement_period")
            .or("from-to range", || p.range.captures(&pages.text).map(|c| c[1].trim().to_string()))
            .or("details line", || period_from_details_line(lines))
            .resolve();

        record.due_date = label_index(header, DUE_LABELS)
            .and_then(|idx| find_near_line(lines, idx, dates, LineWindow::new(5, 2)));

        record.minimum_due = Fallback::new("minimum_due")
            .or("label", || near_amount(MINIMUM_LABELS))
            .or("inline", || amount_in(&p.minimum_inline, &header_text))
            .resolve();

        record.total_due = Fallback::new("total_due")
            .or("label", || near_amount(TOTAL_LABELS))
            .or("inline", || amount_in(&p.total_inline, &header_text))
            .resolve();

        if record.total_due.is_none() || record.minimum_due.is_none() {
            let ranked = ranked_amounts(header, &p.amount);
            if record.minimum_due.is_none() {
                record.minimum_due = ranked.first().copied();
            }
            if record.total_due.is_none() {
                record.total_due = ranked.get(1).copied();
            }
        }

        record.transactions = p.ledger.scan(lines);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> StatementRecord {
        KotakProfile.parse(&StatementPages::from_text(text))
    }

    const SAMPLE: &str = "\
Kotak Mahindra Bank
Primary Card Number
4147XXXXXXXX8314
Statement Date
22-Jun-2024 22/06/2024
Remember to Pay By
10/07/2024
Minimum Amount Due
Rs. 1,200.00
Total Amount Due
Rs. 12,345.67
Date Transaction details from 23/05/2024 to 22/06/2024
25/05/2024 SWIGGY BANGALORE 320.00
01/06/2024 PAYMENT RECEIVED - THANK YOU 5,000.00 Cr
";

    #[test]
    fn test_header_fields() {
        let r = parse(SAMPLE);
        assert_eq!(r.bank, "Kotak Mahindra Bank");
        assert_eq!(r.card_last4.as_deref(), Some("8314"));
        assert_eq!(r.statement_date.as_deref(), Some("22/06/2024"));
        assert_eq!(r.statement_period.as_deref(), Some("23/05/2024"));
        assert_eq!(r.due_date.as_deref(), Some("10/07/2024"));
        assert!(r.minimum_due.unwrap() == "1200.00");
        assert!(r.total_due.unwrap() == "12345.67");
    }

    #[test]
    fn test_transactions() {
        let r = parse(SAMPLE);
        assert_eq!(r.transactions.len(), 2);
        assert_eq!(r.transactions[0].description, "SWIGGY BANGALORE");
        assert_eq!(r.transactions[1].description, "PAYMENT RECEIVED - THANK YOU");
        assert!(r.transactions[1].credit);
    }

    #[test]
    fn test_month_name_range() {
        let r = parse("Transactions from 21-Jul-2024 to 20-Aug-2024");
        assert_eq!(r.statement_period.as_deref(), Some("21-Jul-2024"));
    }

    #[test]
    fn test_ranking_assigns_second_smallest_to_total() {
        let r = parse("Summary\n900.00\n45.00\n3,000.00\n");
        assert!(r.minimum_due.unwrap() == "45.00");
        assert!(r.total_due.unwrap() == "900.00");
    }

    #[test]
    fn test_card_from_x_run() {
        let r = parse("Card XXXX XXXX XXXX 4006");
        assert_eq!(r.card_last4.as_deref(), Some("4006"));
    }
}
