//! ICICI Bank statement profile (text only).
//!
//! Header labels appear either stacked ("STATEMENT DATE" on one line, the
//! value on the next) or inline ("Statement Date : June 22, 2024"), so each
//! field tries the stacked form before the inline one.
//!
//! Ledger rows:
//!   15/06/2024 4566690290 AMAZON PAY INDIA 1,499.00
//!   18/06/2024 4566690291 PAYMENT RECEIVED 20,000.00 CR

use std::sync::OnceLock;

use cardstmt_core::{BankId, Fallback, StatementRecord, card_last4};
use regex::Regex;

use super::{StatementPages, StatementProfile, amount_in, date_in};
use crate::locator::capture_token;
use crate::scanner::LedgerGrammar;

const MAX_TRANSACTIONS: usize = 1000;
const TXN_DATE: &str = r"\d{2}/\d{2}/\d{4}";

struct Patterns {
    card_masked: Regex,
    card_tail: Regex,
    card_label: Regex,
    statement_date_stacked: Regex,
    statement_date_inline: Regex,
    period: Regex,
    due_stacked: Regex,
    due_inline: Regex,
    total_stacked: Regex,
    total_inline: Regex,
    minimum_stacked: Regex,
    minimum_inline: Regex,
    dates: Vec<Regex>,
    ledger: LedgerGrammar,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("icici regex");
        let ledger = LedgerGrammar::new(TXN_DATE, r"(?P<amt>[0-9,]+\.\d{2})(?:\s*(?P<cr>(?i:cr)))?")
            .and_then(|g| {
                g.with_loose(&format!(
                    r"^(?P<date>{TXN_DATE})\s*(?P<desc>.*?)\s*(?P<amt>[0-9,]+\.\d{{2}})(?P<rest>.*)$"
                ))
            })
            .expect("icici ledger grammar")
            .strip_serial()
            .credit_word_anywhere()
            .max_records(MAX_TRANSACTIONS);

        Patterns {
            card_masked: re(r"(\d{4})\s*X{2,}[X\s]*?(\d{4})"),
            card_tail: re(r"X{2,}\s*(\d{4})"),
            card_label: re(r"(?i)Card(?:\s+Ending|\s+No\.?|\s+Number)[:\s]*\*?(\d{4})"),
            statement_date_stacked: re(r"(?i)STATEMENT\s+DATE[ \t]*\n\s*([A-Za-z0-9 ,/\-]+)"),
            statement_date_inline: re(r"(?i)Statement\s+Date\s*[:\-]\s*([A-Za-z0-9,/\- ]+)"),
            period: re(r"(?i)Statement\s+period\s*[:\-]\s*([A-Za-z0-9 ,/\-]+)"),
            due_stacked: re(r"(?i)PAYMENT\s+DUE\s+DATE[ \t]*\n\s*([A-Za-z0-9 ,/\-]+)"),
            due_inline: re(r"(?i)Payment\s+Due\s+Date\s*[:\-]\s*([A-Za-z0-9,/\- ]+)"),
            total_stacked: re(r"(?i)Total\s+Amount\s+due[ \t]*\n\s*[`₹Rs\$\s]*([0-9,]+\.\d{2})"),
            total_inline: re(r"(?i)Total\s+Amount\s+due[:\s\-]*[`₹Rs\.\$\s]*([0-9,]+\.\d{2})"),
            minimum_stacked: re(r"(?i)Minimum\s+Amount\s+due[ \t]*\n\s*[`₹Rs\$\s]*([0-9,]+\.\d{2})"),
            minimum_inline: re(r"(?i)Minimum\s+Amount\s+due[:\s\-]*[`₹Rs\.\$\s]*([0-9,]+\.\d{2})"),
            dates: vec![
                re(r"(\d{1,2}/\d{1,2}/\d{4})"),
                re(r"([A-Za-z]{3,9}\s+\d{1,2},\s*\d{4})"),
                re(r"(\d{1,2}[\s\-][A-Za-z]{3,9}[\s\-,]+\d{4})"),
            ],
            ledger,
        }
    })
}

/// Date token inside a label's captured value.
fn labelled_date(label: &Regex, text: &str) -> Option<String> {
    let value = capture_token(label, text)?;
    date_in(&patterns().dates, &value)
}

pub struct IciciProfile;

impl StatementProfile for IciciProfile {
    fn bank(&self) -> BankId {
        BankId::Icici
    }

    fn parse(&self, pages: &StatementPages) -> StatementRecord {
        let p = patterns();
        let text = pages.text.as_str();
        let mut record = StatementRecord::new(BankId::Icici);

        record.card_last4 = Fallback::new("card_last4")
            .or("masked", || {
                p.card_masked.captures(text).and_then(|c| card_last4(&c[2]))
            })
            .or("x-run", || capture_token(&p.card_tail, text).and_then(|t| card_last4(&t)))
            .or("label", || capture_token(&p.card_label, text).and_then(|t| card_last4(&t)))
            .resolve();

        record.statement_date = Fallback::new("statement_date")
            .or("stacked", || labelled_date(&p.statement_date_stacked, text))
            .or("inline", || labelled_date(&p.statement_date_inline, text))
            .resolve();

        // the period value is a range; its first date is the start
        record.statement_period = labelled_date(&p.period, text);

        record.due_date = Fallback::new("due_date")
            .or("stacked", || labelled_date(&p.due_stacked, text))
            .or("inline", || labelled_date(&p.due_inline, text))
            .resolve();

        record.total_due = Fallback::new("total_due")
            .or("stacked", || amount_in(&p.total_stacked, text))
            .or("inline", || amount_in(&p.total_inline, text))
            .resolve();

        record.minimum_due = Fallback::new("minimum_due")
            .or("stacked", || amount_in(&p.minimum_stacked, text))
            .or("inline", || amount_in(&p.minimum_inline, text))
            .resolve();

        record.transactions = p.ledger.scan(&pages.lines);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> StatementRecord {
        IciciProfile.parse(&StatementPages::from_text(text))
    }

    const SAMPLE: &str = "\
ICICI Bank Credit Card Statement
Card Number 4375XXXXXXXX4006
STATEMENT DATE
June 22, 2024
Statement period : May 23, 2024 to June 22, 2024
PAYMENT DUE DATE
July 10, 2024
Total Amount due
₹12,345.67
Minimum Amount due
`1,200.00
15/06/2024 4566690290 AMAZON PAY INDIA 1,499.00
18/06/2024 4566690291 PAYMENT RECEIVED 20,000.00 CR
19/06/2024 4566690292 FUEL SURCHARGE 10.00 REVERSAL
";

    #[test]
    fn test_stacked_header() {
        let r = parse(SAMPLE);
        assert_eq!(r.bank, "ICICI Bank");
        assert_eq!(r.card_last4.as_deref(), Some("4006"));
        assert_eq!(r.statement_date.as_deref(), Some("June 22, 2024"));
        assert_eq!(r.statement_period.as_deref(), Some("May 23, 2024"));
        assert_eq!(r.due_date.as_deref(), Some("July 10, 2024"));
        assert!(r.total_due.unwrap() == "12345.67");
        assert!(r.minimum_due.unwrap() == "1200.00");
    }

    #[test]
    fn test_ledger_rows() {
        let r = parse(SAMPLE);
        assert_eq!(r.transactions.len(), 3);
        assert_eq!(r.transactions[0].description, "AMAZON PAY INDIA");
        assert!(r.transactions[1].credit);
        assert!(r.transactions[1].amount.unwrap() == "20000.00");
        // trailing words after the amount fall back to the loose shape
        assert_eq!(r.transactions[2].description, "FUEL SURCHARGE REVERSAL");
        assert!(r.transactions[2].amount.unwrap() == "10.00");
    }

    #[test]
    fn test_inline_header() {
        let r = parse(
            "Statement Date: 22/06/2024\n\
             Payment Due Date: 10/07/2024\n\
             Total Amount due 12,345.67\n\
             Minimum Amount due 1,200.00\n\
             15/06/2024 SUPERMARKET PURCHASE 500.00\n",
        );
        assert_eq!(r.statement_date.as_deref(), Some("22/06/2024"));
        assert_eq!(r.due_date.as_deref(), Some("10/07/2024"));
        assert!(r.total_due.unwrap() == "12345.67");
        assert!(r.minimum_due.unwrap() == "1200.00");
        assert_eq!(r.transactions.len(), 1);
        assert_eq!(r.transactions[0].description, "SUPERMARKET PURCHASE");
        assert!(!r.transactions[0].credit);
    }

    #[test]
    fn test_mixed_case_credit_suffix() {
        let r = parse(
            "18/06/2024 4566690291 PAYMENT RECEIVED 20,000.00 Cr\n\
             20/06/2024 4566690293 REFUND 99.00 cr REVERSAL",
        );
        assert_eq!(r.transactions.len(), 2);
        assert_eq!(r.transactions[0].description, "PAYMENT RECEIVED");
        assert!(r.transactions[0].credit);
        assert!(r.transactions[0].amount.unwrap() == "20000.00");
        assert_eq!(r.transactions[1].description, "REFUND REVERSAL");
        assert!(r.transactions[1].credit);
    }

    #[test]
    fn test_card_forms() {
        assert_eq!(parse("XXXX XXXX XXXX 4006").card_last4.as_deref(), Some("4006"));
        assert_eq!(parse("Card Ending 4006").card_last4.as_deref(), Some("4006"));
        assert_eq!(parse("5241 XXXX XXXX 9012").card_last4.as_deref(), Some("9012"));
        assert_eq!(parse("no card here").card_last4, None);
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let r = parse("Total Amount due 100.00");
        assert!(r.total_due.unwrap() == "100.00");
        assert_eq!(r.minimum_due, None);
        assert_eq!(r.statement_date, None);
        assert!(r.transactions.is_empty());
    }
}
