//! American Express statement profile (text only, US dollars).
//!
//! Header fields are read from the first 200 lines joined into one block.
//! The ledger mixes one-line rows with rows split over several lines:
//!   05/05/24 GOOGLE*KEVIN SERVICES $4.99
//!   05/15/24
//!   DELTA AIR LINES ATLANTA
//!   $1,758.63

use std::sync::OnceLock;

use cardstmt_core::{BankId, DateOrder, Fallback, StatementRecord, card_last4, earliest_date};
use regex::Regex;

use super::{StatementPages, StatementProfile, amount_in};
use crate::locator::capture_token;
use crate::scanner::LedgerGrammar;

const HEADER_LINES: usize = 200;
const RANGE_SCAN_LINES: usize = 500;
const US_DATE: &str = r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}";

struct Patterns {
    account_ending: Regex,
    digit_group: Regex,
    closing_date: Regex,
    payment_due: Regex,
    payment_due_loose: Regex,
    new_balance: Regex,
    amount_due: Regex,
    minimum_due: Regex,
    range: Regex,
    date: Regex,
    ledger: LedgerGrammar,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("amex regex");
        let ledger = LedgerGrammar::new(US_DATE, r"(?P<amt>-?\$?[0-9,]+\.\d{2}|\(\$?[0-9,]+\.\d{2}\))")
            .and_then(|g| {
                g.with_split_records(
                    US_DATE,
                    r"^-?[\$\(]?-?\$?[0-9,]+\.\d{2}\)?$",
                    r"([-\$\(]?-?\$?[0-9,]+\.\d{2}\)?)",
                )
            })
            .and_then(|g| {
                g.with_loose(&format!(r"^(?P<date>{US_DATE})\s+(?P<desc>.+?)\s+(?P<amt>[0-9,]+\.\d{{2}})$"))
            })
            .expect("amex ledger grammar");

        Patterns {
            account_ending: re(r"(?i)account\s+ending[:\s]*([0-9\-Xx]{2,20})"),
            digit_group: re(r"(\d{4})"),
            closing_date: re(&format!(r"(?i)closing\s+date[:\s]*({US_DATE})")),
            payment_due: re(&format!(r"(?i)payment\s+due\s+date[:\s]*({US_DATE})")),
            payment_due_loose: re(r"(?i)payment\s+due[:\s]*([A-Za-z0-9/\-\s]+)"),
            new_balance: re(r"(?i)new\s+balance[:\s]*\$?([0-9\-,]+\.\d{2})"),
            amount_due: re(r"(?i)amount\s+due[:\s]*\$?([0-9\-,]+\.\d{2})"),
            minimum_due: re(r"(?i)minimum\s+amount\s+due[:\s]*\$?([0-9\-,]+\.\d{2})"),
            range: re(&format!(r"(?i)({US_DATE})\s*(?:to:?|-)\s*{US_DATE}")),
            date: re(&format!("({US_DATE})")),
            ledger,
        }
    })
}

/// First four-digit group of an "Account Ending" token: `9-77002` gives `7700`.
fn account_last4(re: &Regex, text: &str) -> Option<String> {
    let token = capture_token(re, text)?;
    capture_token(&patterns().digit_group, &token).and_then(|g| card_last4(&g))
}

fn loose_due_date(lines: &[String]) -> Option<String> {
    let p = patterns();
    lines.iter().take(HEADER_LINES).find_map(|line| {
        let tail = capture_token(&p.payment_due_loose, line)?;
        capture_token(&p.date, &tail)
    })
}

pub struct AmexProfile;

impl StatementProfile for AmexProfile {
    fn bank(&self) -> BankId {
        BankId::Amex
    }

    fn parse(&self, pages: &StatementPages) -> StatementRecord {
        let p = patterns();
        let lines = pages.lines.as_slice();
        let header = pages.head(HEADER_LINES, " ");
        let mut record = StatementRecord::new(BankId::Amex);

        record.transactions = p.ledger.scan(lines);

        record.card_last4 = Fallback::new("card_last4")
            .or("header", || account_last4(&p.account_ending, &header))
            .or("whole document", || account_last4(&p.account_ending, &pages.head(lines.len(), " ")))
            .resolve();

        record.statement_date = capture_token(&p.closing_date, &header);

        record.due_date = Fallback::new("due_date")
            .or("header", || capture_token(&p.payment_due, &header))
            .or("loose", || loose_due_date(lines))
            .resolve();

        record.total_due = Fallback::new("total_due")
            .or("new balance", || amount_in(&p.new_balance, &header))
            .or("amount due", || amount_in(&p.amount_due, &header))
            .resolve();

        record.minimum_due = amount_in(&p.minimum_due, &header);

        record.statement_period = Fallback::new("statement_period")
            .or("header range", || capture_token(&p.range, &header))
            .or("wider range", || capture_token(&p.range, &pages.head(RANGE_SCAN_LINES, " ")))
            .or("earliest transaction", || {
                earliest_date(record.transactions.iter().map(|t| t.date.as_str()), DateOrder::MonthFirst)
                    .map(str::to_string)
            })
            .resolve();

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> StatementRecord {
        AmexProfile.parse(&StatementPages::from_text(text))
    }

    const SAMPLE: &str = "\
American Express
Blue Cash Everyday
Account Ending 9-77002
Closing Date 05/28/24
New Balance $4,053.61
Minimum Amount Due $40.00
Payment Due Date 06/22/24
05/05/24 GOOGLE*KEVIN SERVICES $4.99
05/15/24
DELTA AIR LINES ATLANTA
$1,758.63
05/01/24 PAYMENT RECEIVED - THANK YOU -$3,481.72
05/07/24 UNITED AIRLINES HOUSTON TX 561.60
";

    #[test]
    fn test_header_fields() {
        let r = parse(SAMPLE);
        assert_eq!(r.bank, "American Express");
        assert_eq!(r.card_last4.as_deref(), Some("7700"));
        assert_eq!(r.statement_date.as_deref(), Some("05/28/24"));
        assert_eq!(r.due_date.as_deref(), Some("06/22/24"));
        assert!(r.total_due.unwrap() == "4053.61");
        assert!(r.minimum_due.unwrap() == "40.00");
    }

    #[test]
    fn test_transactions_in_document_order() {
        let r = parse(SAMPLE);
        let dates: Vec<_> = r.transactions.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(dates, vec!["05/05/24", "05/15/24", "05/01/24", "05/07/24"]);

        let delta = &r.transactions[1];
        assert_eq!(delta.description, "DELTA AIR LINES ATLANTA");
        assert!(delta.amount.unwrap() == "1758.63");

        assert!(r.transactions[2].credit);
        assert!(r.transactions[2].amount.unwrap() == "3481.72");
        assert!(!r.transactions[3].credit);
    }

    #[test]
    fn test_account_ending_without_dash() {
        let r = parse("Account Ending 51004\n05/05/24 CAFE $3.00");
        assert_eq!(r.card_last4.as_deref(), Some("5100"));
        assert_eq!(parse("Account Ending 9-7").card_last4, None);
    }

    #[test]
    fn test_one_line_refund_in_dollar_parentheses() {
        let r = parse("05/02/24 AMAZON REFUND ($25.00)\n05/03/24 CAFE $3.00");
        assert_eq!(r.transactions.len(), 2);
        assert_eq!(r.transactions[0].description, "AMAZON REFUND");
        assert!(r.transactions[0].amount.unwrap() == "25.00");
        assert!(r.transactions[0].credit);
        assert!(!r.transactions[1].credit);
    }

    #[test]
    fn test_split_row_does_not_take_next_rows_amount() {
        let r = parse("05/15/24\nDELTA AIR LINES\n05/16/24 UBER TRIP $12.00\n05/17/24 LYFT $8.00");
        let descs: Vec<_> = r.transactions.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["DELTA AIR LINES", "UBER TRIP", "LYFT"]);
        assert_eq!(r.transactions[0].amount, None);
        assert!(r.transactions[1].amount.unwrap() == "12.00");
    }

    #[test]
    fn test_period_from_earliest_transaction() {
        let r = parse(SAMPLE);
        assert_eq!(r.statement_period.as_deref(), Some("05/01/24"));
    }

    #[test]
    fn test_period_from_range() {
        let r = parse("Transactions Dated From 04/28/24 To: 05/28/24\n05/05/24 CAFE $3.00");
        assert_eq!(r.statement_period.as_deref(), Some("04/28/24"));
    }

    #[test]
    fn test_amount_due_when_no_new_balance() {
        let r = parse("Amount Due $120.50\nPayment Due: on or before 07/01/24");
        assert!(r.total_due.unwrap() == "120.50");
        assert_eq!(r.due_date.as_deref(), Some("07/01/24"));
        assert_eq!(r.minimum_due, None);
    }
}
