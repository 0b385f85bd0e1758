//! Unified statement record types produced by every bank profile

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::amount::Amount;

/// The closed set of supported card issuers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankId {
    #[serde(rename = "icici")]
    Icici,
    #[serde(rename = "hdfc")]
    Hdfc,
    #[serde(rename = "sbi")]
    Sbi,
    #[serde(rename = "kotak")]
    Kotak,
    #[serde(rename = "amex")]
    Amex,
}

impl BankId {
    pub const ALL: [BankId; 5] = [
        BankId::Icici,
        BankId::Hdfc,
        BankId::Sbi,
        BankId::Kotak,
        BankId::Amex,
    ];

    /// Short identifier used on the command line and in JSON
    pub fn id(&self) -> &'static str {
        match self {
            BankId::Icici => "icici",
            BankId::Hdfc => "hdfc",
            BankId::Sbi => "sbi",
            BankId::Kotak => "kotak",
            BankId::Amex => "amex",
        }
    }

    /// Issuer name written into `StatementRecord::bank`
    pub fn display_name(&self) -> &'static str {
        match self {
            BankId::Icici => "ICICI Bank",
            BankId::Hdfc => "HDFC Bank",
            BankId::Sbi => "SBI Card",
            BankId::Kotak => "Kotak Mahindra Bank",
            BankId::Amex => "American Express",
        }
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BankId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        BankId::ALL
            .into_iter()
            .find(|b| b.id() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown bank '{}' (expected one of: icici, hdfc, sbi, kotak, amex)",
                    s.trim()
                )
            })
    }
}

/// Why a document could not be parsed at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum StructuralFailure {
    /// The document could not be opened or decoded
    Unreadable(String),
    /// The document opened but has no pages
    EmptyDocument,
}

impl fmt::Display for StructuralFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralFailure::Unreadable(reason) => write!(f, "unreadable document: {reason}"),
            StructuralFailure::EmptyDocument => f.write_str("Empty PDF"),
        }
    }
}

/// One itemized ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Raw date token exactly as printed (bank-specific grammar)
    pub date: String,
    /// Whitespace-normalized description with date/serial/amount removed
    pub description: String,
    /// Absolute value; absent when a split record never produced an amount
    pub amount: Option<Amount>,
    /// Refund or payment (CR suffix, leading minus, or parentheses)
    pub credit: bool,
}

impl TransactionRecord {
    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        amount: Option<Amount>,
        credit: bool,
    ) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount,
            credit,
        }
    }
}

/// Output of every bank profile.
///
/// Absent fields stay `None`; a found `0.00` is `Some(Amount::ZERO)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub bank: String,
    pub card_last4: Option<String>,
    /// Statement / closing date token
    pub statement_date: Option<String>,
    /// Start of the statement period, as a raw date token
    pub statement_period: Option<String>,
    pub due_date: Option<String>,
    pub total_due: Option<Amount>,
    pub minimum_due: Option<Amount>,
    /// Document order, not re-sorted
    pub transactions: Vec<TransactionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StructuralFailure>,
}

impl StatementRecord {
    /// Empty record for `bank` with every optional field absent
    pub fn new(bank: BankId) -> Self {
        Self {
            bank: bank.display_name().to_string(),
            card_last4: None,
            statement_date: None,
            statement_period: None,
            due_date: None,
            total_due: None,
            minimum_due: None,
            transactions: Vec::new(),
            error: None,
        }
    }

    /// Record signalling that the document could not be parsed at all
    pub fn failed(bank: BankId, failure: StructuralFailure) -> Self {
        Self {
            error: Some(failure),
            ..Self::new(bank)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Number of transactions flagged as credits
    pub fn credit_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.credit).count()
    }
}

/// Accept `token` as a card suffix only when it is exactly four ASCII digits.
pub fn card_last4(token: &str) -> Option<String> {
    let t = token.trim();
    if t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()) {
        Some(t.to_string())
    } else {
        None
    }
}

/// A positioned run of text from one page, in top-down page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Horizontal center, computed once at construction
    pub cx: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bbox: [f32; 4]) -> Self {
        let [x0, y0, x1, y1] = bbox;
        Self {
            text: text.into(),
            x0,
            y0,
            x1,
            y1,
            cx: (x0 + x1) / 2.0,
        }
    }
}
