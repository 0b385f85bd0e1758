//! cardstmt-core: statement record types and pure normalization helpers

pub mod amount;
pub mod dates;
pub mod fallback;
pub mod record;
pub mod text;

pub use amount::{Amount, has_credit_marker, normalize_amount};
pub use dates::{DateOrder, date_sort_key, earliest_date};
pub use fallback::Fallback;
pub use record::{
    BankId, StatementRecord, StructuralFailure, TextFragment, TransactionRecord, card_last4,
};
pub use text::{collapse_whitespace, normalize_text, normalized_lines};
