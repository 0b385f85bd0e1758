//! cardstmt-ingest: statement documents, layout geometry, and the bank
//! profiles that turn them into [`StatementRecord`]s.

pub mod detect;
pub mod document;
pub mod geometry;
pub mod locator;
pub mod parsers;
pub mod pdf;
pub mod scanner;

use cardstmt_core::{BankId, StatementRecord, StructuralFailure};
use tracing::{debug, warn};

pub use detect::detect_bank;
pub use document::{Document, DocumentError, DocumentSource, MemoryDocument};
pub use geometry::{LayoutBlock, LayoutLine, LayoutSpan, PageLayout, collect_fragments};
pub use parsers::{StatementPages, StatementProfile, profile};
pub use pdf::{PdfDocument, open_document};

/// Result of detecting the issuer and parsing in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Parsed(StatementRecord),
    /// No supported bank signature in the text
    Unsupported,
    /// The document could not be read at all
    Unreadable(StructuralFailure),
}

/// Parse a statement from bytes or a path with `bank`'s profile.
///
/// Never fails: an unreadable or empty document yields a record whose
/// `error` is set.
pub fn parse(bank: BankId, source: impl Into<DocumentSource>) -> StatementRecord {
    match open_document(&source.into()) {
        Ok(doc) => parse_document(bank, &doc),
        Err(err) => {
            warn!(bank = bank.id(), error = %err, "could not open statement");
            StatementRecord::failed(bank, StructuralFailure::Unreadable(err.to_string()))
        }
    }
}

/// Parse an already opened document with `bank`'s profile.
pub fn parse_document(bank: BankId, doc: &dyn Document) -> StatementRecord {
    match read_text(doc) {
        Ok(text) => parse_text(bank, doc, &text),
        Err(failure) => StatementRecord::failed(bank, failure),
    }
}

/// Detect the issuer from the document text, then parse with its profile.
pub fn auto_parse(source: impl Into<DocumentSource>) -> Outcome {
    match open_document(&source.into()) {
        Ok(doc) => auto_parse_document(&doc),
        Err(err) => {
            warn!(error = %err, "could not open statement");
            Outcome::Unreadable(StructuralFailure::Unreadable(err.to_string()))
        }
    }
}

pub fn auto_parse_document(doc: &dyn Document) -> Outcome {
    let text = match read_text(doc) {
        Ok(text) => text,
        Err(failure) => return Outcome::Unreadable(failure),
    };
    match detect_bank(&text) {
        Some(bank) => Outcome::Parsed(parse_text(bank, doc, &text)),
        None => {
            debug!("no supported bank signature");
            Outcome::Unsupported
        }
    }
}

fn read_text(doc: &dyn Document) -> Result<String, StructuralFailure> {
    if doc.page_count() == 0 {
        warn!("statement has no pages");
        return Err(StructuralFailure::EmptyDocument);
    }
    doc.extract_text().map_err(|err| {
        warn!(error = %err, "text extraction failed");
        StructuralFailure::Unreadable(err.to_string())
    })
}

fn parse_text(bank: BankId, doc: &dyn Document, text: &str) -> StatementRecord {
    let profile = parsers::profile(bank);
    let mut pages = StatementPages::from_text(text);
    if profile.uses_layout() {
        match doc.page_fragments(0) {
            Ok(fragments) => pages = pages.with_fragments(fragments),
            Err(err) => warn!(bank = bank.id(), error = %err, "page layout unavailable"),
        }
    }
    let record = profile.parse(&pages);
    debug!(
        bank = bank.id(),
        transactions = record.transactions.len(),
        fragments = pages.fragments.len(),
        "statement parsed"
    );
    record
}
