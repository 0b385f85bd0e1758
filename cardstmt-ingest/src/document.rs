//! Document boundary: what the extraction engine needs from a converted
//! statement (page count, per-page text, per-page layout).

use std::io::Read;
use std::path::{Path, PathBuf};

use cardstmt_core::TextFragment;
use thiserror::Error;

use crate::geometry::{PageLayout, collect_fragments};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("reading document: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
}

/// Where a statement comes from: raw bytes or a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl DocumentSource {
    /// Drain a byte stream into an owned source.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, DocumentError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(DocumentSource::Bytes(buf))
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(bytes: Vec<u8>) -> Self {
        DocumentSource::Bytes(bytes)
    }
}

impl From<&[u8]> for DocumentSource {
    fn from(bytes: &[u8]) -> Self {
        DocumentSource::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        DocumentSource::Path(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        DocumentSource::Path(path.to_path_buf())
    }
}

/// An opened statement. Implementations own their underlying resources and
/// release them on drop.
pub trait Document {
    fn page_count(&self) -> usize;

    /// Plain text of one page (0-based).
    fn page_text(&self, index: usize) -> Result<String, DocumentError>;

    /// Block/line/span structure of one page (0-based).
    fn page_layout(&self, index: usize) -> Result<PageLayout, DocumentError>;

    /// All pages' text joined with newlines.
    fn extract_text(&self) -> Result<String, DocumentError> {
        let pages = (0..self.page_count())
            .map(|i| self.page_text(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages.join("\n"))
    }

    /// Flat positioned fragments of one page.
    fn page_fragments(&self, index: usize) -> Result<Vec<TextFragment>, DocumentError> {
        Ok(collect_fragments(&self.page_layout(index)?))
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryPage {
    text: String,
    layout: PageLayout,
}

/// A document whose pages were converted elsewhere and are held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text-only page.
    pub fn with_page(mut self, text: impl Into<String>) -> Self {
        self.pages.push(MemoryPage {
            text: text.into(),
            layout: PageLayout::default(),
        });
        self
    }

    /// Append a page that also carries layout.
    pub fn with_layout_page(mut self, text: impl Into<String>, layout: PageLayout) -> Self {
        self.pages.push(MemoryPage {
            text: text.into(),
            layout,
        });
        self
    }

    fn page(&self, index: usize) -> Result<&MemoryPage, DocumentError> {
        self.pages.get(index).ok_or(DocumentError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })
    }
}

impl Document for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, DocumentError> {
        Ok(self.page(index)?.text.clone())
    }

    fn page_layout(&self, index: usize) -> Result<PageLayout, DocumentError> {
        Ok(self.page(index)?.layout.clone())
    }
}
