//! lopdf-backed [`Document`] implementation.
//!
//! Text comes from lopdf's own extraction. Layout is recovered by walking
//! each page's content stream: every BT/ET pair becomes a block, every
//! text-positioning operator starts a new line, and every show-text operator
//! becomes a span. Span boxes are approximate (glyph widths are estimated
//! from the font size) which is enough for row/column proximity queries.
//! Span text is decoded through the selected font's encoding or ToUnicode
//! map, the same way lopdf's own extraction does.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Encoding, Object, ObjectId};
use tracing::debug;

use crate::document::{Document, DocumentError, DocumentSource};
use crate::geometry::{LayoutBlock, LayoutLine, LayoutSpan, PageLayout};

const DEFAULT_PAGE_HEIGHT: f32 = 792.0;
const AVG_GLYPH_WIDTH: f32 = 0.5;
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

pub struct PdfDocument {
    inner: lopdf::Document,
    /// (1-based page number, page object id) in page order
    pages: Vec<(u32, ObjectId)>,
}

/// Open a PDF from bytes or a path.
pub fn open_document(source: &DocumentSource) -> Result<PdfDocument, DocumentError> {
    let inner = match source {
        DocumentSource::Bytes(bytes) => lopdf::Document::load_mem(bytes)?,
        DocumentSource::Path(path) => lopdf::Document::load(path)?,
    };
    let pages: Vec<(u32, ObjectId)> = inner.get_pages().into_iter().collect();
    debug!(pages = pages.len(), "opened PDF");
    Ok(PdfDocument { inner, pages })
}

impl PdfDocument {
    fn page(&self, index: usize) -> Result<(u32, ObjectId), DocumentError> {
        self.pages
            .get(index)
            .copied()
            .ok_or(DocumentError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
    }

    /// Page height from the (possibly inherited) MediaBox.
    fn page_height(&self, mut id: ObjectId) -> f32 {
        for _ in 0..8 {
            let Ok(dict) = self.inner.get_dictionary(id) else {
                break;
            };
            if let Ok(Object::Array(mbox)) = dict.get(b"MediaBox") {
                let nums: Vec<f32> = mbox.iter().filter_map(number).collect();
                if let [_, y0, _, y1] = nums[..] {
                    return (y1 - y0).abs();
                }
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => id = parent,
                Err(_) => break,
            }
        }
        DEFAULT_PAGE_HEIGHT
    }

    /// Encodings of the page's fonts keyed by resource name. Fonts whose
    /// encoding lopdf cannot resolve are left out.
    fn font_encodings(&self, id: ObjectId) -> BTreeMap<Vec<u8>, Encoding<'_>> {
        let Ok(fonts) = self.inner.get_page_fonts(id) else {
            return BTreeMap::new();
        };
        fonts
            .into_iter()
            .filter_map(|(name, font)| match font.get_font_encoding(&self.inner) {
                Ok(encoding) => Some((name, encoding)),
                Err(err) => {
                    debug!(font = %String::from_utf8_lossy(&name), error = %err, "font encoding unavailable");
                    None
                }
            })
            .collect()
    }
}

impl Document for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, DocumentError> {
        let (number, _) = self.page(index)?;
        Ok(self.inner.extract_text(&[number])?)
    }

    fn page_layout(&self, index: usize) -> Result<PageLayout, DocumentError> {
        let (_, id) = self.page(index)?;
        let raw = self.inner.get_page_content(id)?;
        let content = Content::decode(&raw)?;
        let mut walker = LayoutWalker::new(self.page_height(id)).with_fonts(self.font_encodings(id));
        for op in &content.operations {
            walker.apply(op);
        }
        Ok(walker.finish())
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// UTF-16BE when the string carries a BOM, otherwise one char per byte.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// 2D affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(ops: &[Object]) -> Option<Matrix> {
        let n: Vec<f32> = ops.iter().filter_map(number).collect();
        match n[..] {
            [a, b, c, d, e, f] => Some(Matrix { a, b, c, d, e, f }),
            _ => None,
        }
    }

    fn translate(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    /// `self × other`
    fn then(self, o: Matrix) -> Matrix {
        Matrix {
            a: self.a * o.a + self.b * o.c,
            b: self.a * o.b + self.b * o.d,
            c: self.c * o.a + self.d * o.c,
            d: self.c * o.b + self.d * o.d,
            e: self.e * o.a + self.f * o.c + o.e,
            f: self.e * o.b + self.f * o.d + o.f,
        }
    }

    fn x_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn y_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

struct LayoutWalker<'a> {
    page_height: f32,
    fonts: BTreeMap<Vec<u8>, Encoding<'a>>,
    font: Option<Vec<u8>>,
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    font_size: f32,
    leading: f32,
    blocks: Vec<LayoutBlock>,
    current: LayoutBlock,
    line: LayoutLine,
}

impl<'a> LayoutWalker<'a> {
    fn new(page_height: f32) -> Self {
        Self {
            page_height,
            fonts: BTreeMap::new(),
            font: None,
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            blocks: Vec::new(),
            current: LayoutBlock::default(),
            line: LayoutLine::default(),
        }
    }

    fn with_fonts(mut self, fonts: BTreeMap<Vec<u8>, Encoding<'a>>) -> Self {
        self.fonts = fonts;
        self
    }

    /// Decode a shown string with the current font, falling back to the
    /// byte-level decoding when the font or its encoding is unknown.
    fn decode(&self, bytes: &[u8]) -> String {
        self.font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .and_then(|encoding| lopdf::Document::decode_text(encoding, bytes).ok())
            .unwrap_or_else(|| decode_pdf_string(bytes))
    }

    fn apply(&mut self, op: &Operation) {
        let args = &op.operands;
        match op.operator.as_str() {
            "q" => self.ctm_stack.push(self.ctm),
            "Q" => {
                if let Some(m) = self.ctm_stack.pop() {
                    self.ctm = m;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(args) {
                    self.ctm = m.then(self.ctm);
                }
            }
            "BT" => {
                self.end_block();
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "ET" => self.end_block(),
            "Tf" => {
                self.font = args.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec);
                if let Some(size) = args.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = args.first().and_then(number) {
                    self.leading = l;
                }
            }
            "Td" | "TD" => {
                let tx = args.first().and_then(number).unwrap_or(0.0);
                let ty = args.get(1).and_then(number).unwrap_or(0.0);
                if op.operator == "TD" {
                    self.leading = -ty;
                }
                self.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(args) {
                    self.end_line();
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.move_line(0.0, -self.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = args.first() {
                    self.show(self.decode(bytes));
                }
            }
            "'" => {
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = args.first() {
                    self.show(self.decode(bytes));
                }
            }
            "\"" => {
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = args.get(2) {
                    self.show(self.decode(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = args.first() {
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&self.decode(bytes)),
                            // large negative kerning is a visual word gap
                            other => {
                                if number(other).is_some_and(|n| n < -250.0) {
                                    text.push(' ');
                                }
                            }
                        }
                    }
                    self.show(text);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.end_line();
        self.tlm = Matrix::translate(tx, ty).then(self.tlm);
        self.tm = self.tlm;
    }

    fn show(&mut self, text: String) {
        let advance = text.chars().count() as f32 * self.font_size * AVG_GLYPH_WIDTH;
        let trm = self.tm.then(self.ctm);
        let height = self.font_size * trm.y_scale();
        let width = advance * trm.x_scale();
        let (x, y) = (trm.e, trm.f);

        let bbox = [
            x,
            self.page_height - (y + height * ASCENT),
            x + width,
            self.page_height - (y - height * DESCENT),
        ];
        self.line.spans.push(LayoutSpan::new(text, bbox));
        self.tm = Matrix::translate(advance, 0.0).then(self.tm);
    }

    fn end_line(&mut self) {
        if !self.line.spans.is_empty() {
            self.current.lines.push(std::mem::take(&mut self.line));
        }
    }

    fn end_block(&mut self) {
        self.end_line();
        if !self.current.lines.is_empty() {
            self.blocks.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> PageLayout {
        self.end_block();
        PageLayout {
            blocks: self.blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Stream, StringFormat};

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn int(n: i64) -> Object {
        Object::Integer(n)
    }

    fn text(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    #[test]
    fn test_walker_builds_blocks_lines_and_spans() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), int(10)]),
            op("Td", vec![int(100), int(700)]),
            op("Tj", vec![text("Total Dues")]),
            op("Td", vec![int(0), int(-20)]),
            op("Tj", vec![text("12,345.67")]),
            op("ET", vec![]),
        ];
        let mut walker = LayoutWalker::new(792.0);
        for o in &ops {
            walker.apply(o);
        }
        let layout = walker.finish();

        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(layout.blocks[0].lines.len(), 2);
        let label = &layout.blocks[0].lines[0].spans[0];
        let value = &layout.blocks[0].lines[1].spans[0];
        assert_eq!(label.text, "Total Dues");
        assert_eq!(label.bbox[0], 100.0);
        // value sits below the label in top-down coordinates
        assert!(value.bbox[1] > label.bbox[3]);
    }

    #[test]
    fn test_tj_kerning_gap_becomes_space() {
        let ops = vec![
            op("BT", vec![]),
            op(
                "TJ",
                vec![Object::Array(vec![text("Card"), int(-300), text("No")])],
            ),
            op("ET", vec![]),
        ];
        let mut walker = LayoutWalker::new(792.0);
        for o in &ops {
            walker.apply(o);
        }
        let layout = walker.finish();
        assert_eq!(layout.blocks[0].lines[0].spans[0].text, "Card No");
    }

    #[test]
    fn test_utf16_strings_decode() {
        let bytes = [0xFE, 0xFF, 0x00, 0x41, 0x20, 0xB9];
        assert_eq!(decode_pdf_string(&bytes), "A₹");
    }

    fn name(n: &str) -> Object {
        Object::Name(n.as_bytes().to_vec())
    }

    /// One-page PDF whose font `F1` uses WinAnsiEncoding.
    fn win_ansi_pdf(content: &[u8]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", name("Font"));
        font.set("Subtype", name("Type1"));
        font.set("BaseFont", name("Helvetica"));
        font.set("Encoding", name("WinAnsiEncoding"));
        let font_id = doc.add_object(font);

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));

        let mut page = Dictionary::new();
        page.set("Type", name("Page"));
        page.set("Parent", Object::Reference(pages_id));
        page.set("MediaBox", Object::Array(vec![int(0), int(0), int(612), int(792)]));
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));
        let page_id = doc.add_object(page);

        let mut pages = Dictionary::new();
        pages.set("Type", name("Pages"));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        pages.set("Count", int(1));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", name("Catalog"));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_layout_spans_use_font_encoding() {
        // 0x80 is the euro sign in WinAnsi but a control char in Latin-1
        let pdf = win_ansi_pdf(b"BT /F1 12 Tf 100 700 Td (\x80 500.00) Tj ET");
        let doc = open_document(&DocumentSource::Bytes(pdf)).unwrap();
        let layout = doc.page_layout(0).unwrap();
        let span = &layout.blocks[0].lines[0].spans[0];
        assert_eq!(span.text, "\u{20ac} 500.00");
        assert_eq!(span.bbox[0], 100.0);
    }

    #[test]
    fn test_unknown_font_falls_back_to_bytes() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F9".to_vec()), int(10)]),
            op("Tj", vec![text("Minimum Due")]),
            op("ET", vec![]),
        ];
        let mut walker = LayoutWalker::new(792.0);
        for o in &ops {
            walker.apply(o);
        }
        assert_eq!(walker.finish().blocks[0].lines[0].spans[0].text, "Minimum Due");
    }

    #[test]
    fn test_garbage_bytes_fail_to_open() {
        let err = open_document(&DocumentSource::Bytes(b"not a pdf".to_vec()));
        assert!(err.is_err());
    }
}
