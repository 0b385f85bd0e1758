//! Page layout tree (blocks → lines → spans) and its flattening into
//! positioned fragments.

use cardstmt_core::TextFragment;

/// One run of text with its bounding box `[x0, y0, x1, y1]`, top-down.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSpan {
    pub text: String,
    pub bbox: [f32; 4],
}

impl LayoutSpan {
    pub fn new(text: impl Into<String>, bbox: [f32; 4]) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutLine {
    pub spans: Vec<LayoutSpan>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutBlock {
    pub lines: Vec<LayoutLine>,
}

/// Structured text of a single page as produced by the conversion layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub blocks: Vec<LayoutBlock>,
}

impl PageLayout {
    /// A layout with one block per span; handy when the source has no
    /// block structure (and in tests).
    pub fn from_spans(spans: impl IntoIterator<Item = LayoutSpan>) -> Self {
        Self {
            blocks: spans
                .into_iter()
                .map(|span| LayoutBlock {
                    lines: vec![LayoutLine { spans: vec![span] }],
                })
                .collect(),
        }
    }
}

/// Flatten a page layout in block/line/span order. Text is trimmed and
/// spans left empty by trimming are dropped.
pub fn collect_fragments(page: &PageLayout) -> Vec<TextFragment> {
    page.blocks
        .iter()
        .flat_map(|block| &block.lines)
        .flat_map(|line| &line.spans)
        .filter_map(|span| {
            let text = span.text.trim();
            if text.is_empty() {
                None
            } else {
                Some(TextFragment::new(text, span.bbox))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_keeps_traversal_order_and_drops_blanks() {
        let page = PageLayout {
            blocks: vec![
                LayoutBlock {
                    lines: vec![LayoutLine {
                        spans: vec![
                            LayoutSpan::new(" Payment Due Date ", [300.0, 100.0, 380.0, 110.0]),
                            LayoutSpan::new("   ", [390.0, 100.0, 395.0, 110.0]),
                        ],
                    }],
                },
                LayoutBlock {
                    lines: vec![LayoutLine {
                        spans: vec![LayoutSpan::new("10/07/2024", [305.0, 120.0, 360.0, 130.0])],
                    }],
                },
            ],
        };

        let frags = collect_fragments(&page);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].text, "Payment Due Date");
        assert_eq!(frags[0].cx, 340.0);
        assert_eq!(frags[1].text, "10/07/2024");
    }

    #[test]
    fn test_from_spans_round_trips() {
        let page = PageLayout::from_spans([
            LayoutSpan::new("a", [0.0, 0.0, 1.0, 1.0]),
            LayoutSpan::new("b", [2.0, 0.0, 3.0, 1.0]),
        ]);
        let texts: Vec<_> = collect_fragments(&page).into_iter().map(|f| f.text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}
