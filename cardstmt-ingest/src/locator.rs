//! Label → value proximity search, by line adjacency or by page geometry.
//!
//! Both modes return the first qualifying token and never aggregate; a miss
//! is `None` so callers can fall through to their next strategy.

use cardstmt_core::TextFragment;
use regex::Regex;

/// Grammar a located value must satisfy.
#[derive(Debug, Clone, Copy)]
pub enum ValueKind<'g> {
    /// Currency-amount shape; capture group 1 (or the whole match) is the token
    Amount(&'g Regex),
    /// Any of the bank's date grammars, tried in order
    Date(&'g [Regex]),
    /// Any non-empty text
    Any,
}

impl ValueKind<'_> {
    /// First token in `text` satisfying this grammar.
    pub fn find(&self, text: &str) -> Option<String> {
        match self {
            ValueKind::Amount(re) => capture_token(re, text),
            ValueKind::Date(grammars) => grammars.iter().find_map(|re| capture_token(re, text)),
            ValueKind::Any => {
                let t = text.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

pub(crate) fn capture_token(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    let m = caps.get(1).or_else(|| caps.get(0))?;
    let token = m.as_str().trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// How far around a label line to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWindow {
    pub forward: usize,
    pub back: usize,
}

impl LineWindow {
    pub const fn new(forward: usize, back: usize) -> Self {
        Self { forward, back }
    }
}

/// Index of the first line among the first `limit` that `label` matches.
pub fn find_label_line(lines: &[String], limit: usize, label: &Regex) -> Option<usize> {
    lines.iter().take(limit).position(|l| label.is_match(l))
}

/// Look for a value on the label line itself, then up to `window.forward`
/// lines after it, then up to `window.back` lines before it.
pub fn find_near_line(
    lines: &[String],
    idx: usize,
    kind: ValueKind<'_>,
    window: LineWindow,
) -> Option<String> {
    if idx >= lines.len() {
        return None;
    }
    let forward = (idx..=idx + window.forward).take_while(|&i| i < lines.len());
    let back = (1..=window.back).filter_map(|k| idx.checked_sub(k));
    forward.chain(back).find_map(|i| kind.find(&lines[i]))
}

/// Row alignment tolerances for the same-row-right search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowTolerance {
    /// Max difference between the tops of label and value
    pub y_tol: f32,
    /// Value must start at least this far right of the label's right edge
    pub x_min_offset: f32,
}

impl Default for RowTolerance {
    fn default() -> Self {
        Self {
            y_tol: 7.0,
            x_min_offset: 2.0,
        }
    }
}

/// Column tolerances for the nearest-below search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnTolerance {
    /// Max gap between the label's bottom and the value's top
    pub max_vdist: f32,
    /// Horizontal slack on each side of the label's span
    pub x_tol: f32,
}

/// Top-most fragment whose text `label` matches.
pub fn find_label_fragment<'f>(fragments: &'f [TextFragment], label: &Regex) -> Option<&'f TextFragment> {
    fragments
        .iter()
        .filter(|f| label.is_match(&f.text))
        .fold(None, |best: Option<&TextFragment>, f| match best {
            Some(b) if b.y0 <= f.y0 => Some(b),
            _ => Some(f),
        })
}

/// Leftmost fragment on the label's row, strictly to its right, matching `kind`.
pub fn same_row_right<'f>(
    fragments: &'f [TextFragment],
    label: &TextFragment,
    kind: ValueKind<'_>,
    tol: RowTolerance,
) -> Option<&'f TextFragment> {
    let mut row: Vec<&TextFragment> = fragments
        .iter()
        .filter(|f| (f.y0 - label.y0).abs() <= tol.y_tol && f.x0 > label.x1 + tol.x_min_offset)
        .collect();
    row.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    row.into_iter().find(|f| kind.matches(&f.text))
}

/// Closest fragment below the label whose center falls in the label's column.
pub fn nearest_below<'f>(
    fragments: &'f [TextFragment],
    label: &TextFragment,
    kind: ValueKind<'_>,
    tol: ColumnTolerance,
) -> Option<&'f TextFragment> {
    let mut best: Option<(&TextFragment, f32)> = None;
    for f in fragments {
        if f.y0 <= label.y1 {
            continue;
        }
        if f.cx < label.x0 - tol.x_tol || f.cx > label.x1 + tol.x_tol {
            continue;
        }
        let dy = f.y0 - label.y1;
        if dy > tol.max_vdist || !kind.matches(&f.text) {
            continue;
        }
        if best.is_none_or(|(_, best_dy)| dy < best_dy) {
            best = Some((f, dy));
        }
    }
    best.map(|(f, _)| f)
}

/// Text of every fragment whose top lies in `[top, bottom]`, left to right.
pub fn band_text(fragments: &[TextFragment], top: f32, bottom: f32) -> String {
    let mut band: Vec<&TextFragment> = fragments
        .iter()
        .filter(|f| f.y0 >= top && f.y0 <= bottom)
        .collect();
    band.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    band.iter().map(|f| f.text.as_str()).collect::<Vec<_>>().join(" ")
}
