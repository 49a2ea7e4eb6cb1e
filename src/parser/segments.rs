use std::sync::LazyLock;

use regex::Regex;

// Broader than a plain "\n\n" split: a line of only spaces or tabs also ends a paragraph.
/// A line break followed by one or more blank (or whitespace-only) lines.
static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").unwrap());

/// One blank-line-delimited paragraph of a raw description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub lowercased: String,
}

impl<'a> Segment<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            lowercased: text.to_lowercase(),
        }
    }

    /// Everything after the first `:`, or `None` when the segment has no label delimiter.
    pub fn body(&self) -> Option<&'a str> {
        self.text.split_once(':').map(|(_, body)| body)
    }
}

/// Split raw text into segments in document order. Whitespace-only paragraphs are skipped.
pub fn segments(raw: &str) -> impl Iterator<Item = Segment<'_>> {
    PARAGRAPH_BREAK_RE
        .split(raw)
        .filter(|chunk| !chunk.trim().is_empty())
        .map(Segment::new)
}

// ── Tests ──
