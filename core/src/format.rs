//! Text Formatter
//!
//! Pure preparation of canonical answer text for rendering: paragraphs and
//! bold emphasis, nothing else. No UI toolkit types leak in here; the
//! output is a plain block/span tree any surface can map onto its own
//! widgets.
//!
//! Rules:
//! - paragraphs split on the blank-line boundary (`\n\n`), order preserved
//! - `**text**` pairs become emphasis spans within a paragraph
//! - an unmatched `**` is literal text, never an error
//! - empty input yields no blocks

use serde::{Deserialize, Serialize};

/// Emphasis delimiter
const MARKER: &str = "**";

/// Paragraph separator
const PARAGRAPH_SEP: &str = "\n\n";

/// One inline run of text within a paragraph
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Span {
    /// Plain text, rendered as-is
    Plain(String),
    /// Emphasized text (delimiters already stripped)
    Emphasis(String),
}

impl Span {
    /// The text content, without delimiters
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Emphasis(text) => text,
        }
    }
}

/// One paragraph of formatted output
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Inline spans in original order
    pub spans: Vec<Span>,
}

/// Format answer text into renderable blocks.
///
/// Deterministic and side-effect-free. Empty input produces an empty
/// sequence rather than an empty paragraph.
#[must_use]
pub fn format_text(text: &str) -> Vec<Block> {
    if text.is_empty() {
        return Vec::new();
    }

    text.split(PARAGRAPH_SEP)
        .map(|paragraph| Block {
            spans: parse_spans(paragraph),
        })
        .collect()
}

/// Split one paragraph into plain and emphasized spans.
///
/// Scans for `**...**` pairs left to right, shortest match first. A lone
/// trailing `**` has no partner and stays literal.
fn parse_spans(paragraph: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = paragraph;

    while let Some(open) = rest.find(MARKER) {
        let after_open = &rest[open + MARKER.len()..];
        let Some(close) = after_open.find(MARKER) else {
            // Unmatched opener: everything left is literal.
            break;
        };

        if open > 0 {
            spans.push(Span::Plain(rest[..open].to_string()));
        }
        spans.push(Span::Emphasis(after_open[..close].to_string()));
        rest = &after_open[close + MARKER.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::Plain(rest.to_string()));
    }
    spans
}
