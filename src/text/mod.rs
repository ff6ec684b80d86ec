//! Source text, spans and line mapping.

mod source_text;

pub use source_text::{SourceText, SourceTextContainer, TextLine};

use std::fmt;

use serde::{Deserialize, Serialize};

/// A byte-offset range into a source text.
///
/// `start` is inclusive, `end` exclusive. Zero-width spans mark positions,
/// e.g. tokens synthesized by error recovery.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    /// Creates a span from start (inclusive) to end (exclusive).
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Creates a span from a start offset and a length.
    #[must_use]
    pub const fn from_length(start: usize, length: usize) -> Self {
        Self {
            start,
            end: start + length,
        }
    }

    /// Creates a zero-width span at `position`.
    #[must_use]
    pub const fn empty(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    /// Whether the span is zero-width.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Whether `position` lies within the span (`end` excluded).
    #[must_use]
    pub const fn contains(self, position: usize) -> bool {
        self.start <= position && position < self.end
    }

    /// Whether `other` lies completely within this span.
    #[must_use]
    pub const fn contains_span(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether the two spans share at least one position, or touch.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

/// Zero-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextLocation {
    pub line: usize,
    pub column: usize,
}

impl TextLocation {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Rendered one-based for humans.
        write!(f, "({}, {})", self.line + 1, self.column + 1)
    }
}

/// Replacement of the text in `span` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    pub span: TextSpan,
    pub new_text: String,
}

impl TextChange {
    #[must_use]
    pub fn new(span: TextSpan, new_text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: new_text.into(),
        }
    }

    /// An insertion of `text` at `position`.
    #[must_use]
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Self::new(TextSpan::empty(position), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_containment() {
        let outer = TextSpan::new(2, 10);
        assert!(outer.contains(2));
        assert!(!outer.contains(10));
        assert!(outer.contains_span(TextSpan::new(4, 10)));
        assert!(outer.contains_span(TextSpan::empty(10)));
        assert!(!outer.contains_span(TextSpan::new(1, 3)));
    }

    #[test]
    fn test_span_merge() {
        let merged = TextSpan::new(5, 7).merge(TextSpan::new(1, 3));
        assert_eq!(merged, TextSpan::new(1, 7));
        assert_eq!(merged.len(), 6);
    }

    #[test]
    fn test_span_debug_format() {
        assert_eq!(format!("{:?}", TextSpan::new(3, 8)), "3..8");
    }
}
