//! Immutable source text with line table and change history.

use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;

use crate::error::{Result, RuqlError};

use super::{TextChange, TextLocation, TextSpan};

/// One line of a [`SourceText`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLine {
    line_number: usize,
    span: TextSpan,
    line_break_len: usize,
}

impl TextLine {
    /// Zero-based line number.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Span of the line content, excluding the line break.
    #[must_use]
    pub fn span(&self) -> TextSpan {
        self.span
    }

    /// Span of the line including its line break, if any.
    #[must_use]
    pub fn span_including_line_break(&self) -> TextSpan {
        TextSpan::new(self.span.start, self.span.end + self.line_break_len)
    }
}

/// The text a [`SourceText`] was derived from, and how.
struct TextOrigin {
    previous: Arc<SourceText>,
    changes: Vec<TextChange>,
}

/// Immutable source text.
///
/// Always handled through `Arc`: derived texts keep a link to the text they
/// were produced from so that [`SourceText::changes_since`] can recover the
/// edit list between two versions.
pub struct SourceText {
    text: String,
    lines: Vec<TextLine>,
    origin: Option<TextOrigin>,
    container: ArcSwapOption<SourceTextContainer>,
}

impl SourceText {
    /// Creates a source text from a string.
    #[must_use]
    pub fn from(text: &str) -> Arc<Self> {
        Arc::new(Self::build(text.to_string(), None))
    }

    fn build(text: String, origin: Option<TextOrigin>) -> Self {
        let lines = compute_lines(&text);
        SourceText {
            text,
            lines,
            origin,
            container: ArcSwapOption::empty(),
        }
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The complete text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text within `span`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpan` if the span is not within the text or does not
    /// fall on character boundaries.
    pub fn text_in(&self, span: TextSpan) -> Result<&str> {
        self.text
            .get(span.start..span.end)
            .ok_or(RuqlError::InvalidSpan {
                start: span.start,
                end: span.end,
                length: self.len(),
            })
    }

    /// All lines; an empty text has a single empty line.
    #[must_use]
    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// Returns the line containing `position`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPosition` if `position > len()`.
    pub fn line_from_position(&self, position: usize) -> Result<TextLine> {
        if position > self.len() {
            return Err(RuqlError::InvalidPosition {
                position,
                length: self.len(),
            });
        }
        let index = self
            .lines
            .partition_point(|line| line.span.start <= position)
            .saturating_sub(1);
        Ok(self.lines[index])
    }

    /// Converts a position to a zero-based line/column location.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPosition` if `position > len()`.
    pub fn text_location(&self, position: usize) -> Result<TextLocation> {
        let line = self.line_from_position(position)?;
        Ok(TextLocation::new(
            line.line_number,
            position - line.span.start,
        ))
    }

    /// Converts a line/column location back to a position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLocation` if the line does not exist or the column is
    /// past the line's end (including its line break).
    pub fn position(&self, location: TextLocation) -> Result<usize> {
        let invalid = RuqlError::InvalidLocation {
            line: location.line,
            column: location.column,
        };
        let line = self.lines.get(location.line).ok_or(invalid.clone())?;
        let position = line.span.start + location.column;
        if position > line.span_including_line_break().end {
            return Err(invalid);
        }
        Ok(position)
    }

    /// Applies `changes` in order and returns the resulting text.
    ///
    /// Each change's span refers to the text produced by the changes before it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpan` if a change does not fit the text it applies to.
    pub fn with_changes(self: &Arc<Self>, changes: Vec<TextChange>) -> Result<Arc<Self>> {
        if changes.is_empty() {
            return Ok(Arc::clone(self));
        }

        let mut text = self.text.clone();
        for change in &changes {
            let span = change.span;
            if span.start > span.end
                || span.end > text.len()
                || !text.is_char_boundary(span.start)
                || !text.is_char_boundary(span.end)
            {
                return Err(RuqlError::InvalidSpan {
                    start: span.start,
                    end: span.end,
                    length: text.len(),
                });
            }
            text.replace_range(span.start..span.end, &change.new_text);
        }

        let origin = TextOrigin {
            previous: Arc::clone(self),
            changes,
        };
        Ok(Arc::new(Self::build(text, Some(origin))))
    }

    /// Replaces the text in `span` with `new_text`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpan` if the span is not within the text.
    pub fn replace(self: &Arc<Self>, span: TextSpan, new_text: &str) -> Result<Arc<Self>> {
        self.with_changes(vec![TextChange::new(span, new_text)])
    }

    /// Returns the changes that turn `old` into `self`.
    ///
    /// If `self` was not derived from `old`, a single change replacing all of
    /// `old` is returned.
    #[must_use]
    pub fn changes_since(self: &Arc<Self>, old: &Arc<SourceText>) -> Vec<TextChange> {
        if Arc::ptr_eq(self, old) {
            return Vec::new();
        }

        let mut path: Vec<&TextOrigin> = Vec::new();
        let mut candidate: &SourceText = self;
        let mut found = false;
        while let Some(origin) = &candidate.origin {
            path.push(origin);
            if Arc::ptr_eq(&origin.previous, old) {
                found = true;
                break;
            }
            candidate = &origin.previous;
        }

        if !found {
            return vec![TextChange::new(
                TextSpan::new(0, old.len()),
                self.text.clone(),
            )];
        }

        path.iter()
            .rev()
            .flat_map(|origin| origin.changes.iter().cloned())
            .collect()
    }

    /// Returns the container for this text, creating it on first use.
    ///
    /// Concurrent first calls may each build a candidate; only the first one
    /// published is ever returned.
    #[must_use]
    pub fn container(self: &Arc<Self>) -> Arc<SourceTextContainer> {
        if let Some(existing) = self.container.load_full() {
            return existing;
        }

        let candidate = Arc::new(SourceTextContainer {
            text: Arc::downgrade(self),
        });
        let previous = self
            .container
            .compare_and_swap(&None::<Arc<SourceTextContainer>>, Some(Arc::clone(&candidate)));
        match &*previous {
            Some(winner) => Arc::clone(winner),
            None => candidate,
        }
    }
}

impl fmt::Debug for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceText")
            .field("text", &self.text)
            .field("lines", &self.lines.len())
            .field("derived", &self.origin.is_some())
            .finish()
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Handle through which hosts observe a text snapshot.
#[derive(Debug)]
pub struct SourceTextContainer {
    text: Weak<SourceText>,
}

impl SourceTextContainer {
    /// The text this container was created for, if it is still alive.
    #[must_use]
    pub fn current(&self) -> Option<Arc<SourceText>> {
        self.text.upgrade()
    }
}

fn compute_lines(text: &str) -> Vec<TextLine> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut line_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let break_len = match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
            b'\r' | b'\n' => 1,
            _ => 0,
        };
        if break_len > 0 {
            lines.push(TextLine {
                line_number: lines.len(),
                span: TextSpan::new(line_start, i),
                line_break_len: break_len,
            });
            i += break_len;
            line_start = i;
        } else {
            i += 1;
        }
    }
    lines.push(TextLine {
        line_number: lines.len(),
        span: TextSpan::new(line_start, bytes.len()),
        line_break_len: 0,
    });
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_on_all_break_kinds() {
        let text = SourceText::from("a\nbc\r\nd\re");
        let spans: Vec<_> = text.lines().iter().map(TextLine::span).collect();
        assert_eq!(
            spans,
            vec![
                TextSpan::new(0, 1),
                TextSpan::new(2, 4),
                TextSpan::new(6, 7),
                TextSpan::new(8, 9)
            ]
        );
    }

    #[test]
    fn test_location_roundtrip() {
        let text = SourceText::from("SELECT *\nFROM t");
        let location = text.text_location(11).unwrap();
        assert_eq!(location, TextLocation::new(1, 2));
        assert_eq!(text.position(location).unwrap(), 11);
    }

    #[test]
    fn test_position_past_end_rejected() {
        let text = SourceText::from("abc");
        assert!(text.line_from_position(3).is_ok());
        assert_eq!(
            text.line_from_position(4),
            Err(RuqlError::InvalidPosition {
                position: 4,
                length: 3
            })
        );
        assert!(text.position(TextLocation::new(1, 0)).is_err());
    }

    #[test]
    fn test_changes_since_follows_chain() {
        let v1 = SourceText::from("SELECT 1");
        let v2 = v1.replace(TextSpan::new(7, 8), "2").unwrap();
        let v3 = v2.with_changes(vec![TextChange::insert(8, " + 3")]).unwrap();
        assert_eq!(v3.text(), "SELECT 2 + 3");

        let changes = v3.changes_since(&v1);
        assert_eq!(
            changes,
            vec![
                TextChange::new(TextSpan::new(7, 8), "2"),
                TextChange::insert(8, " + 3")
            ]
        );
        assert!(v3.changes_since(&v3).is_empty());
    }

    #[test]
    fn test_changes_since_unrelated_text_replaces_everything() {
        let a = SourceText::from("abc");
        let b = SourceText::from("xyz");
        assert_eq!(
            b.changes_since(&a),
            vec![TextChange::new(TextSpan::new(0, 3), "xyz")]
        );
    }

    #[test]
    fn test_container_is_published_once() {
        let text = SourceText::from("SELECT 1");
        let first = text.container();
        let second = text.container();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.current().unwrap(), &text));
    }

    #[test]
    fn test_container_race_publishes_single_winner() {
        let text = SourceText::from("SELECT 1");
        let containers: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| text.container())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for container in &containers {
            assert!(Arc::ptr_eq(container, &containers[0]));
        }
    }
}
