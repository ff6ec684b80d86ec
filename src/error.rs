//! Error types for ruql API contract violations.
//!
//! Malformed query text never produces an error: lexical, syntactic and
//! semantic problems are reported as [`Diagnostic`](crate::diagnostics::Diagnostic)s
//! attached to otherwise complete trees. `RuqlError` is reserved for callers
//! handing the library arguments it cannot interpret.

use thiserror::Error;

/// Result type alias using [`RuqlError`].
pub type Result<T> = std::result::Result<T, RuqlError>;

/// Error types for ruql operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuqlError {
    /// A text position outside `0..=length`.
    #[error("Invalid position {position}: text length is {length}")]
    InvalidPosition { position: usize, length: usize },

    /// A line/column pair that does not denote a position in the text.
    #[error("Invalid location: line {line}, column {column}")]
    InvalidLocation { line: usize, column: usize },

    /// A span that does not lie within the text.
    #[error("Invalid span {start}..{end}: text length is {length}")]
    InvalidSpan {
        start: usize,
        end: usize,
        length: usize,
    },

    /// A compilation was asked for a semantic model without a syntax tree.
    #[error("Compilation has no syntax tree")]
    MissingSyntaxTree,

    /// Catalog construction errors (duplicate table, duplicate variable, etc.).
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A node id that does not belong to the tree it was used with.
    #[error("Unknown syntax node: {0}")]
    UnknownNode(usize),
}
