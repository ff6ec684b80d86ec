//! Diagnostics reported by the lexer, parser and binder.
//!
//! Every phase owns its own append-only [`DiagnosticBag`]. Consumers that want
//! a single list concatenate the bags in phase order: lexical, syntactic,
//! semantic. Within a bag diagnostics appear in the order they were found,
//! which for all three phases is source order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::text::TextSpan;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// The phase that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Lexical,
    Syntactic,
    Semantic,
}

/// Enumerated diagnostic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticId {
    // ==================== Lexical ====================
    IllegalInputCharacter,
    UnterminatedComment,
    UnterminatedString,
    UnterminatedQuotedIdentifier,
    UnterminatedParenthesizedIdentifier,
    InvalidInteger,
    InvalidReal,

    // ==================== Syntactic ====================
    TokenExpected,
    NestingTooDeep,

    // ==================== Semantic: symbols ====================
    UndeclaredTable,
    UndeclaredVariable,
    UndeclaredFunction,
    UndeclaredAggregate,
    UndeclaredMethod,
    UndeclaredProperty,
    UndeclaredType,
    ColumnTableOrVariableNotDeclared,
    UndeclaredColumn,
    AmbiguousColumnRef,
    AmbiguousInvocation,
    DuplicateTableRefInFrom,
    InvalidRowReference,

    // ==================== Semantic: types ====================
    CannotConvert,
    CannotApplyUnaryOperator,
    CannotApplyBinaryOperator,
    AmbiguousUnaryOperator,
    AmbiguousBinaryOperator,

    // ==================== Semantic: queries ====================
    AggregateInWhere,
    AggregateInOn,
    AggregateInGroupBy,
    AggregateCannotContainAggregate,
    AggregateDoesNotSupportType,
    SelectExpressionNotAggregatedOrGrouped,
    OrderByItemsMustBeInSelectListIfDistinct,
    OrderByItemsMustBeInSelectListIfUnionSpecified,
    ConstantExpressionInOrderBy,
    TopWithTiesRequiresOrderBy,
    InvalidTopValue,
    MustSpecifyTableToSelectFrom,
    DifferentExpressionCountInBinaryQuery,
    TooManyExpressionsInSelectListOfSubquery,
    WildcardNotAllowed,
}

impl DiagnosticId {
    /// The phase that reports this kind.
    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            DiagnosticId::IllegalInputCharacter
            | DiagnosticId::UnterminatedComment
            | DiagnosticId::UnterminatedString
            | DiagnosticId::UnterminatedQuotedIdentifier
            | DiagnosticId::UnterminatedParenthesizedIdentifier
            | DiagnosticId::InvalidInteger
            | DiagnosticId::InvalidReal => Phase::Lexical,
            DiagnosticId::TokenExpected | DiagnosticId::NestingTooDeep => Phase::Syntactic,
            _ => Phase::Semantic,
        }
    }

    /// Default severity for this kind.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticId::ConstantExpressionInOrderBy => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Message template; `{0}`, `{1}`, ... are replaced by the arguments.
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            DiagnosticId::IllegalInputCharacter => "Invalid character in input '{0}'.",
            DiagnosticId::UnterminatedComment => "Comment is not properly terminated.",
            DiagnosticId::UnterminatedString => "String is not properly terminated.",
            DiagnosticId::UnterminatedQuotedIdentifier => {
                "Quoted identifier is not properly terminated."
            }
            DiagnosticId::UnterminatedParenthesizedIdentifier => {
                "Parenthesized identifier is not properly terminated."
            }
            DiagnosticId::InvalidInteger => "'{0}' is not a valid integer.",
            DiagnosticId::InvalidReal => "'{0}' is not a valid number.",
            DiagnosticId::TokenExpected => "Found '{0}' but expected '{1}'.",
            DiagnosticId::NestingTooDeep => "Nesting depth exceeds {0}.",
            DiagnosticId::UndeclaredTable => "Table '{0}' does not exist.",
            DiagnosticId::UndeclaredVariable => "Variable '@{0}' does not exist.",
            DiagnosticId::UndeclaredFunction => {
                "Function '{0}' with argument types ({1}) does not exist."
            }
            DiagnosticId::UndeclaredAggregate => "Aggregate '{0}' does not exist.",
            DiagnosticId::UndeclaredMethod => {
                "Type '{0}' does not have a method '{1}' with argument types ({2})."
            }
            DiagnosticId::UndeclaredProperty => "Type '{0}' does not have a property '{1}'.",
            DiagnosticId::UndeclaredType => "Type '{0}' does not exist.",
            DiagnosticId::ColumnTableOrVariableNotDeclared => {
                "Column, table or variable '{0}' does not exist."
            }
            DiagnosticId::UndeclaredColumn => "Table '{0}' does not have a column '{1}'.",
            DiagnosticId::AmbiguousColumnRef => "Column reference '{0}' is ambiguous between {1}.",
            DiagnosticId::AmbiguousInvocation => "Invocation of '{0}' is ambiguous between {1}.",
            DiagnosticId::DuplicateTableRefInFrom => {
                "Table '{0}' is referenced more than once in FROM; use aliases to tell the references apart."
            }
            DiagnosticId::InvalidRowReference => "Table '{0}' cannot be used as a value.",
            DiagnosticId::CannotConvert => "Cannot convert from '{0}' to '{1}'.",
            DiagnosticId::CannotApplyUnaryOperator => {
                "Operator '{0}' cannot be applied to operand of type '{1}'."
            }
            DiagnosticId::CannotApplyBinaryOperator => {
                "Operator '{0}' cannot be applied to operands of type '{1}' and '{2}'."
            }
            DiagnosticId::AmbiguousUnaryOperator => {
                "Operator '{0}' is ambiguous on operand of type '{1}'."
            }
            DiagnosticId::AmbiguousBinaryOperator => {
                "Operator '{0}' is ambiguous on operands of type '{1}' and '{2}'."
            }
            DiagnosticId::AggregateInWhere => "Aggregates are not allowed in WHERE.",
            DiagnosticId::AggregateInOn => "Aggregates are not allowed in ON.",
            DiagnosticId::AggregateInGroupBy => "Aggregates are not allowed in GROUP BY.",
            DiagnosticId::AggregateCannotContainAggregate => {
                "Aggregate '{0}' cannot contain another aggregate."
            }
            DiagnosticId::AggregateDoesNotSupportType => {
                "Aggregate '{0}' does not support values of type '{1}'."
            }
            DiagnosticId::SelectExpressionNotAggregatedOrGrouped => {
                "'{0}' must be aggregated or appear in the GROUP BY clause."
            }
            DiagnosticId::OrderByItemsMustBeInSelectListIfDistinct => {
                "ORDER BY items must appear in the select list if DISTINCT is specified."
            }
            DiagnosticId::OrderByItemsMustBeInSelectListIfUnionSpecified => {
                "ORDER BY items must appear in the select list if the query combines results."
            }
            DiagnosticId::ConstantExpressionInOrderBy => {
                "Ordering by a constant expression has no effect."
            }
            DiagnosticId::TopWithTiesRequiresOrderBy => "TOP WITH TIES requires an ORDER BY clause.",
            DiagnosticId::InvalidTopValue => "TOP value '{0}' must be a non-negative integer.",
            DiagnosticId::MustSpecifyTableToSelectFrom => "SELECT * requires a FROM clause.",
            DiagnosticId::DifferentExpressionCountInBinaryQuery => {
                "All queries combined using {0} must have the same number of expressions in their select lists."
            }
            DiagnosticId::TooManyExpressionsInSelectListOfSubquery => {
                "Only one expression can be selected by a subquery that is not introduced with EXISTS."
            }
            DiagnosticId::WildcardNotAllowed => {
                "'*' is not allowed in the select list of a scalar subquery."
            }
        }
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub span: TextSpan,
    pub args: Vec<String>,
    pub severity: Severity,
}

impl Diagnostic {
    /// Creates a diagnostic with the default severity of `id`.
    #[must_use]
    pub fn new(id: DiagnosticId, span: TextSpan, args: Vec<String>) -> Self {
        Diagnostic {
            id,
            span,
            args,
            severity: id.severity(),
        }
    }

    /// The formatted message.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = self.id.template().to_string();
        for (i, arg) in self.args.iter().enumerate() {
            message = message.replace(&format!("{{{i}}}"), arg);
        }
        message
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{severity}[{:?}] {:?}: {}", self.id, self.span, self.message())
    }
}

/// Append-only diagnostic collection owned by a single phase.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn report(&mut self, id: DiagnosticId, span: TextSpan, args: Vec<String>) {
        self.diagnostics.push(Diagnostic::new(id, span, args));
    }

    pub fn report_token_expected(&mut self, span: TextSpan, found: &str, expected: &str) {
        self.report(
            DiagnosticId::TokenExpected,
            span,
            vec![found.to_string(), expected.to_string()],
        );
    }

    pub fn report_cannot_convert(&mut self, span: TextSpan, from: &str, to: &str) {
        self.report(
            DiagnosticId::CannotConvert,
            span,
            vec![from.to_string(), to.to_string()],
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_formats_arguments() {
        let diagnostic = Diagnostic::new(
            DiagnosticId::CannotApplyBinaryOperator,
            TextSpan::new(0, 5),
            vec!["+".into(), "bool".into(), "int".into()],
        );
        assert_eq!(
            diagnostic.message(),
            "Operator '+' cannot be applied to operands of type 'bool' and 'int'."
        );
        assert!(diagnostic.to_string().starts_with("error[CannotApplyBinaryOperator] 0..5"));
    }

    #[test]
    fn test_phase_classification() {
        assert_eq!(DiagnosticId::UnterminatedString.phase(), Phase::Lexical);
        assert_eq!(DiagnosticId::TokenExpected.phase(), Phase::Syntactic);
        assert_eq!(DiagnosticId::NestingTooDeep.phase(), Phase::Syntactic);
        assert_eq!(DiagnosticId::CannotConvert.phase(), Phase::Semantic);
        assert!(Phase::Lexical < Phase::Syntactic);
    }

    #[test]
    fn test_bag_preserves_report_order() {
        let mut bag = DiagnosticBag::new();
        bag.report_token_expected(TextSpan::empty(4), ")", "<identifier>");
        bag.report_token_expected(TextSpan::empty(2), ")", ",");
        let spans: Vec<_> = bag.iter().map(|d| d.span.start).collect();
        assert_eq!(spans, vec![4, 2]);
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_order_by_constant_is_warning() {
        assert_eq!(
            DiagnosticId::ConstantExpressionInOrderBy.severity(),
            Severity::Warning
        );
    }
}
