//! Token and trivia definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::text::{SourceText, TextSpan};
use crate::types::Value;

/// Kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    EndOfFile,
    BadToken,
    IdentifierToken,
    NumericLiteralToken,
    StringLiteralToken,

    // ==================== Punctuation ====================
    PlusToken,
    MinusToken,
    AsteriskToken,
    AsteriskAsteriskToken,
    SlashToken,
    PercentToken,
    AmpersandToken,
    BarToken,
    CaretToken,
    TildeToken,
    LessLessToken,
    GreaterGreaterToken,
    EqualsToken,
    EqualsEqualsToken,
    ExclamationEqualsToken,
    LessGreaterToken,
    LessToken,
    LessEqualsToken,
    GreaterToken,
    GreaterEqualsToken,
    ExclamationLessToken,
    ExclamationGreaterToken,
    LeftParenthesisToken,
    RightParenthesisToken,
    CommaToken,
    DotToken,
    AtToken,

    // ==================== Keywords ====================
    SelectKeyword,
    DistinctKeyword,
    AllKeyword,
    TopKeyword,
    WithKeyword,
    FromKeyword,
    WhereKeyword,
    GroupKeyword,
    ByKeyword,
    HavingKeyword,
    OrderKeyword,
    AscKeyword,
    DescKeyword,
    AsKeyword,
    OnKeyword,
    JoinKeyword,
    InnerKeyword,
    LeftKeyword,
    RightKeyword,
    FullKeyword,
    OuterKeyword,
    CrossKeyword,
    UnionKeyword,
    IntersectKeyword,
    ExceptKeyword,
    AndKeyword,
    OrKeyword,
    NotKeyword,
    IsKeyword,
    NullKeyword,
    TrueKeyword,
    FalseKeyword,
    LikeKeyword,
    BetweenKeyword,
    InKeyword,
    CaseKeyword,
    WhenKeyword,
    ThenKeyword,
    ElseKeyword,
    EndKeyword,
    CastKeyword,
    CoalesceKeyword,
    NullIfKeyword,
    ExistsKeyword,

    // ==================== Contextual keywords ====================
    TiesKeyword,
}

const KEYWORDS: &[(&str, SyntaxKind)] = &[
    ("SELECT", SyntaxKind::SelectKeyword),
    ("DISTINCT", SyntaxKind::DistinctKeyword),
    ("ALL", SyntaxKind::AllKeyword),
    ("TOP", SyntaxKind::TopKeyword),
    ("WITH", SyntaxKind::WithKeyword),
    ("FROM", SyntaxKind::FromKeyword),
    ("WHERE", SyntaxKind::WhereKeyword),
    ("GROUP", SyntaxKind::GroupKeyword),
    ("BY", SyntaxKind::ByKeyword),
    ("HAVING", SyntaxKind::HavingKeyword),
    ("ORDER", SyntaxKind::OrderKeyword),
    ("ASC", SyntaxKind::AscKeyword),
    ("DESC", SyntaxKind::DescKeyword),
    ("AS", SyntaxKind::AsKeyword),
    ("ON", SyntaxKind::OnKeyword),
    ("JOIN", SyntaxKind::JoinKeyword),
    ("INNER", SyntaxKind::InnerKeyword),
    ("LEFT", SyntaxKind::LeftKeyword),
    ("RIGHT", SyntaxKind::RightKeyword),
    ("FULL", SyntaxKind::FullKeyword),
    ("OUTER", SyntaxKind::OuterKeyword),
    ("CROSS", SyntaxKind::CrossKeyword),
    ("UNION", SyntaxKind::UnionKeyword),
    ("INTERSECT", SyntaxKind::IntersectKeyword),
    ("EXCEPT", SyntaxKind::ExceptKeyword),
    ("AND", SyntaxKind::AndKeyword),
    ("OR", SyntaxKind::OrKeyword),
    ("NOT", SyntaxKind::NotKeyword),
    ("IS", SyntaxKind::IsKeyword),
    ("NULL", SyntaxKind::NullKeyword),
    ("TRUE", SyntaxKind::TrueKeyword),
    ("FALSE", SyntaxKind::FalseKeyword),
    ("LIKE", SyntaxKind::LikeKeyword),
    ("BETWEEN", SyntaxKind::BetweenKeyword),
    ("IN", SyntaxKind::InKeyword),
    ("CASE", SyntaxKind::CaseKeyword),
    ("WHEN", SyntaxKind::WhenKeyword),
    ("THEN", SyntaxKind::ThenKeyword),
    ("ELSE", SyntaxKind::ElseKeyword),
    ("END", SyntaxKind::EndKeyword),
    ("CAST", SyntaxKind::CastKeyword),
    ("COALESCE", SyntaxKind::CoalesceKeyword),
    ("NULLIF", SyntaxKind::NullIfKeyword),
    ("EXISTS", SyntaxKind::ExistsKeyword),
];

impl SyntaxKind {
    /// Looks up a reserved keyword, ignoring case.
    #[must_use]
    pub fn keyword(text: &str) -> Option<SyntaxKind> {
        KEYWORDS
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(text))
            .map(|(_, kind)| *kind)
    }

    /// Looks up a contextual keyword, ignoring case.
    #[must_use]
    pub fn contextual_keyword(text: &str) -> Option<SyntaxKind> {
        text.eq_ignore_ascii_case("TIES")
            .then_some(SyntaxKind::TiesKeyword)
    }

    #[must_use]
    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self)
    }

    #[must_use]
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            SyntaxKind::NumericLiteralToken
                | SyntaxKind::StringLiteralToken
                | SyntaxKind::NullKeyword
                | SyntaxKind::TrueKeyword
                | SyntaxKind::FalseKeyword
        )
    }

    /// Text used when the token is named in a diagnostic.
    #[must_use]
    pub fn display_text(self) -> &'static str {
        if let Some((text, _)) = KEYWORDS.iter().find(|(_, kind)| *kind == self) {
            return text;
        }
        match self {
            SyntaxKind::EndOfFile => "<end-of-file>",
            SyntaxKind::BadToken => "<bad-token>",
            SyntaxKind::IdentifierToken => "<identifier>",
            SyntaxKind::NumericLiteralToken => "<numeric-literal>",
            SyntaxKind::StringLiteralToken => "<string-literal>",
            SyntaxKind::PlusToken => "+",
            SyntaxKind::MinusToken => "-",
            SyntaxKind::AsteriskToken => "*",
            SyntaxKind::AsteriskAsteriskToken => "**",
            SyntaxKind::SlashToken => "/",
            SyntaxKind::PercentToken => "%",
            SyntaxKind::AmpersandToken => "&",
            SyntaxKind::BarToken => "|",
            SyntaxKind::CaretToken => "^",
            SyntaxKind::TildeToken => "~",
            SyntaxKind::LessLessToken => "<<",
            SyntaxKind::GreaterGreaterToken => ">>",
            SyntaxKind::EqualsToken => "=",
            SyntaxKind::EqualsEqualsToken => "==",
            SyntaxKind::ExclamationEqualsToken => "!=",
            SyntaxKind::LessGreaterToken => "<>",
            SyntaxKind::LessToken => "<",
            SyntaxKind::LessEqualsToken => "<=",
            SyntaxKind::GreaterToken => ">",
            SyntaxKind::GreaterEqualsToken => ">=",
            SyntaxKind::ExclamationLessToken => "!<",
            SyntaxKind::ExclamationGreaterToken => "!>",
            SyntaxKind::LeftParenthesisToken => "(",
            SyntaxKind::RightParenthesisToken => ")",
            SyntaxKind::CommaToken => ",",
            SyntaxKind::DotToken => ".",
            SyntaxKind::AtToken => "@",
            SyntaxKind::TiesKeyword => "TIES",
            _ => "<keyword>",
        }
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

/// Kind of a trivia run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriviaKind {
    Whitespace,
    EndOfLine,
    SingleLineComment,
    MultiLineComment,
    /// A token the parser could not use.
    SkippedTokens,
}

/// Text attached to a token that carries no syntactic meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: TextSpan,
}

/// A token with its attached trivia.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: SyntaxKind,
    /// Keyword meaning of an identifier in some positions (`TIES`).
    pub contextual_kind: Option<SyntaxKind>,
    pub span: TextSpan,
    pub leading: Vec<Trivia>,
    pub trailing: Vec<Trivia>,
    /// Synthesized by error recovery; zero-width.
    pub missing: bool,
    /// Literal value for numeric and string literals, and the unquoted name
    /// of identifiers.
    pub value: Option<Value>,
}

impl Token {
    /// Creates a zero-width token the parser expected but did not find.
    #[must_use]
    pub fn missing(kind: SyntaxKind, position: usize) -> Self {
        Token {
            kind,
            contextual_kind: None,
            span: TextSpan::empty(position),
            leading: Vec::new(),
            trailing: Vec::new(),
            missing: true,
            value: None,
        }
    }

    /// Span including leading and trailing trivia.
    #[must_use]
    pub fn full_span(&self) -> TextSpan {
        let start = self.leading.first().map_or(self.span.start, |t| t.span.start);
        let end = self.trailing.last().map_or(self.span.end, |t| t.span.end);
        TextSpan::new(start, end)
    }

    /// The token text without trivia.
    #[must_use]
    pub fn text<'a>(&self, source: &'a SourceText) -> &'a str {
        source.text_in(self.span).unwrap_or_default()
    }

    /// The token text including trivia.
    #[must_use]
    pub fn full_text<'a>(&self, source: &'a SourceText) -> &'a str {
        source.text_in(self.full_span()).unwrap_or_default()
    }

    /// The identifier name with quoting removed; empty for missing tokens.
    #[must_use]
    pub fn identifier_name(&self) -> &str {
        match &self.value {
            Some(Value::String(name)) if self.kind == SyntaxKind::IdentifierToken => name,
            _ => "",
        }
    }

    /// Whether the token is the given contextual keyword.
    #[must_use]
    pub fn is_contextual(&self, kind: SyntaxKind) -> bool {
        self.contextual_kind == Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_ignores_case() {
        assert_eq!(SyntaxKind::keyword("select"), Some(SyntaxKind::SelectKeyword));
        assert_eq!(SyntaxKind::keyword("NullIf"), Some(SyntaxKind::NullIfKeyword));
        assert_eq!(SyntaxKind::keyword("ties"), None);
        assert_eq!(
            SyntaxKind::contextual_keyword("Ties"),
            Some(SyntaxKind::TiesKeyword)
        );
    }

    #[test]
    fn test_display_text() {
        assert_eq!(SyntaxKind::CommaToken.display_text(), ",");
        assert_eq!(SyntaxKind::ExistsKeyword.display_text(), "EXISTS");
        assert_eq!(SyntaxKind::IdentifierToken.to_string(), "<identifier>");
    }

    #[test]
    fn test_missing_token_is_zero_width() {
        let token = Token::missing(SyntaxKind::RightParenthesisToken, 7);
        assert!(token.missing);
        assert_eq!(token.full_span(), TextSpan::empty(7));
    }
}
