//! Single-pass lexer producing tokens with attached trivia.

use tracing::trace;

use crate::diagnostics::{DiagnosticBag, DiagnosticId};
use crate::text::{SourceText, TextSpan};
use crate::types::Value;

use super::token::{SyntaxKind, Token, Trivia, TriviaKind};

/// Turns source text into tokens.
///
/// The token list always ends with an `EndOfFile` token that carries any
/// trivia left at the end of the text.
pub struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    position: usize,
    diagnostics: DiagnosticBag,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a SourceText) -> Self {
        Lexer {
            text: source.text(),
            bytes: source.text().as_bytes(),
            position: 0,
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Lexes the whole text.
    #[must_use]
    pub fn tokenize(mut self) -> (Vec<Token>, DiagnosticBag) {
        let mut tokens = Vec::new();
        loop {
            let token = self.lex_token();
            let done = token.kind == SyntaxKind::EndOfFile;
            tokens.push(token);
            if done {
                break;
            }
        }
        trace!(tokens = tokens.len(), "lexed");
        (tokens, self.diagnostics)
    }

    fn peek(&self, offset: usize) -> u8 {
        self.bytes.get(self.position + offset).copied().unwrap_or(0)
    }

    fn lex_token(&mut self) -> Token {
        let leading = self.read_trivia(true);
        let start = self.position;
        let (kind, value) = self.read_token();
        let span = TextSpan::new(start, self.position);
        let contextual_kind = match (&kind, &value) {
            (SyntaxKind::IdentifierToken, Some(Value::String(name)))
                if self.bytes[start].is_ascii_alphabetic() =>
            {
                SyntaxKind::contextual_keyword(name)
            }
            _ => None,
        };
        let trailing = if kind == SyntaxKind::EndOfFile {
            Vec::new()
        } else {
            self.read_trivia(false)
        };
        Token {
            kind,
            contextual_kind,
            span,
            leading,
            trailing,
            missing: false,
            value,
        }
    }

    // ==================== Trivia ====================

    /// Reads trivia. Trailing trivia stops after the first line break.
    fn read_trivia(&mut self, leading: bool) -> Vec<Trivia> {
        let mut trivia = Vec::new();
        loop {
            let start = self.position;
            let kind = match self.peek(0) {
                b'\r' | b'\n' => {
                    let len = if self.peek(0) == b'\r' && self.peek(1) == b'\n' {
                        2
                    } else {
                        1
                    };
                    self.position += len;
                    TriviaKind::EndOfLine
                }
                b' ' | b'\t' | 0x0b | 0x0c => {
                    while matches!(self.peek(0), b' ' | b'\t' | 0x0b | 0x0c) {
                        self.position += 1;
                    }
                    TriviaKind::Whitespace
                }
                b'-' if self.peek(1) == b'-' => {
                    self.read_single_line_comment();
                    TriviaKind::SingleLineComment
                }
                b'/' if self.peek(1) == b'/' => {
                    self.read_single_line_comment();
                    TriviaKind::SingleLineComment
                }
                b'/' if self.peek(1) == b'*' => {
                    self.read_multi_line_comment();
                    TriviaKind::MultiLineComment
                }
                _ => break,
            };
            trivia.push(Trivia {
                kind,
                span: TextSpan::new(start, self.position),
            });
            if kind == TriviaKind::EndOfLine && !leading {
                break;
            }
        }
        trivia
    }

    fn read_single_line_comment(&mut self) {
        while self.position < self.bytes.len() && !matches!(self.peek(0), b'\r' | b'\n') {
            self.position += 1;
        }
    }

    fn read_multi_line_comment(&mut self) {
        let start = self.position;
        self.position += 2;
        loop {
            if self.position >= self.bytes.len() {
                self.diagnostics.report(
                    DiagnosticId::UnterminatedComment,
                    TextSpan::new(start, self.position),
                    vec![],
                );
                return;
            }
            if self.peek(0) == b'*' && self.peek(1) == b'/' {
                self.position += 2;
                return;
            }
            self.position += 1;
        }
    }

    // ==================== Tokens ====================

    fn read_token(&mut self) -> (SyntaxKind, Option<Value>) {
        if self.position >= self.bytes.len() {
            return (SyntaxKind::EndOfFile, None);
        }

        let c = self.peek(0);
        match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.read_identifier_or_keyword(),
            b'[' => self.read_delimited_identifier(
                b']',
                DiagnosticId::UnterminatedParenthesizedIdentifier,
            ),
            b'"' => self.read_delimited_identifier(b'"', DiagnosticId::UnterminatedQuotedIdentifier),
            b'\'' => self.read_string(),
            b'0'..=b'9' => self.read_number(),
            b'.' if self.peek(1).is_ascii_digit() => self.read_number(),
            _ => (self.read_punctuation(), None),
        }
    }

    fn read_identifier_or_keyword(&mut self) -> (SyntaxKind, Option<Value>) {
        let start = self.position;
        while matches!(self.peek(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.position += 1;
        }
        let text = &self.text[start..self.position];
        match SyntaxKind::keyword(text) {
            Some(keyword) => (keyword, None),
            None => (
                SyntaxKind::IdentifierToken,
                Some(Value::String(text.to_string())),
            ),
        }
    }

    /// Reads `[name]` or `"name"`. A doubled closing delimiter escapes it.
    fn read_delimited_identifier(
        &mut self,
        close: u8,
        unterminated: DiagnosticId,
    ) -> (SyntaxKind, Option<Value>) {
        let start = self.position;
        self.position += 1;
        let mut name = String::new();
        loop {
            if self.position >= self.bytes.len() {
                self.diagnostics
                    .report(unterminated, TextSpan::new(start, self.position), vec![]);
                break;
            }
            let segment_start = self.position;
            while self.position < self.bytes.len() && self.peek(0) != close {
                self.position += 1;
            }
            name.push_str(&self.text[segment_start..self.position]);
            if self.position < self.bytes.len() {
                self.position += 1;
                if self.peek(0) == close {
                    name.push(char::from(close));
                    self.position += 1;
                    continue;
                }
                break;
            }
        }
        (SyntaxKind::IdentifierToken, Some(Value::String(name)))
    }

    fn read_string(&mut self) -> (SyntaxKind, Option<Value>) {
        let start = self.position;
        self.position += 1;
        let mut value = String::new();
        loop {
            if self.position >= self.bytes.len() {
                self.diagnostics.report(
                    DiagnosticId::UnterminatedString,
                    TextSpan::new(start, self.position),
                    vec![],
                );
                break;
            }
            let segment_start = self.position;
            while self.position < self.bytes.len() && self.peek(0) != b'\'' {
                self.position += 1;
            }
            value.push_str(&self.text[segment_start..self.position]);
            if self.position < self.bytes.len() {
                self.position += 1;
                if self.peek(0) == b'\'' {
                    value.push('\'');
                    self.position += 1;
                    continue;
                }
                break;
            }
        }
        (SyntaxKind::StringLiteralToken, Some(Value::String(value)))
    }

    fn read_number(&mut self) -> (SyntaxKind, Option<Value>) {
        let start = self.position;
        let mut is_real = false;
        let mut malformed = false;

        while self.peek(0).is_ascii_digit() {
            self.position += 1;
        }
        if self.peek(0) == b'.' && self.peek(1).is_ascii_digit() {
            is_real = true;
            self.position += 1;
            while self.peek(0).is_ascii_digit() {
                self.position += 1;
            }
        }
        if matches!(self.peek(0), b'e' | b'E') {
            is_real = true;
            self.position += 1;
            if matches!(self.peek(0), b'+' | b'-') {
                self.position += 1;
            }
            if !self.peek(0).is_ascii_digit() {
                malformed = true;
            }
            while self.peek(0).is_ascii_digit() {
                self.position += 1;
            }
        }

        let span = TextSpan::new(start, self.position);
        let text = &self.text[start..self.position];
        let value = if is_real {
            match text.parse::<f64>() {
                Ok(v) if !malformed && v.is_finite() => Some(Value::Float64(v)),
                _ => {
                    self.diagnostics
                        .report(DiagnosticId::InvalidReal, span, vec![text.to_string()]);
                    None
                }
            }
        } else if let Ok(v) = text.parse::<i32>() {
            Some(Value::Int32(v))
        } else if let Ok(v) = text.parse::<i64>() {
            Some(Value::Int64(v))
        } else {
            self.diagnostics
                .report(DiagnosticId::InvalidInteger, span, vec![text.to_string()]);
            None
        };
        (SyntaxKind::NumericLiteralToken, value)
    }

    fn read_punctuation(&mut self) -> SyntaxKind {
        let (kind, len) = match (self.peek(0), self.peek(1)) {
            (b'*', b'*') => (SyntaxKind::AsteriskAsteriskToken, 2),
            (b'*', _) => (SyntaxKind::AsteriskToken, 1),
            (b'+', _) => (SyntaxKind::PlusToken, 1),
            (b'-', _) => (SyntaxKind::MinusToken, 1),
            (b'/', _) => (SyntaxKind::SlashToken, 1),
            (b'%', _) => (SyntaxKind::PercentToken, 1),
            (b'&', _) => (SyntaxKind::AmpersandToken, 1),
            (b'|', _) => (SyntaxKind::BarToken, 1),
            (b'^', _) => (SyntaxKind::CaretToken, 1),
            (b'~', _) => (SyntaxKind::TildeToken, 1),
            (b'<', b'<') => (SyntaxKind::LessLessToken, 2),
            (b'<', b'=') => (SyntaxKind::LessEqualsToken, 2),
            (b'<', b'>') => (SyntaxKind::LessGreaterToken, 2),
            (b'<', _) => (SyntaxKind::LessToken, 1),
            (b'>', b'>') => (SyntaxKind::GreaterGreaterToken, 2),
            (b'>', b'=') => (SyntaxKind::GreaterEqualsToken, 2),
            (b'>', _) => (SyntaxKind::GreaterToken, 1),
            (b'=', b'=') => (SyntaxKind::EqualsEqualsToken, 2),
            (b'=', _) => (SyntaxKind::EqualsToken, 1),
            (b'!', b'=') => (SyntaxKind::ExclamationEqualsToken, 2),
            (b'!', b'<') => (SyntaxKind::ExclamationLessToken, 2),
            (b'!', b'>') => (SyntaxKind::ExclamationGreaterToken, 2),
            (b'(', _) => (SyntaxKind::LeftParenthesisToken, 1),
            (b')', _) => (SyntaxKind::RightParenthesisToken, 1),
            (b',', _) => (SyntaxKind::CommaToken, 1),
            (b'.', _) => (SyntaxKind::DotToken, 1),
            (b'@', _) => (SyntaxKind::AtToken, 1),
            _ => return self.read_bad_character(),
        };
        self.position += len;
        kind
    }

    fn read_bad_character(&mut self) -> SyntaxKind {
        let start = self.position;
        let c = self.text[start..].chars().next().unwrap_or('\0');
        self.position += c.len_utf8().max(1);
        self.diagnostics.report(
            DiagnosticId::IllegalInputCharacter,
            TextSpan::new(start, self.position),
            vec![c.to_string()],
        );
        SyntaxKind::BadToken
    }
}

/// Lexes `source` into tokens and lexical diagnostics.
#[must_use]
pub fn tokenize(source: &SourceText) -> (Vec<Token>, DiagnosticBag) {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<SyntaxKind> {
        let source = SourceText::from(text);
        tokenize(&source).0.iter().map(|t| t.kind).collect()
    }

    fn lex(text: &str) -> (Vec<Token>, DiagnosticBag) {
        let source = SourceText::from(text);
        tokenize(&source)
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("select Name from [Order Details]"),
            vec![
                SyntaxKind::SelectKeyword,
                SyntaxKind::IdentifierToken,
                SyntaxKind::FromKeyword,
                SyntaxKind::IdentifierToken,
                SyntaxKind::EndOfFile
            ]
        );
    }

    #[test]
    fn test_delimited_identifiers_unquote() {
        let (tokens, diagnostics) = lex("[a]]b] \"c\"\"d\"");
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].identifier_name(), "a]b");
        assert_eq!(tokens[1].identifier_name(), "c\"d");
    }

    #[test]
    fn test_quoted_keyword_is_identifier() {
        let (tokens, _) = lex("[select]");
        assert_eq!(tokens[0].kind, SyntaxKind::IdentifierToken);
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("** <> <= << !< !> != =="),
            vec![
                SyntaxKind::AsteriskAsteriskToken,
                SyntaxKind::LessGreaterToken,
                SyntaxKind::LessEqualsToken,
                SyntaxKind::LessLessToken,
                SyntaxKind::ExclamationLessToken,
                SyntaxKind::ExclamationGreaterToken,
                SyntaxKind::ExclamationEqualsToken,
                SyntaxKind::EqualsEqualsToken,
                SyntaxKind::EndOfFile
            ]
        );
    }

    #[test]
    fn test_numeric_literals() {
        let (tokens, diagnostics) = lex("42 3000000000 1.5 2e3 .25");
        assert!(diagnostics.is_empty());
        let values: Vec<_> = tokens.iter().filter_map(|t| t.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Value::Int32(42),
                Value::Int64(3_000_000_000),
                Value::Float64(1.5),
                Value::Float64(2000.0),
                Value::Float64(0.25)
            ]
        );
    }

    #[test]
    fn test_invalid_numbers_reported() {
        let (_, diagnostics) = lex("1e 99999999999999999999");
        let ids: Vec<_> = diagnostics.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DiagnosticId::InvalidReal, DiagnosticId::InvalidInteger]);
    }

    #[test]
    fn test_string_escape() {
        let (tokens, diagnostics) = lex("'it''s'");
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].value, Some(Value::String("it's".into())));
    }

    #[test]
    fn test_unterminated_forms_reported() {
        for (text, id) in [
            ("'abc", DiagnosticId::UnterminatedString),
            ("/* abc", DiagnosticId::UnterminatedComment),
            ("[abc", DiagnosticId::UnterminatedParenthesizedIdentifier),
            ("\"abc", DiagnosticId::UnterminatedQuotedIdentifier),
        ] {
            let (_, diagnostics) = lex(text);
            assert_eq!(diagnostics.as_slice()[0].id, id, "{text}");
        }
    }

    #[test]
    fn test_illegal_character_becomes_bad_token() {
        let (tokens, diagnostics) = lex("1 $ 2");
        assert_eq!(tokens[1].kind, SyntaxKind::BadToken);
        assert_eq!(diagnostics.as_slice()[0].id, DiagnosticId::IllegalInputCharacter);
        assert_eq!(diagnostics.as_slice()[0].args, vec!["$".to_string()]);
    }

    #[test]
    fn test_trailing_trivia_stops_at_line_break() {
        let (tokens, _) = lex("a -- note\n  b");
        let trailing: Vec<_> = tokens[0].trailing.iter().map(|t| t.kind).collect();
        assert_eq!(
            trailing,
            vec![
                TriviaKind::Whitespace,
                TriviaKind::SingleLineComment,
                TriviaKind::EndOfLine
            ]
        );
        assert_eq!(tokens[1].leading[0].kind, TriviaKind::Whitespace);
    }

    #[test]
    fn test_ties_is_contextual() {
        let (tokens, _) = lex("ties");
        assert_eq!(tokens[0].kind, SyntaxKind::IdentifierToken);
        assert!(tokens[0].is_contextual(SyntaxKind::TiesKeyword));
    }

    #[test]
    fn test_end_of_file_carries_final_trivia() {
        let (tokens, _) = lex("x\n  /* tail */");
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, SyntaxKind::EndOfFile);
        assert_eq!(eof.leading.len(), 2);
    }
}
