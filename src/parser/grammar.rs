//! Recursive descent parser with precedence climbing for binary operators.
//!
//! The parser never fails. A token that is expected but absent is
//! synthesized as a zero-width missing token and reported as
//! `TokenExpected`; tokens that cannot be used become `SkippedTokens` trivia
//! on the next token the parser keeps.
//!
//! Nesting is capped at [`MAX_NESTING_DEPTH`]; input nested deeper is
//! reported once and skipped, so later stages only walk trees of bounded
//! height.

use crate::diagnostics::{DiagnosticBag, DiagnosticId};
use crate::text::{SourceText, TextSpan};

use super::ast::{NodeId, SeparatedList, SyntaxElement, SyntaxNode, SyntaxNodeKind, TokenId};
use super::token::{SyntaxKind, Token, Trivia, TriviaKind};

/// Which production the compilation unit wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryPoint {
    Expression,
    Query,
}

/// Output of a parse, consumed by [`SyntaxTree`](super::SyntaxTree).
pub(crate) struct ParseOutput {
    pub tokens: Vec<Token>,
    pub nodes: Vec<SyntaxNode>,
    pub root: NodeId,
    pub diagnostics: DiagnosticBag,
}

/// Deepest expression or query nesting the parser builds.
pub const MAX_NESTING_DEPTH: u32 = 100;

const NOT_PRECEDENCE: u8 = 3;
const COMPARISON_PRECEDENCE: u8 = 4;
const UNARY_PRECEDENCE: u8 = 12;

fn binary_precedence(kind: SyntaxKind) -> Option<u8> {
    use SyntaxKind as S;
    let precedence = match kind {
        S::OrKeyword => 1,
        S::AndKeyword => 2,
        S::EqualsToken
        | S::EqualsEqualsToken
        | S::ExclamationEqualsToken
        | S::LessGreaterToken
        | S::LessToken
        | S::LessEqualsToken
        | S::GreaterToken
        | S::GreaterEqualsToken
        | S::ExclamationLessToken
        | S::ExclamationGreaterToken => COMPARISON_PRECEDENCE,
        S::BarToken => 5,
        S::CaretToken => 6,
        S::AmpersandToken => 7,
        S::LessLessToken | S::GreaterGreaterToken => 8,
        S::PlusToken | S::MinusToken => 9,
        S::AsteriskToken | S::SlashToken | S::PercentToken => 10,
        S::AsteriskAsteriskToken => 11,
        _ => return None,
    };
    Some(precedence)
}

/// Tokens that end an expression skipped past the nesting limit.
fn ends_expression(kind: SyntaxKind) -> bool {
    use SyntaxKind as S;
    matches!(
        kind,
        S::CommaToken
            | S::FromKeyword
            | S::WhereKeyword
            | S::GroupKeyword
            | S::HavingKeyword
            | S::OrderKeyword
            | S::UnionKeyword
            | S::ExceptKeyword
            | S::IntersectKeyword
            | S::WhenKeyword
            | S::ThenKeyword
            | S::ElseKeyword
            | S::EndKeyword
            | S::AsKeyword
            | S::AscKeyword
            | S::DescKeyword
            | S::OnKeyword
            | S::JoinKeyword
            | S::InnerKeyword
            | S::LeftKeyword
            | S::RightKeyword
            | S::FullKeyword
            | S::CrossKeyword
    )
}

fn unary_precedence(kind: SyntaxKind) -> Option<u8> {
    match kind {
        SyntaxKind::NotKeyword => Some(NOT_PRECEDENCE),
        SyntaxKind::PlusToken | SyntaxKind::MinusToken | SyntaxKind::TildeToken => {
            Some(UNARY_PRECEDENCE)
        }
        _ => None,
    }
}

pub(crate) struct Parser<'a> {
    source: &'a SourceText,
    input: Vec<Token>,
    position: usize,
    output: Vec<Token>,
    nodes: Vec<SyntaxNode>,
    heights: Vec<u32>,
    depth: u32,
    nesting_reported: bool,
    pending_trivia: Vec<Trivia>,
    diagnostics: DiagnosticBag,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a SourceText, input: Vec<Token>) -> Self {
        let mut parser = Parser {
            source,
            input,
            position: 0,
            output: Vec::new(),
            nodes: Vec::new(),
            heights: Vec::new(),
            depth: 0,
            nesting_reported: false,
            pending_trivia: Vec::new(),
            diagnostics: DiagnosticBag::new(),
        };
        parser.skip_bad_tokens();
        parser
    }

    pub(crate) fn parse(mut self, entry: EntryPoint) -> ParseOutput {
        let root = match entry {
            EntryPoint::Expression => self.parse_expression(),
            EntryPoint::Query => self.parse_query(),
        };
        self.skip_to_end_of_file();
        let end_of_file = self.take();
        let root = self.finish(SyntaxNodeKind::CompilationUnit { root, end_of_file });
        ParseOutput {
            tokens: self.output,
            nodes: self.nodes,
            root,
            diagnostics: self.diagnostics,
        }
    }

    // ==================== Token handling ====================

    fn current(&self) -> &Token {
        &self.input[self.position]
    }

    fn current_kind(&self) -> SyntaxKind {
        self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> SyntaxKind {
        self.input[self.position..]
            .iter()
            .filter(|t| t.kind != SyntaxKind::BadToken)
            .nth(offset)
            .map_or(SyntaxKind::EndOfFile, |t| t.kind)
    }

    /// Moves the current token to the output and returns its id.
    fn take(&mut self) -> TokenId {
        let mut token = self.current().clone();
        if !self.pending_trivia.is_empty() {
            let mut leading = std::mem::take(&mut self.pending_trivia);
            leading.append(&mut token.leading);
            token.leading = leading;
        }
        if token.kind != SyntaxKind::EndOfFile {
            self.position += 1;
            self.skip_bad_tokens();
        }
        self.push_token(token)
    }

    fn push_token(&mut self, token: Token) -> TokenId {
        let id = TokenId(self.output.len() as u32);
        self.output.push(token);
        id
    }

    fn take_if(&mut self, kind: SyntaxKind) -> Option<TokenId> {
        (self.current_kind() == kind).then(|| self.take())
    }

    /// Takes the current token if it has `kind`; otherwise synthesizes a
    /// missing one and reports it.
    fn expect(&mut self, kind: SyntaxKind) -> TokenId {
        if self.current_kind() == kind {
            return self.take();
        }
        self.missing(kind, kind.display_text())
    }

    fn expect_contextual(&mut self, contextual: SyntaxKind) -> TokenId {
        if self.current().is_contextual(contextual) {
            return self.take();
        }
        let id = self.missing(SyntaxKind::IdentifierToken, contextual.display_text());
        self.output[id.index()].contextual_kind = Some(contextual);
        id
    }

    fn missing(&mut self, kind: SyntaxKind, expected: &str) -> TokenId {
        let position = self
            .pending_trivia
            .first()
            .map_or(self.current().full_span().start, |t| t.span.start);
        let found = self.found_text();
        self.diagnostics
            .report_token_expected(TextSpan::empty(position), &found, expected);
        self.push_token(Token::missing(kind, position))
    }

    fn found_text(&self) -> String {
        let token = self.current();
        if token.kind == SyntaxKind::EndOfFile {
            return SyntaxKind::EndOfFile.display_text().to_string();
        }
        token.text(self.source).to_string()
    }

    /// Turns bad tokens at the current position into skipped trivia.
    /// The lexer has already reported them.
    fn skip_bad_tokens(&mut self) {
        while self.current_kind() == SyntaxKind::BadToken {
            self.skip_current();
        }
    }

    fn skip_current(&mut self) {
        let token = self.input[self.position].clone();
        self.pending_trivia.extend(token.leading.iter().copied());
        self.pending_trivia.push(Trivia {
            kind: TriviaKind::SkippedTokens,
            span: token.span,
        });
        self.pending_trivia.extend(token.trailing.iter().copied());
        self.position += 1;
    }

    fn skip_to_end_of_file(&mut self) {
        if self.current_kind() == SyntaxKind::EndOfFile {
            return;
        }
        let span = self.current().span;
        let found = self.found_text();
        self.diagnostics
            .report_token_expected(span, &found, SyntaxKind::EndOfFile.display_text());
        while self.current_kind() != SyntaxKind::EndOfFile {
            self.skip_current();
            self.skip_bad_tokens();
        }
    }

    fn finish(&mut self, kind: SyntaxNodeKind) -> NodeId {
        let children = kind.children();
        let first_token = children.first().map_or(TokenId(0), |e| self.first_token(*e));
        let last_token = children.last().map_or(TokenId(0), |e| self.last_token(*e));
        let height = children
            .iter()
            .filter_map(|e| match e {
                SyntaxElement::Node(n) => Some(self.heights[n.index()]),
                SyntaxElement::Token(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;
        self.heights.push(height);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode {
            kind,
            first_token,
            last_token,
        });
        id
    }

    fn first_token(&self, element: SyntaxElement) -> TokenId {
        match element {
            SyntaxElement::Node(n) => self.nodes[n.index()].first_token,
            SyntaxElement::Token(t) => t,
        }
    }

    fn last_token(&self, element: SyntaxElement) -> TokenId {
        match element {
            SyntaxElement::Node(n) => self.nodes[n.index()].last_token,
            SyntaxElement::Token(t) => t,
        }
    }

    // ==================== Nesting ====================

    /// Whether extending `node` by another level would exceed the cap.
    fn nesting_exceeded(&self, node: NodeId) -> bool {
        self.depth + self.heights[node.index()] >= MAX_NESTING_DEPTH
    }

    /// Reports the nesting limit once per parse and turns the rest of the
    /// nested construct into skipped trivia. Stops before an unbalanced `)`;
    /// within an expression also before a `,` or a clause keyword at the
    /// starting level.
    fn skip_too_deep(&mut self, within_expression: bool) {
        if !self.nesting_reported {
            self.nesting_reported = true;
            let span = self.current().span;
            self.diagnostics.report(
                DiagnosticId::NestingTooDeep,
                span,
                vec![MAX_NESTING_DEPTH.to_string()],
            );
        }
        let mut balance = 0usize;
        loop {
            match self.current_kind() {
                SyntaxKind::EndOfFile => break,
                SyntaxKind::LeftParenthesisToken => balance += 1,
                SyntaxKind::RightParenthesisToken if balance == 0 => break,
                SyntaxKind::RightParenthesisToken => balance -= 1,
                kind if within_expression && balance == 0 && ends_expression(kind) => break,
                _ => {}
            }
            self.skip_current();
            self.skip_bad_tokens();
        }
    }

    /// A zero-width name standing in for skipped input. Not reported again.
    fn too_deep_expression(&mut self) -> NodeId {
        self.skip_too_deep(true);
        let name = self.silent_missing(SyntaxKind::IdentifierToken);
        self.finish(SyntaxNodeKind::NameExpression { name })
    }

    fn too_deep_query(&mut self) -> NodeId {
        self.skip_too_deep(false);
        let select_keyword = self.silent_missing(SyntaxKind::SelectKeyword);
        let name = self.silent_missing(SyntaxKind::IdentifierToken);
        let expression = self.finish(SyntaxNodeKind::NameExpression { name });
        let column = self.finish(SyntaxNodeKind::ExpressionSelectColumn {
            expression,
            as_keyword: None,
            alias: None,
        });
        let mut columns = SeparatedList::default();
        columns.items.push(column);
        self.finish(SyntaxNodeKind::SelectQuery {
            select_keyword,
            quantifier: None,
            top: None,
            columns,
            from: None,
            where_clause: None,
            group_by: None,
            having: None,
        })
    }

    fn silent_missing(&mut self, kind: SyntaxKind) -> TokenId {
        let position = self
            .pending_trivia
            .first()
            .map_or(self.current().full_span().start, |t| t.span.start);
        self.push_token(Token::missing(kind, position))
    }

    // ==================== Expressions ====================

    pub(crate) fn parse_expression(&mut self) -> NodeId {
        self.parse_sub_expression(0)
    }

    fn parse_sub_expression(&mut self, precedence: u8) -> NodeId {
        if self.depth >= MAX_NESTING_DEPTH {
            return self.too_deep_expression();
        }
        self.depth += 1;
        let node = self.parse_operator_chain(precedence);
        self.depth -= 1;
        node
    }

    fn parse_operator_chain(&mut self, precedence: u8) -> NodeId {
        let mut left = if let Some(unary) = unary_precedence(self.current_kind()) {
            let operator = self.take();
            let operand = self.parse_sub_expression(unary);
            self.finish(SyntaxNodeKind::UnaryExpression { operator, operand })
        } else {
            self.parse_postfix_expression()
        };

        loop {
            let kind = self.current_kind();

            if kind == SyntaxKind::IsKeyword {
                if COMPARISON_PRECEDENCE <= precedence {
                    break;
                }
                if self.nesting_exceeded(left) {
                    self.skip_too_deep(true);
                    break;
                }
                let is_keyword = self.take();
                let not_keyword = self.take_if(SyntaxKind::NotKeyword);
                let null_keyword = self.expect(SyntaxKind::NullKeyword);
                left = self.finish(SyntaxNodeKind::IsNullExpression {
                    expression: left,
                    is_keyword,
                    not_keyword,
                    null_keyword,
                });
                continue;
            }

            let negated_form = kind == SyntaxKind::NotKeyword
                && matches!(
                    self.peek_kind(1),
                    SyntaxKind::LikeKeyword | SyntaxKind::BetweenKeyword | SyntaxKind::InKeyword
                );
            let form = if negated_form { self.peek_kind(1) } else { kind };
            if matches!(
                form,
                SyntaxKind::LikeKeyword | SyntaxKind::BetweenKeyword | SyntaxKind::InKeyword
            ) {
                if COMPARISON_PRECEDENCE <= precedence {
                    break;
                }
                if self.nesting_exceeded(left) {
                    self.skip_too_deep(true);
                    break;
                }
                let not_keyword = negated_form.then(|| self.take());
                left = self.parse_comparison_form(left, not_keyword, form);
                continue;
            }

            let Some(binary) = binary_precedence(kind) else {
                break;
            };
            let right_associative = kind == SyntaxKind::AsteriskAsteriskToken;
            if binary < precedence || (binary == precedence && !right_associative) {
                break;
            }
            if self.nesting_exceeded(left) {
                self.skip_too_deep(true);
                break;
            }
            let operator = self.take();
            let right = self.parse_sub_expression(binary);
            left = self.finish(SyntaxNodeKind::BinaryExpression {
                left,
                operator,
                right,
            });
        }
        left
    }

    fn parse_comparison_form(
        &mut self,
        left: NodeId,
        not_keyword: Option<TokenId>,
        form: SyntaxKind,
    ) -> NodeId {
        match form {
            SyntaxKind::LikeKeyword => {
                let like_keyword = self.take();
                let right = self.parse_sub_expression(COMPARISON_PRECEDENCE);
                self.finish(SyntaxNodeKind::LikeExpression {
                    left,
                    not_keyword,
                    like_keyword,
                    right,
                })
            }
            SyntaxKind::BetweenKeyword => {
                let between_keyword = self.take();
                let lower = self.parse_sub_expression(COMPARISON_PRECEDENCE);
                let and_keyword = self.expect(SyntaxKind::AndKeyword);
                let upper = self.parse_sub_expression(COMPARISON_PRECEDENCE);
                self.finish(SyntaxNodeKind::BetweenExpression {
                    expression: left,
                    not_keyword,
                    between_keyword,
                    lower,
                    and_keyword,
                    upper,
                })
            }
            _ => {
                let in_keyword = self.take();
                let arguments = self.parse_argument_list();
                self.finish(SyntaxNodeKind::InExpression {
                    expression: left,
                    not_keyword,
                    in_keyword,
                    arguments,
                })
            }
        }
    }

    fn parse_postfix_expression(&mut self) -> NodeId {
        let mut target = self.parse_primary_expression();
        while self.current_kind() == SyntaxKind::DotToken {
            if self.nesting_exceeded(target) {
                self.skip_too_deep(true);
                break;
            }
            let dot = self.take();
            let name = self.expect(SyntaxKind::IdentifierToken);
            target = if self.current_kind() == SyntaxKind::LeftParenthesisToken {
                let arguments = self.parse_argument_list();
                self.finish(SyntaxNodeKind::MethodInvocationExpression {
                    target,
                    dot,
                    name,
                    arguments,
                })
            } else {
                self.finish(SyntaxNodeKind::PropertyAccessExpression { target, dot, name })
            };
        }
        target
    }

    fn parse_primary_expression(&mut self) -> NodeId {
        match self.current_kind() {
            kind if kind.is_literal() => {
                let token = self.take();
                self.finish(SyntaxNodeKind::LiteralExpression { token })
            }
            SyntaxKind::AtToken => {
                let at_token = self.take();
                let name = self.expect(SyntaxKind::IdentifierToken);
                self.finish(SyntaxNodeKind::VariableExpression { at_token, name })
            }
            SyntaxKind::IdentifierToken => self.parse_name_or_invocation(),
            SyntaxKind::LeftParenthesisToken => {
                let left_paren = self.take();
                if self.current_kind() == SyntaxKind::SelectKeyword {
                    let query = self.parse_query();
                    let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
                    self.finish(SyntaxNodeKind::SingleRowSubselect {
                        left_paren,
                        query,
                        right_paren,
                    })
                } else {
                    let expression = self.parse_expression();
                    let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
                    self.finish(SyntaxNodeKind::ParenthesizedExpression {
                        left_paren,
                        expression,
                        right_paren,
                    })
                }
            }
            SyntaxKind::CastKeyword => self.parse_cast(),
            SyntaxKind::CoalesceKeyword => self.parse_coalesce(),
            SyntaxKind::NullIfKeyword => self.parse_nullif(),
            SyntaxKind::CaseKeyword => self.parse_case(),
            SyntaxKind::ExistsKeyword => {
                let exists_keyword = self.take();
                let left_paren = self.expect(SyntaxKind::LeftParenthesisToken);
                let query = self.parse_query();
                let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
                self.finish(SyntaxNodeKind::ExistsSubselect {
                    exists_keyword,
                    left_paren,
                    query,
                    right_paren,
                })
            }
            _ => {
                let name = self.expect(SyntaxKind::IdentifierToken);
                self.finish(SyntaxNodeKind::NameExpression { name })
            }
        }
    }

    fn parse_name_or_invocation(&mut self) -> NodeId {
        let is_count_all = self.current().identifier_name().eq_ignore_ascii_case("COUNT")
            && self.peek_kind(1) == SyntaxKind::LeftParenthesisToken
            && self.peek_kind(2) == SyntaxKind::AsteriskToken;
        let name = self.take();
        if is_count_all {
            let left_paren = self.take();
            let asterisk = self.take();
            let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
            return self.finish(SyntaxNodeKind::CountAllExpression {
                name,
                left_paren,
                asterisk,
                right_paren,
            });
        }
        if self.current_kind() == SyntaxKind::LeftParenthesisToken {
            let arguments = self.parse_argument_list();
            return self.finish(SyntaxNodeKind::FunctionInvocationExpression { name, arguments });
        }
        self.finish(SyntaxNodeKind::NameExpression { name })
    }

    fn parse_argument_list(&mut self) -> NodeId {
        let left_paren = self.expect(SyntaxKind::LeftParenthesisToken);
        let mut arguments = SeparatedList::default();
        if self.current_kind() != SyntaxKind::RightParenthesisToken {
            arguments.items.push(self.parse_expression());
            while let Some(comma) = self.take_if(SyntaxKind::CommaToken) {
                arguments.separators.push(comma);
                arguments.items.push(self.parse_expression());
            }
        }
        let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
        self.finish(SyntaxNodeKind::ArgumentList {
            left_paren,
            arguments,
            right_paren,
        })
    }

    fn parse_cast(&mut self) -> NodeId {
        let cast_keyword = self.take();
        let left_paren = self.expect(SyntaxKind::LeftParenthesisToken);
        let expression = self.parse_expression();
        let as_keyword = self.expect(SyntaxKind::AsKeyword);
        let type_name = self.expect(SyntaxKind::IdentifierToken);
        let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
        self.finish(SyntaxNodeKind::CastExpression {
            cast_keyword,
            left_paren,
            expression,
            as_keyword,
            type_name,
            right_paren,
        })
    }

    /// `COALESCE(e, e {, e})`: at least two arguments.
    fn parse_coalesce(&mut self) -> NodeId {
        let coalesce_keyword = self.take();
        let left_paren = self.expect(SyntaxKind::LeftParenthesisToken);
        let mut arguments = SeparatedList::default();
        arguments.items.push(self.parse_expression());
        loop {
            let comma = self.expect(SyntaxKind::CommaToken);
            arguments.separators.push(comma);
            arguments.items.push(self.parse_expression());
            if self.current_kind() != SyntaxKind::CommaToken {
                break;
            }
        }
        let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
        self.finish(SyntaxNodeKind::CoalesceExpression {
            coalesce_keyword,
            left_paren,
            arguments,
            right_paren,
        })
    }

    fn parse_nullif(&mut self) -> NodeId {
        let nullif_keyword = self.take();
        let left_paren = self.expect(SyntaxKind::LeftParenthesisToken);
        let left = self.parse_expression();
        let comma = self.expect(SyntaxKind::CommaToken);
        let right = self.parse_expression();
        let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
        self.finish(SyntaxNodeKind::NullIfExpression {
            nullif_keyword,
            left_paren,
            left,
            comma,
            right,
            right_paren,
        })
    }

    fn parse_case(&mut self) -> NodeId {
        let case_keyword = self.take();
        let input = (self.current_kind() != SyntaxKind::WhenKeyword).then(|| self.parse_expression());
        let mut labels = Vec::new();
        loop {
            let when_keyword = self.expect(SyntaxKind::WhenKeyword);
            let when_expression = self.parse_expression();
            let then_keyword = self.expect(SyntaxKind::ThenKeyword);
            let then_expression = self.parse_expression();
            labels.push(self.finish(SyntaxNodeKind::CaseLabel {
                when_keyword,
                when_expression,
                then_keyword,
                then_expression,
            }));
            if self.current_kind() != SyntaxKind::WhenKeyword {
                break;
            }
        }
        let else_keyword = self.take_if(SyntaxKind::ElseKeyword);
        let else_expression = else_keyword.map(|_| self.parse_expression());
        let end_keyword = self.expect(SyntaxKind::EndKeyword);
        self.finish(SyntaxNodeKind::CaseExpression {
            case_keyword,
            input,
            labels,
            else_keyword,
            else_expression,
            end_keyword,
        })
    }

    // ==================== Queries ====================

    pub(crate) fn parse_query(&mut self) -> NodeId {
        if self.depth >= MAX_NESTING_DEPTH {
            return self.too_deep_query();
        }
        self.depth += 1;
        let query = self.parse_ordered_query();
        self.depth -= 1;
        query
    }

    fn parse_ordered_query(&mut self) -> NodeId {
        let query = self.parse_combined_query();
        let Some(order_keyword) = self.take_if(SyntaxKind::OrderKeyword) else {
            return query;
        };
        let by_keyword = self.expect(SyntaxKind::ByKeyword);
        let columns = self.parse_separated(|p| {
            let expression = p.parse_expression();
            let modifier = match p.current_kind() {
                SyntaxKind::AscKeyword | SyntaxKind::DescKeyword => Some(p.take()),
                _ => None,
            };
            p.finish(SyntaxNodeKind::OrderByColumn {
                expression,
                modifier,
            })
        });
        self.finish(SyntaxNodeKind::OrderedQuery {
            query,
            order_keyword,
            by_keyword,
            columns,
        })
    }

    fn parse_combined_query(&mut self) -> NodeId {
        let mut left = self.parse_intersect_query();
        while matches!(
            self.current_kind(),
            SyntaxKind::UnionKeyword | SyntaxKind::ExceptKeyword
        ) {
            if self.nesting_exceeded(left) {
                self.skip_too_deep(false);
                break;
            }
            let is_union = self.current_kind() == SyntaxKind::UnionKeyword;
            let operator = self.take();
            let all_keyword = if is_union {
                self.take_if(SyntaxKind::AllKeyword)
            } else {
                None
            };
            let right = self.parse_intersect_query();
            left = self.finish(SyntaxNodeKind::CombinedQuery {
                left,
                operator,
                all_keyword,
                right,
            });
        }
        left
    }

    fn parse_intersect_query(&mut self) -> NodeId {
        let mut left = self.parse_primary_query();
        while self.current_kind() == SyntaxKind::IntersectKeyword {
            if self.nesting_exceeded(left) {
                self.skip_too_deep(false);
                break;
            }
            let operator = self.take();
            let right = self.parse_primary_query();
            left = self.finish(SyntaxNodeKind::CombinedQuery {
                left,
                operator,
                all_keyword: None,
                right,
            });
        }
        left
    }

    fn parse_primary_query(&mut self) -> NodeId {
        if self.current_kind() == SyntaxKind::LeftParenthesisToken {
            let left_paren = self.take();
            let query = self.parse_query();
            let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
            return self.finish(SyntaxNodeKind::ParenthesizedQuery {
                left_paren,
                query,
                right_paren,
            });
        }
        self.parse_select_query()
    }

    fn parse_select_query(&mut self) -> NodeId {
        let select_keyword = self.expect(SyntaxKind::SelectKeyword);
        let quantifier = match self.current_kind() {
            SyntaxKind::DistinctKeyword | SyntaxKind::AllKeyword => Some(self.take()),
            _ => None,
        };
        let top = (self.current_kind() == SyntaxKind::TopKeyword).then(|| self.parse_top_clause());
        let columns = self.parse_separated(Self::parse_select_column);

        let from = self.take_if(SyntaxKind::FromKeyword).map(|from_keyword| {
            let tables = self.parse_separated(Self::parse_table_reference);
            self.finish(SyntaxNodeKind::FromClause {
                from_keyword,
                tables,
            })
        });
        let where_clause = self.take_if(SyntaxKind::WhereKeyword).map(|where_keyword| {
            let condition = self.parse_expression();
            self.finish(SyntaxNodeKind::WhereClause {
                where_keyword,
                condition,
            })
        });
        let group_by = self.take_if(SyntaxKind::GroupKeyword).map(|group_keyword| {
            let by_keyword = self.expect(SyntaxKind::ByKeyword);
            let columns = self.parse_separated(Self::parse_expression);
            self.finish(SyntaxNodeKind::GroupByClause {
                group_keyword,
                by_keyword,
                columns,
            })
        });
        let having = self.take_if(SyntaxKind::HavingKeyword).map(|having_keyword| {
            let condition = self.parse_expression();
            self.finish(SyntaxNodeKind::HavingClause {
                having_keyword,
                condition,
            })
        });

        self.finish(SyntaxNodeKind::SelectQuery {
            select_keyword,
            quantifier,
            top,
            columns,
            from,
            where_clause,
            group_by,
            having,
        })
    }

    fn parse_top_clause(&mut self) -> NodeId {
        let top_keyword = self.take();
        let value = self.expect(SyntaxKind::NumericLiteralToken);
        let with_keyword = self.take_if(SyntaxKind::WithKeyword);
        let ties_keyword = with_keyword.map(|_| self.expect_contextual(SyntaxKind::TiesKeyword));
        self.finish(SyntaxNodeKind::TopClause {
            top_keyword,
            value,
            with_keyword,
            ties_keyword,
        })
    }

    fn parse_select_column(&mut self) -> NodeId {
        if self.current_kind() == SyntaxKind::AsteriskToken {
            let asterisk = self.take();
            return self.finish(SyntaxNodeKind::WildcardSelectColumn {
                table_name: None,
                dot: None,
                asterisk,
            });
        }
        if self.current_kind() == SyntaxKind::IdentifierToken
            && self.peek_kind(1) == SyntaxKind::DotToken
            && self.peek_kind(2) == SyntaxKind::AsteriskToken
        {
            let table_name = Some(self.take());
            let dot = Some(self.take());
            let asterisk = self.take();
            return self.finish(SyntaxNodeKind::WildcardSelectColumn {
                table_name,
                dot,
                asterisk,
            });
        }

        let expression = self.parse_expression();
        let (as_keyword, alias) = self.parse_alias();
        self.finish(SyntaxNodeKind::ExpressionSelectColumn {
            expression,
            as_keyword,
            alias,
        })
    }

    fn parse_alias(&mut self) -> (Option<TokenId>, Option<TokenId>) {
        if let Some(as_keyword) = self.take_if(SyntaxKind::AsKeyword) {
            let alias = self.expect(SyntaxKind::IdentifierToken);
            return (Some(as_keyword), Some(alias));
        }
        (None, self.take_if(SyntaxKind::IdentifierToken))
    }

    fn parse_table_reference(&mut self) -> NodeId {
        let mut left = self.parse_primary_table_reference();
        loop {
            let joins = matches!(
                self.current_kind(),
                SyntaxKind::JoinKeyword
                    | SyntaxKind::InnerKeyword
                    | SyntaxKind::LeftKeyword
                    | SyntaxKind::RightKeyword
                    | SyntaxKind::FullKeyword
                    | SyntaxKind::CrossKeyword
            );
            if joins && self.nesting_exceeded(left) {
                self.skip_too_deep(false);
                break;
            }
            let (join_type_keyword, outer_keyword, is_cross) = match self.current_kind() {
                SyntaxKind::JoinKeyword => (None, None, false),
                SyntaxKind::InnerKeyword => (Some(self.take()), None, false),
                SyntaxKind::LeftKeyword | SyntaxKind::RightKeyword | SyntaxKind::FullKeyword => {
                    let join_type = self.take();
                    (Some(join_type), self.take_if(SyntaxKind::OuterKeyword), false)
                }
                SyntaxKind::CrossKeyword => (Some(self.take()), None, true),
                _ => break,
            };
            let join_keyword = self.expect(SyntaxKind::JoinKeyword);
            let right = self.parse_primary_table_reference();
            let (on_keyword, condition) = if is_cross {
                (None, None)
            } else {
                let on_keyword = self.expect(SyntaxKind::OnKeyword);
                (Some(on_keyword), Some(self.parse_expression()))
            };
            left = self.finish(SyntaxNodeKind::JoinedTableReference {
                left,
                join_type_keyword,
                outer_keyword,
                join_keyword,
                right,
                on_keyword,
                condition,
            });
        }
        left
    }

    fn parse_primary_table_reference(&mut self) -> NodeId {
        if self.current_kind() == SyntaxKind::LeftParenthesisToken {
            let left_paren = self.take();
            let query = self.parse_query();
            let right_paren = self.expect(SyntaxKind::RightParenthesisToken);
            let as_keyword = self.take_if(SyntaxKind::AsKeyword);
            let alias = self.expect(SyntaxKind::IdentifierToken);
            return self.finish(SyntaxNodeKind::DerivedTableReference {
                left_paren,
                query,
                right_paren,
                as_keyword,
                alias,
            });
        }
        let table_name = self.expect(SyntaxKind::IdentifierToken);
        let (as_keyword, alias) = self.parse_alias();
        self.finish(SyntaxNodeKind::NamedTableReference {
            table_name,
            as_keyword,
            alias,
        })
    }

    fn parse_separated(&mut self, mut item: impl FnMut(&mut Self) -> NodeId) -> SeparatedList {
        let mut list = SeparatedList::default();
        list.items.push(item(self));
        while let Some(comma) = self.take_if(SyntaxKind::CommaToken) {
            list.separators.push(comma);
            list.items.push(item(self));
        }
        list
    }
}
