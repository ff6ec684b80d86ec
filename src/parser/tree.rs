//! The immutable, lossless syntax tree.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::error::{Result, RuqlError};
use crate::text::{SourceText, TextSpan};

use super::ast::{NodeId, SyntaxElement, SyntaxNode, SyntaxNodeKind, TokenId};
use super::grammar::{EntryPoint, Parser};
use super::lexer::tokenize;
use super::token::Token;

/// A parsed expression or query.
///
/// Owns its source text, the token arena (including missing tokens), the
/// node arena and the parent tables. Concatenating the full text of every
/// token in order reproduces the source exactly.
#[derive(Debug)]
pub struct SyntaxTree {
    text: Arc<SourceText>,
    tokens: Vec<Token>,
    nodes: Vec<SyntaxNode>,
    node_parents: Vec<Option<NodeId>>,
    token_parents: Vec<NodeId>,
    root: NodeId,
    diagnostics: Vec<Diagnostic>,
}

impl SyntaxTree {
    /// Parses a single expression.
    #[must_use]
    pub fn parse_expression(text: &str) -> Self {
        Self::parse_expression_text(SourceText::from(text))
    }

    /// Parses a query.
    #[must_use]
    pub fn parse_query(text: &str) -> Self {
        Self::parse_query_text(SourceText::from(text))
    }

    #[must_use]
    pub fn parse_expression_text(text: Arc<SourceText>) -> Self {
        Self::parse(text, EntryPoint::Expression)
    }

    #[must_use]
    pub fn parse_query_text(text: Arc<SourceText>) -> Self {
        Self::parse(text, EntryPoint::Query)
    }

    fn parse(text: Arc<SourceText>, entry: EntryPoint) -> Self {
        let (tokens, lexical) = tokenize(&text);
        let output = Parser::new(&text, tokens).parse(entry);

        let mut diagnostics = lexical.into_vec();
        diagnostics.extend(output.diagnostics.into_vec());
        debug!(
            ?entry,
            tokens = output.tokens.len(),
            nodes = output.nodes.len(),
            diagnostics = diagnostics.len(),
            "parsed syntax tree"
        );

        let mut node_parents = vec![None; output.nodes.len()];
        let mut token_parents = vec![output.root; output.tokens.len()];
        for (index, node) in output.nodes.iter().enumerate() {
            let id = NodeId(index as u32);
            for child in node.kind.children() {
                match child {
                    SyntaxElement::Node(n) => node_parents[n.index()] = Some(id),
                    SyntaxElement::Token(t) => token_parents[t.index()] = id,
                }
            }
        }

        SyntaxTree {
            text,
            tokens: output.tokens,
            nodes: output.nodes,
            node_parents,
            token_parents,
            root: output.root,
            diagnostics,
        }
    }

    /// The source text the tree was parsed from.
    #[must_use]
    pub fn text(&self) -> &Arc<SourceText> {
        &self.text
    }

    /// The `CompilationUnit` node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The expression or query the compilation unit wraps.
    #[must_use]
    pub fn root_syntax(&self) -> NodeId {
        match &self.node(self.root).kind {
            SyntaxNodeKind::CompilationUnit { root, .. } => *root,
            _ => self.root,
        }
    }

    /// Lexical diagnostics followed by syntactic diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree; use [`Self::try_node`]
    /// for ids from elsewhere.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    /// Returns a node by id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` if the id does not belong to this tree.
    pub fn try_node(&self, id: NodeId) -> Result<&SyntaxNode> {
        self.nodes
            .get(id.index())
            .ok_or(RuqlError::UnknownNode(id.index()))
    }

    #[must_use]
    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    /// All tokens in document order, including missing tokens.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<SyntaxElement> {
        self.node(id).kind.children()
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node_parents[id.index()]
    }

    #[must_use]
    pub fn token_parent(&self, id: TokenId) -> NodeId {
        self.token_parents[id.index()]
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// All nodes below and including `id`, in document order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            let children = self.children(current);
            for child in children.into_iter().rev() {
                if let SyntaxElement::Node(n) = child {
                    stack.push(n);
                }
            }
        }
        result
    }

    /// Span of a node without the leading trivia of its first token and
    /// the trailing trivia of its last token.
    #[must_use]
    pub fn span(&self, id: NodeId) -> TextSpan {
        let node = self.node(id);
        TextSpan::new(
            self.token(node.first_token).span.start,
            self.token(node.last_token).span.end,
        )
    }

    /// Span of a node including all trivia.
    #[must_use]
    pub fn full_span(&self, id: NodeId) -> TextSpan {
        let node = self.node(id);
        TextSpan::new(
            self.token(node.first_token).full_span().start,
            self.token(node.last_token).full_span().end,
        )
    }

    /// Text of a token without trivia.
    #[must_use]
    pub fn token_text(&self, id: TokenId) -> &str {
        self.token(id).text(&self.text)
    }

    /// Text of a node without outer trivia.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> &str {
        self.text.text_in(self.span(id)).unwrap_or_default()
    }

    /// Reassembles the source from the tokens.
    #[must_use]
    pub fn to_full_string(&self) -> String {
        let mut result = String::with_capacity(self.text.len());
        for token in &self.tokens {
            for trivia in &token.leading {
                result.push_str(self.text.text_in(trivia.span).unwrap_or_default());
            }
            result.push_str(token.text(&self.text));
            for trivia in &token.trailing {
                result.push_str(self.text.text_in(trivia.span).unwrap_or_default());
            }
        }
        result
    }

    /// Finds the non-missing token whose full span contains `position`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPosition` if `position` is past the end of the text.
    pub fn find_token(&self, position: usize) -> Result<TokenId> {
        if position > self.text.len() {
            return Err(RuqlError::InvalidPosition {
                position,
                length: self.text.len(),
            });
        }
        let index = self
            .tokens
            .iter()
            .position(|t| !t.missing && t.full_span().contains(position))
            .unwrap_or(self.tokens.len() - 1);
        Ok(TokenId(index as u32))
    }

    /// Renders the tree structure, one node per line.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, indent: usize, out: &mut String) {
        let prefix = "  ".repeat(indent);
        let _ = writeln!(out, "{prefix}{} {}", self.node(id).kind.name(), self.span(id));
        for child in self.children(id) {
            match child {
                SyntaxElement::Node(n) => self.dump_node(n, indent + 1, out),
                SyntaxElement::Token(t) => {
                    let token = self.token(t);
                    let missing = if token.missing { " (missing)" } else { "" };
                    let _ = writeln!(
                        out,
                        "{prefix}  {:?} {:?}{missing}",
                        token.kind,
                        token.text(&self.text)
                    );
                }
            }
        }
    }
}
