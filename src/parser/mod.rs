//! Lexer and lossless parser.

pub mod ast;
mod grammar;
pub mod lexer;
pub mod token;
mod tree;

pub use grammar::MAX_NESTING_DEPTH;
pub use ast::{NodeId, SeparatedList, SyntaxElement, SyntaxNode, SyntaxNodeKind, TokenId};
pub use token::{SyntaxKind, Token, Trivia, TriviaKind};
pub use tree::SyntaxTree;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticId;

    fn expected_count(tree: &SyntaxTree) -> usize {
        tree.diagnostics()
            .iter()
            .filter(|d| d.id == DiagnosticId::TokenExpected)
            .count()
    }

    #[test]
    fn test_round_trip_with_errors() {
        for text in [
            "SELECT a, b -- c\nFROM t WHERE x = 1",
            "SELECT (1 + FROM",
            "  COALESCE( ",
            "SELECT $ 1 $",
            "SELECT 1 2 3 /* tail",
            "",
        ] {
            let tree = SyntaxTree::parse_query(text);
            assert_eq!(tree.to_full_string(), text);
        }
    }

    #[test]
    fn test_coalesce_recovery_counts() {
        assert_eq!(expected_count(&SyntaxTree::parse_expression("COALESCE()")), 3);
        assert_eq!(expected_count(&SyntaxTree::parse_expression("COALESCE(1)")), 2);
        assert_eq!(expected_count(&SyntaxTree::parse_expression("COALESCE(1, 2)")), 0);
    }

    #[test]
    fn test_precedence_shapes() {
        let tree = SyntaxTree::parse_expression("1 + 2 * 3");
        let root = tree.root_syntax();
        let SyntaxNodeKind::BinaryExpression { operator, right, .. } = &tree.node(root).kind else {
            panic!("expected binary expression");
        };
        assert_eq!(tree.token_text(*operator), "+");
        assert_eq!(tree.node_text(*right), "2 * 3");
    }

    #[test]
    fn test_power_is_right_associative() {
        let tree = SyntaxTree::parse_expression("2 ** 3 ** 2");
        let SyntaxNodeKind::BinaryExpression { left, .. } = &tree.node(tree.root_syntax()).kind
        else {
            panic!("expected binary expression");
        };
        assert_eq!(tree.node_text(*left), "2");
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        let tree = SyntaxTree::parse_expression("NOT a = b AND c");
        let SyntaxNodeKind::BinaryExpression { left, operator, .. } =
            &tree.node(tree.root_syntax()).kind
        else {
            panic!("expected binary expression");
        };
        assert_eq!(tree.token_text(*operator), "AND");
        assert_eq!(tree.node_text(*left), "NOT a = b");
    }

    #[test]
    fn test_negated_forms() {
        for (text, name) in [
            ("a NOT LIKE 'x%'", "LikeExpression"),
            ("a NOT BETWEEN 1 AND 2", "BetweenExpression"),
            ("a NOT IN (1, 2)", "InExpression"),
            ("a IS NOT NULL", "IsNullExpression"),
        ] {
            let tree = SyntaxTree::parse_expression(text);
            assert!(tree.diagnostics().is_empty(), "{text}");
            assert_eq!(tree.node(tree.root_syntax()).kind.name(), name);
        }
    }

    #[test]
    fn test_missing_token_position() {
        let tree = SyntaxTree::parse_expression("(1 + 2");
        let diagnostic = &tree.diagnostics()[0];
        assert_eq!(diagnostic.id, DiagnosticId::TokenExpected);
        assert_eq!(diagnostic.span, crate::text::TextSpan::empty(6));
        assert!(tree.tokens().iter().any(|t| t.missing));
    }

    #[test]
    fn test_parent_links_and_spans() {
        let tree = SyntaxTree::parse_query("SELECT a FROM t WHERE a > 1 ORDER BY a DESC");
        assert!(tree.diagnostics().is_empty());
        for id in tree.descendants(tree.root()) {
            if let Some(parent) = tree.parent(id) {
                assert!(tree.full_span(parent).contains_span(tree.full_span(id)));
            }
        }
        assert_eq!(tree.node(tree.root_syntax()).kind.name(), "OrderedQuery");
    }

    #[test]
    fn test_query_forms_parse_cleanly() {
        for text in [
            "SELECT DISTINCT TOP 3 WITH TIES a FROM t ORDER BY a",
            "SELECT t.*, u.x AS y FROM t INNER JOIN u ON t.id = u.id",
            "SELECT * FROM t LEFT OUTER JOIN u ON 1 = 1 CROSS JOIN v",
            "SELECT a FROM (SELECT a FROM t) AS d",
            "SELECT a FROM t UNION ALL SELECT b FROM u INTERSECT SELECT c FROM v",
            "SELECT COUNT(*), SUM(x) FROM t GROUP BY y HAVING COUNT(*) > 1",
            "SELECT CASE WHEN a > 1 THEN 'x' ELSE 'y' END FROM t",
            "SELECT CAST(a AS double), NULLIF(a, 0), @v FROM t WHERE EXISTS (SELECT 1)",
            "SELECT (SELECT 1), a.Length, a.Substring(1, 2) FROM t",
        ] {
            let tree = SyntaxTree::parse_query(text);
            assert!(tree.diagnostics().is_empty(), "{text}: {:?}", tree.diagnostics());
        }
    }

    #[test]
    fn test_trailing_tokens_become_skipped_trivia() {
        let tree = SyntaxTree::parse_expression("1 2");
        assert_eq!(expected_count(&tree), 1);
        let eof = tree.tokens().last().unwrap();
        assert!(eof
            .leading
            .iter()
            .any(|t| t.kind == TriviaKind::SkippedTokens));
    }
}
