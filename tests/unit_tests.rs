//! Unit tests for ruql.

use ruql::binder::{classify, common_type, resolve_overload, ConversionKind, OverloadResolution};
use ruql::catalog::{ColumnSymbol, DataContext, DataContextBuilder, FunctionSymbol, TableSymbol};
use ruql::diagnostics::{DiagnosticId, Severity};
use ruql::parser::{SyntaxKind, SyntaxTree, TriviaKind, MAX_NESTING_DEPTH};
use ruql::text::{SourceText, TextChange, TextLocation, TextSpan};
use ruql::types::{DataType, Value};
use ruql::RuqlError;
use std::sync::Arc;

// =============================================================================
// Error Tests
// =============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_invalid_position_display() {
        let err = RuqlError::InvalidPosition {
            position: 10,
            length: 3,
        };
        assert!(err.to_string().contains("Invalid position 10"));
        assert!(err.to_string().contains("length is 3"));
    }

    #[test]
    fn test_schema_error_display() {
        let err = RuqlError::SchemaError("Table 'Orders' already exists".into());
        assert!(err.to_string().contains("Schema error"));
        assert!(err.to_string().contains("Orders"));
    }

    #[test]
    fn test_missing_syntax_tree_display() {
        assert_eq!(
            RuqlError::MissingSyntaxTree.to_string(),
            "Compilation has no syntax tree"
        );
    }
}

// =============================================================================
// Source Text Tests
// =============================================================================

mod text_tests {
    use super::*;

    #[test]
    fn test_line_and_column_mapping() {
        let text = SourceText::from("SELECT a\r\nFROM t\nWHERE b");
        assert_eq!(text.lines().len(), 3);
        assert_eq!(text.text_location(0).unwrap(), TextLocation::new(0, 0));
        assert_eq!(text.text_location(10).unwrap(), TextLocation::new(1, 0));
        assert_eq!(text.text_location(17).unwrap(), TextLocation::new(2, 0));
        assert_eq!(text.position(TextLocation::new(1, 5)).unwrap(), 15);
    }

    #[test]
    fn test_out_of_range_position_is_rejected() {
        let text = SourceText::from("abc");
        assert_eq!(
            text.text_location(4).unwrap_err(),
            RuqlError::InvalidPosition {
                position: 4,
                length: 3
            }
        );
        assert!(matches!(
            text.position(TextLocation::new(5, 0)),
            Err(RuqlError::InvalidLocation { line: 5, .. })
        ));
    }

    #[test]
    fn test_changes_since_recovers_edit_chain() {
        let original = SourceText::from("SELECT a FROM t");
        let first = original.replace(TextSpan::new(7, 8), "b").unwrap();
        let second = first
            .with_changes(vec![TextChange::insert(first.len(), " WHERE b > 1")])
            .unwrap();
        assert_eq!(second.text(), "SELECT b FROM t WHERE b > 1");

        let changes = second.changes_since(&original);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], TextChange::new(TextSpan::new(7, 8), "b"));
        assert!(second.changes_since(&second).is_empty());
    }

    #[test]
    fn test_container_is_published_once() {
        let text = SourceText::from("1 + 1");
        let first = text.container();
        let second = text.container();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.current().unwrap(), &text));
    }

    #[test]
    fn test_span_operations() {
        let span = TextSpan::new(2, 6);
        assert_eq!(span.len(), 4);
        assert!(span.contains(2));
        assert!(!span.contains(6));
        assert!(span.contains_span(TextSpan::new(3, 6)));
        assert!(span.intersects(TextSpan::new(6, 8)));
        assert_eq!(span.merge(TextSpan::new(0, 3)), TextSpan::new(0, 6));
    }
}

// =============================================================================
// Lexer Tests
// =============================================================================

mod lexer_tests {
    use super::*;
    use ruql::parser::lexer::tokenize;

    #[test]
    fn test_trailing_trivia_stops_at_line_break() {
        let source = SourceText::from("a -- note\n  b");
        let (tokens, diagnostics) = tokenize(&source);
        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 3);

        let kinds: Vec<_> = tokens[0].trailing.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TriviaKind::Whitespace,
                TriviaKind::SingleLineComment,
                TriviaKind::EndOfLine
            ]
        );
        assert_eq!(tokens[1].leading.len(), 1);
        assert_eq!(tokens[1].leading[0].kind, TriviaKind::Whitespace);
        assert_eq!(tokens[2].kind, SyntaxKind::EndOfFile);
    }

    #[test]
    fn test_literal_values() {
        let source = SourceText::from("42 2.5 'it''s' [Order Id]");
        let (tokens, _) = tokenize(&source);
        assert_eq!(tokens[0].value, Some(Value::Int32(42)));
        assert_eq!(tokens[1].value, Some(Value::Float64(2.5)));
        assert_eq!(tokens[2].value, Some(Value::String("it's".into())));
        assert_eq!(tokens[3].identifier_name(), "Order Id");
    }

    #[test]
    fn test_unterminated_comment_is_reported() {
        let source = SourceText::from("1 /* open");
        let (_, diagnostics) = tokenize(&source);
        let ids: Vec<_> = diagnostics.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DiagnosticId::UnterminatedComment]);
    }

    #[test]
    fn test_keywords_ignore_case() {
        assert_eq!(SyntaxKind::keyword("select"), Some(SyntaxKind::SelectKeyword));
        assert_eq!(SyntaxKind::keyword("SeLeCt"), Some(SyntaxKind::SelectKeyword));
        assert_eq!(SyntaxKind::keyword("ties"), None);
        assert_eq!(
            SyntaxKind::contextual_keyword("TIES"),
            Some(SyntaxKind::TiesKeyword)
        );
    }
}

// =============================================================================
// Parser Tests
// =============================================================================

mod parser_tests {
    use super::*;

    #[test]
    fn test_query_round_trips() {
        let text = "SELECT TOP 3 WITH TIES a AS x, t.* -- columns\n\
                    FROM t JOIN u ON t.id = u.id\n\
                    WHERE a BETWEEN 1 AND 2 ORDER BY x DESC";
        let tree = SyntaxTree::parse_query(text);
        assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
        assert_eq!(tree.to_full_string(), text);
    }

    #[test]
    fn test_missing_tokens_are_zero_width() {
        let tree = SyntaxTree::parse_query("SELECT FROM");
        assert!(!tree.diagnostics().is_empty());
        assert!(tree.tokens().iter().any(|t| t.missing));
        assert!(tree
            .tokens()
            .iter()
            .filter(|t| t.missing)
            .all(|t| t.span.is_empty()));
        assert_eq!(tree.to_full_string(), "SELECT FROM");
    }

    #[test]
    fn test_node_spans_nest_in_parent() {
        let tree = SyntaxTree::parse_query("SELECT (a + b) * c FROM t WHERE NOT x IN (1, 2)");
        for node in tree.descendants(tree.root()) {
            if let Some(parent) = tree.parent(node) {
                assert!(tree.full_span(parent).contains_span(tree.span(node)));
            }
        }
    }

    #[test]
    fn test_nesting_below_limit_is_accepted() {
        let n = MAX_NESTING_DEPTH as usize - 10;
        let text = format!("{}1{}", "(".repeat(n), ")".repeat(n));
        let tree = SyntaxTree::parse_expression(&text);
        assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    }

    #[test]
    fn test_derived_tables_past_limit_are_skipped() {
        let n = 200;
        let text = format!(
            "SELECT * FROM {}t{}",
            "(SELECT * FROM ".repeat(n),
            ") x".repeat(n)
        );
        let tree = SyntaxTree::parse_query(&text);
        let ids: Vec<_> = tree.diagnostics().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DiagnosticId::NestingTooDeep]);
        assert_eq!(tree.to_full_string(), text);
        assert!(tree
            .tokens()
            .iter()
            .any(|t| t.leading.iter().any(|trivia| trivia.kind == TriviaKind::SkippedTokens)));
    }

    #[test]
    fn test_find_token_rejects_out_of_range_position() {
        let tree = SyntaxTree::parse_expression("a + b");
        assert!(tree.find_token(2).is_ok());
        assert!(matches!(
            tree.find_token(99),
            Err(RuqlError::InvalidPosition { .. })
        ));
    }
}

// =============================================================================
// Catalog Tests
// =============================================================================

mod catalog_tests {
    use super::*;

    fn orders() -> TableSymbol {
        TableSymbol::new(
            "Orders",
            vec![
                ColumnSymbol::new("Id", DataType::Int32).unwrap(),
                ColumnSymbol::new("Amount", DataType::Float64).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_table_is_rejected() {
        let mut builder = DataContextBuilder::new();
        builder.add_table(orders()).unwrap();
        assert!(matches!(
            builder.add_table(orders()),
            Err(RuqlError::SchemaError(_))
        ));
    }

    #[test]
    fn test_duplicate_column_is_rejected() {
        let result = TableSymbol::new(
            "t",
            vec![
                ColumnSymbol::new("a", DataType::Int32).unwrap(),
                ColumnSymbol::new("A", DataType::String).unwrap(),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_lookups_ignore_case() {
        let mut builder = DataContextBuilder::new();
        builder.add_table(orders()).unwrap();
        let context = builder.build();
        assert!(context.get_table("ORDERS").is_some());
        assert!(context.get_aggregate("count").is_some());
        assert!(!context.functions("SUBSTRING").is_empty());
    }

    #[test]
    fn test_custom_type_conversions() {
        let mut builder = DataContextBuilder::empty();
        let money = builder.add_custom_type("Money").unwrap();
        builder
            .add_conversion(DataType::Int32, money, true)
            .unwrap();
        let context = builder.build();
        assert_eq!(context.resolve_type("money"), Some(money));
        assert_eq!(context.type_name(money), "Money");
        assert_eq!(
            classify(&context, DataType::Int32, money),
            ConversionKind::Implicit
        );
        assert_eq!(
            classify(&context, money, DataType::Int32),
            ConversionKind::None
        );
    }
}

// =============================================================================
// Conversion and Overload Tests
// =============================================================================

mod conversion_tests {
    use super::*;

    #[test]
    fn test_numeric_widening_is_implicit() {
        let context = DataContext::default();
        assert_eq!(
            classify(&context, DataType::Int32, DataType::Int64),
            ConversionKind::Implicit
        );
        assert_eq!(
            classify(&context, DataType::Int64, DataType::Int32),
            ConversionKind::Explicit
        );
        assert_eq!(
            classify(&context, DataType::Null, DataType::String),
            ConversionKind::Implicit
        );
        assert_eq!(
            classify(&context, DataType::String, DataType::Bool),
            ConversionKind::None
        );
    }

    #[test]
    fn test_common_type_picks_widest() {
        let context = DataContext::default();
        assert_eq!(
            common_type(&context, &[DataType::Int32, DataType::Float64, DataType::Null]),
            Some(DataType::Float64)
        );
        assert_eq!(
            common_type(&context, &[DataType::Int32, DataType::String]),
            None
        );
    }

    #[test]
    fn test_overload_prefers_exact_match() {
        let context = DataContext::default();
        let candidates: Vec<Vec<DataType>> = vec![
            vec![DataType::Int64],
            vec![DataType::Int32],
            vec![DataType::Float64],
        ];
        let result = resolve_overload(
            &context,
            candidates.iter().map(Vec::as_slice),
            &[DataType::Int32],
        );
        assert_eq!(result, OverloadResolution::Best(1));
    }

    #[test]
    fn test_overload_without_applicable_candidate() {
        let context = DataContext::default();
        let function = FunctionSymbol::new("f", vec![DataType::Bool], DataType::Bool);
        let result = resolve_overload(
            &context,
            [function.parameters.as_slice()],
            &[DataType::String],
        );
        assert_eq!(result, OverloadResolution::NotApplicable);
    }
}

// =============================================================================
// Diagnostic Tests
// =============================================================================

mod diagnostic_tests {
    use super::*;
    use ruql::diagnostics::Diagnostic;

    #[test]
    fn test_message_formatting() {
        let diagnostic = Diagnostic::new(
            DiagnosticId::CannotConvert,
            TextSpan::new(0, 1),
            vec!["string".into(), "bool".into()],
        );
        assert_eq!(diagnostic.message(), "Cannot convert from 'string' to 'bool'.");
        assert!(diagnostic.is_error());
    }

    #[test]
    fn test_order_by_constant_is_a_warning() {
        assert_eq!(
            DiagnosticId::ConstantExpressionInOrderBy.severity(),
            Severity::Warning
        );
    }
}

// =============================================================================
// Host Extension Tests
// =============================================================================

mod extension_tests {
    use super::*;
    use ruql::binder::{BoundExpression, BoundRoot};
    use ruql::catalog::{
        AggregateFunction, AggregateSymbol, MethodProvider, MethodSymbol, PropertyProvider,
        PropertySymbol, VariableSymbol,
    };
    use ruql::Compilation;

    struct PointProperties {
        point: DataType,
    }

    impl PropertyProvider for PointProperties {
        fn properties(&self, data_type: DataType) -> Vec<PropertySymbol> {
            if data_type == self.point {
                vec![
                    PropertySymbol::new(self.point, "X", DataType::Int32),
                    PropertySymbol::new(self.point, "Y", DataType::Int32),
                ]
            } else {
                Vec::new()
            }
        }
    }

    struct PointMethods {
        point: DataType,
    }

    impl MethodProvider for PointMethods {
        fn methods(&self, data_type: DataType) -> Vec<MethodSymbol> {
            if data_type == self.point {
                vec![MethodSymbol::new(
                    self.point,
                    "DistanceTo",
                    vec![self.point],
                    DataType::Float64,
                )]
            } else {
                Vec::new()
            }
        }
    }

    fn context() -> Arc<DataContext> {
        let mut builder = DataContextBuilder::new();
        let point = builder.add_custom_type("Point").unwrap();
        builder.add_property_provider(Arc::new(PointProperties { point }));
        builder.add_method_provider(Arc::new(PointMethods { point }));
        builder
            .add_variable(VariableSymbol::new("origin", point))
            .unwrap();
        builder
            .add_aggregate(AggregateSymbol::new("TOTAL", AggregateFunction::Sum))
            .unwrap();
        builder
            .add_table(
                TableSymbol::new(
                    "Orders",
                    vec![ColumnSymbol::new("Amount", DataType::Float64).unwrap()],
                )
                .unwrap(),
            )
            .unwrap();
        Arc::new(builder.build())
    }

    fn bind_expression(text: &str) -> ruql::binder::SemanticModel {
        Compilation::empty()
            .with_data_context(context())
            .with_syntax_tree(Arc::new(SyntaxTree::parse_expression(text)))
            .semantic_model()
            .unwrap()
    }

    #[test]
    fn test_custom_property_access() {
        let model = bind_expression("@origin.X + @origin.Y");
        assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
        let Some(BoundRoot::Expression(expression)) = model.root() else {
            panic!("expected expression root");
        };
        assert_eq!(expression.data_type(), DataType::Int32);
        assert!(expression
            .find(&|e| matches!(e, BoundExpression::PropertyAccess { .. }))
            .is_some());
    }

    #[test]
    fn test_custom_method_invocation() {
        let model = bind_expression("@origin.DistanceTo(@origin)");
        assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
        let Some(BoundRoot::Expression(expression)) = model.root() else {
            panic!("expected expression root");
        };
        assert_eq!(expression.data_type(), DataType::Float64);
    }

    #[test]
    fn test_unknown_property_is_reported() {
        let model = bind_expression("@origin.Z");
        let ids: Vec<_> = model.diagnostics().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DiagnosticId::UndeclaredProperty]);
    }

    #[test]
    fn test_registered_aggregate_name() {
        let model = Compilation::empty()
            .with_data_context(context())
            .with_syntax_tree(Arc::new(SyntaxTree::parse_query(
                "SELECT TOTAL(Amount) AS Revenue FROM Orders",
            )))
            .semantic_model()
            .unwrap();
        assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
        let tree = model.syntax_tree();
        let query = model.bound_query(tree.root_syntax()).unwrap();
        assert_eq!(query.output_columns[0].name, "Revenue");
    }
}

// =============================================================================
// Syntax Tree Navigation Tests
// =============================================================================

mod navigation_tests {
    use super::*;
    use ruql::parser::SyntaxNodeKind;

    #[test]
    fn test_token_parent_and_ancestors() {
        let tree = SyntaxTree::parse_query("SELECT a + 1 FROM t");
        let plus = tree.find_token(9).unwrap();
        assert_eq!(tree.token_text(plus), "+");

        let parent = tree.token_parent(plus);
        assert!(matches!(
            tree.node(parent).kind,
            SyntaxNodeKind::BinaryExpression { .. }
        ));
        let ancestors: Vec<_> = tree.ancestors(parent).collect();
        assert_eq!(ancestors.last(), Some(&tree.root()));
        assert!(ancestors.len() < tree.node_count());
    }

    #[test]
    fn test_dump_marks_missing_tokens() {
        let tree = SyntaxTree::parse_expression("(1 +");
        let dump = tree.dump();
        assert!(dump.contains("(missing)"), "{dump}");
        assert!(dump.starts_with(tree.node(tree.root()).kind.name()));
    }

    #[test]
    fn test_token_full_text_includes_trivia() {
        let tree = SyntaxTree::parse_expression("  a /* x */ ");
        let token = &tree.tokens()[0];
        assert_eq!(token.text(tree.text()), "a");
        assert_eq!(token.full_text(tree.text()), "  a /* x */ ");
    }
}
