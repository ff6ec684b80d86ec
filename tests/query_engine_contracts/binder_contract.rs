//! Contract tests for the Binder.
//!
//! These tests verify the binding contracts:
//! - Every output column is produced by the query relation
//! - Names resolve to the symbols recorded in the semantic model
//! - Failed bindings do not cascade into further diagnostics
//! - Binding is deterministic

use std::sync::Arc;

use ruql::binder::{BoundExpression, BoundRoot, SemanticModel, Symbol};
use ruql::catalog::{ColumnSymbol, DataContext, DataContextBuilder, TableSymbol, VariableSymbol};
use ruql::diagnostics::DiagnosticId;
use ruql::parser::{SyntaxNodeKind, SyntaxTree};
use ruql::types::DataType;
use ruql::Compilation;

/// Creates a test context with Orders and Customers tables.
fn create_test_context() -> Arc<DataContext> {
    let mut builder = DataContextBuilder::new();
    builder
        .add_table(
            TableSymbol::new(
                "Orders",
                vec![
                    ColumnSymbol::new("Id", DataType::Int32).unwrap(),
                    ColumnSymbol::new("CustomerId", DataType::Int32).unwrap(),
                    ColumnSymbol::new("Amount", DataType::Float64).unwrap(),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    builder
        .add_table(
            TableSymbol::new(
                "Customers",
                vec![
                    ColumnSymbol::new("Id", DataType::Int32).unwrap(),
                    ColumnSymbol::new("Name", DataType::String).unwrap(),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    builder
        .add_variable(VariableSymbol::new("limit", DataType::Int64))
        .unwrap();
    Arc::new(builder.build())
}

fn bind(text: &str) -> SemanticModel {
    Compilation::empty()
        .with_data_context(create_test_context())
        .with_syntax_tree(Arc::new(SyntaxTree::parse_query(text)))
        .with_options(ruql::CompilationOptions::new().with_optimize(false))
        .semantic_model()
        .unwrap()
}

fn root_query(model: &SemanticModel) -> &ruql::binder::BoundQuery {
    match model.root() {
        Some(BoundRoot::Query(query)) => query,
        other => panic!("expected query root, got {other:?}"),
    }
}

#[test]
fn test_output_columns_are_produced_by_relation() {
    // Contract: each output column's slot is one of the relation's output values,
    //           in select-list order
    for text in [
        "SELECT Id, Amount * 2 AS Doubled FROM Orders",
        "SELECT o.*, c.Name FROM Orders o JOIN Customers c ON o.CustomerId = c.Id",
        "SELECT CustomerId, COUNT(*) FROM Orders GROUP BY CustomerId",
        "SELECT Id FROM Orders UNION SELECT Id FROM Customers",
    ] {
        let model = bind(text);
        assert!(model.diagnostics().is_empty(), "{text}: {:?}", model.diagnostics());
        let query = root_query(&model);
        let outputs = query.relation.output_values();
        let columns: Vec<_> = query.output_columns.iter().map(|c| c.slot.clone()).collect();
        assert_eq!(outputs, columns, "{text}");
    }
}

#[test]
fn test_wildcard_expands_in_table_order() {
    // Contract: o.* expands to the table's columns in declaration order
    let model = bind("SELECT o.* FROM Orders o");
    let names: Vec<_> = root_query(&model)
        .output_columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Id", "CustomerId", "Amount"]);
}

#[test]
fn test_names_resolve_to_column_symbols() {
    // Contract: every name in a successfully bound query has a Column symbol
    //           whose slot matches the bound expression
    let model = bind("SELECT c.Name FROM Customers c WHERE Id > 3");
    let tree = model.syntax_tree();
    let mut seen = 0;
    for node in tree.descendants(tree.root()) {
        if let SyntaxNodeKind::NameExpression { .. } = tree.node(node).kind {
            let Some(Symbol::Column { slot, table, .. }) = model.symbol(node) else {
                panic!("unresolved name {}", tree.node_text(node));
            };
            assert_eq!(table, "c");
            assert_eq!(
                model.bound_expression(node),
                Some(&BoundExpression::ValueSlot(slot.clone()))
            );
            seen += 1;
        }
    }
    assert!(seen >= 1);
}

#[test]
fn test_unknown_does_not_cascade() {
    // Contract: an unresolved name reports once; expressions built on it
    //           stay silent
    let model = bind("SELECT Missing + 1, -(Missing * Amount) FROM Orders WHERE Missing > 0");
    let ids: Vec<_> = model.diagnostics().iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![DiagnosticId::ColumnTableOrVariableNotDeclared; 3]);
}

#[test]
fn test_implicit_conversion_is_explicit_in_bound_tree() {
    // Contract: mixed-type arithmetic binds with a Conversion node on the
    //           narrower operand
    let model = bind("SELECT Id + Amount FROM Orders");
    let tree = model.syntax_tree();
    let binary = tree
        .descendants(tree.root())
        .into_iter()
        .find(|n| matches!(tree.node(*n).kind, SyntaxNodeKind::BinaryExpression { .. }))
        .unwrap();
    assert_eq!(model.expression_type(binary), Some(DataType::Float64));
    let bound = model.bound_expression(binary).unwrap();
    assert!(bound
        .find(&|e| matches!(
            e,
            BoundExpression::Conversion {
                data_type: DataType::Float64,
                ..
            }
        ))
        .is_some());
}

#[test]
fn test_variables_bind_without_at_sign() {
    // Contract: @limit resolves to the variable registered as "limit"
    let model = bind("SELECT TOP 1 Id FROM Orders WHERE Id < @limit ORDER BY Id");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
}

#[test]
fn test_binding_is_deterministic() {
    // Contract: binding the same text twice yields identical diagnostics
    //           and plans
    let text = "SELECT Nope, Id FROM Orders o, Orders o WHERE Amount = 'x' ORDER BY 1";
    let first = bind(text);
    let second = bind(text);
    assert_eq!(first.diagnostics(), second.diagnostics());
    assert_eq!(
        first.query_plan().map(ToString::to_string),
        second.query_plan().map(ToString::to_string)
    );
}
