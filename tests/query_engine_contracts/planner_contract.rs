//! Contract tests for the Planner module.
//!
//! These tests verify the optimization contracts:
//! - Every rule preserves the output values of the plan
//! - Optimization reaches a fixed point
//! - Cardinality estimates of the optimized plan stay sound
//! - EXPLAIN output has a stable layout

use std::sync::Arc;

use ruql::binder::{BoundRelation, BoundRoot, JoinType};
use ruql::catalog::{ColumnSymbol, DataContext, DataContextBuilder, TableSymbol};
use ruql::parser::SyntaxTree;
use ruql::planner::{
    estimate, AtMostOneRowRule, CardinalityEstimate, FilterPushdownRule, OptimizerRule, Planner,
    PredicateSimplificationRule, SubqueryUnnestingRule,
};
use ruql::types::DataType;
use ruql::{Compilation, CompilationOptions};

const QUERIES: &[&str] = &[
    "SELECT Id FROM Orders WHERE Amount > 10 ORDER BY Id",
    "SELECT Id, Amount * 2 AS Doubled FROM Orders WHERE Amount * 2 > 5 AND Id < 10",
    "SELECT o.Id FROM Orders o WHERE EXISTS (SELECT * FROM Customers c WHERE c.Id = o.CustomerId)",
    "SELECT o.Id FROM Orders o WHERE NOT EXISTS (SELECT * FROM Customers c WHERE c.Id = o.CustomerId)",
    "SELECT TOP 5 Id FROM (SELECT TOP 2 Id FROM Orders) d",
    "SELECT Id FROM Orders WHERE 1 = 0",
    "SELECT Id FROM Orders WHERE 1 = 1 AND Id > 3",
    "SELECT CustomerId, COUNT(*) AS Total FROM Orders GROUP BY CustomerId HAVING COUNT(*) > 1",
    "SELECT COUNT(*) FROM Orders ORDER BY 1",
    "SELECT Id FROM Orders UNION ALL SELECT Id FROM Customers",
];

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
    Arc::new(builder.build())
}

/// Binds `text` without optimizing it.
fn bound_relation(text: &str) -> BoundRelation {
    let model = Compilation::empty()
        .with_data_context(create_test_context())
        .with_syntax_tree(Arc::new(SyntaxTree::parse_query(text)))
        .with_options(CompilationOptions::new().with_optimize(false))
        .semantic_model()
        .unwrap();
    assert!(model.diagnostics().iter().all(|d| !d.is_error()), "{text}");
    match model.root() {
        Some(BoundRoot::Query(query)) => query.relation.clone(),
        other => panic!("expected query root, got {other:?}"),
    }
}

fn rules() -> Vec<Box<dyn OptimizerRule>> {
    vec![
        Box::new(SubqueryUnnestingRule),
        Box::new(PredicateSimplificationRule),
        Box::new(FilterPushdownRule),
        Box::new(AtMostOneRowRule),
    ]
}

#[test]
fn test_each_rule_preserves_output_values() {
    // Contract: no rule changes which values a plan produces, or their order
    for text in QUERIES {
        let plan = bound_relation(text);
        for rule in rules() {
            let rewritten = rule.rewrite(plan.clone()).unwrap().into_inner();
            assert_eq!(
                rewritten.output_values(),
                plan.output_values(),
                "{} changed outputs of {text}",
                rule.name()
            );
        }
    }
}

#[test]
fn test_unchanged_plans_report_no_transformation() {
    // Contract: a rule that reports No returns the plan it was given
    for text in QUERIES {
        let plan = bound_relation(text);
        for rule in rules() {
            let result = rule.rewrite(plan.clone()).unwrap();
            if !result.was_transformed() {
                assert_eq!(result.into_inner(), plan, "{} on {text}", rule.name());
            }
        }
    }
}

#[test]
fn test_optimization_reaches_fixed_point() {
    // Contract: optimizing an optimized plan applies no further rules
    let planner = Planner::new();
    for text in QUERIES {
        let once = planner.optimize(bound_relation(text)).unwrap();
        let (twice, applied) = planner.optimize_with_tracking(once.clone()).unwrap();
        assert_eq!(twice, once, "{text}");
        assert!(applied.is_empty(), "{text}: {applied:?}");
    }
}

#[test]
fn test_optimized_estimate_is_not_wider() {
    // Contract: optimization never loosens the row bounds of a plan
    let planner = Planner::new();
    for text in QUERIES {
        let plan = bound_relation(text);
        let before = estimate(&plan);
        let after = estimate(&planner.optimize(plan).unwrap());
        assert!(after.minimum >= before.minimum, "{text}: {before} -> {after}");
        if let Some(max) = before.maximum {
            assert!(after.maximum.is_some_and(|m| m <= max), "{text}: {before} -> {after}");
        }
    }
}

#[test]
fn test_false_filter_yields_empty_plan() {
    // Contract: WHERE with a constant false condition produces no rows
    let plan = Planner::new()
        .optimize(bound_relation("SELECT Id FROM Orders WHERE 1 = 0"))
        .unwrap();
    assert_eq!(estimate(&plan), CardinalityEstimate::exactly(0));
}

#[test]
fn test_exists_becomes_semi_join() {
    // Contract: uncorrelated-after-extraction EXISTS turns into LEFT SEMI,
    //           NOT EXISTS into LEFT ANTI SEMI
    let planner = Planner::new();
    for (text, expected) in [(QUERIES[2], JoinType::LeftSemi), (QUERIES[3], JoinType::LeftAntiSemi)] {
        let plan = planner.optimize(bound_relation(text)).unwrap();
        let BoundRelation::Project { input, .. } = plan else {
            panic!("expected projection on top");
        };
        assert!(
            matches!(*input, BoundRelation::Join { join_type, condition: Some(_), .. } if join_type == expected),
            "{input}"
        );
    }
}

#[test]
fn test_explain_verbose_layout() {
    // Contract: verbose EXPLAIN lists plan, output schema and cardinality
    let planner = Planner::new();
    let plan = planner
        .optimize(bound_relation("SELECT COUNT(*) AS Total FROM Orders"))
        .unwrap();
    let text = planner.explain_verbose(&plan);
    let plan_section = text.find("=== Logical Plan ===").unwrap();
    let schema_section = text.find("=== Output Schema ===").unwrap();
    let cardinality_section = text.find("=== Cardinality ===").unwrap();
    assert!(plan_section < schema_section && schema_section < cardinality_section);
    assert!(text.contains(" : int\n"));
    assert!(text.ends_with("  1..1\n"));
}
