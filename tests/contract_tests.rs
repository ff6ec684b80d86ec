//! Contract tests for the public API (Compilation) and the query engine stages.

use std::sync::Arc;

use ruql::catalog::{ColumnSymbol, DataContextBuilder, TableSymbol};
use ruql::diagnostics::{DiagnosticId, Phase};
use ruql::parser::SyntaxTree;
use ruql::types::DataType;
use ruql::{Compilation, CompilationOptions, RuqlError};

// =============================================================================
// Compilation Contract Tests
// =============================================================================

mod compilation_contracts {
    use super::*;

    fn compilation(text: &str) -> Compilation {
        let mut builder = DataContextBuilder::new();
        builder
            .add_table(
                TableSymbol::new(
                    "Person",
                    vec![
                        ColumnSymbol::new("Id", DataType::Int32).unwrap(),
                        ColumnSymbol::new("Name", DataType::String).unwrap(),
                    ],
                )
                .unwrap(),
            )
            .unwrap();
        Compilation::empty()
            .with_data_context(Arc::new(builder.build()))
            .with_syntax_tree(Arc::new(SyntaxTree::parse_query(text)))
    }

    #[test]
    fn test_diagnostics_are_ordered_by_phase() {
        // Contract: lexical diagnostics come before syntactic ones, which come
        //           before semantic ones
        let diagnostics = compilation("SELECT Nope $ FROM Person WHERE").diagnostics().unwrap();
        let phases: Vec<_> = diagnostics.iter().map(|d| d.id.phase()).collect();
        let mut sorted = phases.clone();
        sorted.sort();
        assert_eq!(phases, sorted);
        assert_eq!(phases.first(), Some(&Phase::Lexical));
    }

    #[test]
    fn test_with_methods_do_not_mutate_original() {
        // Contract: Compilation is immutable; with_* returns a new value
        let original = compilation("SELECT Id FROM Person");
        let other = original
            .clone()
            .with_syntax_tree(Arc::new(SyntaxTree::parse_query("SELECT 1")));
        assert_eq!(original.syntax_tree().unwrap().to_full_string(), "SELECT Id FROM Person");
        assert_eq!(other.syntax_tree().unwrap().to_full_string(), "SELECT 1");
    }

    #[test]
    fn test_missing_tree_is_an_error() {
        assert!(matches!(
            Compilation::empty().diagnostics(),
            Err(RuqlError::MissingSyntaxTree)
        ));
    }

    #[test]
    fn test_errors_skip_optimization() {
        // Contract: a plan with error diagnostics is returned as bound
        let model = compilation("SELECT Id FROM Person WHERE 1 = 0 ORDER BY Nope")
            .semantic_model()
            .unwrap();
        assert!(model
            .diagnostics()
            .iter()
            .any(|d| d.id == DiagnosticId::ColumnTableOrVariableNotDeclared));
        assert!(model.query_plan().unwrap().to_string().contains("Filter:"));
    }

    #[test]
    fn test_optimize_option_is_honored() {
        // Contract: optimize = false leaves the bound plan untouched
        let text = "SELECT Id FROM Person WHERE 1 = 0";
        let unoptimized = compilation(text)
            .with_options(CompilationOptions::new().with_optimize(false))
            .semantic_model()
            .unwrap();
        let optimized = compilation(text).semantic_model().unwrap();
        assert!(unoptimized.query_plan().unwrap().to_string().contains("Filter:"));
        assert!(optimized.query_plan().unwrap().to_string().contains("Empty:"));
    }
}

#[path = "query_engine_contracts/mod.rs"]
mod query_engine_contracts;
