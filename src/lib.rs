//! ruql - an embeddable SQL-like query compiler
//!
//! Source text flows through four stages: the lexer and lossless parser
//! ([`parser`]), the semantic binder ([`binder`]) and the cardinality-driven
//! optimizer ([`planner`]). [`Compilation`] ties them together for a host
//! supplying a [`DataContext`](catalog::DataContext).

pub mod binder;
pub mod catalog;
pub mod diagnostics;
pub mod error;
pub mod parser;
pub mod planner;
pub mod text;
pub mod types;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::{Result, RuqlError};
pub use types::{DataType, Value};

use binder::{Binder, BoundRoot, SemanticModel};
use catalog::DataContext;
use diagnostics::Diagnostic;
use parser::SyntaxTree;
use planner::{OptimizerConfig, Planner};

/// Options controlling how a [`Compilation`] builds its semantic model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationOptions {
    /// Run the optimizer over the bound query.
    pub optimize: bool,
    /// Which optimizer rules run.
    pub optimizer: OptimizerConfig,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl CompilationOptions {
    /// Creates options with optimization enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables optimization.
    #[must_use]
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Sets the optimizer rule selection.
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }
}

/// A syntax tree paired with the data context it binds against.
///
/// Immutable; every `with_*` call returns a new compilation.
#[derive(Clone)]
pub struct Compilation {
    options: CompilationOptions,
    data_context: Arc<DataContext>,
    syntax_tree: Option<Arc<SyntaxTree>>,
}

impl Default for Compilation {
    fn default() -> Self {
        Self::empty()
    }
}

impl Compilation {
    /// A compilation with default options, the built-in data context and no
    /// syntax tree.
    #[must_use]
    pub fn empty() -> Self {
        Compilation {
            options: CompilationOptions::default(),
            data_context: Arc::new(DataContext::default()),
            syntax_tree: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CompilationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_data_context(mut self, data_context: Arc<DataContext>) -> Self {
        self.data_context = data_context;
        self
    }

    #[must_use]
    pub fn with_syntax_tree(mut self, syntax_tree: Arc<SyntaxTree>) -> Self {
        self.syntax_tree = Some(syntax_tree);
        self
    }

    #[must_use]
    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    #[must_use]
    pub fn data_context(&self) -> &Arc<DataContext> {
        &self.data_context
    }

    #[must_use]
    pub fn syntax_tree(&self) -> Option<&Arc<SyntaxTree>> {
        self.syntax_tree.as_ref()
    }

    /// Binds the syntax tree and, for queries, optimizes the bound relation.
    ///
    /// Plans of trees with errors are returned as bound, without optimization.
    ///
    /// # Errors
    ///
    /// Returns [`RuqlError::MissingSyntaxTree`] if no tree was supplied.
    pub fn semantic_model(&self) -> Result<SemanticModel> {
        let tree = self
            .syntax_tree
            .clone()
            .ok_or(RuqlError::MissingSyntaxTree)?;
        let output = Binder::new(&tree, &self.data_context).bind();

        let has_errors = tree
            .diagnostics()
            .iter()
            .chain(&output.diagnostics)
            .any(Diagnostic::is_error);
        let plan = match &output.root {
            Some(BoundRoot::Query(query)) if self.options.optimize && !has_errors => {
                let planner = Planner::with_config(&self.options.optimizer);
                Some(planner.optimize(query.relation.clone())?)
            }
            Some(BoundRoot::Query(query)) => Some(query.relation.clone()),
            _ => None,
        };
        debug!(
            diagnostics = output.diagnostics.len(),
            optimized = self.options.optimize && !has_errors,
            "built semantic model"
        );
        Ok(SemanticModel::new(tree, output, plan))
    }

    /// All diagnostics: lexical, then syntactic, then semantic.
    ///
    /// # Errors
    ///
    /// Returns [`RuqlError::MissingSyntaxTree`] if no tree was supplied.
    pub fn diagnostics(&self) -> Result<Vec<Diagnostic>> {
        let model = self.semantic_model()?;
        let mut diagnostics = model.syntax_tree().diagnostics().to_vec();
        diagnostics.extend_from_slice(model.diagnostics());
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tree_is_an_error() {
        assert_eq!(
            Compilation::empty().semantic_model().unwrap_err(),
            RuqlError::MissingSyntaxTree
        );
    }

    #[test]
    fn test_expression_has_no_plan() {
        let tree = Arc::new(SyntaxTree::parse_expression("1 + 2"));
        let model = Compilation::empty()
            .with_syntax_tree(tree)
            .semantic_model()
            .unwrap();
        assert!(model.query_plan().is_none());
        assert!(matches!(model.root(), Some(BoundRoot::Expression(_))));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: CompilationOptions =
            serde_json::from_str(r#"{"optimizer": {"push_down_filters": false}}"#).unwrap();
        assert!(options.optimize);
        assert!(!options.optimizer.push_down_filters);
        assert!(options.optimizer.unnest_subqueries);
    }
}
