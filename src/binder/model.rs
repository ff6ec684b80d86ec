//! The semantic model: binding results queryable by syntax node.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{
    AggregateSymbol, FunctionSymbol, MethodSymbol, PropertySymbol, VariableSymbol,
};
use crate::diagnostics::Diagnostic;
use crate::parser::{NodeId, SyntaxTree};
use crate::types::DataType;

use super::expression::BoundExpression;
use super::relation::{BoundQuery, BoundRelation};
use super::scope::{TableInstance, ValueSlot};

/// What a name in the source resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// A table or derived table reference in FROM.
    Table(TableInstance),
    Column {
        table: String,
        name: String,
        slot: ValueSlot,
    },
    /// A select-list alias referenced from ORDER BY.
    Alias { name: String, slot: ValueSlot },
    Variable(VariableSymbol),
    Function(FunctionSymbol),
    Aggregate(AggregateSymbol),
    Property(PropertySymbol),
    Method(MethodSymbol),
    Type(DataType),
}

/// The bound form of the tree's root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundRoot {
    Expression(BoundExpression),
    Query(BoundQuery),
}

/// Everything the binder produced for one syntax tree.
#[derive(Debug, Default)]
pub(crate) struct BindOutput {
    pub root: Option<BoundRoot>,
    pub expressions: HashMap<NodeId, BoundExpression>,
    pub queries: HashMap<NodeId, BoundQuery>,
    pub symbols: HashMap<NodeId, Symbol>,
    pub slots: HashMap<NodeId, ValueSlot>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Semantic information about a syntax tree bound against a data context.
///
/// Immutable once built; lookups are keyed by the `NodeId`s of the tree the
/// model was created from.
#[derive(Debug)]
pub struct SemanticModel {
    tree: Arc<SyntaxTree>,
    output: BindOutput,
    plan: Option<BoundRelation>,
}

impl SemanticModel {
    pub(crate) fn new(
        tree: Arc<SyntaxTree>,
        output: BindOutput,
        plan: Option<BoundRelation>,
    ) -> Self {
        SemanticModel { tree, output, plan }
    }

    /// The tree this model describes.
    #[must_use]
    pub fn syntax_tree(&self) -> &Arc<SyntaxTree> {
        &self.tree
    }

    /// The bound root expression or query.
    #[must_use]
    pub fn root(&self) -> Option<&BoundRoot> {
        self.output.root.as_ref()
    }

    /// Type of an expression node; `Unknown` when it failed to bind.
    #[must_use]
    pub fn expression_type(&self, node: NodeId) -> Option<DataType> {
        self.bound_expression(node).map(BoundExpression::data_type)
    }

    /// The bound form of an expression node, before aggregate hoisting.
    #[must_use]
    pub fn bound_expression(&self, node: NodeId) -> Option<&BoundExpression> {
        self.output.expressions.get(&node)
    }

    /// The bound form of a query node.
    #[must_use]
    pub fn bound_query(&self, node: NodeId) -> Option<&BoundQuery> {
        self.output.queries.get(&node)
    }

    /// What a name-bearing node resolved to.
    #[must_use]
    pub fn symbol(&self, node: NodeId) -> Option<&Symbol> {
        self.output.symbols.get(&node)
    }

    /// The slot holding the value of a select column or GROUP BY item.
    #[must_use]
    pub fn slot(&self, node: NodeId) -> Option<&ValueSlot> {
        self.output.slots.get(&node)
    }

    /// Semantic diagnostics in the order they were found.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.output.diagnostics
    }

    /// The relation of the root query after optimization, if the root is a
    /// query.
    #[must_use]
    pub fn query_plan(&self) -> Option<&BoundRelation> {
        self.plan.as_ref()
    }
}
