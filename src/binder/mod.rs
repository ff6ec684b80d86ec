//! Binder module for semantic analysis.
//!
//! The binder resolves a parsed syntax tree against a [`DataContext`]:
//! - Table, column, variable, function and aggregate names
//! - Operator and overload resolution with implicit conversions
//! - Grouping, aggregation and ordering rules of queries
//!
//! The output is a [`SemanticModel`] holding bound expressions and relations.
//!
//! [`DataContext`]: crate::catalog::DataContext

mod conversion;
mod expression;
mod model;
mod operators;
mod overload;
mod query;
mod relation;
mod scope;
mod semantic;

pub use conversion::{classify, common_type, ConversionKind};
pub use expression::{BoundExpression, CaseLabel};
pub use model::{BoundRoot, SemanticModel, Symbol};
pub use operators::{
    resolve_binary, resolve_unary, BinaryOperator, OperatorResolution, OperatorSignature,
    UnaryOperator,
};
pub use overload::{resolve_overload, OverloadResolution};
pub use relation::{BoundQuery, BoundRelation, JoinType, QueryColumn, SetOperation, SortKey};
pub use scope::{AggregatedValue, ColumnInstance, ComputedValue, TableInstance, ValueSlot, ValueSlotFactory};
pub use semantic::Binder;

