//! Value slots and per-query binding state.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::catalog::{AggregateSymbol, TableSymbol};
use crate::parser::NodeId;
use crate::types::DataType;

use super::expression::BoundExpression;

/// A named, typed value produced by a relation.
///
/// Identity is the id alone; names are for display.
#[derive(Debug, Clone)]
pub struct ValueSlot {
    pub id: u32,
    pub name: Arc<str>,
    pub data_type: DataType,
}

impl PartialEq for ValueSlot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueSlot {}

impl Hash for ValueSlot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ValueSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Hands out slots with unique ids.
#[derive(Debug, Clone, Default)]
pub struct ValueSlotFactory {
    next: u32,
}

impl ValueSlotFactory {
    /// Creates a slot with the next free id.
    pub fn create(&mut self, name: &str, data_type: DataType) -> ValueSlot {
        let id = self.next;
        self.next += 1;
        ValueSlot {
            id,
            name: Arc::from(name),
            data_type,
        }
    }
}

/// A value computed from an expression and stored in a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputedValue {
    pub expression: BoundExpression,
    pub slot: ValueSlot,
}

/// An aggregate computed by a group-by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregatedValue {
    pub aggregate: AggregateSymbol,
    pub argument: Option<BoundExpression>,
    pub slot: ValueSlot,
}

/// A column of a table instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnInstance {
    pub name: String,
    pub slot: ValueSlot,
}

/// One occurrence of a table or derived table in a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableInstance {
    /// The alias, or the table name when there is none.
    pub name: String,
    /// `None` for derived tables.
    pub table: Option<TableSymbol>,
    pub columns: Vec<ColumnInstance>,
}

impl TableInstance {
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnInstance> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn owns(&self, slot: &ValueSlot) -> bool {
        self.columns.iter().any(|c| &c.slot == slot)
    }
}

/// The clause an expression is being bound in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ClauseContext {
    #[default]
    None,
    On,
    Where,
    GroupBy,
    Select,
    Having,
    OrderBy,
}

/// Binding state of a single query scope.
///
/// States live on the binder's stack; `parent` indexes the enclosing query
/// so correlated names resolve outward.
#[derive(Debug, Default)]
pub(crate) struct BoundQueryState {
    pub parent: Option<usize>,
    pub tables: Vec<TableInstance>,
    pub groupings: Vec<ComputedValue>,
    pub aggregates: Vec<AggregatedValue>,
    pub projections: Vec<ComputedValue>,
    /// Hoisted expressions and the slot holding their value.
    pub replaced: HashMap<BoundExpression, ValueSlot>,
    /// Slots recorded for select-list and grouping syntax.
    pub node_slots: HashMap<NodeId, ValueSlot>,
    /// Set once a FROM table failed to resolve; silences follow-up name errors.
    pub has_undeclared_table: bool,
    pub clause: ClauseContext,
    pub in_aggregate: bool,
}

impl BoundQueryState {
    #[must_use]
    pub fn new(parent: Option<usize>) -> Self {
        BoundQueryState {
            parent,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableInstance> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Whether `slot` is a column of one of this query's tables.
    #[must_use]
    pub fn owns_column(&self, slot: &ValueSlot) -> bool {
        self.tables.iter().any(|t| t.owns(slot))
    }
}
