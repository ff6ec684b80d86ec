//! Bound relations: the relational algebra tree a query binds to.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::expression::BoundExpression;
use super::scope::{AggregatedValue, ComputedValue, TableInstance, ValueSlot};

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    /// Left rows with at least one match; outputs left values only.
    LeftSemi,
    /// Left rows without any match; outputs left values only.
    LeftAntiSemi,
}

impl JoinType {
    /// Whether only the left side's values are visible above the join.
    #[must_use]
    pub fn is_semi(&self) -> bool {
        matches!(self, JoinType::LeftSemi | JoinType::LeftAntiSemi)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::LeftOuter => write!(f, "LEFT OUTER"),
            JoinType::RightOuter => write!(f, "RIGHT OUTER"),
            JoinType::FullOuter => write!(f, "FULL OUTER"),
            JoinType::LeftSemi => write!(f, "LEFT SEMI"),
            JoinType::LeftAntiSemi => write!(f, "LEFT ANTI SEMI"),
        }
    }
}

/// Set operations combining two queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOperation {
    UnionAll,
    Union,
    Intersect,
    Except,
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOperation::UnionAll => write!(f, "UNION ALL"),
            SetOperation::Union => write!(f, "UNION"),
            SetOperation::Intersect => write!(f, "INTERSECT"),
            SetOperation::Except => write!(f, "EXCEPT"),
        }
    }
}

/// Sort key over a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub slot: ValueSlot,
    pub ascending: bool,
}

/// Bound relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundRelation {
    /// Scan of a table instance.
    Table(TableInstance),

    /// Exactly one row with no values.
    Constant,

    /// No rows.
    Empty { output: Vec<ValueSlot> },

    Filter {
        input: Box<BoundRelation>,
        condition: BoundExpression,
    },

    /// Extends each input row with computed values.
    Compute {
        input: Box<BoundRelation>,
        values: Vec<ComputedValue>,
    },

    Join {
        join_type: JoinType,
        left: Box<BoundRelation>,
        right: Box<BoundRelation>,
        condition: Option<BoundExpression>,
    },

    GroupBy {
        input: Box<BoundRelation>,
        groups: Vec<ValueSlot>,
        aggregates: Vec<AggregatedValue>,
    },

    Sort {
        input: Box<BoundRelation>,
        keys: Vec<SortKey>,
    },

    /// First `limit` rows. Non-empty `ties` keeps rows that tie with the
    /// last one on those keys.
    Top {
        input: Box<BoundRelation>,
        limit: u64,
        ties: Vec<SortKey>,
    },

    Project {
        input: Box<BoundRelation>,
        outputs: Vec<ValueSlot>,
    },

    /// Set operation; `left_values` and `right_values` map position-wise
    /// onto `outputs`.
    Combined {
        op: SetOperation,
        left: Box<BoundRelation>,
        right: Box<BoundRelation>,
        left_values: Vec<ValueSlot>,
        right_values: Vec<ValueSlot>,
        outputs: Vec<ValueSlot>,
    },
}

impl BoundRelation {
    /// Creates a filter node.
    #[must_use]
    pub fn filter(input: BoundRelation, condition: BoundExpression) -> Self {
        BoundRelation::Filter {
            input: Box::new(input),
            condition,
        }
    }

    /// Creates a join node.
    #[must_use]
    pub fn join(
        join_type: JoinType,
        left: BoundRelation,
        right: BoundRelation,
        condition: Option<BoundExpression>,
    ) -> Self {
        BoundRelation::Join {
            join_type,
            left: Box::new(left),
            right: Box::new(right),
            condition,
        }
    }

    /// Creates a projection node.
    #[must_use]
    pub fn project(input: BoundRelation, outputs: Vec<ValueSlot>) -> Self {
        BoundRelation::Project {
            input: Box::new(input),
            outputs,
        }
    }

    /// Values visible to the parent of this relation.
    #[must_use]
    pub fn output_values(&self) -> Vec<ValueSlot> {
        match self {
            BoundRelation::Table(instance) => {
                instance.columns.iter().map(|c| c.slot.clone()).collect()
            }
            BoundRelation::Constant => Vec::new(),
            BoundRelation::Empty { output } => output.clone(),
            BoundRelation::Filter { input, .. }
            | BoundRelation::Sort { input, .. }
            | BoundRelation::Top { input, .. } => input.output_values(),
            BoundRelation::Compute { input, values } => {
                let mut output = input.output_values();
                output.extend(values.iter().map(|v| v.slot.clone()));
                output
            }
            BoundRelation::Join {
                join_type,
                left,
                right,
                ..
            } => {
                let mut output = left.output_values();
                if !join_type.is_semi() {
                    output.extend(right.output_values());
                }
                output
            }
            BoundRelation::GroupBy {
                groups, aggregates, ..
            } => {
                let mut output = groups.clone();
                output.extend(aggregates.iter().map(|a| a.slot.clone()));
                output
            }
            BoundRelation::Project { outputs, .. } | BoundRelation::Combined { outputs, .. } => {
                outputs.clone()
            }
        }
    }

    /// Returns the child relations.
    #[must_use]
    pub fn children(&self) -> Vec<&BoundRelation> {
        match self {
            BoundRelation::Table(_) | BoundRelation::Constant | BoundRelation::Empty { .. } => {
                vec![]
            }
            BoundRelation::Filter { input, .. }
            | BoundRelation::Compute { input, .. }
            | BoundRelation::GroupBy { input, .. }
            | BoundRelation::Sort { input, .. }
            | BoundRelation::Top { input, .. }
            | BoundRelation::Project { input, .. } => vec![input.as_ref()],
            BoundRelation::Join { left, right, .. } | BoundRelation::Combined { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
        }
    }

    /// Expressions evaluated directly by this node.
    #[must_use]
    pub fn expressions(&self) -> Vec<&BoundExpression> {
        match self {
            BoundRelation::Filter { condition, .. } => vec![condition],
            BoundRelation::Compute { values, .. } => values.iter().map(|v| &v.expression).collect(),
            BoundRelation::Join { condition, .. } => condition.iter().collect(),
            BoundRelation::GroupBy { aggregates, .. } => aggregates
                .iter()
                .filter_map(|a| a.argument.as_ref())
                .collect(),
            _ => vec![],
        }
    }

    /// Collects every slot read in this subtree, including reads by
    /// subqueries nested in its expressions.
    pub fn collect_referenced_slots(&self, out: &mut HashSet<ValueSlot>) {
        for expression in self.expressions() {
            expression.collect_referenced_slots(out);
        }
        match self {
            BoundRelation::GroupBy { groups, .. } => out.extend(groups.iter().cloned()),
            BoundRelation::Sort { keys, .. } => out.extend(keys.iter().map(|k| k.slot.clone())),
            BoundRelation::Top { ties, .. } => out.extend(ties.iter().map(|k| k.slot.clone())),
            BoundRelation::Project { outputs, .. } => out.extend(outputs.iter().cloned()),
            BoundRelation::Combined {
                left_values,
                right_values,
                ..
            } => {
                out.extend(left_values.iter().cloned());
                out.extend(right_values.iter().cloned());
            }
            _ => {}
        }
        for child in self.children() {
            child.collect_referenced_slots(out);
        }
    }

    /// Collects every slot produced in this subtree, including slots produced
    /// inside nested subqueries.
    pub fn collect_defined_slots(&self, out: &mut HashSet<ValueSlot>) {
        match self {
            BoundRelation::Table(instance) => {
                out.extend(instance.columns.iter().map(|c| c.slot.clone()));
            }
            BoundRelation::Empty { output } => out.extend(output.iter().cloned()),
            BoundRelation::Compute { values, .. } => {
                out.extend(values.iter().map(|v| v.slot.clone()));
            }
            BoundRelation::GroupBy { aggregates, .. } => {
                out.extend(aggregates.iter().map(|a| a.slot.clone()));
            }
            BoundRelation::Combined { outputs, .. } => out.extend(outputs.iter().cloned()),
            _ => {}
        }
        for expression in self.expressions() {
            expression.collect_defined_slots(out);
        }
        for child in self.children() {
            child.collect_defined_slots(out);
        }
    }

    /// Slots read in this subtree that it does not produce itself, i.e. the
    /// correlated references to enclosing queries.
    #[must_use]
    pub fn outer_references(&self) -> HashSet<ValueSlot> {
        let mut referenced = HashSet::new();
        self.collect_referenced_slots(&mut referenced);
        let mut defined = HashSet::new();
        self.collect_defined_slots(&mut defined);
        referenced.retain(|s| !defined.contains(s));
        referenced
    }

    /// Short node name, used for explain output and tracing.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            BoundRelation::Table(_) => "Table",
            BoundRelation::Constant => "Constant",
            BoundRelation::Empty { .. } => "Empty",
            BoundRelation::Filter { .. } => "Filter",
            BoundRelation::Compute { .. } => "Compute",
            BoundRelation::Join { .. } => "Join",
            BoundRelation::GroupBy { .. } => "GroupBy",
            BoundRelation::Sort { .. } => "Sort",
            BoundRelation::Top { .. } => "Top",
            BoundRelation::Project { .. } => "Project",
            BoundRelation::Combined { .. } => "Combined",
        }
    }
}

fn slot_list(slots: &[ValueSlot]) -> String {
    slots
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn key_list(keys: &[SortKey]) -> String {
    keys.iter()
        .map(|k| {
            let dir = if k.ascending { "ASC" } else { "DESC" };
            format!("{} {dir}", k.slot)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for BoundRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.format_plan(f, 0)
    }
}

impl BoundRelation {
    fn format_plan(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        let child_prefix = "  ".repeat(indent + 1);

        match self {
            BoundRelation::Table(instance) => {
                let columns: Vec<_> = instance.columns.iter().map(|c| c.slot.clone()).collect();
                match &instance.table {
                    Some(table) if !table.name.eq_ignore_ascii_case(&instance.name) => writeln!(
                        f,
                        "{prefix}Table: {} AS {} [{}]",
                        table.name,
                        instance.name,
                        slot_list(&columns)
                    )?,
                    _ => writeln!(f, "{prefix}Table: {} [{}]", instance.name, slot_list(&columns))?,
                }
            }
            BoundRelation::Constant => writeln!(f, "{prefix}Constant")?,
            BoundRelation::Empty { output } => {
                writeln!(f, "{prefix}Empty: [{}]", slot_list(output))?;
            }
            BoundRelation::Filter { input, condition } => {
                writeln!(f, "{prefix}Filter: {condition}")?;
                input.format_plan(f, indent + 1)?;
            }
            BoundRelation::Compute { input, values } => {
                writeln!(f, "{prefix}Compute:")?;
                for value in values {
                    writeln!(f, "{child_prefix}  {} := {}", value.slot, value.expression)?;
                }
                input.format_plan(f, indent + 1)?;
            }
            BoundRelation::Join {
                join_type,
                left,
                right,
                condition,
            } => {
                match condition {
                    Some(condition) => writeln!(f, "{prefix}Join: {join_type} ON {condition}")?,
                    None => writeln!(f, "{prefix}Join: {join_type}")?,
                }
                left.format_plan(f, indent + 1)?;
                right.format_plan(f, indent + 1)?;
            }
            BoundRelation::GroupBy {
                input,
                groups,
                aggregates,
            } => {
                writeln!(f, "{prefix}GroupBy: [{}]", slot_list(groups))?;
                for aggregate in aggregates {
                    match &aggregate.argument {
                        Some(argument) => writeln!(
                            f,
                            "{child_prefix}  {} := {}({argument})",
                            aggregate.slot, aggregate.aggregate.name
                        )?,
                        None => writeln!(
                            f,
                            "{child_prefix}  {} := {}(*)",
                            aggregate.slot, aggregate.aggregate.name
                        )?,
                    }
                }
                input.format_plan(f, indent + 1)?;
            }
            BoundRelation::Sort { input, keys } => {
                writeln!(f, "{prefix}Sort: [{}]", key_list(keys))?;
                input.format_plan(f, indent + 1)?;
            }
            BoundRelation::Top { input, limit, ties } => {
                if ties.is_empty() {
                    writeln!(f, "{prefix}Top: {limit}")?;
                } else {
                    writeln!(f, "{prefix}Top: {limit} WITH TIES [{}]", key_list(ties))?;
                }
                input.format_plan(f, indent + 1)?;
            }
            BoundRelation::Project { input, outputs } => {
                writeln!(f, "{prefix}Project: [{}]", slot_list(outputs))?;
                input.format_plan(f, indent + 1)?;
            }
            BoundRelation::Combined {
                op,
                left,
                right,
                outputs,
                ..
            } => {
                writeln!(f, "{prefix}{op}: [{}]", slot_list(outputs))?;
                left.format_plan(f, indent + 1)?;
                right.format_plan(f, indent + 1)?;
            }
        }
        Ok(())
    }
}

/// A named output column of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryColumn {
    /// Alias, column or property name; empty for unnamed expressions.
    pub name: String,
    pub slot: ValueSlot,
}

/// A bound query: its relation plus the named output columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundQuery {
    pub relation: BoundRelation,
    pub output_columns: Vec<QueryColumn>,
}

impl BoundQuery {
    #[must_use]
    pub fn output_slots(&self) -> Vec<ValueSlot> {
        self.output_columns.iter().map(|c| c.slot.clone()).collect()
    }
}
