//! Bound expression definitions.

use std::collections::HashSet;
use std::fmt;

use crate::catalog::{
    AggregateSymbol, FunctionSymbol, MethodSymbol, PropertySymbol, VariableSymbol,
};
use crate::types::{DataType, Value};

use super::operators::{BinaryOperator, UnaryOperator};
use super::relation::BoundQuery;
use super::scope::ValueSlot;

/// Bound expression after semantic analysis.
///
/// Structural equality ignores syntax entirely, so two spellings of the same
/// computation compare equal and hash alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoundExpression {
    /// Literal value (constant).
    Literal { value: Value, data_type: DataType },

    /// Host variable.
    Variable(VariableSymbol),

    /// Reference to a value produced by a relation.
    ValueSlot(ValueSlot),

    Unary {
        op: UnaryOperator,
        operand: Box<BoundExpression>,
        data_type: DataType,
    },

    Binary {
        op: BinaryOperator,
        left: Box<BoundExpression>,
        right: Box<BoundExpression>,
        data_type: DataType,
    },

    /// Inserted wherever a value changes type.
    Conversion {
        expression: Box<BoundExpression>,
        data_type: DataType,
    },

    Coalesce {
        arguments: Vec<BoundExpression>,
        data_type: DataType,
    },

    NullIf {
        left: Box<BoundExpression>,
        right: Box<BoundExpression>,
        data_type: DataType,
    },

    IsNull {
        expression: Box<BoundExpression>,
        negated: bool,
    },

    /// Searched CASE; simple CASE is lowered into equality conditions.
    Case {
        labels: Vec<CaseLabel>,
        else_expression: Option<Box<BoundExpression>>,
        data_type: DataType,
    },

    FunctionInvocation {
        function: FunctionSymbol,
        arguments: Vec<BoundExpression>,
    },

    PropertyAccess {
        target: Box<BoundExpression>,
        property: PropertySymbol,
    },

    MethodInvocation {
        target: Box<BoundExpression>,
        method: MethodSymbol,
        arguments: Vec<BoundExpression>,
    },

    /// Aggregate call. Only present before hoisting; query relations read
    /// aggregates through slots.
    Aggregate {
        aggregate: AggregateSymbol,
        argument: Option<Box<BoundExpression>>, // None for COUNT(*)
        data_type: DataType,
    },

    Exists { query: Box<BoundQuery> },

    SingleRowSubselect {
        query: Box<BoundQuery>,
        data_type: DataType,
    },

    /// Placeholder for anything that failed to bind.
    Error,
}

/// One `WHEN ... THEN ...` arm of a CASE.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseLabel {
    pub condition: BoundExpression,
    pub result: BoundExpression,
}

impl BoundExpression {
    /// Returns the data type of this expression.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            BoundExpression::Literal { data_type, .. }
            | BoundExpression::Unary { data_type, .. }
            | BoundExpression::Binary { data_type, .. }
            | BoundExpression::Conversion { data_type, .. }
            | BoundExpression::Coalesce { data_type, .. }
            | BoundExpression::NullIf { data_type, .. }
            | BoundExpression::Case { data_type, .. }
            | BoundExpression::Aggregate { data_type, .. }
            | BoundExpression::SingleRowSubselect { data_type, .. } => *data_type,
            BoundExpression::Variable(symbol) => symbol.data_type,
            BoundExpression::ValueSlot(slot) => slot.data_type,
            BoundExpression::IsNull { .. } | BoundExpression::Exists { .. } => DataType::Bool,
            BoundExpression::FunctionInvocation { function, .. } => function.return_type,
            BoundExpression::PropertyAccess { property, .. } => property.data_type,
            BoundExpression::MethodInvocation { method, .. } => method.return_type,
            BoundExpression::Error => DataType::Unknown,
        }
    }

    /// Creates a literal expression typed after its value.
    #[must_use]
    pub fn literal(value: Value) -> Self {
        let data_type = value.data_type();
        BoundExpression::Literal { value, data_type }
    }

    /// Creates a boolean literal.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::literal(Value::Bool(value))
    }

    /// Creates a slot reference.
    #[must_use]
    pub fn slot(slot: &ValueSlot) -> Self {
        BoundExpression::ValueSlot(slot.clone())
    }

    /// Creates a logical AND.
    #[must_use]
    pub fn and(left: BoundExpression, right: BoundExpression) -> Self {
        BoundExpression::Binary {
            op: BinaryOperator::LogicalAnd,
            left: Box::new(left),
            right: Box::new(right),
            data_type: DataType::Bool,
        }
    }

    /// Creates a logical OR.
    #[must_use]
    pub fn or(left: BoundExpression, right: BoundExpression) -> Self {
        BoundExpression::Binary {
            op: BinaryOperator::LogicalOr,
            left: Box::new(left),
            right: Box::new(right),
            data_type: DataType::Bool,
        }
    }

    /// Creates a logical NOT.
    #[must_use]
    pub fn not(operand: BoundExpression) -> Self {
        BoundExpression::Unary {
            op: UnaryOperator::LogicalNot,
            operand: Box::new(operand),
            data_type: DataType::Bool,
        }
    }

    /// Wraps `self` in a conversion unless it already has `data_type`.
    #[must_use]
    pub fn convert_to(self, data_type: DataType) -> Self {
        if self.data_type() == data_type || data_type.is_unknown() || self.is_error() {
            self
        } else {
            BoundExpression::Conversion {
                expression: Box::new(self),
                data_type,
            }
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, BoundExpression::Error)
    }

    /// Whether the expression is the literal `value`.
    #[must_use]
    pub fn is_literal(&self, value: &Value) -> bool {
        matches!(self, BoundExpression::Literal { value: v, .. } if v == value)
    }

    /// Direct sub-expressions, not descending into subqueries.
    #[must_use]
    pub fn children(&self) -> Vec<&BoundExpression> {
        match self {
            BoundExpression::Literal { .. }
            | BoundExpression::Variable(_)
            | BoundExpression::ValueSlot(_)
            | BoundExpression::Exists { .. }
            | BoundExpression::SingleRowSubselect { .. }
            | BoundExpression::Error => vec![],
            BoundExpression::Unary { operand, .. } => vec![operand.as_ref()],
            BoundExpression::Conversion { expression, .. }
            | BoundExpression::IsNull { expression, .. } => vec![expression.as_ref()],
            BoundExpression::Binary { left, right, .. }
            | BoundExpression::NullIf { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            BoundExpression::Coalesce { arguments, .. }
            | BoundExpression::FunctionInvocation { arguments, .. } => arguments.iter().collect(),
            BoundExpression::Case {
                labels,
                else_expression,
                ..
            } => {
                let mut children: Vec<&BoundExpression> = labels
                    .iter()
                    .flat_map(|l| [&l.condition, &l.result])
                    .collect();
                children.extend(else_expression.as_deref());
                children
            }
            BoundExpression::PropertyAccess { target, .. } => vec![target.as_ref()],
            BoundExpression::MethodInvocation {
                target, arguments, ..
            } => std::iter::once(target.as_ref()).chain(arguments).collect(),
            BoundExpression::Aggregate { argument, .. } => argument.as_deref().into_iter().collect(),
        }
    }

    /// Rebuilds the expression bottom-up, letting `f` replace any node after
    /// its children have been rebuilt. Subqueries are left alone.
    #[must_use]
    pub fn rewrite(self, f: &mut impl FnMut(BoundExpression) -> BoundExpression) -> Self {
        let rebuilt = match self {
            BoundExpression::Unary {
                op,
                operand,
                data_type,
            } => BoundExpression::Unary {
                op,
                operand: Self::rewrite_boxed(operand, f),
                data_type,
            },
            BoundExpression::Binary {
                op,
                left,
                right,
                data_type,
            } => {
                let left = Self::rewrite_boxed(left, f);
                BoundExpression::Binary {
                    op,
                    left,
                    right: Self::rewrite_boxed(right, f),
                    data_type,
                }
            }
            BoundExpression::Conversion {
                expression,
                data_type,
            } => BoundExpression::Conversion {
                expression: Self::rewrite_boxed(expression, f),
                data_type,
            },
            BoundExpression::IsNull {
                expression,
                negated,
            } => BoundExpression::IsNull {
                expression: Self::rewrite_boxed(expression, f),
                negated,
            },
            BoundExpression::NullIf {
                left,
                right,
                data_type,
            } => {
                let left = Self::rewrite_boxed(left, f);
                BoundExpression::NullIf {
                    left,
                    right: Self::rewrite_boxed(right, f),
                    data_type,
                }
            }
            BoundExpression::PropertyAccess { target, property } => {
                BoundExpression::PropertyAccess {
                    target: Self::rewrite_boxed(target, f),
                    property,
                }
            }
            BoundExpression::Aggregate {
                aggregate,
                argument,
                data_type,
            } => BoundExpression::Aggregate {
                aggregate,
                argument: argument.map(|a| Self::rewrite_boxed(a, f)),
                data_type,
            },
            BoundExpression::Coalesce {
                arguments,
                data_type,
            } => BoundExpression::Coalesce {
                arguments: arguments.into_iter().map(|a| a.rewrite(f)).collect(),
                data_type,
            },
            BoundExpression::FunctionInvocation {
                function,
                arguments,
            } => BoundExpression::FunctionInvocation {
                function,
                arguments: arguments.into_iter().map(|a| a.rewrite(f)).collect(),
            },
            BoundExpression::MethodInvocation {
                target,
                method,
                arguments,
            } => {
                let target = Box::new(target.rewrite(f));
                BoundExpression::MethodInvocation {
                    target,
                    method,
                    arguments: arguments.into_iter().map(|a| a.rewrite(f)).collect(),
                }
            }
            BoundExpression::Case {
                labels,
                else_expression,
                data_type,
            } => {
                let labels = labels
                    .into_iter()
                    .map(|l| CaseLabel {
                        condition: l.condition.rewrite(f),
                        result: l.result.rewrite(f),
                    })
                    .collect();
                BoundExpression::Case {
                    labels,
                    else_expression: else_expression.map(|e| Box::new(e.rewrite(f))),
                    data_type,
                }
            }
            leaf @ (BoundExpression::Literal { .. }
            | BoundExpression::Variable(_)
            | BoundExpression::ValueSlot(_)
            | BoundExpression::Exists { .. }
            | BoundExpression::SingleRowSubselect { .. }
            | BoundExpression::Error) => leaf,
        };
        f(rebuilt)
    }

    fn rewrite_boxed(
        expression: Box<BoundExpression>,
        f: &mut impl FnMut(BoundExpression) -> BoundExpression,
    ) -> Box<BoundExpression> {
        Box::new(expression.rewrite(f))
    }

    /// Collects every slot this expression reads, including reads made by
    /// nested subqueries.
    pub fn collect_referenced_slots(&self, out: &mut HashSet<ValueSlot>) {
        match self {
            BoundExpression::ValueSlot(slot) => {
                out.insert(slot.clone());
            }
            BoundExpression::Exists { query } | BoundExpression::SingleRowSubselect { query, .. } => {
                query.relation.collect_referenced_slots(out);
            }
            _ => {
                for child in self.children() {
                    child.collect_referenced_slots(out);
                }
            }
        }
    }

    /// Collects every slot defined inside nested subqueries.
    pub fn collect_defined_slots(&self, out: &mut HashSet<ValueSlot>) {
        match self {
            BoundExpression::Exists { query } | BoundExpression::SingleRowSubselect { query, .. } => {
                query.relation.collect_defined_slots(out);
            }
            _ => {
                for child in self.children() {
                    child.collect_defined_slots(out);
                }
            }
        }
    }

    /// Slots read by this expression and not produced inside it.
    #[must_use]
    pub fn referenced_slots(&self) -> HashSet<ValueSlot> {
        let mut referenced = HashSet::new();
        self.collect_referenced_slots(&mut referenced);
        let mut defined = HashSet::new();
        self.collect_defined_slots(&mut defined);
        referenced.retain(|s| !defined.contains(s));
        referenced
    }

    /// First node in pre-order satisfying `predicate`, not descending into
    /// subqueries.
    #[must_use]
    pub fn find(&self, predicate: &impl Fn(&BoundExpression) -> bool) -> Option<&BoundExpression> {
        if predicate(self) {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(predicate))
    }

    /// Whether any node satisfies `predicate`, not descending into subqueries.
    #[must_use]
    pub fn any(&self, predicate: &impl Fn(&BoundExpression) -> bool) -> bool {
        self.find(predicate).is_some()
    }

    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        self.any(&|e| matches!(e, BoundExpression::Aggregate { .. }))
    }

    /// An expression whose value cannot vary between rows.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        !self.any(&|e| {
            matches!(
                e,
                BoundExpression::ValueSlot(_)
                    | BoundExpression::Aggregate { .. }
                    | BoundExpression::Exists { .. }
                    | BoundExpression::SingleRowSubselect { .. }
            )
        })
    }

    /// Splits a predicate into its top-level AND conjuncts.
    #[must_use]
    pub fn split_conjunctions(self) -> Vec<BoundExpression> {
        match self {
            BoundExpression::Binary {
                op: BinaryOperator::LogicalAnd,
                left,
                right,
                ..
            } => {
                let mut conjuncts = left.split_conjunctions();
                conjuncts.extend(right.split_conjunctions());
                conjuncts
            }
            other => vec![other],
        }
    }

    /// Joins conjuncts with AND; `None` for an empty list.
    #[must_use]
    pub fn conjunction(conjuncts: Vec<BoundExpression>) -> Option<BoundExpression> {
        conjuncts.into_iter().reduce(BoundExpression::and)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[BoundExpression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for BoundExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundExpression::Literal { value, .. } => write!(f, "{value}"),
            BoundExpression::Variable(symbol) => write!(f, "@{}", symbol.name),
            BoundExpression::ValueSlot(slot) => write!(f, "{slot}"),
            BoundExpression::Unary { op, operand, .. } => match op {
                UnaryOperator::LogicalNot => write!(f, "NOT {operand}"),
                _ => write!(f, "{op}{operand}"),
            },
            BoundExpression::Binary {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            BoundExpression::Conversion {
                expression,
                data_type,
            } => write!(f, "CAST({expression} AS {data_type})"),
            BoundExpression::Coalesce { arguments, .. } => {
                f.write_str("COALESCE(")?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            BoundExpression::NullIf { left, right, .. } => write!(f, "NULLIF({left}, {right})"),
            BoundExpression::IsNull {
                expression,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expression} IS {not}NULL")
            }
            BoundExpression::Case {
                labels,
                else_expression,
                ..
            } => {
                f.write_str("CASE")?;
                for label in labels {
                    write!(f, " WHEN {} THEN {}", label.condition, label.result)?;
                }
                if let Some(else_expression) = else_expression {
                    write!(f, " ELSE {else_expression}")?;
                }
                f.write_str(" END")
            }
            BoundExpression::FunctionInvocation {
                function,
                arguments,
            } => {
                write!(f, "{}(", function.name)?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            BoundExpression::PropertyAccess { target, property } => {
                write!(f, "{target}.{}", property.name)
            }
            BoundExpression::MethodInvocation {
                target,
                method,
                arguments,
            } => {
                write!(f, "{target}.{}(", method.name)?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            BoundExpression::Aggregate {
                aggregate,
                argument,
                ..
            } => match argument {
                Some(argument) => write!(f, "{}({argument})", aggregate.name),
                None => write!(f, "{}(*)", aggregate.name),
            },
            BoundExpression::Exists { .. } => f.write_str("EXISTS(<subquery>)"),
            BoundExpression::SingleRowSubselect { .. } => f.write_str("(<subquery>)"),
            BoundExpression::Error => f.write_str("<error>"),
        }
    }
}
