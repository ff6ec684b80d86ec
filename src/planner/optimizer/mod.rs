//! Query optimization rules.
//!
//! This module contains optimizer rules that rewrite bound relations into
//! cheaper forms with the same rows and ordering.

mod at_most_one_row;
pub mod cardinality;
mod filter_pushdown;
mod subquery_unnesting;

pub use at_most_one_row::AtMostOneRowRule;
pub use cardinality::{estimate, CardinalityEstimate};
pub use filter_pushdown::FilterPushdownRule;
pub use subquery_unnesting::SubqueryUnnestingRule;

use crate::binder::{BinaryOperator, BoundExpression, BoundRelation, UnaryOperator};
use crate::error::Result;
use crate::types::Value;

/// Result of optimization transformation.
#[derive(Debug)]
pub enum Transformed<T> {
    /// Plan was modified.
    Yes(T),
    /// Plan unchanged.
    No(T),
}

impl<T> Transformed<T> {
    /// Returns the inner value.
    pub fn into_inner(self) -> T {
        match self {
            Transformed::Yes(v) | Transformed::No(v) => v,
        }
    }

    /// Returns true if the plan was modified.
    #[must_use]
    pub fn was_transformed(&self) -> bool {
        matches!(self, Transformed::Yes(_))
    }
}

/// Optimizer rule trait.
pub trait OptimizerRule: Send + Sync {
    /// Returns the name of this rule.
    fn name(&self) -> &str;

    /// Rewrites the whole relation tree if applicable.
    fn rewrite(&self, plan: BoundRelation) -> Result<Transformed<BoundRelation>>;
}

fn transform_child(
    input: Box<BoundRelation>,
    f: &mut impl FnMut(BoundRelation) -> Result<Transformed<BoundRelation>>,
    changed: &mut bool,
) -> Result<Box<BoundRelation>> {
    let transformed = transform_up(*input, f)?;
    *changed |= transformed.was_transformed();
    Ok(Box::new(transformed.into_inner()))
}

/// Applies `f` to every node, children before parents.
pub(crate) fn transform_up(
    plan: BoundRelation,
    f: &mut impl FnMut(BoundRelation) -> Result<Transformed<BoundRelation>>,
) -> Result<Transformed<BoundRelation>> {
    let mut changed = false;
    let plan = match plan {
        BoundRelation::Filter { input, condition } => BoundRelation::Filter {
            input: transform_child(input, f, &mut changed)?,
            condition,
        },
        BoundRelation::Compute { input, values } => BoundRelation::Compute {
            input: transform_child(input, f, &mut changed)?,
            values,
        },
        BoundRelation::Join {
            join_type,
            left,
            right,
            condition,
        } => BoundRelation::Join {
            join_type,
            left: transform_child(left, f, &mut changed)?,
            right: transform_child(right, f, &mut changed)?,
            condition,
        },
        BoundRelation::GroupBy {
            input,
            groups,
            aggregates,
        } => BoundRelation::GroupBy {
            input: transform_child(input, f, &mut changed)?,
            groups,
            aggregates,
        },
        BoundRelation::Sort { input, keys } => BoundRelation::Sort {
            input: transform_child(input, f, &mut changed)?,
            keys,
        },
        BoundRelation::Top { input, limit, ties } => BoundRelation::Top {
            input: transform_child(input, f, &mut changed)?,
            limit,
            ties,
        },
        BoundRelation::Project { input, outputs } => BoundRelation::Project {
            input: transform_child(input, f, &mut changed)?,
            outputs,
        },
        BoundRelation::Combined {
            op,
            left,
            right,
            left_values,
            right_values,
            outputs,
        } => BoundRelation::Combined {
            op,
            left: transform_child(left, f, &mut changed)?,
            right: transform_child(right, f, &mut changed)?,
            left_values,
            right_values,
            outputs,
        },
        leaf @ (BoundRelation::Table(_) | BoundRelation::Constant | BoundRelation::Empty { .. }) => {
            leaf
        }
    };
    match f(plan)? {
        Transformed::Yes(plan) => Ok(Transformed::Yes(plan)),
        Transformed::No(plan) if changed => Ok(Transformed::Yes(plan)),
        no => Ok(no),
    }
}

// ============================================================================
// Helper functions for constant evaluation
// ============================================================================

/// Result of evaluating a constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// Expression is a constant true.
    True,
    /// Expression is a constant false.
    False,
    /// Expression cannot be evaluated at compile time, or is null.
    Unknown,
}

impl From<bool> for ConstantValue {
    fn from(value: bool) -> Self {
        if value {
            ConstantValue::True
        } else {
            ConstantValue::False
        }
    }
}

/// Tries to evaluate a BoundExpression to a constant boolean value.
fn try_evaluate_constant(expr: &BoundExpression) -> ConstantValue {
    match expr {
        BoundExpression::Literal {
            value: Value::Bool(b),
            ..
        } => ConstantValue::from(*b),
        BoundExpression::Binary {
            op, left, right, ..
        } => match op {
            BinaryOperator::LogicalAnd => {
                match (try_evaluate_constant(left), try_evaluate_constant(right)) {
                    (ConstantValue::False, _) | (_, ConstantValue::False) => ConstantValue::False,
                    (ConstantValue::True, ConstantValue::True) => ConstantValue::True,
                    _ => ConstantValue::Unknown,
                }
            }
            BinaryOperator::LogicalOr => {
                match (try_evaluate_constant(left), try_evaluate_constant(right)) {
                    (ConstantValue::True, _) | (_, ConstantValue::True) => ConstantValue::True,
                    (ConstantValue::False, ConstantValue::False) => ConstantValue::False,
                    _ => ConstantValue::Unknown,
                }
            }
            _ => match (left.as_ref(), right.as_ref()) {
                (
                    BoundExpression::Literal {
                        value: left_val, ..
                    },
                    BoundExpression::Literal {
                        value: right_val, ..
                    },
                ) => evaluate_comparison(left_val, *op, right_val),
                _ => ConstantValue::Unknown,
            },
        },
        BoundExpression::Unary {
            op: UnaryOperator::LogicalNot,
            operand,
            ..
        } => match try_evaluate_constant(operand) {
            ConstantValue::True => ConstantValue::False,
            ConstantValue::False => ConstantValue::True,
            ConstantValue::Unknown => ConstantValue::Unknown,
        },
        _ => ConstantValue::Unknown,
    }
}

/// Evaluates a comparison between two constant values.
///
/// Comparisons involving null stay unknown.
fn evaluate_comparison(left: &Value, op: BinaryOperator, right: &Value) -> ConstantValue {
    use std::cmp::Ordering;

    let Some(ordering) = left.compare(right) else {
        return ConstantValue::Unknown;
    };
    let result = match op {
        BinaryOperator::Equal => ordering == Ordering::Equal,
        BinaryOperator::NotEqual => ordering != Ordering::Equal,
        BinaryOperator::Less => ordering == Ordering::Less,
        BinaryOperator::LessOrEqual | BinaryOperator::NotGreater => {
            ordering != Ordering::Greater
        }
        BinaryOperator::Greater => ordering == Ordering::Greater,
        BinaryOperator::GreaterOrEqual | BinaryOperator::NotLess => ordering != Ordering::Less,
        _ => return ConstantValue::Unknown,
    };
    ConstantValue::from(result)
}

fn constant_literal(value: &ConstantValue) -> Option<BoundExpression> {
    match value {
        ConstantValue::True => Some(BoundExpression::boolean(true)),
        ConstantValue::False => Some(BoundExpression::boolean(false)),
        ConstantValue::Unknown => None,
    }
}

/// Simplifies a predicate expression by removing constant subexpressions.
fn simplify_predicate(expr: &BoundExpression) -> BoundExpression {
    match expr {
        BoundExpression::Binary {
            op: op @ (BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr),
            left,
            right,
            ..
        } => {
            let left = simplify_predicate(left);
            let right = simplify_predicate(right);
            // The absorbing constant decides the result; the neutral one drops out.
            let (absorbing, neutral) = if *op == BinaryOperator::LogicalAnd {
                (ConstantValue::False, ConstantValue::True)
            } else {
                (ConstantValue::True, ConstantValue::False)
            };
            let left_val = try_evaluate_constant(&left);
            let right_val = try_evaluate_constant(&right);
            if left_val == absorbing || right_val == absorbing {
                constant_literal(&absorbing).unwrap_or(left)
            } else if left_val == neutral {
                right
            } else if right_val == neutral {
                left
            } else if *op == BinaryOperator::LogicalAnd {
                BoundExpression::and(left, right)
            } else {
                BoundExpression::or(left, right)
            }
        }
        BoundExpression::Unary {
            op: UnaryOperator::LogicalNot,
            operand,
            ..
        } => {
            let simplified = simplify_predicate(operand);
            match try_evaluate_constant(&simplified) {
                ConstantValue::True => BoundExpression::boolean(false),
                ConstantValue::False => BoundExpression::boolean(true),
                ConstantValue::Unknown => BoundExpression::not(simplified),
            }
        }
        BoundExpression::Binary { .. } => {
            constant_literal(&try_evaluate_constant(expr)).unwrap_or_else(|| expr.clone())
        }
        _ => expr.clone(),
    }
}

/// Predicate simplification rule.
///
/// Simplifies constant predicates: `WHERE 1 = 0` becomes an empty relation
/// and `WHERE 1 = 1` disappears.
pub struct PredicateSimplificationRule;

impl PredicateSimplificationRule {
    fn rewrite_node(plan: BoundRelation) -> Transformed<BoundRelation> {
        match plan {
            BoundRelation::Filter { input, condition } => {
                let simplified = simplify_predicate(&condition);
                match try_evaluate_constant(&simplified) {
                    ConstantValue::False => Transformed::Yes(BoundRelation::Empty {
                        output: input.output_values(),
                    }),
                    ConstantValue::True => Transformed::Yes(*input),
                    ConstantValue::Unknown if simplified != condition => {
                        Transformed::Yes(BoundRelation::Filter {
                            input,
                            condition: simplified,
                        })
                    }
                    ConstantValue::Unknown => Transformed::No(BoundRelation::Filter { input, condition }),
                }
            }
            BoundRelation::Join {
                join_type,
                left,
                right,
                condition: Some(condition),
            } => {
                let simplified = simplify_predicate(&condition);
                let (condition, transformed) = match try_evaluate_constant(&simplified) {
                    ConstantValue::True => (None, true),
                    _ => {
                        let transformed = simplified != condition;
                        (Some(simplified), transformed)
                    }
                };
                let plan = BoundRelation::Join {
                    join_type,
                    left,
                    right,
                    condition,
                };
                if transformed {
                    Transformed::Yes(plan)
                } else {
                    Transformed::No(plan)
                }
            }
            other => Transformed::No(other),
        }
    }
}

impl OptimizerRule for PredicateSimplificationRule {
    fn name(&self) -> &str {
        "PredicateSimplification"
    }

    fn rewrite(&self, plan: BoundRelation) -> Result<Transformed<BoundRelation>> {
        transform_up(plan, &mut |node| Ok(Self::rewrite_node(node)))
    }
}
