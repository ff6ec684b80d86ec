//! Filter pushdown optimization rule.

use std::collections::HashSet;

use crate::binder::{BoundExpression, BoundRelation, ComputedValue, ValueSlot};
use crate::error::Result;

use super::{transform_up, OptimizerRule, Transformed};

/// Filter pushdown rule.
///
/// Pushes filter predicates below sorts, projections and computations so
/// fewer rows flow through them. A conjunct stays above a computation when
/// it reads one of the computed values.
pub struct FilterPushdownRule;

fn reads_any(condition: &BoundExpression, slots: &HashSet<ValueSlot>) -> bool {
    condition.referenced_slots().iter().any(|s| slots.contains(s))
}

/// Places `condition` as deep as possible into `input`.
fn push_down(input: BoundRelation, condition: BoundExpression) -> Transformed<BoundRelation> {
    match input {
        BoundRelation::Sort { input, keys } => {
            let pushed = push_down(*input, condition).into_inner();
            Transformed::Yes(BoundRelation::Sort {
                input: Box::new(pushed),
                keys,
            })
        }
        BoundRelation::Project { input, outputs } => {
            let pushed = push_down(*input, condition).into_inner();
            Transformed::Yes(BoundRelation::Project {
                input: Box::new(pushed),
                outputs,
            })
        }
        BoundRelation::Compute { input, values } => push_below_compute(*input, values, condition),
        BoundRelation::Filter {
            input,
            condition: inner,
        } => {
            // Merge with the filter below so both move together.
            let merged = BoundExpression::and(inner, condition);
            Transformed::Yes(push_down(*input, merged).into_inner())
        }
        other => Transformed::No(BoundRelation::filter(other, condition)),
    }
}

fn push_below_compute(
    input: BoundRelation,
    values: Vec<ComputedValue>,
    condition: BoundExpression,
) -> Transformed<BoundRelation> {
    let computed: HashSet<ValueSlot> = values.iter().map(|v| v.slot.clone()).collect();
    let (blocked, movable): (Vec<_>, Vec<_>) = condition
        .split_conjunctions()
        .into_iter()
        .partition(|c| reads_any(c, &computed));

    let Some(movable) = BoundExpression::conjunction(movable) else {
        let Some(blocked) = BoundExpression::conjunction(blocked) else {
            return Transformed::No(BoundRelation::Compute {
                input: Box::new(input),
                values,
            });
        };
        return Transformed::No(BoundRelation::filter(
            BoundRelation::Compute {
                input: Box::new(input),
                values,
            },
            blocked,
        ));
    };
    let compute = BoundRelation::Compute {
        input: Box::new(push_down(input, movable).into_inner()),
        values,
    };
    Transformed::Yes(match BoundExpression::conjunction(blocked) {
        Some(blocked) => BoundRelation::filter(compute, blocked),
        None => compute,
    })
}

impl FilterPushdownRule {
    fn rewrite_node(plan: BoundRelation) -> Transformed<BoundRelation> {
        match plan {
            BoundRelation::Filter { input, condition } => push_down(*input, condition),
            other => Transformed::No(other),
        }
    }
}

impl OptimizerRule for FilterPushdownRule {
    fn name(&self) -> &str {
        "FilterPushdown"
    }

    fn rewrite(&self, plan: BoundRelation) -> Result<Transformed<BoundRelation>> {
        transform_up(plan, &mut |node| Ok(Self::rewrite_node(node)))
    }
}
