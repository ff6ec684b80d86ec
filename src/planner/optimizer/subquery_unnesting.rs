//! Subquery unnesting optimization rule.

use tracing::trace;

use crate::binder::{BoundExpression, BoundQuery, BoundRelation, JoinType, UnaryOperator};
use crate::error::Result;

use super::{transform_up, OptimizerRule, Transformed};

/// Subquery unnesting rule.
///
/// Turns `EXISTS` and `NOT EXISTS` conjuncts of a filter into left semi and
/// left anti semi joins of the filter input with the subquery. A subquery is
/// unnested only when, after its correlated predicate becomes the join
/// condition, the remaining relation reads nothing from the outer query.
pub struct SubqueryUnnestingRule;

/// Drops operators that cannot change whether a subquery returns a row.
fn strip_row_preserving(mut relation: BoundRelation) -> BoundRelation {
    loop {
        relation = match relation {
            BoundRelation::Project { input, .. }
            | BoundRelation::Sort { input, .. }
            | BoundRelation::Compute { input, .. } => *input,
            other => return other,
        };
    }
}

/// Splits `EXISTS(query)` into the join's right side and condition.
fn unnest(query: &BoundQuery) -> Option<(BoundRelation, Option<BoundExpression>)> {
    let (right, condition) = match strip_row_preserving(query.relation.clone()) {
        BoundRelation::Filter { input, condition } => (*input, Some(condition)),
        other => (other, None),
    };
    if !right.outer_references().is_empty() {
        return None;
    }
    Some((right, condition))
}

fn existence_test(conjunct: &BoundExpression) -> Option<(JoinType, &BoundQuery)> {
    match conjunct {
        BoundExpression::Exists { query } => Some((JoinType::LeftSemi, query)),
        BoundExpression::Unary {
            op: UnaryOperator::LogicalNot,
            operand,
            ..
        } => match operand.as_ref() {
            BoundExpression::Exists { query } => Some((JoinType::LeftAntiSemi, query)),
            _ => None,
        },
        _ => None,
    }
}

impl SubqueryUnnestingRule {
    fn rewrite_node(plan: BoundRelation) -> Transformed<BoundRelation> {
        let BoundRelation::Filter { input, condition } = plan else {
            return Transformed::No(plan);
        };
        if !condition.any(&|e| matches!(e, BoundExpression::Exists { .. })) {
            return Transformed::No(BoundRelation::Filter { input, condition });
        }

        let mut relation = *input;
        let mut remaining = Vec::new();
        let mut unnested = 0;
        for conjunct in condition.split_conjunctions() {
            match existence_test(&conjunct).and_then(|(join_type, query)| {
                unnest(query).map(|(right, condition)| (join_type, right, condition))
            }) {
                Some((join_type, right, condition)) => {
                    relation = BoundRelation::join(join_type, relation, right, condition);
                    unnested += 1;
                }
                None => remaining.push(conjunct),
            }
        }

        let relation = match BoundExpression::conjunction(remaining) {
            Some(condition) => BoundRelation::filter(relation, condition),
            None => relation,
        };
        if unnested > 0 {
            trace!(unnested, "unnested existence subqueries");
            Transformed::Yes(relation)
        } else {
            Transformed::No(relation)
        }
    }
}

impl OptimizerRule for SubqueryUnnestingRule {
    fn name(&self) -> &str {
        "SubqueryUnnesting"
    }

    fn rewrite(&self, plan: BoundRelation) -> Result<Transformed<BoundRelation>> {
        transform_up(plan, &mut |node| Ok(Self::rewrite_node(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{BinaryOperator, ColumnInstance, TableInstance, ValueSlot, ValueSlotFactory};
    use crate::types::DataType;

    fn table(name: &str, slot: &ValueSlot) -> BoundRelation {
        BoundRelation::Table(TableInstance {
            name: name.into(),
            table: None,
            columns: vec![ColumnInstance {
                name: slot.name.to_string(),
                slot: slot.clone(),
            }],
        })
    }

    fn equals(left: &ValueSlot, right: &ValueSlot) -> BoundExpression {
        BoundExpression::Binary {
            op: BinaryOperator::Equal,
            left: Box::new(BoundExpression::slot(left)),
            right: Box::new(BoundExpression::slot(right)),
            data_type: DataType::Bool,
        }
    }

    fn exists(relation: BoundRelation) -> BoundExpression {
        BoundExpression::Exists {
            query: Box::new(BoundQuery {
                relation,
                output_columns: vec![],
            }),
        }
    }

    #[test]
    fn test_correlated_exists_becomes_semi_join() {
        let mut slots = ValueSlotFactory::default();
        let a = slots.create("a", DataType::Int32);
        let b = slots.create("b", DataType::Int32);
        let subquery = BoundRelation::project(
            BoundRelation::filter(table("u", &b), equals(&b, &a)),
            vec![b.clone()],
        );
        let plan = BoundRelation::filter(table("t", &a), exists(subquery));

        let result = SubqueryUnnestingRule.rewrite(plan).unwrap();
        assert!(result.was_transformed());
        let BoundRelation::Join {
            join_type,
            right,
            condition,
            ..
        } = result.into_inner()
        else {
            panic!("expected join");
        };
        assert_eq!(join_type, JoinType::LeftSemi);
        assert!(matches!(*right, BoundRelation::Table(_)));
        assert_eq!(condition, Some(equals(&b, &a)));
    }

    #[test]
    fn test_not_exists_becomes_anti_semi_join_and_keeps_other_conjuncts() {
        let mut slots = ValueSlotFactory::default();
        let a = slots.create("a", DataType::Bool);
        let b = slots.create("b", DataType::Int32);
        let condition = BoundExpression::and(
            BoundExpression::slot(&a),
            BoundExpression::not(exists(table("u", &b))),
        );
        let plan = BoundRelation::filter(table("t", &a), condition);

        let BoundRelation::Filter { input, condition } =
            SubqueryUnnestingRule.rewrite(plan).unwrap().into_inner()
        else {
            panic!("expected filter");
        };
        assert_eq!(condition, BoundExpression::slot(&a));
        assert!(matches!(
            *input,
            BoundRelation::Join {
                join_type: JoinType::LeftAntiSemi,
                condition: None,
                ..
            }
        ));
    }

    #[test]
    fn test_correlation_below_top_is_kept() {
        let mut slots = ValueSlotFactory::default();
        let a = slots.create("a", DataType::Int32);
        let b = slots.create("b", DataType::Int32);
        let subquery = BoundRelation::Top {
            input: Box::new(BoundRelation::filter(table("u", &b), equals(&b, &a))),
            limit: 1,
            ties: vec![],
        };
        let plan = BoundRelation::filter(table("t", &a), exists(subquery));
        assert!(!SubqueryUnnestingRule.rewrite(plan).unwrap().was_transformed());
    }
}
