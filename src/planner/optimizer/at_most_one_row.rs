//! Rewrites justified by small cardinality bounds.

use tracing::trace;

use crate::binder::{BoundRelation, JoinType};
use crate::error::Result;

use super::cardinality::estimate;
use super::{transform_up, OptimizerRule, Transformed};

/// At-most-one-row rule.
///
/// - `Top(n)` disappears when its input never has more than `n` rows.
/// - `Sort` disappears when its input never has more than one row.
/// - `A SEMI (B LEFT OUTER C)`, where the outer join has no condition and
///   `C` yields at most one row, becomes `(A LEFT OUTER C) SEMI B`. This
///   holds for semi and anti semi joins alike; a projection restores the
///   output of `A`.
pub struct AtMostOneRowRule;

impl AtMostOneRowRule {
    fn rewrite_node(plan: BoundRelation) -> Result<Transformed<BoundRelation>> {
        let transformed = match plan {
            BoundRelation::Top { input, limit, ties } => {
                if estimate(&input).is_at_most(limit) {
                    trace!(limit, "removed redundant top");
                    Transformed::Yes(*input)
                } else {
                    Transformed::No(BoundRelation::Top { input, limit, ties })
                }
            }
            BoundRelation::Sort { input, keys } => {
                if estimate(&input).is_at_most(1) {
                    trace!("removed sort of at most one row");
                    Transformed::Yes(*input)
                } else {
                    Transformed::No(BoundRelation::Sort { input, keys })
                }
            }
            BoundRelation::Join {
                join_type,
                left,
                right,
                condition,
            } if join_type.is_semi() => match *right {
                BoundRelation::Join {
                    join_type: JoinType::LeftOuter,
                    left: outer_left,
                    right: outer_right,
                    condition: None,
                } if estimate(&outer_right).is_at_most(1) => {
                    trace!(%join_type, "moved single-row outer join below semi join");
                    let outputs = left.output_values();
                    let padded =
                        BoundRelation::join(JoinType::LeftOuter, *left, *outer_right, None);
                    let semi = BoundRelation::join(join_type, padded, *outer_left, condition);
                    // The rebuilt subtree may enable the same rewrites again.
                    let rewritten = transform_up(
                        BoundRelation::project(semi, outputs),
                        &mut Self::rewrite_node,
                    )?;
                    Transformed::Yes(rewritten.into_inner())
                }
                right => Transformed::No(BoundRelation::Join {
                    join_type,
                    left,
                    right: Box::new(right),
                    condition,
                }),
            },
            other => Transformed::No(other),
        };
        Ok(transformed)
    }
}

impl OptimizerRule for AtMostOneRowRule {
    fn name(&self) -> &str {
        "AtMostOneRow"
    }

    fn rewrite(&self, plan: BoundRelation) -> Result<Transformed<BoundRelation>> {
        transform_up(plan, &mut Self::rewrite_node)
    }
}
