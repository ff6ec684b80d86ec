//! Row-count bounds for bound relations.
//!
//! Estimates are conservative: the number of rows a relation produces always
//! lies within `minimum..=maximum`. Rewrites that depend on a relation being
//! small consult the maximum only.

use std::fmt;

use crate::binder::{BoundRelation, JoinType, SetOperation};

/// Lower and upper bound on the number of rows of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardinalityEstimate {
    pub minimum: u64,
    /// `None` means unbounded.
    pub maximum: Option<u64>,
}

impl CardinalityEstimate {
    /// Nothing known.
    pub const UNKNOWN: Self = CardinalityEstimate {
        minimum: 0,
        maximum: None,
    };

    #[must_use]
    pub fn exactly(rows: u64) -> Self {
        CardinalityEstimate {
            minimum: rows,
            maximum: Some(rows),
        }
    }

    #[must_use]
    pub fn between(minimum: u64, maximum: Option<u64>) -> Self {
        CardinalityEstimate { minimum, maximum }
    }

    /// Whether the relation can never produce more than `rows` rows.
    #[must_use]
    pub fn is_at_most(&self, rows: u64) -> bool {
        self.maximum.is_some_and(|m| m <= rows)
    }

    /// Whether `rows` lies within the bound.
    #[must_use]
    pub fn contains(&self, rows: u64) -> bool {
        self.minimum <= rows && self.maximum.map_or(true, |m| rows <= m)
    }
}

impl fmt::Display for CardinalityEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.maximum {
            Some(maximum) => write!(f, "{}..{maximum}", self.minimum),
            None => write!(f, "{}..", self.minimum),
        }
    }
}

fn add(left: Option<u64>, right: Option<u64>) -> Option<u64> {
    left?.checked_add(right?)
}

fn multiply(left: Option<u64>, right: Option<u64>) -> Option<u64> {
    match (left, right) {
        (Some(0), _) | (_, Some(0)) => Some(0),
        (Some(l), Some(r)) => l.checked_mul(r),
        _ => None,
    }
}

fn smaller(left: Option<u64>, right: Option<u64>) -> Option<u64> {
    match (left, right) {
        (Some(l), Some(r)) => Some(l.min(r)),
        (Some(m), None) | (None, Some(m)) => Some(m),
        (None, None) => None,
    }
}

/// Estimates the row count of `relation`.
#[must_use]
pub fn estimate(relation: &BoundRelation) -> CardinalityEstimate {
    match relation {
        BoundRelation::Table(_) => CardinalityEstimate::UNKNOWN,
        BoundRelation::Constant => CardinalityEstimate::exactly(1),
        BoundRelation::Empty { .. } => CardinalityEstimate::exactly(0),
        BoundRelation::Filter { input, .. } => {
            CardinalityEstimate::between(0, estimate(input).maximum)
        }
        BoundRelation::Compute { input, .. }
        | BoundRelation::Sort { input, .. }
        | BoundRelation::Project { input, .. } => estimate(input),
        BoundRelation::Top { input, limit, ties } => {
            let input = estimate(input);
            let minimum = input.minimum.min(*limit);
            if ties.is_empty() {
                CardinalityEstimate::between(minimum, smaller(input.maximum, Some(*limit)))
            } else {
                // Ties can extend the result past the limit.
                CardinalityEstimate::between(minimum, input.maximum)
            }
        }
        BoundRelation::GroupBy { input, groups, .. } => {
            if groups.is_empty() {
                CardinalityEstimate::exactly(1)
            } else {
                let input = estimate(input);
                CardinalityEstimate::between(input.minimum.min(1), input.maximum)
            }
        }
        BoundRelation::Join {
            join_type,
            left,
            right,
            condition,
        } => estimate_join(*join_type, estimate(left), estimate(right), condition.is_some()),
        BoundRelation::Combined {
            op, left, right, ..
        } => {
            let left = estimate(left);
            let right = estimate(right);
            match op {
                SetOperation::UnionAll => CardinalityEstimate::between(
                    left.minimum.saturating_add(right.minimum),
                    add(left.maximum, right.maximum),
                ),
                SetOperation::Union => CardinalityEstimate::between(
                    left.minimum.max(right.minimum).min(1),
                    add(left.maximum, right.maximum),
                ),
                SetOperation::Intersect => {
                    CardinalityEstimate::between(0, smaller(left.maximum, right.maximum))
                }
                SetOperation::Except => CardinalityEstimate::between(0, left.maximum),
            }
        }
    }
}

fn estimate_join(
    join_type: JoinType,
    left: CardinalityEstimate,
    right: CardinalityEstimate,
    has_condition: bool,
) -> CardinalityEstimate {
    let product = multiply(left.maximum, right.maximum);
    // Every row of the preserved side appears at least once; unmatched rows
    // are padded, so the other side counts as at least one row.
    let padded_right = multiply(left.maximum, right.maximum.map(|m| m.max(1)));
    let padded_left = multiply(left.maximum.map(|m| m.max(1)), right.maximum);
    match join_type {
        JoinType::Inner if has_condition => CardinalityEstimate::between(0, product),
        JoinType::Inner => CardinalityEstimate::between(
            left.minimum.saturating_mul(right.minimum),
            product,
        ),
        JoinType::LeftOuter => CardinalityEstimate::between(left.minimum, padded_right),
        JoinType::RightOuter => CardinalityEstimate::between(right.minimum, padded_left),
        JoinType::FullOuter => CardinalityEstimate::between(
            left.minimum.max(right.minimum),
            add(product, add(left.maximum, right.maximum)),
        ),
        JoinType::LeftSemi | JoinType::LeftAntiSemi => {
            CardinalityEstimate::between(0, left.maximum)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{SortKey, TableInstance, ValueSlotFactory};
    use crate::types::DataType;

    fn table() -> BoundRelation {
        BoundRelation::Table(TableInstance {
            name: "t".into(),
            table: None,
            columns: vec![],
        })
    }

    fn top(input: BoundRelation, limit: u64) -> BoundRelation {
        BoundRelation::Top {
            input: Box::new(input),
            limit,
            ties: vec![],
        }
    }

    #[test]
    fn test_leaves() {
        assert_eq!(estimate(&table()), CardinalityEstimate::UNKNOWN);
        assert_eq!(estimate(&BoundRelation::Constant), CardinalityEstimate::exactly(1));
        assert_eq!(
            estimate(&BoundRelation::Empty { output: vec![] }),
            CardinalityEstimate::exactly(0)
        );
    }

    #[test]
    fn test_top_caps_maximum() {
        let estimate = estimate(&top(table(), 3));
        assert_eq!(estimate, CardinalityEstimate::between(0, Some(3)));
        assert!(estimate.is_at_most(3));
        assert!(!estimate.is_at_most(2));
    }

    #[test]
    fn test_top_with_ties_keeps_input_maximum() {
        let slot = ValueSlotFactory::default().create("a", DataType::Int32);
        let relation = BoundRelation::Top {
            input: Box::new(table()),
            limit: 1,
            ties: vec![SortKey {
                slot,
                ascending: true,
            }],
        };
        assert_eq!(estimate(&relation).maximum, None);
    }

    #[test]
    fn test_semi_join_is_bounded_by_left() {
        let relation = BoundRelation::join(JoinType::LeftSemi, top(table(), 4), table(), None);
        assert_eq!(estimate(&relation), CardinalityEstimate::between(0, Some(4)));
    }

    #[test]
    fn test_cross_join_multiplies() {
        let relation = BoundRelation::join(
            JoinType::Inner,
            BoundRelation::Constant,
            top(BoundRelation::Constant, 5),
            None,
        );
        assert_eq!(estimate(&relation), CardinalityEstimate::exactly(1));
        let relation = BoundRelation::join(JoinType::LeftOuter, top(table(), 2), top(table(), 3), None);
        assert_eq!(estimate(&relation), CardinalityEstimate::between(0, Some(6)));
    }

    #[test]
    fn test_scalar_aggregate_has_one_row() {
        let relation = BoundRelation::GroupBy {
            input: Box::new(table()),
            groups: vec![],
            aggregates: vec![],
        };
        assert_eq!(estimate(&relation), CardinalityEstimate::exactly(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(CardinalityEstimate::between(0, Some(3)).to_string(), "0..3");
        assert_eq!(CardinalityEstimate::UNKNOWN.to_string(), "0..");
    }
}
