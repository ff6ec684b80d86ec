//! Overload resolution shared by operators, functions and methods.

use std::cmp::Ordering;

use crate::catalog::DataContext;
use crate::types::DataType;

use super::conversion::is_implicit;

/// Outcome of picking among candidate signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadResolution {
    /// Index of the unique best candidate.
    Best(usize),
    /// Indices of the applicable candidates none of which is best.
    Ambiguous(Vec<usize>),
    NotApplicable,
}

/// Compares converting `argument` to `first` against converting it to
/// `second`. `Greater` means `first` is the better target.
fn better_conversion(
    context: &DataContext,
    argument: DataType,
    first: DataType,
    second: DataType,
) -> Ordering {
    if first == second {
        return Ordering::Equal;
    }
    if argument == first {
        return Ordering::Greater;
    }
    if argument == second {
        return Ordering::Less;
    }

    let first_to_second = is_implicit(context, first, second);
    let second_to_first = is_implicit(context, second, first);
    if first_to_second && !second_to_first {
        return Ordering::Greater;
    }
    if second_to_first && !first_to_second {
        return Ordering::Less;
    }

    if first.is_signed_integral() && second.is_unsigned_integral() {
        return Ordering::Greater;
    }
    if second.is_signed_integral() && first.is_unsigned_integral() {
        return Ordering::Less;
    }
    Ordering::Equal
}

/// Whether `first` is better than `second` for `arguments`: at least as good
/// for every argument and strictly better for one.
fn is_better(
    context: &DataContext,
    arguments: &[DataType],
    first: &[DataType],
    second: &[DataType],
) -> bool {
    let mut strictly = false;
    for ((argument, a), b) in arguments.iter().zip(first).zip(second) {
        match better_conversion(context, *argument, *a, *b) {
            Ordering::Less => return false,
            Ordering::Greater => strictly = true,
            Ordering::Equal => {}
        }
    }
    strictly
}

/// Picks the best of `candidates` for `arguments`.
///
/// A candidate is applicable when it has one parameter per argument and every
/// argument converts to its parameter by identity or implicitly.
pub fn resolve_overload<'c>(
    context: &DataContext,
    candidates: impl IntoIterator<Item = &'c [DataType]>,
    arguments: &[DataType],
) -> OverloadResolution {
    let applicable: Vec<(usize, &[DataType])> = candidates
        .into_iter()
        .enumerate()
        .filter(|(_, parameters)| {
            parameters.len() == arguments.len()
                && arguments
                    .iter()
                    .zip(parameters.iter())
                    .all(|(a, p)| is_implicit(context, *a, *p))
        })
        .collect();

    match applicable.len() {
        0 => return OverloadResolution::NotApplicable,
        1 => return OverloadResolution::Best(applicable[0].0),
        _ => {}
    }

    for (index, parameters) in &applicable {
        let best = applicable
            .iter()
            .filter(|(other, _)| other != index)
            .all(|(_, other)| is_better(context, arguments, parameters, other));
        if best {
            return OverloadResolution::Best(*index);
        }
    }
    OverloadResolution::Ambiguous(applicable.into_iter().map(|(i, _)| i).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(candidates: &[Vec<DataType>], arguments: &[DataType]) -> OverloadResolution {
        resolve_overload(
            &DataContext::default(),
            candidates.iter().map(Vec::as_slice),
            arguments,
        )
    }

    #[test]
    fn test_identity_wins() {
        let candidates = vec![vec![DataType::Float64], vec![DataType::Int32]];
        assert_eq!(
            resolve(&candidates, &[DataType::Int32]),
            OverloadResolution::Best(1)
        );
    }

    #[test]
    fn test_narrower_target_wins() {
        let candidates = vec![
            vec![DataType::Float64],
            vec![DataType::Int64],
            vec![DataType::Object],
        ];
        assert_eq!(
            resolve(&candidates, &[DataType::Int16]),
            OverloadResolution::Best(1)
        );
    }

    #[test]
    fn test_signed_beats_unsigned() {
        let candidates = vec![vec![DataType::UInt32], vec![DataType::Int32]];
        assert_eq!(
            resolve(&candidates, &[DataType::Byte]),
            OverloadResolution::Best(1)
        );
    }

    #[test]
    fn test_incomparable_candidates_are_ambiguous() {
        let candidates = vec![
            vec![DataType::Float32, DataType::Float32],
            vec![DataType::Decimal, DataType::Decimal],
        ];
        assert_eq!(
            resolve(&candidates, &[DataType::Int64, DataType::UInt64]),
            OverloadResolution::Ambiguous(vec![0, 1])
        );
    }

    #[test]
    fn test_arity_and_applicability() {
        let candidates = vec![vec![DataType::String], vec![DataType::Int32, DataType::Int32]];
        assert_eq!(
            resolve(&candidates, &[DataType::Bool]),
            OverloadResolution::NotApplicable
        );
        assert_eq!(
            resolve(&candidates, &[DataType::Null]),
            OverloadResolution::Best(0)
        );
    }
}
