//! Conversion classification between data types.

use crate::catalog::DataContext;
use crate::types::DataType;

/// How a value of one type can become a value of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    Identity,
    Implicit,
    Explicit,
    None,
}

impl ConversionKind {
    /// Identity or implicit.
    #[must_use]
    pub fn is_implicit(self) -> bool {
        matches!(self, ConversionKind::Identity | ConversionKind::Implicit)
    }

    /// Identity, implicit or explicit.
    #[must_use]
    pub fn exists(self) -> bool {
        self != ConversionKind::None
    }
}

/// Implicit numeric widening targets of a built-in type.
fn implicit_numeric_targets(from: DataType) -> &'static [DataType] {
    use DataType::{
        Decimal, Float32, Float64, Int16, Int32, Int64, UInt16, UInt32, UInt64,
    };
    match from {
        DataType::SByte => &[Int16, Int32, Int64, Float32, Float64, Decimal],
        DataType::Byte => &[
            Int16, UInt16, Int32, UInt32, Int64, UInt64, Float32, Float64, Decimal,
        ],
        DataType::Int16 => &[Int32, Int64, Float32, Float64, Decimal],
        DataType::UInt16 => &[Int32, UInt32, Int64, UInt64, Float32, Float64, Decimal],
        DataType::Char => &[UInt16, Int32, UInt32, Int64, UInt64, Float32, Float64, Decimal],
        DataType::Int32 => &[Int64, Float32, Float64, Decimal],
        DataType::UInt32 => &[Int64, UInt64, Float32, Float64, Decimal],
        DataType::Int64 | DataType::UInt64 => &[Float32, Float64, Decimal],
        DataType::Float32 => &[Float64],
        _ => &[],
    }
}

fn is_numeric_or_char(data_type: DataType) -> bool {
    data_type.is_numeric() || data_type == DataType::Char
}

/// Classifies the conversion from `from` to `to`.
///
/// `Unknown` on either side classifies as identity so that a failed
/// sub-expression does not produce a second diagnostic.
#[must_use]
pub fn classify(context: &DataContext, from: DataType, to: DataType) -> ConversionKind {
    if from == to || from.is_unknown() || to.is_unknown() {
        return ConversionKind::Identity;
    }
    if from == DataType::Null || to == DataType::Object {
        return ConversionKind::Implicit;
    }
    if implicit_numeric_targets(from).contains(&to) {
        return ConversionKind::Implicit;
    }
    if let Some(registered) = context.registered_conversion(from, to) {
        return if registered.implicit {
            ConversionKind::Implicit
        } else {
            ConversionKind::Explicit
        };
    }
    if from == DataType::Object || (is_numeric_or_char(from) && is_numeric_or_char(to)) {
        return ConversionKind::Explicit;
    }
    ConversionKind::None
}

/// Whether `from` converts to `to` by identity or implicitly.
#[must_use]
pub fn is_implicit(context: &DataContext, from: DataType, to: DataType) -> bool {
    classify(context, from, to).is_implicit()
}

/// The most specific type every one of `types` implicitly converts to.
///
/// Null arguments impose no constraint. Returns `Some(Unknown)` when an
/// argument is unknown, `Some(Null)` when every argument is null, and
/// `None` when no candidate accepts them all.
#[must_use]
pub fn common_type(context: &DataContext, types: &[DataType]) -> Option<DataType> {
    if types.iter().any(DataType::is_unknown) {
        return Some(DataType::Unknown);
    }
    let mut candidates: Vec<DataType> = Vec::new();
    for t in types {
        if *t != DataType::Null && !candidates.contains(t) {
            candidates.push(*t);
        }
    }
    if candidates.is_empty() {
        return Some(DataType::Null);
    }

    let valid: Vec<DataType> = candidates
        .iter()
        .copied()
        .filter(|c| types.iter().all(|t| is_implicit(context, *t, *c)))
        .collect();
    valid
        .iter()
        .copied()
        .find(|best| valid.iter().all(|other| is_implicit(context, *best, *other)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataContextBuilder;

    #[test]
    fn test_numeric_widening() {
        let context = DataContext::default();
        assert_eq!(
            classify(&context, DataType::Int32, DataType::Int64),
            ConversionKind::Implicit
        );
        assert_eq!(
            classify(&context, DataType::Int64, DataType::Int32),
            ConversionKind::Explicit
        );
        assert_eq!(
            classify(&context, DataType::Float32, DataType::Decimal),
            ConversionKind::Explicit
        );
        assert_eq!(
            classify(&context, DataType::Char, DataType::UInt16),
            ConversionKind::Implicit
        );
        assert_eq!(
            classify(&context, DataType::Int16, DataType::Char),
            ConversionKind::Explicit
        );
    }

    #[test]
    fn test_null_object_and_unrelated_types() {
        let context = DataContext::default();
        assert!(is_implicit(&context, DataType::Null, DataType::String));
        assert!(is_implicit(&context, DataType::Bool, DataType::Object));
        assert_eq!(
            classify(&context, DataType::Object, DataType::Int32),
            ConversionKind::Explicit
        );
        assert_eq!(
            classify(&context, DataType::String, DataType::Int32),
            ConversionKind::None
        );
        assert_eq!(
            classify(&context, DataType::Unknown, DataType::String),
            ConversionKind::Identity
        );
    }

    #[test]
    fn test_registered_conversions() {
        let mut builder = DataContextBuilder::new();
        let money = builder.add_custom_type("Money").unwrap();
        builder.add_conversion(DataType::Int32, money, true).unwrap();
        builder.add_conversion(money, DataType::Float64, false).unwrap();
        let context = builder.build();
        assert!(is_implicit(&context, DataType::Int32, money));
        assert_eq!(
            classify(&context, money, DataType::Float64),
            ConversionKind::Explicit
        );
        assert_eq!(classify(&context, money, DataType::Int32), ConversionKind::None);
    }

    #[test]
    fn test_common_type() {
        let context = DataContext::default();
        assert_eq!(
            common_type(&context, &[DataType::Int32, DataType::Float64]),
            Some(DataType::Float64)
        );
        assert_eq!(
            common_type(&context, &[DataType::Null, DataType::Int16, DataType::Int32]),
            Some(DataType::Int32)
        );
        assert_eq!(
            common_type(&context, &[DataType::Int32, DataType::String]),
            None
        );
        assert_eq!(
            common_type(&context, &[DataType::Null, DataType::Null]),
            Some(DataType::Null)
        );
        assert_eq!(
            common_type(&context, &[DataType::String, DataType::Unknown]),
            Some(DataType::Unknown)
        );
    }
}
