//! Intrinsic unary and binary operators and their signature tables.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::DataContext;
use crate::parser::SyntaxKind;
use crate::types::DataType;

use super::overload::{resolve_overload, OverloadResolution};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// `+x`
    Identity,
    /// `-x`
    Negation,
    /// `~x`
    Complement,
    /// `NOT x`
    LogicalNot,
}

impl UnaryOperator {
    #[must_use]
    pub fn from_token(kind: SyntaxKind) -> Option<Self> {
        match kind {
            SyntaxKind::PlusToken => Some(UnaryOperator::Identity),
            SyntaxKind::MinusToken => Some(UnaryOperator::Negation),
            SyntaxKind::TildeToken => Some(UnaryOperator::Complement),
            SyntaxKind::NotKeyword => Some(UnaryOperator::LogicalNot),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Identity => "+",
            UnaryOperator::Negation => "-",
            UnaryOperator::Complement => "~",
            UnaryOperator::LogicalNot => "NOT",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Power,
    Multiply,
    Divide,
    Modulus,
    Add,
    Subtract,
    LeftShift,
    RightShift,
    BitAnd,
    BitOr,
    BitXor,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    NotLess,
    NotGreater,
    LogicalAnd,
    LogicalOr,
    Like,
}

impl BinaryOperator {
    #[must_use]
    pub fn from_token(kind: SyntaxKind) -> Option<Self> {
        use SyntaxKind as S;
        let op = match kind {
            S::AsteriskAsteriskToken => BinaryOperator::Power,
            S::AsteriskToken => BinaryOperator::Multiply,
            S::SlashToken => BinaryOperator::Divide,
            S::PercentToken => BinaryOperator::Modulus,
            S::PlusToken => BinaryOperator::Add,
            S::MinusToken => BinaryOperator::Subtract,
            S::LessLessToken => BinaryOperator::LeftShift,
            S::GreaterGreaterToken => BinaryOperator::RightShift,
            S::AmpersandToken => BinaryOperator::BitAnd,
            S::BarToken => BinaryOperator::BitOr,
            S::CaretToken => BinaryOperator::BitXor,
            S::EqualsToken | S::EqualsEqualsToken => BinaryOperator::Equal,
            S::ExclamationEqualsToken | S::LessGreaterToken => BinaryOperator::NotEqual,
            S::LessToken => BinaryOperator::Less,
            S::LessEqualsToken => BinaryOperator::LessOrEqual,
            S::GreaterToken => BinaryOperator::Greater,
            S::GreaterEqualsToken => BinaryOperator::GreaterOrEqual,
            S::ExclamationLessToken => BinaryOperator::NotLess,
            S::ExclamationGreaterToken => BinaryOperator::NotGreater,
            S::AndKeyword => BinaryOperator::LogicalAnd,
            S::OrKeyword => BinaryOperator::LogicalOr,
            S::LikeKeyword => BinaryOperator::Like,
            _ => return None,
        };
        Some(op)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Power => "**",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulus => "%",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::LeftShift => "<<",
            BinaryOperator::RightShift => ">>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::NotLess => "!<",
            BinaryOperator::NotGreater => "!>",
            BinaryOperator::LogicalAnd => "AND",
            BinaryOperator::LogicalOr => "OR",
            BinaryOperator::Like => "LIKE",
        }
    }

    /// Whether the operator yields a boolean regardless of operand types.
    #[must_use]
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::Less
                | BinaryOperator::LessOrEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterOrEqual
                | BinaryOperator::NotLess
                | BinaryOperator::NotGreater
                | BinaryOperator::LogicalAnd
                | BinaryOperator::LogicalOr
                | BinaryOperator::Like
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an operator signature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSignature {
    pub parameters: Vec<DataType>,
    pub result: DataType,
}

impl OperatorSignature {
    fn unary(operand: DataType, result: DataType) -> Self {
        OperatorSignature {
            parameters: vec![operand],
            result,
        }
    }

    fn binary(left: DataType, right: DataType, result: DataType) -> Self {
        OperatorSignature {
            parameters: vec![left, right],
            result,
        }
    }
}

/// Outcome of resolving an operator against operand types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorResolution {
    Resolved(OperatorSignature),
    Ambiguous(Vec<OperatorSignature>),
    NotApplicable,
}

const ARITHMETIC_TYPES: [DataType; 7] = [
    DataType::Int32,
    DataType::UInt32,
    DataType::Int64,
    DataType::UInt64,
    DataType::Float32,
    DataType::Float64,
    DataType::Decimal,
];

const BITWISE_TYPES: [DataType; 5] = [
    DataType::Int32,
    DataType::UInt32,
    DataType::Int64,
    DataType::UInt64,
    DataType::Bool,
];

/// Signature table of a unary operator.
#[must_use]
pub fn unary_signatures(op: UnaryOperator) -> Vec<OperatorSignature> {
    use DataType::{Decimal, Float32, Float64, Int32, Int64, UInt32, UInt64};
    let operands: &[DataType] = match op {
        UnaryOperator::Identity => &ARITHMETIC_TYPES,
        UnaryOperator::Negation => &[Int32, Int64, Float32, Float64, Decimal],
        UnaryOperator::Complement => &[Int32, UInt32, Int64, UInt64],
        UnaryOperator::LogicalNot => &[DataType::Bool],
    };
    operands
        .iter()
        .map(|t| OperatorSignature::unary(*t, *t))
        .collect()
}

/// Signature table of a binary operator.
#[must_use]
pub fn binary_signatures(op: BinaryOperator) -> Vec<OperatorSignature> {
    use DataType::{Bool, Float64, Int32, Int64, String, UInt32, UInt64};
    let same = |types: &[DataType], result: Option<DataType>| -> Vec<OperatorSignature> {
        types
            .iter()
            .map(|t| OperatorSignature::binary(*t, *t, result.unwrap_or(*t)))
            .collect()
    };
    match op {
        BinaryOperator::Add => {
            let mut signatures = same(&ARITHMETIC_TYPES, None);
            signatures.push(OperatorSignature::binary(String, String, String));
            signatures
        }
        BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulus
        | BinaryOperator::Subtract => same(&ARITHMETIC_TYPES, None),
        BinaryOperator::Power => same(&[Float64], None),
        BinaryOperator::LeftShift | BinaryOperator::RightShift => [Int32, UInt32, Int64, UInt64]
            .iter()
            .map(|t| OperatorSignature::binary(*t, Int32, *t))
            .collect(),
        BinaryOperator::BitAnd | BinaryOperator::BitOr | BinaryOperator::BitXor => {
            same(&BITWISE_TYPES, None)
        }
        BinaryOperator::Equal | BinaryOperator::NotEqual => {
            let mut signatures = same(&ARITHMETIC_TYPES, Some(Bool));
            signatures.push(OperatorSignature::binary(String, String, Bool));
            signatures.push(OperatorSignature::binary(Bool, Bool, Bool));
            signatures
        }
        BinaryOperator::Less
        | BinaryOperator::LessOrEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterOrEqual
        | BinaryOperator::NotLess
        | BinaryOperator::NotGreater => {
            let mut signatures = same(&ARITHMETIC_TYPES, Some(Bool));
            signatures.push(OperatorSignature::binary(String, String, Bool));
            signatures
        }
        BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => same(&[Bool], None),
        BinaryOperator::Like => vec![OperatorSignature::binary(String, String, Bool)],
    }
}

fn resolve(
    context: &DataContext,
    signatures: Vec<OperatorSignature>,
    arguments: &[DataType],
) -> OperatorResolution {
    let resolution = resolve_overload(
        context,
        signatures.iter().map(|s| s.parameters.as_slice()),
        arguments,
    );
    match resolution {
        OverloadResolution::Best(index) => OperatorResolution::Resolved(signatures[index].clone()),
        OverloadResolution::Ambiguous(indices) => OperatorResolution::Ambiguous(
            indices.into_iter().map(|i| signatures[i].clone()).collect(),
        ),
        OverloadResolution::NotApplicable => OperatorResolution::NotApplicable,
    }
}

/// Picks the unary operator signature for an operand type.
#[must_use]
pub fn resolve_unary(
    context: &DataContext,
    op: UnaryOperator,
    operand: DataType,
) -> OperatorResolution {
    resolve(context, unary_signatures(op), &[operand])
}

/// Picks the binary operator signature for two operand types.
#[must_use]
pub fn resolve_binary(
    context: &DataContext,
    op: BinaryOperator,
    left: DataType,
    right: DataType,
) -> OperatorResolution {
    resolve(context, binary_signatures(op), &[left, right])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_result(op: BinaryOperator, left: DataType, right: DataType) -> Option<DataType> {
        match resolve_binary(&DataContext::default(), op, left, right) {
            OperatorResolution::Resolved(signature) => Some(signature.result),
            _ => None,
        }
    }

    #[test]
    fn test_small_integrals_promote_to_int() {
        for t in [
            DataType::Byte,
            DataType::SByte,
            DataType::Int16,
            DataType::UInt16,
            DataType::Char,
        ] {
            assert_eq!(
                binary_result(BinaryOperator::Add, t, t),
                Some(DataType::Int32),
                "{t}"
            );
        }
    }

    #[test]
    fn test_mixed_sign_widening() {
        assert_eq!(
            binary_result(BinaryOperator::Add, DataType::Int32, DataType::UInt32),
            Some(DataType::Int64)
        );
        assert_eq!(
            binary_result(BinaryOperator::Multiply, DataType::Int32, DataType::Float64),
            Some(DataType::Float64)
        );
    }

    #[test]
    fn test_long_plus_ulong_is_ambiguous() {
        let resolution = resolve_binary(
            &DataContext::default(),
            BinaryOperator::Add,
            DataType::Int64,
            DataType::UInt64,
        );
        assert!(matches!(resolution, OperatorResolution::Ambiguous(_)));
    }

    #[test]
    fn test_inapplicable_operators() {
        assert_eq!(
            binary_result(BinaryOperator::Add, DataType::Bool, DataType::Int32),
            None
        );
        assert_eq!(
            binary_result(BinaryOperator::Like, DataType::Int32, DataType::String),
            None
        );
        assert!(matches!(
            resolve_unary(&DataContext::default(), UnaryOperator::Negation, DataType::UInt64),
            OperatorResolution::Ambiguous(_) | OperatorResolution::NotApplicable
        ));
    }

    #[test]
    fn test_shift_keeps_left_type() {
        assert_eq!(
            binary_result(BinaryOperator::LeftShift, DataType::UInt64, DataType::Byte),
            Some(DataType::UInt64)
        );
    }

    #[test]
    fn test_comparisons_yield_bool() {
        assert_eq!(
            binary_result(BinaryOperator::NotLess, DataType::Int16, DataType::Decimal),
            Some(DataType::Bool)
        );
        assert_eq!(
            binary_result(BinaryOperator::Equal, DataType::Bool, DataType::Bool),
            Some(DataType::Bool)
        );
        assert_eq!(
            binary_result(BinaryOperator::Less, DataType::Bool, DataType::Bool),
            None
        );
    }

    #[test]
    fn test_unary_negation_of_uint_widens_to_long() {
        assert_eq!(
            resolve_unary(&DataContext::default(), UnaryOperator::Negation, DataType::UInt32),
            OperatorResolution::Resolved(OperatorSignature::unary(DataType::Int64, DataType::Int64))
        );
    }
}
