//! Comparison operators for recorded-field conditions.
//!
//! The [`Op`] enum defines the operators a
//! [`PendingCondition`](crate::PendingCondition) can apply to a recorded
//! field. Not all operators are meaningful for all value types.

use std::cmp::Ordering;

/// Comparison operator for a recorded-field condition.
///
/// Operators are grouped by the types they support:
/// - **Universal**: `Eq`, `Ne`
/// - **Ordering**: `Gt`, `Gte`, `Lt`, `Lte` (numbers, strings, timestamps, ...)
/// - **String**: `StartsWith`, `EndsWith`, `Contains`, `Regex`
/// - **Null checks**: `IsNull`, `IsNotNull`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Equal (exact match).
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// String starts with prefix.
    StartsWith,
    /// String ends with suffix.
    EndsWith,
    /// String contains substring.
    Contains,
    /// String matches regular expression.
    Regex,
    /// Field value is absent.
    IsNull,
    /// Field value is present.
    IsNotNull,
}

impl Op {
    /// Returns `true` if this operator only applies to strings.
    pub fn is_string_op(self) -> bool {
        matches!(
            self,
            Op::StartsWith | Op::EndsWith | Op::Contains | Op::Regex
        )
    }

    /// Returns `true` if this operator is decided by an [`Ordering`].
    pub fn is_ordering_op(self) -> bool {
        matches!(self, Op::Eq | Op::Ne | Op::Gt | Op::Gte | Op::Lt | Op::Lte)
    }

    /// Returns `true` if this operator takes no operand.
    pub fn is_null_check(self) -> bool {
        matches!(self, Op::IsNull | Op::IsNotNull)
    }

    /// Evaluates a comparison given an ordering result.
    ///
    /// Used for every typed comparison: the field value is compared to the
    /// operand, and the resulting ordering decides the match.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            _ => false, // Not an ordering-based operator
        }
    }

    /// Returns the display name of this operator, as rendered in query logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::StartsWith => "STARTS WITH",
            Op::EndsWith => "ENDS WITH",
            Op::Contains => "CONTAINS",
            Op::Regex => "MATCHES",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
