//! Condition evaluators.
//!
//! A [`WhereCondition`] decides whether one candidate element belongs in the
//! result. Conditions come from three places:
//!
//! - closures supplied by the caller (`Fn(&T) -> bool`, or [`TryCondition`]
//!   for fallible ones),
//! - a [`Comparison`] synthesized from a recorded method invocation plus an
//!   operator (`is_equal`, `is_greater_than`, ...),
//! - a [`FieldPredicate`]: a recorded invocation plus a custom predicate on
//!   the replayed, typed field value.

use std::fmt;
use std::marker::PhantomData;

use regex::Regex;

use crate::error::{JaqError, Result};
use crate::invocation::MethodInvocation;
use crate::op::Op;
use crate::recorder::Invocable;
use crate::value::{FromValue, Value};

/// A single-method capability deciding whether an element matches.
pub trait WhereCondition<T: ?Sized> {
    /// Evaluates the condition against one element.
    ///
    /// Errors propagate unchanged to the caller and abort the scan.
    fn evaluate(&self, element: &T) -> Result<bool>;

    /// Returns a human-readable rendering for query logs.
    fn describe(&self) -> String {
        "<condition>".to_string()
    }
}

impl<T: ?Sized, F> WhereCondition<T> for F
where
    F: Fn(&T) -> bool,
{
    fn evaluate(&self, element: &T) -> Result<bool> {
        Ok(self(element))
    }
}

/// A condition whose closure can fail.
///
/// The closure's error is boxed into [`JaqError::Condition`] and surfaces to
/// the caller without modification.
///
/// ```
/// use jaqlib::{TryCondition, WhereCondition};
///
/// let parse = TryCondition::new(|s: &String| s.parse::<i32>().map(|n| n > 10));
/// assert!(parse.evaluate(&"42".to_string()).unwrap());
/// assert!(parse.evaluate(&"x".to_string()).is_err());
/// ```
pub struct TryCondition<F> {
    predicate: F,
}

impl<F> TryCondition<F> {
    /// Wraps a fallible predicate.
    pub fn new(predicate: F) -> Self {
        TryCondition { predicate }
    }
}

impl<T: ?Sized, F, E> WhereCondition<T> for TryCondition<F>
where
    F: Fn(&T) -> std::result::Result<bool, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn evaluate(&self, element: &T) -> Result<bool> {
        (self.predicate)(element).map_err(|e| JaqError::Condition(e.into()))
    }
}

/// Attaches a label to any condition, used when rendering the query.
pub struct Described<C> {
    label: String,
    inner: C,
}

impl<C> Described<C> {
    /// Labels `inner` with `label`.
    pub fn new(label: impl Into<String>, inner: C) -> Self {
        Described {
            label: label.into(),
            inner,
        }
    }
}

impl<T: ?Sized, C: WhereCondition<T>> WhereCondition<T> for Described<C> {
    fn evaluate(&self, element: &T) -> Result<bool> {
        self.inner.evaluate(element)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Operand of a [`Comparison`].
#[derive(Debug, Clone)]
pub enum Operand {
    /// No operand (null checks).
    None,
    /// Plain value.
    Value(Value),
    /// Compiled regular expression.
    Regex(Regex),
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Regex> for Operand {
    fn from(r: Regex) -> Self {
        Operand::Regex(r)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Value(v) => write!(f, "{}", v),
            Operand::Regex(r) => write!(f, "/{}/", r.as_str()),
        }
    }
}

/// A recorded method invocation compared against an operand.
///
/// Evaluation replays the invocation against the element, then compares the
/// returned value with the operand using the operator.
///
/// # Example
///
/// ```
/// use jaqlib::{Comparison, MethodInvocation, Op, Value};
///
/// let cmp = Comparison::new(MethodInvocation::new("age"), Op::Gte, Value::from(18));
/// assert!(cmp.matches(&Value::from(30u32)));
/// assert!(!cmp.matches(&Value::from(12u32)));
/// ```
#[derive(Debug, Clone)]
pub struct Comparison {
    invocation: MethodInvocation,
    op: Op,
    operand: Operand,
}

impl Comparison {
    /// Creates a new comparison.
    pub fn new(invocation: MethodInvocation, op: Op, operand: impl Into<Operand>) -> Self {
        Comparison {
            invocation,
            op,
            operand: operand.into(),
        }
    }

    /// Creates a null check (`IsNull` / `IsNotNull`).
    pub fn null_check(invocation: MethodInvocation, op: Op) -> Self {
        Comparison {
            invocation,
            op,
            operand: Operand::None,
        }
    }

    /// Returns the recorded invocation.
    pub fn invocation(&self) -> &MethodInvocation {
        &self.invocation
    }

    /// Returns the operator.
    pub fn op(&self) -> Op {
        self.op
    }

    /// Decides the comparison for an already replayed field value.
    ///
    /// Type mismatches never match. An absent field only matches `IsNull`
    /// and equality with an absent operand.
    pub fn matches(&self, field_value: &Value) -> bool {
        match (self.op, &self.operand, field_value) {
            (Op::IsNull, _, v) => v.is_none(),
            (Op::IsNotNull, _, v) => !v.is_none(),

            // Comparisons against an absent operand (is_equal(None))
            (Op::Eq, Operand::Value(Value::None), v) => v.is_none(),
            (Op::Ne, Operand::Value(Value::None), v) => !v.is_none(),

            // A missing field never matches any positive assertion
            (_, _, Value::None) => false,

            (Op::Regex, Operand::Regex(regex), Value::String(s)) => regex.is_match(s),

            (op, Operand::Value(Value::String(pattern)), Value::String(s))
                if op.is_string_op() =>
            {
                match_string(op, s, pattern)
            }

            (op, Operand::Value(operand), v) if op.is_ordering_op() => v
                .compare(operand)
                .is_some_and(|ordering| op.eval_ordering(ordering)),

            // Type mismatch - doesn't match
            _ => false,
        }
    }
}

fn match_string(op: Op, field: &str, pattern: &str) -> bool {
    match op {
        Op::StartsWith => field.starts_with(pattern),
        Op::EndsWith => field.ends_with(pattern),
        Op::Contains => field.contains(pattern),
        _ => false,
    }
}

impl<T: Invocable + ?Sized> WhereCondition<T> for Comparison {
    fn evaluate(&self, element: &T) -> Result<bool> {
        let value = element.invoke(&self.invocation)?;
        Ok(self.matches(&value))
    }

    fn describe(&self) -> String {
        if self.op.is_null_check() {
            format!("{} {}", self.invocation, self.op)
        } else {
            format!("{} {} {}", self.invocation, self.op, self.operand)
        }
    }
}

/// A recorded invocation checked by a caller-supplied predicate on the
/// typed field value.
pub struct FieldPredicate<V, F> {
    invocation: MethodInvocation,
    predicate: F,
    _field: PhantomData<fn(&V)>,
}

impl<V, F> FieldPredicate<V, F>
where
    V: FromValue,
    F: Fn(&V) -> bool,
{
    /// Creates a predicate over the value returned by `invocation`.
    pub fn new(invocation: MethodInvocation, predicate: F) -> Self {
        FieldPredicate {
            invocation,
            predicate,
            _field: PhantomData,
        }
    }
}

impl<T, V, F> WhereCondition<T> for FieldPredicate<V, F>
where
    T: Invocable + ?Sized,
    V: FromValue,
    F: Fn(&V) -> bool,
{
    fn evaluate(&self, element: &T) -> Result<bool> {
        let value = element.invoke(&self.invocation)?;
        let typed = V::from_value(&value).ok_or_else(|| {
            JaqError::replay(
                self.invocation.method(),
                format!(
                    "returned a {} value that does not convert to {}",
                    value.type_name(),
                    std::any::type_name::<V>()
                ),
            )
        })?;
        Ok((self.predicate)(&typed))
    }

    fn describe(&self) -> String {
        format!("{} SATISFIES <predicate>", self.invocation)
    }
}
