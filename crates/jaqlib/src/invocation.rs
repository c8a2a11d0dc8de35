//! Recorded method invocations.
//!
//! A [`MethodInvocation`] is the record a recorder leaves behind when one of
//! its methods is called. The [`InvocationLog`] keeps those records in call
//! order and hands them out to the query, one per recorded-field condition.

use std::borrow::Cow;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;

use crate::value::Value;

/// One captured method call: the method's name and the arguments it was
/// called with.
///
/// Invocations are immutable once created and are replayed against real
/// elements through [`Invocable::invoke`](crate::Invocable::invoke).
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvocation {
    method: Cow<'static, str>,
    args: Vec<Value>,
}

impl MethodInvocation {
    /// Creates an invocation of a method without arguments.
    pub fn new(method: impl Into<Cow<'static, str>>) -> Self {
        MethodInvocation {
            method: method.into(),
            args: Vec::new(),
        }
    }

    /// Creates an invocation with arguments.
    pub fn with_args(method: impl Into<Cow<'static, str>>, args: Vec<Value>) -> Self {
        MethodInvocation {
            method: method.into(),
            args,
        }
    }

    /// Returns the method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the recorded arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Returns the argument at `index`, or [`Value::None`] when absent.
    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&Value::None)
    }

    /// Returns the number of recorded arguments.
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for MethodInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// Append-only log of recorded invocations with a consumption cursor.
///
/// Recorders append to the log through `&self`, so the log uses interior
/// mutability and is not `Sync`. Entries are never removed; consuming one
/// only moves the cursor.
///
/// # Example
///
/// ```
/// use jaqlib::{InvocationLog, MethodInvocation};
///
/// let log = InvocationLog::new();
/// log.record(MethodInvocation::new("last_name"));
/// log.record(MethodInvocation::new("age"));
///
/// assert_eq!(log.current_invocation().unwrap().method(), "last_name");
/// assert_eq!(log.current_invocation().unwrap().method(), "age");
/// assert!(log.current_invocation().is_none());
/// assert_eq!(log.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct InvocationLog {
    entries: RefCell<Vec<MethodInvocation>>,
    cursor: Cell<usize>,
}

impl InvocationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        InvocationLog::default()
    }

    /// Appends an invocation.
    pub fn record(&self, invocation: MethodInvocation) {
        self.entries.borrow_mut().push(invocation);
    }

    /// Appends an invocation of `method` with `args`.
    ///
    /// Convenience for hand-written recorders whose methods take arguments.
    pub fn record_call(&self, method: impl Into<Cow<'static, str>>, args: Vec<Value>) {
        self.record(MethodInvocation::with_args(method, args));
    }

    /// Returns the oldest unconsumed invocation without consuming it.
    pub fn peek(&self) -> Option<MethodInvocation> {
        self.entries.borrow().get(self.cursor.get()).cloned()
    }

    /// Consumes the oldest unconsumed invocation.
    ///
    /// Returns `false` (and does nothing) if every entry is consumed.
    pub fn advance(&self) -> bool {
        let cursor = self.cursor.get();
        if cursor < self.entries.borrow().len() {
            self.cursor.set(cursor + 1);
            true
        } else {
            false
        }
    }

    /// Returns and consumes the oldest unconsumed invocation (FIFO).
    ///
    /// `None` means no invocation is waiting.
    pub fn current_invocation(&self) -> Option<MethodInvocation> {
        let next = self.peek()?;
        self.advance();
        Some(next)
    }

    /// Returns every recorded invocation, consumed or not, in call order.
    pub fn entries(&self) -> Ref<'_, [MethodInvocation]> {
        Ref::map(self.entries.borrow(), Vec::as_slice)
    }

    /// Returns the number of unconsumed invocations.
    pub fn pending(&self) -> usize {
        self.entries.borrow().len() - self.cursor.get()
    }

    /// Returns the number of recorded invocations.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_consumption() {
        let log = InvocationLog::new();
        log.record(MethodInvocation::new("get_x"));
        log.record(MethodInvocation::new("get_y"));

        assert_eq!(log.pending(), 2);
        assert_eq!(log.current_invocation().unwrap().method(), "get_x");
        assert_eq!(log.current_invocation().unwrap().method(), "get_y");
        assert_eq!(log.current_invocation(), None);
        assert_eq!(log.pending(), 0);
    }

    #[test]
    fn peek_does_not_consume() {
        let log = InvocationLog::new();
        log.record(MethodInvocation::new("name"));

        assert_eq!(log.peek().unwrap().method(), "name");
        assert_eq!(log.peek().unwrap().method(), "name");
        assert_eq!(log.pending(), 1);
        assert!(log.advance());
        assert!(!log.advance());
        assert_eq!(log.peek(), None);
    }

    #[test]
    fn consumed_entries_stay_inspectable() {
        let log = InvocationLog::new();
        log.record(MethodInvocation::new("a"));
        log.record(MethodInvocation::new("b"));
        log.current_invocation();

        let names: Vec<_> = log.entries().iter().map(|i| i.method().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn record_after_exhaustion() {
        let log = InvocationLog::new();
        assert!(log.is_empty());
        assert_eq!(log.current_invocation(), None);

        log.record(MethodInvocation::new("late"));
        assert_eq!(log.current_invocation().unwrap().method(), "late");
    }

    #[test]
    fn arguments() {
        let inv = MethodInvocation::with_args("tag", vec![Value::from(2u32)]);
        assert_eq!(inv.arity(), 1);
        assert_eq!(inv.arg(0), &Value::from(2u32));
        assert_eq!(inv.arg(5), &Value::None);
        assert_eq!(inv.to_string(), "tag(2)");
        assert_eq!(MethodInvocation::new("name").to_string(), "name()");
    }
}
