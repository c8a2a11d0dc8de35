//! Recording stand-ins and replay.
//!
//! A recorder stands in for an element that does not exist yet. Every call
//! on it is appended to an [`InvocationLog`] instead of being executed, and a
//! default value of the declared return type is handed back. Later, the
//! query replays each logged call against real elements through
//! [`Invocable::invoke`].
//!
//! Recorders are normally generated with `#[derive(Recordable)]`, but all of
//! the traits here can be implemented by hand.

use crate::error::Result;
use crate::invocation::{InvocationLog, MethodInvocation};
use crate::value::{Timestamp, Value};

/// Types whose methods can be replayed from a [`MethodInvocation`].
///
/// # Manual Implementation
///
/// ```
/// use jaqlib::{Invocable, JaqError, MethodInvocation, Result, Value};
///
/// struct Person {
///     last_name: String,
///     tags: Vec<String>,
/// }
///
/// impl Invocable for Person {
///     fn invoke(&self, invocation: &MethodInvocation) -> Result<Value> {
///         match invocation.method() {
///             "last_name" => Ok(Value::from(self.last_name.clone())),
///             "tag" => {
///                 let index = invocation.arg(0).as_number().map(|n| n.to_f64() as usize);
///                 Ok(Value::from(index.and_then(|i| self.tags.get(i).cloned())))
///             }
///             other => Err(JaqError::unknown_method(other)),
///         }
///     }
/// }
/// ```
pub trait Invocable {
    /// Re-executes the recorded call against `self` and returns its value.
    ///
    /// Fails with [`JaqError::Replay`](crate::JaqError::Replay) if the
    /// method is unknown or its arguments cannot be applied.
    fn invoke(&self, invocation: &MethodInvocation) -> Result<Value>;
}

impl<T: Invocable + ?Sized> Invocable for &T {
    fn invoke(&self, invocation: &MethodInvocation) -> Result<Value> {
        (**self).invoke(invocation)
    }
}

impl<T: Invocable + ?Sized> Invocable for Box<T> {
    fn invoke(&self, invocation: &MethodInvocation) -> Result<Value> {
        (**self).invoke(invocation)
    }
}

impl<T: Invocable + ?Sized> Invocable for std::rc::Rc<T> {
    fn invoke(&self, invocation: &MethodInvocation) -> Result<Value> {
        (**self).invoke(invocation)
    }
}

/// A recording stand-in: anything that owns an [`InvocationLog`].
///
/// The provided methods are what recorder methods call: they log the call
/// and return `R::default()` (`false`, `0`, `""`, `None`, ...), so chained
/// expressions on the returned value keep working.
pub trait Recorder {
    /// Returns the log this recorder appends to.
    fn log(&self) -> &InvocationLog;

    /// Records a call without arguments and returns the default of `R`.
    fn record<R: Default>(&self, method: &'static str) -> R
    where
        Self: Sized,
    {
        self.log().record(MethodInvocation::new(method));
        R::default()
    }

    /// Records a call with arguments and returns the default of `R`.
    fn record_with_args<R: Default>(&self, method: &'static str, args: Vec<Value>) -> R
    where
        Self: Sized,
    {
        self.log().record_call(method, args);
        R::default()
    }
}

impl Recorder for InvocationLog {
    fn log(&self) -> &InvocationLog {
        self
    }
}

/// Types that have a generated (or hand-written) recorder.
///
/// This trait is typically derived using `#[derive(Recordable)]`, which
/// generates a `<Name>Recorder` type with one method per field.
///
/// # Derive Usage
///
/// ```ignore
/// use jaqlib::{Query, Recordable};
///
/// #[derive(Clone, Recordable)]
/// struct Person {
///     last_name: String,
///     age: u32,
/// }
///
/// let people = vec![
///     Person { last_name: "huber".into(), age: 42 },
///     Person { last_name: "maier".into(), age: 17 },
/// ];
///
/// let rec = Person::recorder();
/// let adults = Query::from_items(people.iter())
///     .recorded_by(&rec)
///     .where_(rec.age())?
///     .is_greater_than_or_equal(18)
///     .as_list()?;
/// ```
pub trait Recordable: Invocable {
    /// The recording stand-in type.
    type Recorder: Recorder;

    /// Creates a fresh recorder with an empty log.
    fn recorder() -> Self::Recorder;
}

/// Helper trait for converting enum types to their discriminant values.
///
/// Used by `#[derive(Recordable)]` for fields marked `#[record(Enum)]`.
///
/// # Example
///
/// ```
/// use jaqlib::EnumField;
///
/// #[derive(Clone, Copy, Default)]
/// enum Status {
///     #[default]
///     Pending,
///     Active,
/// }
///
/// impl EnumField for Status {
///     fn discriminant(&self) -> u32 {
///         match self {
///             Status::Pending => 0,
///             Status::Active => 1,
///         }
///     }
/// }
/// ```
pub trait EnumField {
    /// Returns a stable discriminant for this variant.
    fn discriminant(&self) -> u32;
}

/// Helper trait for converting datetime types to timestamps.
///
/// Used by `#[derive(Recordable)]` for fields marked `#[record(Timestamp)]`.
pub trait TimestampField {
    /// Converts this value to a [`Timestamp`].
    fn timestamp(&self) -> Timestamp;
}

impl TimestampField for i64 {
    fn timestamp(&self) -> Timestamp {
        Timestamp::from_millis(*self)
    }
}

impl TimestampField for u64 {
    fn timestamp(&self) -> Timestamp {
        Timestamp::from_millis(i64::try_from(*self).unwrap_or(i64::MAX))
    }
}

impl TimestampField for Timestamp {
    fn timestamp(&self) -> Timestamp {
        *self
    }
}
