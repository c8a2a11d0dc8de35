//! Query builder and executor.
//!
//! The [`Query`] struct provides the fluent `where_ / and / or` API. It
//! owns one [`SyntaxTree`] per query, reads recorded field references from
//! the attached recorder's [`InvocationLog`], and on a terminal call picks a
//! fetch strategy and materializes the result.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use regex::Regex;
use tracing::debug;

use crate::cache::QueryCache;
use crate::condition::{Comparison, FieldPredicate, Operand, WhereCondition};
use crate::error::{JaqError, Result};
use crate::fetch::{
    CachingFetchStrategy, Collector, CountCollector, FetchStrategy, FirstOccurrenceFetchStrategy,
    ListCollector, MapCollector, SetCollector,
};
use crate::invocation::{InvocationLog, MethodInvocation};
use crate::op::Op;
use crate::recorder::{Invocable, Recorder};
use crate::source::{DataSource, IterSource, NullableSource};
use crate::tree::{ConnectorKind, Node, SyntaxTree};
use crate::value::{FromValue, Value};

/// A query over one data source.
///
/// Conditions are chained strictly left to right: `a.and(b).or(c)` means
/// `(a AND b) OR c`, and `a.or(b).and(c)` means `(a OR b) AND c`.
///
/// # Example
///
/// ```
/// use jaqlib::{Invocable, InvocationLog, JaqError, MethodInvocation, Query, Recorder, Result, Value};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Person {
///     last_name: String,
///     age: u32,
/// }
///
/// impl Invocable for Person {
///     fn invoke(&self, invocation: &MethodInvocation) -> Result<Value> {
///         match invocation.method() {
///             "last_name" => Ok(Value::from(self.last_name.clone())),
///             "age" => Ok(Value::from(self.age)),
///             other => Err(JaqError::unknown_method(other)),
///         }
///     }
/// }
///
/// #[derive(Default)]
/// struct PersonRecorder {
///     log: InvocationLog,
/// }
///
/// impl PersonRecorder {
///     fn last_name(&self) -> String {
///         self.record("last_name")
///     }
///
///     fn age(&self) -> u32 {
///         self.record("age")
///     }
/// }
///
/// impl Recorder for PersonRecorder {
///     fn log(&self) -> &InvocationLog {
///         &self.log
///     }
/// }
///
/// # fn main() -> Result<()> {
/// let people = vec![
///     Person { last_name: "huber".into(), age: 42 },
///     Person { last_name: "huber".into(), age: 12 },
///     Person { last_name: "maier".into(), age: 50 },
/// ];
///
/// let rec = PersonRecorder::default();
/// let found = Query::from_items(people.iter())
///     .recorded_by(&rec)
///     .where_(rec.last_name())?
///     .is_equal("huber")
///     .and(rec.age())?
///     .is_greater_than(18)
///     .as_list()?;
///
/// assert_eq!(found, vec![&people[0]]);
/// # Ok(())
/// # }
/// ```
pub struct Query<'q, S: DataSource> {
    source: S,
    tree: SyntaxTree<'q, S::Item>,
    log: Option<&'q InvocationLog>,
    cache: Option<&'q mut QueryCache<S::Item>>,
}

impl<'q, I: Iterator> Query<'q, IterSource<I>> {
    /// Creates a query over anything iterable.
    ///
    /// `people.iter()` queries by reference; `people` (by value) moves the
    /// elements into the result.
    pub fn from_items(items: impl IntoIterator<IntoIter = I>) -> Self {
        Query::new(IterSource::new(items))
    }
}

impl<'q, T, I: Iterator<Item = Option<T>>> Query<'q, NullableSource<I, T>> {
    /// Creates a query over optional elements; `None` items are skipped.
    pub fn from_nullable(items: impl IntoIterator<IntoIter = I>) -> Self {
        Query::new(NullableSource::new(items))
    }
}

impl<'q, S: DataSource> Query<'q, S> {
    /// Creates a query over a data source.
    ///
    /// A query without conditions matches every element.
    pub fn new(source: S) -> Self {
        Query {
            source,
            tree: SyntaxTree::new(),
            log: None,
            cache: None,
        }
    }

    /// Attaches the recorder whose calls name the fields of this query.
    pub fn recorded_by<R: Recorder + ?Sized>(mut self, recorder: &'q R) -> Self {
        self.log = Some(recorder.log());
        self
    }

    /// Reuses `cache` for this query.
    ///
    /// If the cache is filled, the source is not read; otherwise a full scan
    /// fills it for the next query against the same source.
    pub fn cached(mut self, cache: &'q mut QueryCache<S::Item>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the predicate tree built so far.
    pub fn tree(&self) -> &SyntaxTree<'q, S::Item> {
        &self.tree
    }

    fn next_invocation(&self) -> Result<MethodInvocation> {
        let log = self.log.ok_or(JaqError::NoRecorder)?;
        log.current_invocation().ok_or(JaqError::NoInvocation)
    }

    fn pending<V>(self, connector: Option<ConnectorKind>) -> Result<PendingCondition<'q, S, V>> {
        match connector {
            None if self.tree.has_root() => return Err(JaqError::RootAlreadySet),
            Some(_) if !self.tree.has_root() => return Err(JaqError::MissingRoot),
            _ => {}
        }
        let invocation = self.next_invocation()?;
        Ok(PendingCondition {
            query: self,
            connector,
            invocation,
            _field: PhantomData,
        })
    }

    fn push<C>(mut self, connector: Option<ConnectorKind>, condition: C) -> Result<Self>
    where
        C: WhereCondition<S::Item> + 'q,
    {
        let node = Node::condition(condition);
        match connector {
            None => self.tree.set_root(node)?,
            Some(kind) => self.tree.add_connector(kind, node)?,
        }
        Ok(self)
    }

    // ========================================================================
    // Recorded-field conditions
    // ========================================================================

    /// Starts the WHERE condition on a recorded field.
    ///
    /// `_field` is the value returned by a recorder call, e.g.
    /// `rec.last_name()`; only its type is used. The call itself is taken
    /// from the recorder's log.
    pub fn where_<V>(self, _field: V) -> Result<PendingCondition<'q, S, V>> {
        self.pending(None)
    }

    /// Continues with `AND` on a recorded field.
    pub fn and<V>(self, _field: V) -> Result<PendingCondition<'q, S, V>> {
        self.pending(Some(ConnectorKind::And))
    }

    /// Continues with `OR` on a recorded field.
    pub fn or<V>(self, _field: V) -> Result<PendingCondition<'q, S, V>> {
        self.pending(Some(ConnectorKind::Or))
    }

    // ========================================================================
    // Caller-supplied conditions
    // ========================================================================

    /// Sets the WHERE condition to a closure over the element.
    pub fn where_matches<F>(self, predicate: F) -> Result<Self>
    where
        F: Fn(&S::Item) -> bool + 'q,
    {
        self.push(None, predicate)
    }

    /// Continues with `AND` and a closure over the element.
    pub fn and_matches<F>(self, predicate: F) -> Result<Self>
    where
        F: Fn(&S::Item) -> bool + 'q,
    {
        self.push(Some(ConnectorKind::And), predicate)
    }

    /// Continues with `OR` and a closure over the element.
    pub fn or_matches<F>(self, predicate: F) -> Result<Self>
    where
        F: Fn(&S::Item) -> bool + 'q,
    {
        self.push(Some(ConnectorKind::Or), predicate)
    }

    /// Sets the WHERE condition to any [`WhereCondition`].
    pub fn where_condition<C>(self, condition: C) -> Result<Self>
    where
        C: WhereCondition<S::Item> + 'q,
    {
        self.push(None, condition)
    }

    /// Continues with `AND` and any [`WhereCondition`].
    pub fn and_condition<C>(self, condition: C) -> Result<Self>
    where
        C: WhereCondition<S::Item> + 'q,
    {
        self.push(Some(ConnectorKind::And), condition)
    }

    /// Continues with `OR` and any [`WhereCondition`].
    pub fn or_condition<C>(self, condition: C) -> Result<Self>
    where
        C: WhereCondition<S::Item> + 'q,
    {
        self.push(Some(ConnectorKind::Or), condition)
    }
}

// ============================================================================
// Execution
// ============================================================================

impl<'q, S> Query<'q, S>
where
    S: DataSource,
    S::Item: Clone,
{
    fn scan_all(self, sink: &mut dyn Collector<S::Item>) -> Result<()> {
        let Query {
            mut source,
            tree,
            cache,
            ..
        } = self;
        let mut strategy = match cache {
            Some(cache) => CachingFetchStrategy::with_cache(cache),
            None => CachingFetchStrategy::new(),
        };
        debug!(query = %tree, strategy = strategy.name(), "executing query");
        strategy.fetch(&mut source, &tree, sink)
    }

    fn scan_first(self, sink: &mut dyn Collector<S::Item>) -> Result<()> {
        let Query {
            mut source,
            tree,
            cache,
            ..
        } = self;
        let mut strategy = match cache.as_deref() {
            Some(cache) => FirstOccurrenceFetchStrategy::with_cache(cache),
            None => FirstOccurrenceFetchStrategy::new(),
        };
        debug!(query = %tree, strategy = strategy.name(), "executing query");
        strategy.fetch(&mut source, &tree, sink)
    }

    /// Returns every matching element, in source order.
    pub fn as_list(self) -> Result<Vec<S::Item>> {
        let mut sink = ListCollector::new();
        self.scan_all(&mut sink)?;
        Ok(sink.into_inner())
    }

    /// Returns the distinct matching elements.
    pub fn as_set(self) -> Result<HashSet<S::Item>>
    where
        S::Item: Eq + Hash,
    {
        let mut sink = SetCollector::new();
        self.scan_all(&mut sink)?;
        Ok(sink.into_inner())
    }

    /// Returns the matching elements keyed by a recorded field.
    ///
    /// `_key` is the value returned by a recorder call such as `rec.id()`;
    /// each match is keyed by replaying that call against it. When two
    /// matches share a key, the later one wins.
    pub fn as_map<K>(self, _key: K) -> Result<HashMap<K, S::Item>>
    where
        K: FromValue + Eq + Hash,
        S::Item: Invocable,
    {
        let mut sink = MapCollector::new(self.next_invocation()?);
        self.scan_all(&mut sink)?;
        Ok(sink.into_inner())
    }

    /// Returns the only matching element.
    ///
    /// `Ok(None)` when nothing matches; [`JaqError::NonUniqueResult`] when
    /// more than one element matches.
    pub fn unique_result(self) -> Result<Option<S::Item>> {
        let mut sink = ListCollector::new();
        self.scan_all(&mut sink)?;
        let mut items = sink.into_inner();
        match items.len() {
            0 | 1 => Ok(items.pop()),
            count => Err(JaqError::NonUniqueResult { count }),
        }
    }

    /// Returns the first matching element, scanning no further.
    pub fn first_result(self) -> Result<Option<S::Item>> {
        let mut sink = ListCollector::new();
        self.scan_first(&mut sink)?;
        Ok(sink.into_inner().into_iter().next())
    }

    /// Returns the number of matching elements.
    pub fn count(self) -> Result<usize> {
        let mut sink = CountCollector::new();
        self.scan_all(&mut sink)?;
        Ok(sink.count())
    }
}

impl<S: DataSource> fmt::Display for Query<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tree)
    }
}

impl<S: DataSource> fmt::Debug for Query<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("tree", &self.tree)
            .field("recorded", &self.log.is_some())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

// ============================================================================
// Pending conditions
// ============================================================================

/// Values accepted as the operand of a condition on a field of type `V`.
///
/// Any `V` is accepted for a `V` field; string slices are accepted for
/// `String` and `Option<String>` fields.
pub trait FieldOperand<V> {
    /// Converts the operand into a comparison value.
    fn into_value(self) -> Value;
}

impl<V: Into<Value>> FieldOperand<V> for V {
    fn into_value(self) -> Value {
        self.into()
    }
}

impl FieldOperand<String> for &str {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl FieldOperand<Option<String>> for &str {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

/// Field types that support string matching.
pub trait TextField {}

impl TextField for String {}
impl TextField for Option<String> {}

/// Field types that can be absent.
pub trait NullableField {}

impl<T> NullableField for Option<T> {}

/// A recorded field waiting for its comparison.
///
/// Returned by [`Query::where_`], [`Query::and`] and [`Query::or`]; every
/// comparison method hands the query back.
#[must_use = "a pending condition does nothing until a comparison is applied"]
pub struct PendingCondition<'q, S: DataSource, V> {
    query: Query<'q, S>,
    connector: Option<ConnectorKind>,
    invocation: MethodInvocation,
    _field: PhantomData<fn() -> V>,
}

impl<'q, S, V> PendingCondition<'q, S, V>
where
    S: DataSource,
    S::Item: Invocable,
{
    /// Returns the recorded invocation this condition applies to.
    pub fn invocation(&self) -> &MethodInvocation {
        &self.invocation
    }

    fn attach<C>(self, condition: C) -> Query<'q, S>
    where
        C: WhereCondition<S::Item> + 'q,
    {
        let mut query = self.query;
        query
            .tree
            .graft(self.connector, Node::condition(condition));
        query
    }

    fn compare(self, op: Op, operand: impl Into<Operand>) -> Query<'q, S> {
        let comparison = Comparison::new(self.invocation.clone(), op, operand);
        self.attach(comparison)
    }

    /// Field equals `value`.
    pub fn is_equal(self, value: impl FieldOperand<V>) -> Query<'q, S> {
        self.compare(Op::Eq, value.into_value())
    }

    /// Field differs from `value`.
    pub fn is_not_equal(self, value: impl FieldOperand<V>) -> Query<'q, S> {
        self.compare(Op::Ne, value.into_value())
    }

    /// Field is greater than `value`.
    pub fn is_greater_than(self, value: impl FieldOperand<V>) -> Query<'q, S> {
        self.compare(Op::Gt, value.into_value())
    }

    /// Field is greater than or equal to `value`.
    pub fn is_greater_than_or_equal(self, value: impl FieldOperand<V>) -> Query<'q, S> {
        self.compare(Op::Gte, value.into_value())
    }

    /// Field is smaller than `value`.
    pub fn is_smaller_than(self, value: impl FieldOperand<V>) -> Query<'q, S> {
        self.compare(Op::Lt, value.into_value())
    }

    /// Field is smaller than or equal to `value`.
    pub fn is_smaller_than_or_equal(self, value: impl FieldOperand<V>) -> Query<'q, S> {
        self.compare(Op::Lte, value.into_value())
    }

    /// Field satisfies a custom predicate on its typed value.
    pub fn satisfies<F>(self, predicate: F) -> Query<'q, S>
    where
        V: FromValue + 'q,
        F: Fn(&V) -> bool + 'q,
    {
        let condition = FieldPredicate::new(self.invocation.clone(), predicate);
        self.attach(condition)
    }
}

impl<'q, S, V> PendingCondition<'q, S, V>
where
    S: DataSource,
    S::Item: Invocable,
    V: TextField,
{
    /// Field starts with `prefix`.
    pub fn starts_with(self, prefix: &str) -> Query<'q, S> {
        self.compare(Op::StartsWith, Value::from(prefix))
    }

    /// Field ends with `suffix`.
    pub fn ends_with(self, suffix: &str) -> Query<'q, S> {
        self.compare(Op::EndsWith, Value::from(suffix))
    }

    /// Field contains `needle`.
    pub fn contains(self, needle: &str) -> Query<'q, S> {
        self.compare(Op::Contains, Value::from(needle))
    }

    /// Field matches the regular expression `pattern`.
    ///
    /// Returns an error if the pattern is invalid.
    pub fn matches_regex(self, pattern: &str) -> Result<Query<'q, S>> {
        let regex = Regex::new(pattern)?;
        Ok(self.compare(Op::Regex, regex))
    }
}

impl<'q, S, V> PendingCondition<'q, S, V>
where
    S: DataSource,
    S::Item: Invocable,
    V: NullableField,
{
    /// Field is absent.
    pub fn is_null(self) -> Query<'q, S> {
        let comparison = Comparison::null_check(self.invocation.clone(), Op::IsNull);
        self.attach(comparison)
    }

    /// Field is present.
    pub fn is_not_null(self) -> Query<'q, S> {
        let comparison = Comparison::null_check(self.invocation.clone(), Op::IsNotNull);
        self.attach(comparison)
    }
}
