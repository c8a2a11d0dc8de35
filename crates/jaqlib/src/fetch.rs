//! Fetch strategies and result collectors.
//!
//! A [`FetchStrategy`] drives the scan: it pulls elements from a
//! [`DataSource`] (or a filled [`QueryCache`]), asks the [`SyntaxTree`]
//! whether each one matches, and hands matches to a [`Collector`] that
//! builds the requested result shape.
//!
//! Null elements are skipped by every strategy: they are never evaluated
//! and never collected. Any error aborts the scan and propagates; partial
//! results are dropped with the collector.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use tracing::trace;

use crate::cache::QueryCache;
use crate::error::{JaqError, Result};
use crate::invocation::MethodInvocation;
use crate::recorder::Invocable;
use crate::source::DataSource;
use crate::tree::SyntaxTree;
use crate::value::FromValue;

/// Receives matching elements and accumulates the result.
pub trait Collector<T> {
    /// Accepts one matching element.
    fn collect(&mut self, element: &T) -> Result<()>;
}

/// Collects matches into a `Vec`, in scan order.
#[derive(Debug)]
pub struct ListCollector<T> {
    items: Vec<T>,
}

impl<T> ListCollector<T> {
    /// Creates an empty list collector.
    pub fn new() -> Self {
        ListCollector { items: Vec::new() }
    }

    /// Returns the collected elements.
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for ListCollector<T> {
    fn default() -> Self {
        ListCollector::new()
    }
}

impl<T: Clone> Collector<T> for ListCollector<T> {
    fn collect(&mut self, element: &T) -> Result<()> {
        self.items.push(element.clone());
        Ok(())
    }
}

/// Collects matches into a `HashSet`.
#[derive(Debug)]
pub struct SetCollector<T> {
    items: HashSet<T>,
}

impl<T> SetCollector<T> {
    /// Creates an empty set collector.
    pub fn new() -> Self {
        SetCollector {
            items: HashSet::new(),
        }
    }

    /// Returns the collected elements.
    pub fn into_inner(self) -> HashSet<T> {
        self.items
    }
}

impl<T> Default for SetCollector<T> {
    fn default() -> Self {
        SetCollector::new()
    }
}

impl<T: Clone + Eq + Hash> Collector<T> for SetCollector<T> {
    fn collect(&mut self, element: &T) -> Result<()> {
        self.items.insert(element.clone());
        Ok(())
    }
}

/// Collects matches into a `HashMap`, keyed by replaying a recorded
/// invocation against each element.
///
/// When two matches produce the same key, the later one wins.
#[derive(Debug)]
pub struct MapCollector<K, T> {
    key: MethodInvocation,
    items: HashMap<K, T>,
}

impl<K, T> MapCollector<K, T> {
    /// Creates a map collector keyed by `key`.
    pub fn new(key: MethodInvocation) -> Self {
        MapCollector {
            key,
            items: HashMap::new(),
        }
    }

    /// Returns the collected entries.
    pub fn into_inner(self) -> HashMap<K, T> {
        self.items
    }
}

impl<K, T> Collector<T> for MapCollector<K, T>
where
    K: FromValue + Eq + Hash,
    T: Invocable + Clone,
{
    fn collect(&mut self, element: &T) -> Result<()> {
        let value = element.invoke(&self.key)?;
        let key = K::from_value(&value).ok_or_else(|| JaqError::KeyConversion {
            method: self.key.to_string(),
            value: value.to_string(),
            key_type: std::any::type_name::<K>(),
        })?;
        self.items.insert(key, element.clone());
        Ok(())
    }
}

/// Counts matches without keeping them.
#[derive(Debug, Default)]
pub struct CountCollector {
    count: usize,
}

impl CountCollector {
    /// Creates a zeroed counter.
    pub fn new() -> Self {
        CountCollector::default()
    }

    /// Returns the number of collected elements.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl<T> Collector<T> for CountCollector {
    fn collect(&mut self, _element: &T) -> Result<()> {
        self.count += 1;
        Ok(())
    }
}

/// Policy for how much of the source to scan and what to remember.
pub trait FetchStrategy<T> {
    /// Scans `source` (or a cache), feeding elements that match `tree` to
    /// `sink`.
    fn fetch<S>(
        &mut self,
        source: &mut S,
        tree: &SyntaxTree<'_, T>,
        sink: &mut dyn Collector<T>,
    ) -> Result<()>
    where
        S: DataSource<Item = T> + ?Sized;

    /// Returns the strategy's name, for logs.
    fn name(&self) -> &'static str;
}

/// Stops at the first matching element.
///
/// With a filled cache, the cache is scanned instead of the source. This
/// strategy never fills a cache: a scan that stops early is not a complete
/// snapshot of the source.
#[derive(Debug)]
pub struct FirstOccurrenceFetchStrategy<'c, T> {
    cache: Option<&'c QueryCache<T>>,
}

impl<'c, T> FirstOccurrenceFetchStrategy<'c, T> {
    /// Creates a strategy that always reads the source.
    pub fn new() -> Self {
        FirstOccurrenceFetchStrategy { cache: None }
    }

    /// Creates a strategy that reads `cache` when it is filled.
    pub fn with_cache(cache: &'c QueryCache<T>) -> Self {
        FirstOccurrenceFetchStrategy { cache: Some(cache) }
    }
}

impl<T> Default for FirstOccurrenceFetchStrategy<'_, T> {
    fn default() -> Self {
        FirstOccurrenceFetchStrategy::new()
    }
}

impl<T> FetchStrategy<T> for FirstOccurrenceFetchStrategy<'_, T> {
    fn fetch<S>(
        &mut self,
        source: &mut S,
        tree: &SyntaxTree<'_, T>,
        sink: &mut dyn Collector<T>,
    ) -> Result<()>
    where
        S: DataSource<Item = T> + ?Sized,
    {
        if let Some(cache) = self.cache.filter(|cache| cache.is_filled()) {
            trace!(cached = cache.len(), "first occurrence: reading cache");
            for element in cache.elements() {
                if tree.matches(element)? {
                    return sink.collect(element);
                }
            }
            return Ok(());
        }

        for (scanned, slot) in source.elements()?.enumerate() {
            let Some(element) = slot? else {
                continue;
            };
            if tree.matches(&element)? {
                trace!(scanned = scanned + 1, "first occurrence: match found, scan stopped");
                return sink.collect(&element);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "first-occurrence"
    }
}

/// Scans every element, optionally remembering them in a [`QueryCache`].
///
/// - With a filled cache: filters the cached elements; the source is not
///   touched.
/// - With an unfilled cache: scans the source, keeps every scanned slot
///   (matched or not), and commits them to the cache once the scan has
///   completed.
/// - Without a cache: scans the source.
#[derive(Debug)]
pub struct CachingFetchStrategy<'c, T> {
    cache: Option<&'c mut QueryCache<T>>,
}

impl<'c, T> CachingFetchStrategy<'c, T> {
    /// Creates a strategy without a cache.
    pub fn new() -> Self {
        CachingFetchStrategy { cache: None }
    }

    /// Creates a strategy that reads or fills `cache`.
    pub fn with_cache(cache: &'c mut QueryCache<T>) -> Self {
        CachingFetchStrategy { cache: Some(cache) }
    }
}

impl<T> Default for CachingFetchStrategy<'_, T> {
    fn default() -> Self {
        CachingFetchStrategy::new()
    }
}

impl<T> FetchStrategy<T> for CachingFetchStrategy<'_, T> {
    fn fetch<S>(
        &mut self,
        source: &mut S,
        tree: &SyntaxTree<'_, T>,
        sink: &mut dyn Collector<T>,
    ) -> Result<()>
    where
        S: DataSource<Item = T> + ?Sized,
    {
        match self.cache.as_deref_mut() {
            Some(cache) if cache.is_filled() => {
                trace!(cached = cache.len(), "caching: filtering cached elements");
                for element in cache.elements() {
                    if tree.matches(element)? {
                        sink.collect(element)?;
                    }
                }
                Ok(())
            }
            Some(cache) => {
                let mut scanned = Vec::new();
                for slot in source.elements()? {
                    let slot = slot?;
                    if let Some(element) = &slot {
                        if tree.matches(element)? {
                            sink.collect(element)?;
                        }
                    }
                    scanned.push(slot);
                }
                trace!(scanned = scanned.len(), "caching: cache filled");
                cache.fill(scanned);
                Ok(())
            }
            None => {
                for slot in source.elements()? {
                    if let Some(element) = slot? {
                        if tree.matches(&element)? {
                            sink.collect(&element)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "caching"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{IterSource, NullableSource};
    use crate::tree::Node;
    use crate::value::Value;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        hit: bool,
    }

    impl Invocable for Item {
        fn invoke(&self, invocation: &MethodInvocation) -> Result<Value> {
            match invocation.method() {
                "id" => Ok(Value::from(self.id)),
                "hit" => Ok(Value::from(self.hit)),
                "label" => Ok(Value::from(format!("item-{}", self.id))),
                other => Err(JaqError::unknown_method(other)),
            }
        }
    }

    fn item(id: u32, hit: bool) -> Item {
        Item { id, hit }
    }

    fn hits<'c>() -> SyntaxTree<'c, Item> {
        let mut tree = SyntaxTree::new();
        tree.set_root(Node::condition(|i: &Item| i.hit)).unwrap();
        tree
    }

    #[test]
    fn first_occurrence_stops_after_first_match() {
        let evaluated = Cell::new(Vec::new());
        let mut tree = SyntaxTree::new();
        tree.set_root(Node::condition(|i: &Item| {
            let mut seen = evaluated.take();
            seen.push(i.id);
            evaluated.set(seen);
            i.hit
        }))
        .unwrap();

        let mut source = IterSource::new(vec![item(1, false), item(2, true), item(3, true)]);
        let mut sink = ListCollector::<Item>::new();
        FirstOccurrenceFetchStrategy::new()
            .fetch(&mut source, &tree, &mut sink)
            .unwrap();

        assert_eq!(sink.into_inner(), vec![item(2, true)]);
        assert_eq!(evaluated.take(), vec![1, 2]);
    }

    #[test]
    fn first_occurrence_into_map_stops_after_one_entry() {
        let mut source = IterSource::new(vec![item(1, true), item(2, true)]);
        let mut sink: MapCollector<u32, Item> = MapCollector::new(MethodInvocation::new("id"));
        FirstOccurrenceFetchStrategy::new()
            .fetch(&mut source, &hits(), &mut sink)
            .unwrap();

        let map = sink.into_inner();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&item(1, true)));
    }

    #[test]
    fn first_occurrence_does_not_fill_cache() {
        let cache = QueryCache::new();
        let mut source = IterSource::new(vec![item(1, true)]);
        let mut sink = ListCollector::<Item>::new();
        FirstOccurrenceFetchStrategy::with_cache(&cache)
            .fetch(&mut source, &hits(), &mut sink)
            .unwrap();
        assert!(!cache.is_filled());
        assert_eq!(sink.into_inner().len(), 1);
    }

    #[test]
    fn caching_scan_fills_cache_with_every_element() {
        let elements = vec![item(1, true), item(2, false), item(3, true), item(4, false)];
        let mut cache = QueryCache::new();
        let mut source = IterSource::new(elements.clone());
        let mut sink = ListCollector::<Item>::new();

        CachingFetchStrategy::with_cache(&mut cache)
            .fetch(&mut source, &hits(), &mut sink)
            .unwrap();

        assert!(cache.is_filled());
        assert_eq!(cache.len(), 4);
        assert_eq!(sink.into_inner(), vec![item(1, true), item(3, true)]);
    }

    #[test]
    fn filled_cache_is_filtered_without_touching_source() {
        let mut cache = QueryCache::new();
        let mut first_source = IterSource::new(vec![item(1, true), item(2, false)]);
        CachingFetchStrategy::with_cache(&mut cache)
            .fetch(&mut first_source, &hits(), &mut CountCollector::new())
            .unwrap();

        // An already consumed source would fail if it were read again.
        let mut misses = SyntaxTree::new();
        misses.set_root(Node::condition(|i: &Item| !i.hit)).unwrap();
        let mut sink = ListCollector::<Item>::new();
        CachingFetchStrategy::with_cache(&mut cache)
            .fetch(&mut first_source, &misses, &mut sink)
            .unwrap();

        assert_eq!(sink.into_inner(), vec![item(2, false)]);
        assert_eq!(cache.len(), 2);

        // First occurrence also reads the filled cache
        let mut sink = ListCollector::<Item>::new();
        FirstOccurrenceFetchStrategy::with_cache(&cache)
            .fetch(&mut first_source, &misses, &mut sink)
            .unwrap();
        assert_eq!(sink.into_inner(), vec![item(2, false)]);
    }

    #[test]
    fn null_elements_are_skipped_but_cached() {
        let evaluations = Cell::new(0);
        let mut tree = SyntaxTree::new();
        tree.set_root(Node::condition(|i: &Item| {
            evaluations.set(evaluations.get() + 1);
            i.hit
        }))
        .unwrap();

        let mut cache = QueryCache::new();
        let mut source = NullableSource::new(vec![None, Some(item(7, true))]);
        let mut sink: MapCollector<u32, Item> = MapCollector::new(MethodInvocation::new("id"));
        CachingFetchStrategy::with_cache(&mut cache)
            .fetch(&mut source, &tree, &mut sink)
            .unwrap();

        let map = sink.into_inner();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&7), Some(&item(7, true)));
        assert_eq!(evaluations.get(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn predicate_error_aborts_and_leaves_cache_unfilled() {
        let mut tree = SyntaxTree::new();
        tree.set_root(Node::condition(crate::condition::TryCondition::new(
            |i: &Item| -> std::result::Result<bool, String> {
                if i.id == 2 {
                    Err("boom".to_string())
                } else {
                    Ok(true)
                }
            },
        )))
        .unwrap();

        let mut cache = QueryCache::new();
        let mut source = IterSource::new(vec![item(1, true), item(2, true), item(3, true)]);
        let err = CachingFetchStrategy::with_cache(&mut cache)
            .fetch(&mut source, &tree, &mut ListCollector::<Item>::new())
            .unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert!(!cache.is_filled());
        assert!(cache.is_empty());
    }

    #[test]
    fn map_key_conversion_failure() {
        let mut source = IterSource::new(vec![item(1, true)]);
        let mut sink: MapCollector<u32, Item> = MapCollector::new(MethodInvocation::new("label"));
        let err = CachingFetchStrategy::new()
            .fetch(&mut source, &hits(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, JaqError::KeyConversion { .. }));
    }

    #[test]
    fn map_duplicate_keys_keep_last() {
        let mut source = IterSource::new(vec![item(1, true), item(1, false)]);
        let mut sink: MapCollector<bool, Item> = MapCollector::new(MethodInvocation::new("hit"));
        let tree = SyntaxTree::new();
        CachingFetchStrategy::new()
            .fetch(&mut source, &tree, &mut sink)
            .unwrap();
        assert_eq!(sink.into_inner().len(), 2);

        let mut source = IterSource::new(vec![item(1, true), item(2, true)]);
        let mut sink: MapCollector<bool, Item> = MapCollector::new(MethodInvocation::new("hit"));
        CachingFetchStrategy::new()
            .fetch(&mut source, &tree, &mut sink)
            .unwrap();
        assert_eq!(sink.into_inner().get(&true), Some(&item(2, true)));
    }

    #[test]
    fn set_and_count_collectors() {
        let mut source = IterSource::new(vec![3, 1, 3, 2]);
        let mut sink = SetCollector::<i32>::new();
        CachingFetchStrategy::new()
            .fetch(&mut source, &SyntaxTree::new(), &mut sink)
            .unwrap();
        assert_eq!(sink.into_inner().len(), 3);

        let mut source = IterSource::new(vec![3, 1, 3, 2]);
        let mut counter = CountCollector::new();
        CachingFetchStrategy::new()
            .fetch(&mut source, &SyntaxTree::new(), &mut counter)
            .unwrap();
        assert_eq!(counter.count(), 4);
    }
}
