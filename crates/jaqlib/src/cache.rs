//! Query cache.
//!
//! A [`QueryCache`] remembers every element pulled from a data source by a
//! full scan, so later queries against the same source filter the cached
//! elements instead of reading the source again. The cache stores raw
//! elements only; each query applies its own predicate.

/// Elements already scanned from one data source.
///
/// Null slots are kept, so [`len`](QueryCache::len) equals the number of
/// elements the source produced. Once [`is_filled`](QueryCache::is_filled)
/// is true the cache holds a complete scan and never shrinks.
///
/// A cache belongs to one data source and one thread; it is not
/// synchronized.
#[derive(Debug, Clone)]
pub struct QueryCache<T> {
    elements: Vec<Option<T>>,
    filled: bool,
}

impl<T> QueryCache<T> {
    /// Creates an empty, unfilled cache.
    pub fn new() -> Self {
        QueryCache {
            elements: Vec::new(),
            filled: false,
        }
    }

    /// Returns `true` once a complete scan has been stored.
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Returns the number of cached slots, null slots included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates the cached slots in scan order.
    pub fn iter(&self) -> std::slice::Iter<'_, Option<T>> {
        self.elements.iter()
    }

    /// Returns the cached non-null elements in scan order.
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.elements.iter().flatten()
    }

    /// Stores the slots of a completed scan and marks the cache filled.
    ///
    /// Has no effect on an already filled cache.
    pub(crate) fn fill(&mut self, scanned: Vec<Option<T>>) {
        if self.filled {
            return;
        }
        self.elements.extend(scanned);
        self.filled = true;
    }
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        QueryCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cache_is_empty_and_unfilled() {
        let cache: QueryCache<i32> = QueryCache::new();
        assert!(!cache.is_filled());
        assert!(cache.is_empty());
    }

    #[test]
    fn fill_keeps_null_slots() {
        let mut cache = QueryCache::new();
        cache.fill(vec![Some(1), None, Some(3)]);
        assert!(cache.is_filled());
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.elements().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn filled_cache_never_changes() {
        let mut cache = QueryCache::new();
        cache.fill(vec![Some("a")]);
        cache.fill(vec![Some("b"), Some("c")]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.iter().next(), Some(&Some("a")));
    }
}
