//! Property-based tests for jaqlib using proptest.

use std::cell::Cell;

use jaqlib::{
    ConnectorKind, InvocationLog, Invocable, JaqError, MethodInvocation, Node, Query, QueryCache,
    Recorder, Result, SyntaxTree, Value,
};
use proptest::prelude::*;

// ============================================================================
// Test helpers
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct TestItem {
    value: i64,
    name: String,
    active: bool,
}

impl Invocable for TestItem {
    fn invoke(&self, invocation: &MethodInvocation) -> Result<Value> {
        match invocation.method() {
            "value" => Ok(Value::from(self.value)),
            "name" => Ok(Value::from(self.name.as_str())),
            "active" => Ok(Value::from(self.active)),
            other => Err(JaqError::unknown_method(other)),
        }
    }
}

#[derive(Default)]
struct TestItemRecorder {
    log: InvocationLog,
}

impl TestItemRecorder {
    fn value(&self) -> i64 {
        self.record("value")
    }

    fn active(&self) -> bool {
        self.record("active")
    }
}

impl Recorder for TestItemRecorder {
    fn log(&self) -> &InvocationLog {
        &self.log
    }
}

// Strategy to generate test items
fn test_item_strategy() -> impl Strategy<Value = TestItem> {
    (any::<i64>(), "[a-z]{1,10}", any::<bool>()).prop_map(|(value, name, active)| TestItem {
        value,
        name,
        active,
    })
}

fn connector_strategy() -> impl Strategy<Value = ConnectorKind> {
    prop_oneof![Just(ConnectorKind::And), Just(ConnectorKind::Or)]
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// A chain of conditions evaluates as a strict left fold.
    #[test]
    fn chain_is_left_fold(
        first in any::<bool>(),
        rest in prop::collection::vec((connector_strategy(), any::<bool>()), 0..12),
    ) {
        let mut tree: SyntaxTree<'_, ()> = SyntaxTree::new();
        tree.set_root(Node::condition(move |_: &()| first)).unwrap();
        let mut expected = first;
        for &(kind, outcome) in &rest {
            tree.add_connector(kind, Node::condition(move |_: &()| outcome)).unwrap();
            expected = match kind {
                ConnectorKind::And => expected && outcome,
                ConnectorKind::Or => expected || outcome,
            };
        }
        prop_assert_eq!(tree.matches(&()).unwrap(), expected);
    }

    /// Once the running result is decided, no further condition runs.
    #[test]
    fn evaluation_short_circuits(
        first in any::<bool>(),
        rest in prop::collection::vec((connector_strategy(), any::<bool>()), 0..12),
    ) {
        let calls = Cell::new(0usize);
        let counter = &calls;
        let counted = move |outcome: bool| {
            move |_: &()| {
                counter.set(counter.get() + 1);
                outcome
            }
        };

        let mut tree: SyntaxTree<'_, ()> = SyntaxTree::new();
        tree.set_root(Node::condition(counted(first))).unwrap();
        let mut running = first;
        let mut expected_calls = 1;
        for &(kind, outcome) in &rest {
            tree.add_connector(kind, Node::condition(counted(outcome))).unwrap();
            let needs_right = match kind {
                ConnectorKind::And => running,
                ConnectorKind::Or => !running,
            };
            if needs_right {
                expected_calls += 1;
                running = outcome;
            }
        }

        prop_assert_eq!(tree.matches(&()).unwrap(), running);
        prop_assert_eq!(calls.get(), expected_calls);
    }

    /// A query without conditions matches every element.
    #[test]
    fn empty_query_matches_all(
        items in prop::collection::vec(test_item_strategy(), 0..50),
    ) {
        let results = Query::from_items(items.iter()).as_list().unwrap();
        prop_assert_eq!(results.len(), items.len());
    }

    /// Null elements never reach the result.
    #[test]
    fn nulls_never_match(
        slots in prop::collection::vec(prop::option::of(test_item_strategy()), 0..50),
    ) {
        let present = slots.iter().flatten().count();
        let count = Query::from_nullable(slots.iter().map(Option::as_ref))
            .where_matches(|_| true)
            .unwrap()
            .count()
            .unwrap();
        prop_assert_eq!(count, present);
    }

    /// Count equals the length of the list.
    #[test]
    fn count_equals_list_len(
        items in prop::collection::vec(test_item_strategy(), 0..50),
        threshold in any::<i64>(),
    ) {
        let rec = TestItemRecorder::default();
        let listed = Query::from_items(items.iter())
            .recorded_by(&rec)
            .where_(rec.value())
            .unwrap()
            .is_greater_than_or_equal(threshold)
            .as_list()
            .unwrap();

        let counted = Query::from_items(items.iter())
            .recorded_by(&rec)
            .where_(rec.value())
            .unwrap()
            .is_greater_than_or_equal(threshold)
            .count()
            .unwrap();

        prop_assert_eq!(listed.len(), counted);
    }

    /// The list keeps source order and agrees with a plain filter.
    #[test]
    fn list_agrees_with_filter(
        items in prop::collection::vec(test_item_strategy(), 0..50),
        threshold in any::<i64>(),
    ) {
        let rec = TestItemRecorder::default();
        let results = Query::from_items(items.iter())
            .recorded_by(&rec)
            .where_(rec.value())
            .unwrap()
            .is_smaller_than(threshold)
            .and(rec.active())
            .unwrap()
            .is_equal(true)
            .as_list()
            .unwrap();

        let expected: Vec<&TestItem> = items
            .iter()
            .filter(|i| i.value < threshold && i.active)
            .collect();
        prop_assert_eq!(results, expected);
    }

    /// first_result is the head of the list.
    #[test]
    fn first_result_is_list_head(
        items in prop::collection::vec(test_item_strategy(), 0..50),
        threshold in any::<i64>(),
    ) {
        let rec = TestItemRecorder::default();
        let first = Query::from_items(items.iter())
            .recorded_by(&rec)
            .where_(rec.value())
            .unwrap()
            .is_greater_than(threshold)
            .first_result()
            .unwrap();

        let head = items.iter().find(|i| i.value > threshold);
        prop_assert_eq!(first, head);
    }

    /// A filled cache answers exactly like the source it was filled from.
    #[test]
    fn cache_matches_source(
        items in prop::collection::vec(test_item_strategy(), 0..50),
        threshold in any::<i64>(),
    ) {
        let mut cache = QueryCache::new();
        let warm = Query::from_items(items.iter())
            .cached(&mut cache)
            .where_matches(|i| i.value < threshold)
            .unwrap()
            .as_list()
            .unwrap();
        prop_assert!(cache.is_filled());
        prop_assert_eq!(cache.len(), items.len());

        let from_cache = Query::from_items(std::iter::empty::<&TestItem>())
            .cached(&mut cache)
            .where_matches(|i| i.value < threshold)
            .unwrap()
            .as_list()
            .unwrap();
        prop_assert_eq!(warm, from_cache);
    }
}
