//! JaQLib - fluent, SQL-like queries over Rust data sources.
//!
//! JaQLib lets you write `WHERE` clauses against plain structs using the
//! structs' own field names, checked by the compiler. It supports:
//!
//! - Recorded field references: call a field on a recorder, and the call is
//!   replayed against every element
//! - Comparison, string matching, regex and null-check conditions
//! - Custom conditions from closures, chained with `AND`/`OR`
//! - List, set, map, unique, first and count results
//! - A reusable cache so repeated queries skip the source
//! - Iterator, SQLite and XML sources
//!
//! # Quick Start
//!
//! ```rust
//! # #[cfg(feature = "macros")]
//! # fn main() -> jaqlib::Result<()> {
//! use jaqlib::{Query, Recordable};
//!
//! #[derive(Debug, Clone, Recordable)]
//! struct Account {
//!     id: u32,
//!     owner: String,
//!     balance: i64,
//! }
//!
//! let accounts = vec![
//!     Account { id: 1, owner: "huber".into(), balance: 5_000 },
//!     Account { id: 2, owner: "maier".into(), balance: -20 },
//!     Account { id: 3, owner: "huber".into(), balance: 0 },
//! ];
//!
//! let rec = Account::recorder();
//! let overdrawn_or_huber = Query::from_items(accounts.iter())
//!     .recorded_by(&rec)
//!     .where_(rec.balance())?
//!     .is_smaller_than(0)
//!     .or(rec.owner())?
//!     .is_equal("huber")
//!     .as_map(rec.id())?;
//!
//! assert_eq!(overdrawn_or_huber.len(), 3);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "macros"))]
//! # fn main() {}
//! ```
//!
//! # Query Semantics
//!
//! Conditions combine strictly in the order they are written. Each `and` or
//! `or` takes everything before it as its left operand:
//!
//! ```text
//! a.and(b).or(c)   =>  (a AND b) OR c
//! a.or(b).and(c)   =>  (a OR b) AND c
//! ```
//!
//! Evaluation short-circuits: the right operand of `AND` is skipped when the
//! left is false, the right operand of `OR` when the left is true. A query
//! without conditions matches every element; null elements never match.
//!
//! # Recorded Fields
//!
//! A recorder's methods return a default value and remember the call. The
//! query takes the oldest unconsumed call each time it needs a field, so
//! the recorder call must happen inside the `where_`/`and`/`or`/`as_map`
//! argument it belongs to.
//!
//! | Field type | Conditions |
//! |------------|------------|
//! | any | `is_equal`, `is_not_equal`, ordering comparisons, `satisfies` |
//! | `String` | `starts_with`, `ends_with`, `contains`, `matches_regex` |
//! | `Option<_>` | `is_null`, `is_not_null` |
//!
//! Values of different kinds never match each other; `age() > "x"` is false
//! for every element.
//!
//! # Features
//!
//! - `macros` (default): `#[derive(Recordable)]`
//! - `sql` (default): [`SqlSource`] over `rusqlite`
//! - `xml` (default): [`XmlSource`] over `quick-xml`

mod cache;
mod condition;
mod error;
mod fetch;
mod invocation;
mod op;
mod query;
mod recorder;
mod source;
mod tree;
mod value;

// Re-export public API
pub use cache::QueryCache;
pub use condition::{Comparison, Described, FieldPredicate, Operand, TryCondition, WhereCondition};
pub use error::{JaqError, Result};
pub use fetch::{
    CachingFetchStrategy, Collector, CountCollector, FetchStrategy, FirstOccurrenceFetchStrategy,
    ListCollector, MapCollector, SetCollector,
};
pub use invocation::{InvocationLog, MethodInvocation};
pub use op::Op;
pub use query::{FieldOperand, NullableField, PendingCondition, Query, TextField};
pub use recorder::{EnumField, Invocable, Recordable, Recorder, TimestampField};
pub use source::{DataSource, Elements, IterSource, NullableSource};
#[cfg(feature = "sql")]
pub use source::{FromRow, SqlSource};
#[cfg(feature = "xml")]
pub use source::{ElementPath, FromXml, XmlNode, XmlSource};
pub use tree::{ConnectorKind, Node, SyntaxTree};
pub use value::{FromValue, Number, Timestamp, Value};

#[cfg(feature = "macros")]
pub use jaqlib_macros::Recordable;
