//! Error types for the jaqlib crate.

use thiserror::Error;

/// Errors that can occur when building or executing queries.
#[derive(Debug, Error)]
pub enum JaqError {
    /// `where_*` was called on a query (or tree) that already has a root.
    #[error("the WHERE condition has already been set for this query")]
    RootAlreadySet,

    /// `and`/`or` was called before any `where_*` condition.
    #[error("cannot add an AND/OR connector before a WHERE condition")]
    MissingRoot,

    /// A recorded-field call was made on a query without a recorder.
    #[error("no recorder attached to this query; call `recorded_by` first")]
    NoRecorder,

    /// The recorder's invocation log has no unconsumed invocation.
    #[error("no recorded method invocation available; call a recorder method first")]
    NoInvocation,

    /// Replaying a recorded invocation against a real element failed.
    #[error("cannot replay `{method}`: {reason}")]
    Replay { method: String, reason: String },

    /// A replayed map key could not be converted to the requested key type.
    #[error("key `{value}` returned by `{method}` cannot be used as map key of type {key_type}")]
    KeyConversion {
        method: String,
        value: String,
        key_type: &'static str,
    },

    /// `unique_result` found more than one matching element.
    #[error("expected a unique result but {count} elements matched")]
    NonUniqueResult { count: usize },

    /// A single-use data source was asked for its elements twice.
    #[error("data source has already been consumed")]
    SourceConsumed,

    /// Invalid regular expression pattern.
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// A caller-supplied condition reported an error.
    #[error(transparent)]
    Condition(Box<dyn std::error::Error + Send + Sync>),

    /// A raw row or node could not be mapped to an element.
    #[error("cannot map element: {0}")]
    Mapping(String),

    /// SQLite error while preparing or walking a result set.
    #[cfg(feature = "sql")]
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// XML parsing error.
    #[cfg(feature = "xml")]
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The XML document is well-formed text but not a single element tree.
    #[cfg(feature = "xml")]
    #[error("invalid XML document: {0}")]
    InvalidDocument(String),

    /// An element path could not be parsed.
    #[cfg(feature = "xml")]
    #[error("invalid element path `{0}`")]
    InvalidPath(String),
}

impl JaqError {
    /// Creates a replay error for the given method.
    pub fn replay(method: impl Into<String>, reason: impl Into<String>) -> Self {
        JaqError::Replay {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Creates a replay error for a method the element does not provide.
    pub fn unknown_method(method: impl Into<String>) -> Self {
        JaqError::replay(method, "no such recordable method on this element")
    }
}

/// Result type for jaqlib operations.
pub type Result<T> = std::result::Result<T, JaqError>;
