//! The predicate syntax tree.
//!
//! A query's WHERE/AND/OR chain is accumulated into a [`SyntaxTree`]. The
//! tree is a strictly binary, left-leaning chain: every new connector takes
//! the *whole* previous tree as its left child and the new condition as its
//! right child. There is no precedence table and no grouping, so
//!
//! ```text
//! where A and B or C   ==>   Or(And(A, B), C)   ==   (A AND B) OR C
//! where A or B and C   ==>   And(Or(A, B), C)   ==   (A OR B) AND C
//! ```
//!
//! Evaluation follows construction order from left to right, with
//! short-circuiting `AND`/`OR`.

use std::fmt;

use crate::condition::WhereCondition;
use crate::error::{JaqError, Result};

/// The binary connector joining two sub-predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorKind {
    /// Both sides must match.
    And,
    /// At least one side must match.
    Or,
}

impl ConnectorKind {
    /// Returns the keyword used when rendering the tree.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorKind::And => "AND",
            ConnectorKind::Or => "OR",
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node of the predicate syntax tree.
pub enum Node<'c, T: ?Sized> {
    /// Terminal placeholder that always matches.
    True,
    /// Leaf wrapping a condition evaluator.
    Condition(Box<dyn WhereCondition<T> + 'c>),
    /// Short-circuit conjunction.
    And(Box<Node<'c, T>>, Box<Node<'c, T>>),
    /// Short-circuit disjunction.
    Or(Box<Node<'c, T>>, Box<Node<'c, T>>),
}

impl<'c, T: ?Sized> Node<'c, T> {
    /// Creates a leaf for `condition`.
    pub fn condition<C>(condition: C) -> Self
    where
        C: WhereCondition<T> + 'c,
    {
        Node::Condition(Box::new(condition))
    }

    /// Joins `left` and `right` with the given connector.
    pub fn connect(kind: ConnectorKind, left: Node<'c, T>, right: Node<'c, T>) -> Self {
        match kind {
            ConnectorKind::And => Node::And(Box::new(left), Box::new(right)),
            ConnectorKind::Or => Node::Or(Box::new(left), Box::new(right)),
        }
    }

    /// Evaluates this subtree against an element.
    ///
    /// The right side of a connector is not evaluated when the left side
    /// already decides the result.
    pub fn visit(&self, element: &T) -> Result<bool> {
        match self {
            Node::True => Ok(true),
            Node::Condition(condition) => condition.evaluate(element),
            Node::And(left, right) => Ok(left.visit(element)? && right.visit(element)?),
            Node::Or(left, right) => Ok(left.visit(element)? || right.visit(element)?),
        }
    }

    /// Renders this subtree as `a AND b OR c`; `True` nodes render empty.
    pub fn render(&self) -> String {
        match self {
            Node::True => String::new(),
            Node::Condition(condition) => condition.describe(),
            Node::And(left, right) => render_connector(ConnectorKind::And, left, right),
            Node::Or(left, right) => render_connector(ConnectorKind::Or, left, right),
        }
    }
}

fn render_connector<T: ?Sized>(kind: ConnectorKind, left: &Node<'_, T>, right: &Node<'_, T>) -> String {
    let left = left.render();
    let right = right.render();
    match (left.is_empty(), right.is_empty()) {
        (true, _) => right,
        (false, true) => left,
        (false, false) => format!("{} {} {}", left, kind, right),
    }
}

impl<T: ?Sized> fmt::Debug for Node<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::True => write!(f, "True"),
            Node::Condition(condition) => f
                .debug_tuple("Condition")
                .field(&condition.describe())
                .finish(),
            Node::And(left, right) => f.debug_tuple("And").field(left).field(right).finish(),
            Node::Or(left, right) => f.debug_tuple("Or").field(left).field(right).finish(),
        }
    }
}

/// The predicate tree of one query.
///
/// # Example
///
/// ```
/// use jaqlib::{ConnectorKind, Node, SyntaxTree};
///
/// let mut tree = SyntaxTree::new();
/// assert!(tree.matches(&7).unwrap()); // no root: everything matches
///
/// tree.set_root(Node::condition(|n: &i32| *n > 5)).unwrap();
/// tree.add_connector(ConnectorKind::Or, Node::condition(|n: &i32| *n == 0)).unwrap();
///
/// assert!(tree.matches(&7).unwrap());
/// assert!(tree.matches(&0).unwrap());
/// assert!(!tree.matches(&3).unwrap());
/// ```
pub struct SyntaxTree<'c, T: ?Sized> {
    root: Option<Node<'c, T>>,
}

impl<'c, T: ?Sized> SyntaxTree<'c, T> {
    /// Creates an empty tree, which matches every element.
    pub fn new() -> Self {
        SyntaxTree { root: None }
    }

    /// Returns `true` once the WHERE condition has been set.
    pub fn has_root(&self) -> bool {
        self.root.is_some()
    }

    /// Returns the root node, if any.
    pub fn root(&self) -> Option<&Node<'c, T>> {
        self.root.as_ref()
    }

    /// Sets the WHERE condition.
    ///
    /// The node becomes the right child of a synthetic `And(True, node)`
    /// root, so every connector has two children from the start. Fails with
    /// [`JaqError::RootAlreadySet`] if a root exists.
    pub fn set_root(&mut self, node: Node<'c, T>) -> Result<()> {
        if self.has_root() {
            return Err(JaqError::RootAlreadySet);
        }
        self.graft(None, node);
        Ok(())
    }

    /// Appends a condition with an AND/OR connector.
    ///
    /// The entire previous tree becomes the connector's left child and
    /// `node` its right child. Fails with [`JaqError::MissingRoot`] if no
    /// WHERE condition has been set.
    pub fn add_connector(&mut self, kind: ConnectorKind, node: Node<'c, T>) -> Result<()> {
        if !self.has_root() {
            return Err(JaqError::MissingRoot);
        }
        self.graft(Some(kind), node);
        Ok(())
    }

    /// Splices `node` into the tree without checking preconditions.
    ///
    /// `None` installs the root. Callers validate with [`has_root`] first.
    ///
    /// [`has_root`]: SyntaxTree::has_root
    pub(crate) fn graft(&mut self, connector: Option<ConnectorKind>, node: Node<'c, T>) {
        let root = match (connector, self.root.take()) {
            (Some(kind), Some(previous)) => Node::connect(kind, previous, node),
            _ => Node::connect(ConnectorKind::And, Node::True, node),
        };
        self.root = Some(root);
    }

    /// Evaluates the tree against an element.
    ///
    /// A tree without a root matches everything.
    pub fn matches(&self, element: &T) -> Result<bool> {
        match &self.root {
            Some(root) => root.visit(element),
            None => Ok(true),
        }
    }
}

impl<T: ?Sized> Default for SyntaxTree<'_, T> {
    fn default() -> Self {
        SyntaxTree::new()
    }
}

impl<T: ?Sized> fmt::Display for SyntaxTree<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => write!(f, "WHERE {}", root.render()),
            None => Ok(()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for SyntaxTree<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree").field("root", &self.root).finish()
    }
}
