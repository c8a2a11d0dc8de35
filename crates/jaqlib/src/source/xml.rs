//! XML documents as data sources.
//!
//! The document is parsed once into an [`XmlNode`] tree. An [`ElementPath`]
//! then selects the nodes that become query elements:
//!
//! | Path            | Selects                                        |
//! |-----------------|------------------------------------------------|
//! | `/people/person`| `person` children of the `people` root         |
//! | `/people/*`     | every child of the root                        |
//! | `//person`      | every `person` element, at any depth           |
//! | `/a//b`         | every `b` below the `a` root                   |

use std::collections::HashSet;
use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use super::{DataSource, Elements};
use crate::error::{JaqError, Result};

/// An element of a parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    /// Creates an element without attributes, text or children.
    pub fn new(name: impl Into<String>) -> Self {
        XmlNode {
            name: name.into(),
            ..XmlNode::default()
        }
    }

    /// Parses `xml` and returns its root element.
    pub fn parse(xml: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut open: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;
        loop {
            match reader.read_event()? {
                Event::Start(start) => open.push(XmlNode::from_start(&start)?),
                Event::Empty(start) => {
                    let node = XmlNode::from_start(&start)?;
                    close(&mut open, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = open.pop().ok_or_else(|| {
                        JaqError::InvalidDocument("unexpected end tag".to_string())
                    })?;
                    close(&mut open, &mut root, node)?;
                }
                Event::Text(text) => {
                    if let Some(node) = open.last_mut() {
                        node.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(node) = open.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(JaqError::InvalidDocument(format!(
                "element <{}> is never closed",
                unclosed.name
            )));
        }
        root.ok_or_else(|| JaqError::InvalidDocument("document has no root element".to_string()))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<XmlNode> {
        let mut node = XmlNode::new(String::from_utf8_lossy(start.name().as_ref()));
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            node.attributes.push((key, value));
        }
        Ok(node)
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Sets the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a child element.
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the element name, including any namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of attribute `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns all attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Returns the element's own text (CDATA included), trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the child elements.
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Returns the first child element named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns the text of the first child element named `name`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(XmlNode::text)
    }

    fn push_descendants<'n>(&'n self, out: &mut Vec<&'n XmlNode>) {
        for child in &self.children {
            out.push(child);
            child.push_descendants(out);
        }
    }
}

fn close(open: &mut Vec<XmlNode>, root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => {
            return Err(JaqError::InvalidDocument(format!(
                "second root element <{}>",
                node.name
            )))
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    name: Option<String>,
    descendant: bool,
}

impl Step {
    fn accepts(&self, node: &XmlNode) -> bool {
        self.name.as_deref().map_or(true, |name| name == node.name)
    }
}

/// A minimal element selector.
///
/// Segments are separated by `/`; `*` matches any element name and `//`
/// reaches any depth. A path without a leading `/` is anchored at the root
/// all the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    raw: String,
    steps: Vec<Step>,
}

impl ElementPath {
    /// Parses a path such as `/people/person` or `//person`.
    pub fn parse(path: &str) -> Result<ElementPath> {
        let invalid = || JaqError::InvalidPath(path.to_string());
        let mut steps = Vec::new();
        let mut rest = path.strip_prefix('/').unwrap_or(path);
        let mut descendant = false;
        if let Some(after) = rest.strip_prefix('/') {
            descendant = true;
            rest = after;
        }
        loop {
            let (segment, tail) = match rest.find('/') {
                Some(i) => (&rest[..i], Some(&rest[i + 1..])),
                None => (rest, None),
            };
            if segment.is_empty() || segment.contains(char::is_whitespace) {
                return Err(invalid());
            }
            let name = (segment != "*").then(|| segment.to_string());
            steps.push(Step { name, descendant });
            match tail {
                None => break,
                Some(tail) => match tail.strip_prefix('/') {
                    Some(after) => {
                        descendant = true;
                        rest = after;
                    }
                    None => {
                        descendant = false;
                        rest = tail;
                    }
                },
            }
        }
        Ok(ElementPath {
            raw: path.to_string(),
            steps,
        })
    }

    /// Returns the nodes under `root` selected by this path, in document
    /// order and without duplicates.
    pub fn select<'n>(&self, root: &'n XmlNode) -> Vec<&'n XmlNode> {
        let mut selected: Vec<&'n XmlNode> = Vec::new();
        for (i, step) in self.steps.iter().enumerate() {
            let mut candidates: Vec<&'n XmlNode> = Vec::new();
            if i == 0 {
                candidates.push(root);
                if step.descendant {
                    root.push_descendants(&mut candidates);
                }
            } else {
                for node in &selected {
                    if step.descendant {
                        node.push_descendants(&mut candidates);
                    } else {
                        candidates.extend(node.children.iter());
                    }
                }
            }
            let mut seen = HashSet::new();
            selected = candidates
                .into_iter()
                .filter(|node| step.accepts(node))
                .filter(|node| seen.insert(*node as *const XmlNode))
                .collect();
        }
        selected
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Builds an element from one selected XML node.
pub trait FromXml: Sized {
    /// Maps `node`; errors abort the query.
    fn from_xml(node: &XmlNode) -> Result<Self>;
}

impl FromXml for XmlNode {
    fn from_xml(node: &XmlNode) -> Result<Self> {
        Ok(node.clone())
    }
}

type NodeMapper<'m, T> = Box<dyn Fn(&XmlNode) -> Result<Option<T>> + 'm>;

/// The elements of an XML document selected by an [`ElementPath`].
///
/// The document is parsed up front; each call to
/// [`elements`](DataSource::elements) walks the selection again.
pub struct XmlSource<'m, T> {
    root: XmlNode,
    path: ElementPath,
    mapper: NodeMapper<'m, T>,
}

impl<'m, T: FromXml + 'm> XmlSource<'m, T> {
    /// Parses `xml` and maps the nodes selected by `path` through [`FromXml`].
    pub fn parse(xml: &str, path: &str) -> Result<Self> {
        XmlSource::from_node(XmlNode::parse(xml)?, path)
    }

    /// Maps the nodes of an already parsed document through [`FromXml`].
    pub fn from_node(root: XmlNode, path: &str) -> Result<Self> {
        Ok(XmlSource {
            root,
            path: ElementPath::parse(path)?,
            mapper: Box::new(|node: &XmlNode| T::from_xml(node).map(Some)),
        })
    }
}

impl<'m, T> XmlSource<'m, T> {
    /// Parses `xml` and maps the nodes selected by `path` through `mapper`.
    ///
    /// A node the mapper returns `None` for becomes a null element.
    pub fn with_mapper<F>(xml: &str, path: &str, mapper: F) -> Result<Self>
    where
        F: Fn(&XmlNode) -> Option<T> + 'm,
        T: 'm,
    {
        Ok(XmlSource {
            root: XmlNode::parse(xml)?,
            path: ElementPath::parse(path)?,
            mapper: Box::new(move |node: &XmlNode| Ok(mapper(node))),
        })
    }

    /// Returns the parsed document.
    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    /// Returns the element path.
    pub fn path(&self) -> &ElementPath {
        &self.path
    }
}

impl<T> DataSource for XmlSource<'_, T> {
    type Item = T;

    fn elements(&mut self) -> Result<Elements<'_, T>> {
        let nodes = self.path.select(&self.root);
        trace!(path = %self.path, selected = nodes.len(), "walking XML selection");
        let mapper = &self.mapper;
        Ok(Box::new(nodes.into_iter().map(move |node| mapper(node))))
    }
}

impl<T> fmt::Debug for XmlSource<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlSource")
            .field("root", &self.root.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
