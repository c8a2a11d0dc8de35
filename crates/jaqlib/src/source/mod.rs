//! Data sources.
//!
//! A [`DataSource`] hands the query engine its candidate elements, one at a
//! time, already mapped into the element type the conditions evaluate.
//! Three kinds ship with the crate:
//!
//! - [`IterSource`] / [`NullableSource`]: any Rust iterator
//! - [`SqlSource`]: rows of a SQLite result set (feature `sql`)
//! - [`XmlSource`]: elements of an XML document selected by path (feature `xml`)

use std::marker::PhantomData;

use crate::error::{JaqError, Result};

#[cfg(feature = "sql")]
mod sql;
#[cfg(feature = "xml")]
mod xml;

#[cfg(feature = "sql")]
pub use sql::{FromRow, SqlSource};
#[cfg(feature = "xml")]
pub use xml::{ElementPath, FromXml, XmlNode, XmlSource};

/// The stream of candidate slots produced by a source.
///
/// `Ok(None)` is a null element: it is skipped by every fetch strategy.
pub type Elements<'s, T> = Box<dyn Iterator<Item = Result<Option<T>>> + 's>;

/// Enumerates the candidate elements of a query.
pub trait DataSource {
    /// The element type handed to conditions.
    type Item;

    /// Starts enumerating elements.
    ///
    /// Errors while opening the source are returned here; errors while
    /// reading one element are yielded in its slot and abort the scan.
    fn elements(&mut self) -> Result<Elements<'_, Self::Item>>;
}

impl<S: DataSource + ?Sized> DataSource for &mut S {
    type Item = S::Item;

    fn elements(&mut self) -> Result<Elements<'_, Self::Item>> {
        (**self).elements()
    }
}

/// A single-use source over any iterator.
///
/// # Example
///
/// ```
/// use jaqlib::{DataSource, IterSource};
///
/// let names = vec!["huber", "maier"];
/// let mut source = IterSource::new(names.iter());
/// let first = source.elements().unwrap().next().unwrap().unwrap();
/// assert_eq!(first, Some(&"huber"));
/// assert!(source.elements().is_err()); // already consumed
/// ```
#[derive(Debug)]
pub struct IterSource<I> {
    iter: Option<I>,
}

impl<I: Iterator> IterSource<I> {
    /// Wraps anything iterable.
    pub fn new(items: impl IntoIterator<IntoIter = I>) -> Self {
        IterSource {
            iter: Some(items.into_iter()),
        }
    }
}

impl<I: Iterator> DataSource for IterSource<I> {
    type Item = I::Item;

    fn elements(&mut self) -> Result<Elements<'_, Self::Item>> {
        let iter = self.iter.take().ok_or(JaqError::SourceConsumed)?;
        Ok(Box::new(iter.map(|item| Ok(Some(item)))))
    }
}

/// A single-use source over an iterator of optional elements.
///
/// `None` items are null elements.
#[derive(Debug)]
pub struct NullableSource<I, T> {
    iter: Option<I>,
    _item: PhantomData<fn() -> T>,
}

impl<T, I: Iterator<Item = Option<T>>> NullableSource<I, T> {
    /// Wraps an iterable of optional elements.
    pub fn new(items: impl IntoIterator<IntoIter = I>) -> Self {
        NullableSource {
            iter: Some(items.into_iter()),
            _item: PhantomData,
        }
    }
}

impl<T, I: Iterator<Item = Option<T>>> DataSource for NullableSource<I, T> {
    type Item = T;

    fn elements(&mut self) -> Result<Elements<'_, T>> {
        let iter = self.iter.take().ok_or(JaqError::SourceConsumed)?;
        Ok(Box::new(iter.map(Ok)))
    }
}
