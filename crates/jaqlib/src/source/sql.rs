//! SQLite result sets as data sources.

use std::fmt;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row, Statement};
use tracing::trace;

use super::{DataSource, Elements};
use crate::error::{JaqError, Result};

/// Builds an element from one result row.
///
/// Column access goes through `rusqlite`'s own [`FromSql`](rusqlite::types::FromSql)
/// conversions.
///
/// ```
/// use jaqlib::FromRow;
///
/// struct Person {
///     last_name: String,
///     age: u32,
/// }
///
/// impl FromRow for Person {
///     fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
///         Ok(Person {
///             last_name: row.get("last_name")?,
///             age: row.get("age")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Maps the current row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

type RowMapper<'conn, T> = Box<dyn Fn(&Row<'_>) -> rusqlite::Result<T> + 'conn>;

/// The rows of a prepared SELECT statement.
///
/// The statement is prepared once, when the source is created; every call to
/// [`elements`](DataSource::elements) re-executes it with the same
/// parameters, so the source can back several queries.
pub struct SqlSource<'conn, T> {
    sql: String,
    statement: Statement<'conn>,
    params: Vec<SqlValue>,
    mapper: RowMapper<'conn, T>,
}

impl<'conn, T: FromRow + 'conn> SqlSource<'conn, T> {
    /// Prepares `sql` on `conn`, mapping rows through [`FromRow`].
    ///
    /// `params` bind to the positional placeholders (`?1`, `?2`, ...).
    pub fn new<P>(conn: &'conn Connection, sql: &str, params: P) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: Into<SqlValue>,
    {
        SqlSource::with_mapper(conn, sql, params, T::from_row)
    }
}

impl<'conn, T> SqlSource<'conn, T> {
    /// Prepares `sql` on `conn`, mapping rows through `mapper`.
    pub fn with_mapper<P, F>(conn: &'conn Connection, sql: &str, params: P, mapper: F) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: Into<SqlValue>,
        F: Fn(&Row<'_>) -> rusqlite::Result<T> + 'conn,
    {
        let statement = conn.prepare(sql)?;
        let params: Vec<SqlValue> = params.into_iter().map(Into::into).collect();
        let expected = statement.parameter_count();
        if params.len() != expected {
            return Err(JaqError::Sql(rusqlite::Error::InvalidParameterCount(
                params.len(),
                expected,
            )));
        }
        Ok(SqlSource {
            sql: sql.to_string(),
            statement,
            params,
            mapper: Box::new(mapper),
        })
    }

    /// Returns the column names of the result set.
    pub fn column_names(&self) -> Vec<&str> {
        self.statement.column_names()
    }
}

impl<T> DataSource for SqlSource<'_, T> {
    type Item = T;

    fn elements(&mut self) -> Result<Elements<'_, T>> {
        trace!(sql = %self.sql, params = self.params.len(), "executing SQL statement");
        let mapper = &self.mapper;
        let rows = self
            .statement
            .query_map(params_from_iter(self.params.iter()), move |row| mapper(row))?;
        Ok(Box::new(
            rows.map(|row| row.map(Some).map_err(JaqError::from)),
        ))
    }
}

impl<T> fmt::Debug for SqlSource<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlSource")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Person {
        last_name: String,
        age: u32,
    }

    impl FromRow for Person {
        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Person {
                last_name: row.get(0)?,
                age: row.get(1)?,
            })
        }
    }

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE person (last_name TEXT NOT NULL, age INTEGER NOT NULL);
             INSERT INTO person VALUES ('huber', 42);
             INSERT INTO person VALUES ('maier', 12);
             INSERT INTO person VALUES ('huber', 7);",
        )
        .unwrap();
        conn
    }

    fn drain<S: DataSource>(source: &mut S) -> Vec<S::Item> {
        source
            .elements()
            .unwrap()
            .map(|slot| slot.unwrap().unwrap())
            .collect()
    }

    #[test]
    fn maps_rows_with_from_row() {
        let conn = connection();
        let mut source: SqlSource<'_, Person> = SqlSource::new(
            &conn,
            "SELECT last_name, age FROM person WHERE last_name = ?1 ORDER BY age",
            ["huber".to_string()],
        )
        .unwrap();

        let people = drain(&mut source);
        assert_eq!(
            people,
            vec![
                Person { last_name: "huber".into(), age: 7 },
                Person { last_name: "huber".into(), age: 42 },
            ]
        );
    }

    #[test]
    fn maps_rows_with_closure() {
        let conn = connection();
        let mut source = SqlSource::with_mapper(
            &conn,
            "SELECT age FROM person WHERE age > ?1 ORDER BY age",
            [10],
            |row| row.get::<_, u32>(0),
        )
        .unwrap();
        assert_eq!(drain(&mut source), vec![12, 42]);
    }

    #[test]
    fn source_can_be_read_twice() {
        let conn = connection();
        let mut source = SqlSource::with_mapper(
            &conn,
            "SELECT last_name FROM person",
            Vec::<SqlValue>::new(),
            |row| row.get::<_, String>(0),
        )
        .unwrap();
        assert_eq!(drain(&mut source).len(), 3);
        assert_eq!(drain(&mut source).len(), 3);
        assert_eq!(source.column_names(), vec!["last_name"]);
    }

    #[test]
    fn bad_sql_fails_at_construction() {
        let conn = connection();
        let result = SqlSource::<Person>::new(&conn, "SELECT * FROM nowhere", Vec::<SqlValue>::new());
        assert!(matches!(result.err(), Some(JaqError::Sql(_))));
    }

    #[test]
    fn wrong_parameter_count_fails_at_construction() {
        let conn = connection();
        let result = SqlSource::<Person>::new(
            &conn,
            "SELECT last_name, age FROM person WHERE age > ?1",
            Vec::<SqlValue>::new(),
        );
        assert!(matches!(result.err(), Some(JaqError::Sql(_))));
    }

    #[test]
    fn conversion_error_is_yielded_in_its_slot() {
        let conn = connection();
        let mut source = SqlSource::with_mapper(
            &conn,
            "SELECT last_name FROM person",
            Vec::<SqlValue>::new(),
            |row| row.get::<_, i64>(0),
        )
        .unwrap();
        let first = source.elements().unwrap().next().unwrap();
        assert!(matches!(first, Err(JaqError::Sql(_))));
    }
}
