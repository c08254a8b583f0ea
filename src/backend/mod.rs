//! The database backend seen by the benchmark engine.
//!
//! A [`Backend`] hands out [`Connection`]s, one per runner or worker. The
//! engine never shares a connection between threads. Adapters only have to
//! provide the transaction, statement and cursor primitives; table, index,
//! foreign key and bulk-load operations have ANSI defaults that adapters can
//! override.

mod null;
mod sqlite;

use std::fmt;

pub use null::{NullBackend, NullConnection};
pub use sqlite::{SqliteBackend, SqliteConnection};

use crate::error::BackendError;

/// Rows per transaction when bulk loading through plain inserts.
pub const BULK_LOAD_BATCH: usize = 1000;

/// A typed cell value returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Integer view of the value. Reals are truncated, text is parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(*i),
            Value::Real(f) => Some(*f as i64),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            }
        }
    }

    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Btree,
    Clustered,
    Hash,
}

/// A single foreign key constraint with cascading deletes and updates.
#[derive(Debug, Clone)]
pub struct ForeignKey<'a> {
    pub name: &'a str,
    pub table: &'a str,
    pub column: &'a str,
    pub ref_table: &'a str,
    pub ref_column: &'a str,
}

/// One open session with the database.
///
/// At most one transaction and one cursor are active at a time.
pub trait Connection: Send {
    fn begin(&mut self, isolation: IsolationLevel) -> Result<(), BackendError>;
    fn commit(&mut self) -> Result<(), BackendError>;
    fn rollback(&mut self) -> Result<(), BackendError>;

    /// Executes a statement and returns the number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<u64, BackendError>;
    /// Returns the first column of the first row, or `Value::Null` when the
    /// statement yields no rows.
    fn query_scalar(&mut self, sql: &str) -> Result<Value, BackendError>;

    fn open_cursor(&mut self, sql: &str) -> Result<(), BackendError>;
    /// Advances the cursor. Returns false once the rows are exhausted.
    fn fetch(&mut self) -> Result<bool, BackendError>;
    fn column(&self, index: usize) -> Result<Value, BackendError>;
    fn close_cursor(&mut self) -> Result<(), BackendError>;

    fn create_table(
        &mut self,
        name: &str,
        columns: &str,
        primary_key: Option<&str>,
    ) -> Result<(), BackendError> {
        let sql = match primary_key {
            Some(pk) => format!("create table {} ({}, primary key ({}))", name, columns, pk),
            None => format!("create table {} ({})", name, columns),
        };
        self.execute(&sql).map(|_| ())
    }

    fn create_index(
        &mut self,
        kind: IndexKind,
        name: &str,
        table: &str,
        columns: &str,
    ) -> Result<(), BackendError> {
        let sql = match kind {
            IndexKind::Btree => format!("create index {} on {} ({})", name, table, columns),
            IndexKind::Clustered => {
                format!("create clustered index {} on {} ({})", name, table, columns)
            }
            IndexKind::Hash => {
                format!("create index {} on {} using hash ({})", name, table, columns)
            }
        };
        self.execute(&sql).map(|_| ())
    }

    fn create_foreign_key(&mut self, fk: &ForeignKey) -> Result<(), BackendError> {
        let sql = format!(
            "alter table {} add constraint {} foreign key ({}) references {} ({}) \
             on delete cascade on update cascade",
            fk.table, fk.name, fk.column, fk.ref_table, fk.ref_column
        );
        self.execute(&sql).map(|_| ())
    }

    /// Inserts every row of `rows` into `table`, committing every
    /// [`BULK_LOAD_BATCH`] rows. Returns the number of rows loaded.
    fn bulk_load(
        &mut self,
        table: &str,
        rows: &mut dyn Iterator<Item = Vec<Value>>,
    ) -> Result<u64, BackendError> {
        let mut loaded = 0;
        let mut in_batch = 0;
        self.begin(IsolationLevel::ReadCommitted)?;
        for row in rows {
            let values: Vec<String> = row.iter().map(Value::to_sql_literal).collect();
            let sql = format!("insert into {} values ({})", table, values.join(", "));
            if let Err(e) = self.execute(&sql) {
                let _ = self.rollback();
                return Err(e);
            }
            loaded += 1;
            in_batch += 1;
            if in_batch == BULK_LOAD_BATCH {
                self.commit()?;
                self.begin(IsolationLevel::ReadCommitted)?;
                in_batch = 0;
            }
        }
        self.commit()?;
        Ok(loaded)
    }

    fn disconnect(self) -> Result<(), BackendError>
    where
        Self: Sized;
}

/// A database that connections can be opened against.
pub trait Backend: Sync {
    type Conn: Connection;

    fn name(&self) -> &str;
    fn connect(&self) -> Result<Self::Conn, BackendError>;
    /// Drops any existing database and creates an empty one.
    fn create_database(&self) -> Result<(), BackendError>;
}

/// A transaction that rolls back when dropped without being committed.
pub struct TxnGuard<'a, C: Connection> {
    conn: &'a mut C,
    done: bool,
}

impl<'a, C: Connection> TxnGuard<'a, C> {
    pub fn begin(conn: &'a mut C, isolation: IsolationLevel) -> Result<Self, BackendError> {
        conn.begin(isolation)?;
        Ok(TxnGuard { conn, done: false })
    }

    pub fn conn(&mut self) -> &mut C {
        &mut *self.conn
    }

    pub fn commit(mut self) -> Result<(), BackendError> {
        self.done = true;
        self.conn.commit()
    }

    pub fn rollback(mut self) -> Result<(), BackendError> {
        self.done = true;
        self.conn.rollback()
    }
}

impl<C: Connection> Drop for TxnGuard<'_, C> {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.conn.rollback();
        }
    }
}

/// An open cursor, closed when dropped.
pub struct CursorGuard<'a, C: Connection> {
    conn: &'a mut C,
}

impl<'a, C: Connection> CursorGuard<'a, C> {
    pub fn open(conn: &'a mut C, sql: &str) -> Result<Self, BackendError> {
        conn.open_cursor(sql)?;
        Ok(CursorGuard { conn })
    }

    pub fn fetch(&mut self) -> Result<bool, BackendError> {
        self.conn.fetch()
    }

    pub fn column(&self, index: usize) -> Result<Value, BackendError> {
        self.conn.column(index)
    }

    /// Drains the cursor and returns the number of rows it produced.
    pub fn count(mut self) -> Result<u64, BackendError> {
        let mut rows = 0;
        while self.fetch()? {
            rows += 1;
        }
        Ok(rows)
    }
}

impl<C: Connection> Drop for CursorGuard<'_, C> {
    fn drop(&mut self) {
        let _ = self.conn.close_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Integer(42), Some(42))]
    #[case(Value::Real(980000000.75), Some(980000000))]
    #[case(Value::Text(" 17 ".to_string()), Some(17))]
    #[case(Value::Text("12.5".to_string()), Some(12))]
    #[case(Value::Text("abc".to_string()), None)]
    #[case(Value::Null, None)]
    fn value_as_i64(#[case] value: Value, #[case] expected: Option<i64>) {
        assert_eq!(value.as_i64(), expected);
    }

    #[test]
    fn text_literals_are_quoted() {
        assert_eq!(Value::from("O'HARE").to_sql_literal(), "'O''HARE'");
        assert_eq!(Value::from(-5i64).to_sql_literal(), "-5");
        assert_eq!(Value::Null.to_sql_literal(), "null");
    }

    #[test]
    fn txn_guard_rolls_back_on_drop() {
        let backend = NullBackend::new();
        let mut conn = backend.connect().unwrap();
        {
            let _txn = TxnGuard::begin(&mut conn, IsolationLevel::RepeatableRead).unwrap();
        }
        assert_eq!(conn.rollbacks(), 1);
        assert!(!conn.in_transaction());

        let txn = TxnGuard::begin(&mut conn, IsolationLevel::ReadCommitted).unwrap();
        txn.commit().unwrap();
        assert_eq!(conn.rollbacks(), 1);
        assert_eq!(conn.commits(), 1);
    }

    #[test]
    fn cursor_guard_closes_on_drop() {
        let backend = NullBackend::new();
        let mut conn = backend.connect().unwrap();
        {
            let cursor = CursorGuard::open(&mut conn, "select * from tiny").unwrap();
            assert_eq!(cursor.count().unwrap(), 0);
        }
        assert!(!conn.cursor_open());
    }

    #[test]
    fn default_bulk_load_batches_commits() {
        let backend = NullBackend::new();
        let mut conn = backend.connect().unwrap();
        let mut rows = (0..2500i64).map(|i| vec![Value::Integer(i)]);
        let loaded = conn.bulk_load("tiny", &mut rows).unwrap();
        assert_eq!(loaded, 2500);
        // Two full batches plus the tail.
        assert_eq!(conn.commits(), 3);
    }
}
