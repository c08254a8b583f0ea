use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::ffi::ErrorCode;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, ToSql};

use super::{Backend, Connection, ForeignKey, IndexKind, IsolationLevel, Value, BULK_LOAD_BATCH};
use crate::error::BackendError;
use crate::{log_debug, log_info};

/// SQLite through rusqlite. Every connection opens the same database file.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SqliteBackend {
            path: path.as_ref().to_path_buf(),
            busy_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for SqliteBackend {
    type Conn = SqliteConnection;

    fn name(&self) -> &str {
        "sqlite"
    }

    fn connect(&self) -> Result<SqliteConnection, BackendError> {
        let conn = rusqlite::Connection::open(&self.path)
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        Ok(SqliteConnection {
            conn,
            pending: None,
            in_txn: false,
            cursor: None,
        })
    }

    fn create_database(&self) -> Result<(), BackendError> {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            match std::fs::remove_file(&file) {
                Ok(()) => log_debug!("Removed {:?}", file),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(BackendError::Connection(e.to_string())),
            }
        }
        log_info!("Creating SQLite database at {}", self.path.display());
        let conn = self.connect()?;
        conn.disconnect()
    }
}

struct SqliteCursor {
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
    // SQLite has a single isolation level. The transaction is opened when
    // the first statement arrives so that writers can take the write lock
    // up front and wait on the busy handler instead of failing on upgrade.
    pending: Option<IsolationLevel>,
    in_txn: bool,
    cursor: Option<SqliteCursor>,
}

fn classify(sql: &str, e: rusqlite::Error) -> BackendError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(
                err.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::OutOfMemory
            ) =>
        {
            BackendError::Connection(e.to_string())
        }
        _ => BackendError::statement(sql, e),
    }
}

fn is_read_only(sql: &str) -> bool {
    let head = sql.trim_start();
    head.len() >= 6 && head[..6].eq_ignore_ascii_case("select")
}

fn to_value(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl SqliteConnection {
    fn start_pending(&mut self, sql: &str) -> Result<(), BackendError> {
        if self.pending.take().is_some() {
            let begin = if is_read_only(sql) {
                "BEGIN DEFERRED"
            } else {
                "BEGIN IMMEDIATE"
            };
            self.conn
                .execute_batch(begin)
                .map_err(|e| classify(begin, e))?;
            self.in_txn = true;
        }
        Ok(())
    }

    fn end(&mut self, stmt: &str) -> Result<(), BackendError> {
        self.pending = None;
        self.cursor = None;
        if self.in_txn {
            self.in_txn = false;
            self.conn.execute_batch(stmt).map_err(|e| classify(stmt, e))?;
        }
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn begin(&mut self, isolation: IsolationLevel) -> Result<(), BackendError> {
        if self.in_txn {
            // Nested begin: close out whatever the previous owner left behind.
            self.end("ROLLBACK")?;
        }
        self.pending = Some(isolation);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.end("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.end("ROLLBACK")
    }

    fn execute(&mut self, sql: &str) -> Result<u64, BackendError> {
        self.start_pending(sql)?;
        if is_read_only(sql) {
            // Selects go through a cursor so that the row count is reported.
            let mut stmt = self.conn.prepare(sql).map_err(|e| classify(sql, e))?;
            let mut rows = stmt.query([]).map_err(|e| classify(sql, e))?;
            let mut count = 0;
            while rows.next().map_err(|e| classify(sql, e))?.is_some() {
                count += 1;
            }
            return Ok(count);
        }
        self.conn
            .execute(sql, [])
            .map(|n| n as u64)
            .map_err(|e| classify(sql, e))
    }

    fn query_scalar(&mut self, sql: &str) -> Result<Value, BackendError> {
        self.start_pending(sql)?;
        let mut stmt = self.conn.prepare(sql).map_err(|e| classify(sql, e))?;
        let mut rows = stmt.query([]).map_err(|e| classify(sql, e))?;
        match rows.next().map_err(|e| classify(sql, e))? {
            Some(row) => row
                .get_ref(0)
                .map(to_value)
                .map_err(|e| classify(sql, e)),
            None => Ok(Value::Null),
        }
    }

    fn open_cursor(&mut self, sql: &str) -> Result<(), BackendError> {
        self.start_pending(sql)?;
        let mut stmt = self.conn.prepare(sql).map_err(|e| classify(sql, e))?;
        let columns = stmt.column_count();
        let mut rows = stmt.query([]).map_err(|e| classify(sql, e))?;
        let mut buffered = VecDeque::new();
        while let Some(row) = rows.next().map_err(|e| classify(sql, e))? {
            let mut values = Vec::with_capacity(columns);
            for i in 0..columns {
                values.push(to_value(row.get_ref(i).map_err(|e| classify(sql, e))?));
            }
            buffered.push_back(values);
        }
        self.cursor = Some(SqliteCursor {
            rows: buffered,
            current: None,
        });
        Ok(())
    }

    fn fetch(&mut self) -> Result<bool, BackendError> {
        let cursor = self.cursor.as_mut().ok_or(BackendError::NoCursor)?;
        cursor.current = cursor.rows.pop_front();
        Ok(cursor.current.is_some())
    }

    fn column(&self, index: usize) -> Result<Value, BackendError> {
        let cursor = self.cursor.as_ref().ok_or(BackendError::NoCursor)?;
        cursor
            .current
            .as_ref()
            .and_then(|row| row.get(index))
            .cloned()
            .ok_or(BackendError::NoRow)
    }

    fn close_cursor(&mut self) -> Result<(), BackendError> {
        self.cursor = None;
        Ok(())
    }

    fn create_index(
        &mut self,
        _kind: IndexKind,
        name: &str,
        table: &str,
        columns: &str,
    ) -> Result<(), BackendError> {
        // Only B-trees exist in SQLite.
        let sql = format!("create index {} on {} ({})", name, table, columns);
        self.execute(&sql).map(|_| ())
    }

    /// SQLite cannot add a constraint to an existing table, so the foreign
    /// key is enforced with triggers.
    fn create_foreign_key(&mut self, fk: &ForeignKey) -> Result<(), BackendError> {
        let missing = format!(
            "not exists (select 1 from {} where {} = new.{})",
            fk.ref_table, fk.ref_column, fk.column
        );
        let statements = [
            format!(
                "create trigger {name}_ins before insert on {t} when {missing} \
                 begin select raise(abort, 'foreign key {name} violated'); end",
                name = fk.name,
                t = fk.table,
                missing = missing
            ),
            format!(
                "create trigger {name}_upd before update of {c} on {t} when {missing} \
                 begin select raise(abort, 'foreign key {name} violated'); end",
                name = fk.name,
                c = fk.column,
                t = fk.table,
                missing = missing
            ),
            format!(
                "create trigger {name}_del after delete on {rt} \
                 begin delete from {t} where {c} = old.{rc}; end",
                name = fk.name,
                rt = fk.ref_table,
                t = fk.table,
                c = fk.column,
                rc = fk.ref_column
            ),
            format!(
                "create trigger {name}_cas after update of {rc} on {rt} \
                 begin update {t} set {c} = new.{rc} where {c} = old.{rc}; end",
                name = fk.name,
                rt = fk.ref_table,
                t = fk.table,
                c = fk.column,
                rc = fk.ref_column
            ),
        ];
        for sql in statements.iter() {
            self.execute(sql)?;
        }
        Ok(())
    }

    fn bulk_load(
        &mut self,
        table: &str,
        rows: &mut dyn Iterator<Item = Vec<Value>>,
    ) -> Result<u64, BackendError> {
        let mut rows = rows.peekable();
        let width = match rows.peek() {
            Some(row) => row.len(),
            None => return Ok(0),
        };
        let placeholders = vec!["?"; width].join(", ");
        let sql = format!("insert into {} values ({})", table, placeholders);

        let mut loaded = 0;
        while rows.peek().is_some() {
            self.begin(IsolationLevel::ReadCommitted)?;
            self.start_pending(&sql)?;
            let batch = (|| {
                let mut stmt = self.conn.prepare_cached(&sql).map_err(|e| classify(&sql, e))?;
                let mut n = 0;
                for row in rows.by_ref().take(BULK_LOAD_BATCH) {
                    stmt.execute(params_from_iter(row.iter()))
                        .map_err(|e| classify(&sql, e))?;
                    n += 1;
                }
                Ok::<u64, BackendError>(n)
            })();
            match batch {
                Ok(n) => {
                    self.commit()?;
                    loaded += n;
                }
                Err(e) => {
                    let _ = self.rollback();
                    return Err(e);
                }
            }
        }
        Ok(loaded)
    }

    fn disconnect(mut self) -> Result<(), BackendError> {
        if self.in_txn {
            self.end("ROLLBACK")?;
        }
        self.conn
            .close()
            .map_err(|(_, e)| BackendError::Connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CursorGuard, TxnGuard};
    use tempfile::TempDir;

    fn open() -> (TempDir, SqliteBackend, SqliteConnection) {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("test.db"));
        backend.create_database().unwrap();
        let conn = backend.connect().unwrap();
        (dir, backend, conn)
    }

    #[test]
    fn cursor_counts_rows() {
        let (_dir, _backend, mut conn) = open();
        conn.create_table("t", "a integer not null, b char(10)", Some("a"))
            .unwrap();
        let mut rows = (0..10i64).map(|i| vec![Value::Integer(i), Value::from("x")]);
        assert_eq!(conn.bulk_load("t", &mut rows).unwrap(), 10);

        let mut cursor = CursorGuard::open(&mut conn, "select a, b from t where a < 3").unwrap();
        assert!(cursor.fetch().unwrap());
        assert_eq!(cursor.column(1).unwrap(), Value::from("x"));
        assert_eq!(cursor.count().unwrap(), 2);
        assert!(matches!(conn.fetch(), Err(BackendError::NoCursor)));
    }

    #[test]
    fn rollback_discards_changes() {
        let (_dir, _backend, mut conn) = open();
        conn.create_table("t", "a integer not null", Some("a")).unwrap();
        {
            let mut txn = TxnGuard::begin(&mut conn, IsolationLevel::ReadCommitted).unwrap();
            txn.conn().execute("insert into t values (1)").unwrap();
        }
        let count = conn.query_scalar("select count(*) from t").unwrap();
        assert_eq!(count, Value::Integer(0));
    }

    #[test]
    fn duplicate_key_is_a_statement_error() {
        let (_dir, _backend, mut conn) = open();
        conn.create_table("t", "a integer not null", Some("a")).unwrap();
        conn.execute("insert into t values (1)").unwrap();
        let err = conn.execute("insert into t values (1)").unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn foreign_key_triggers_reject_and_cascade() {
        let (_dir, _backend, mut conn) = open();
        conn.create_table("parent", "k integer not null", Some("k")).unwrap();
        conn.create_table("child", "k integer not null, p integer not null", Some("k"))
            .unwrap();
        conn.execute("insert into parent values (1)").unwrap();
        conn.execute("insert into parent values (2)").unwrap();
        conn.create_foreign_key(&ForeignKey {
            name: "fk_child_parent",
            table: "child",
            column: "p",
            ref_table: "parent",
            ref_column: "k",
        })
        .unwrap();

        conn.execute("insert into child values (10, 1)").unwrap();
        assert!(conn.execute("insert into child values (11, 3)").is_err());
        assert!(conn.execute("update child set p = 5 where k = 10").is_err());

        conn.execute("update parent set k = 7 where k = 1").unwrap();
        assert_eq!(
            conn.query_scalar("select p from child where k = 10").unwrap(),
            Value::Integer(7)
        );
        conn.execute("delete from parent where k = 7").unwrap();
        assert_eq!(
            conn.query_scalar("select count(*) from child").unwrap(),
            Value::Integer(0)
        );
    }

    #[test]
    fn execute_reports_select_row_count() {
        let (_dir, _backend, mut conn) = open();
        conn.create_table("t", "a integer not null", None).unwrap();
        let mut rows = (0..5i64).map(|i| vec![Value::Integer(i)]);
        conn.bulk_load("t", &mut rows).unwrap();
        assert_eq!(conn.execute("select * from t").unwrap(), 5);
        assert_eq!(conn.execute("delete from t where a > 2").unwrap(), 2);
        conn.disconnect().unwrap();
    }
}
