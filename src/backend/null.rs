use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Backend, Connection, IsolationLevel, Value};
use crate::error::BackendError;

#[derive(Debug, Default)]
struct NullCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    statements: AtomicU64,
}

/// A backend that accepts every statement and returns no rows.
///
/// Used for dry runs of the driver and to calibrate the scheduler without a
/// database in the way.
#[derive(Debug, Default)]
pub struct NullBackend {
    counters: Arc<NullCounters>,
    refuse_connections: bool,
    statement_delay: Duration,
    updates_rows: Option<u64>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `connect` call fails with a connection error.
    pub fn refusing() -> Self {
        NullBackend {
            refuse_connections: true,
            ..Self::default()
        }
    }

    /// Each executed statement sleeps for `delay` before returning.
    pub fn with_statement_delay(delay: Duration) -> Self {
        NullBackend {
            statement_delay: delay,
            ..Self::default()
        }
    }

    /// Row counts of `updates` report `rows` instead of `NULL`, so that a
    /// dry run gets past the driver's row-count checks.
    pub fn with_updates_rows(rows: u64) -> Self {
        NullBackend {
            updates_rows: Some(rows),
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::Acquire)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::Acquire)
    }

    pub fn statements(&self) -> u64 {
        self.counters.statements.load(Ordering::Acquire)
    }
}

impl Backend for NullBackend {
    type Conn = NullConnection;

    fn name(&self) -> &str {
        "null"
    }

    fn connect(&self) -> Result<NullConnection, BackendError> {
        if self.refuse_connections {
            return Err(BackendError::Connection(
                "null backend refuses connections".to_string(),
            ));
        }
        self.counters.opened.fetch_add(1, Ordering::AcqRel);
        Ok(NullConnection {
            counters: self.counters.clone(),
            statement_delay: self.statement_delay,
            updates_rows: self.updates_rows,
            in_txn: false,
            cursor_open: false,
            commits: 0,
            rollbacks: 0,
        })
    }

    fn create_database(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

fn is_updates_count(sql: &str) -> bool {
    sql.trim().eq_ignore_ascii_case("select count(*) from updates")
}

pub struct NullConnection {
    counters: Arc<NullCounters>,
    statement_delay: Duration,
    updates_rows: Option<u64>,
    in_txn: bool,
    cursor_open: bool,
    commits: usize,
    rollbacks: usize,
}

impl NullConnection {
    pub fn in_transaction(&self) -> bool {
        self.in_txn
    }

    pub fn cursor_open(&self) -> bool {
        self.cursor_open
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    fn statement(&self) {
        self.counters.statements.fetch_add(1, Ordering::AcqRel);
        if !self.statement_delay.is_zero() {
            std::thread::sleep(self.statement_delay);
        }
    }
}

impl Connection for NullConnection {
    fn begin(&mut self, _isolation: IsolationLevel) -> Result<(), BackendError> {
        self.in_txn = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.in_txn = false;
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.in_txn = false;
        self.rollbacks += 1;
        Ok(())
    }

    fn execute(&mut self, _sql: &str) -> Result<u64, BackendError> {
        self.statement();
        Ok(0)
    }

    fn query_scalar(&mut self, sql: &str) -> Result<Value, BackendError> {
        self.statement();
        match self.updates_rows {
            Some(rows) if is_updates_count(sql) => Ok(Value::Integer(rows as i64)),
            _ => Ok(Value::Null),
        }
    }

    fn open_cursor(&mut self, _sql: &str) -> Result<(), BackendError> {
        self.statement();
        self.cursor_open = true;
        Ok(())
    }

    fn fetch(&mut self) -> Result<bool, BackendError> {
        if self.cursor_open {
            Ok(false)
        } else {
            Err(BackendError::NoCursor)
        }
    }

    fn column(&self, _index: usize) -> Result<Value, BackendError> {
        Err(BackendError::NoRow)
    }

    fn close_cursor(&mut self) -> Result<(), BackendError> {
        self.cursor_open = false;
        Ok(())
    }

    fn disconnect(self) -> Result<(), BackendError> {
        self.counters.closed.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
