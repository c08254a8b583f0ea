use super::SuiteContext;
use crate::backend::{Connection, CursorGuard, ForeignKey, IndexKind, IsolationLevel, TxnGuard, Value};
use crate::error::BackendError;

/// A connection bound to one test run.
///
/// Each helper runs its statement in its own transaction at the session's
/// isolation level, committing on success and rolling back otherwise.
pub struct Session<'a, C: Connection> {
    conn: &'a mut C,
    ctx: &'a SuiteContext,
    isolation: IsolationLevel,
}

impl<'a, C: Connection> Session<'a, C> {
    pub fn new(conn: &'a mut C, ctx: &'a SuiteContext, isolation: IsolationLevel) -> Self {
        Session {
            conn,
            ctx,
            isolation,
        }
    }

    pub fn ctx(&self) -> &'a SuiteContext {
        self.ctx
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    fn in_txn<T>(
        &mut self,
        f: impl FnOnce(&mut C) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut txn = TxnGuard::begin(&mut *self.conn, self.isolation)?;
        let out = f(txn.conn())?;
        txn.commit()?;
        Ok(out)
    }

    /// Runs a query through a cursor and counts the rows it returns.
    pub fn count_rows(&mut self, sql: &str) -> Result<u64, BackendError> {
        self.in_txn(|conn| CursorGuard::open(conn, sql)?.count())
    }

    pub fn execute(&mut self, sql: &str) -> Result<u64, BackendError> {
        self.in_txn(|conn| conn.execute(sql))
    }

    /// Runs a statement and rolls it back. Returns the rows it touched.
    pub fn execute_aborted(&mut self, sql: &str) -> Result<u64, BackendError> {
        let mut txn = TxnGuard::begin(&mut *self.conn, self.isolation)?;
        let rows = txn.conn().execute(sql)?;
        txn.rollback()?;
        Ok(rows)
    }

    pub fn scalar(&mut self, sql: &str) -> Result<Value, BackendError> {
        self.in_txn(|conn| conn.query_scalar(sql))
    }

    pub fn create_table(
        &mut self,
        name: &str,
        columns: &str,
        primary_key: Option<&str>,
    ) -> Result<(), BackendError> {
        self.in_txn(|conn| conn.create_table(name, columns, primary_key))
    }

    pub fn create_index(
        &mut self,
        kind: IndexKind,
        name: &str,
        table: &str,
        columns: &str,
    ) -> Result<(), BackendError> {
        self.in_txn(|conn| conn.create_index(kind, name, table, columns))
    }

    pub fn create_foreign_key(&mut self, fk: &ForeignKey) -> Result<(), BackendError> {
        self.in_txn(|conn| conn.create_foreign_key(fk))
    }

    /// Bulk loads manage their own batches and transactions.
    pub fn bulk_load(
        &mut self,
        table: &str,
        rows: &mut dyn Iterator<Item = Vec<Value>>,
    ) -> Result<u64, BackendError> {
        self.conn.bulk_load(table, rows)
    }
}
