//! Correctness windows for the multi-user phases.
//!
//! A window is the 100 `updates` rows with `1001 <= col <= 1100`, selected by
//! primary key (sequential) or by `col_int` (random). The window is copied to
//! a side table, shifted by a reversible delta on `col_double`, and then
//! compared with the copy: exactly the 100 shifted rows must differ.

use crate::backend::Connection;
use crate::error::BenchResult;
use crate::suite::{base_table_structure, settle, Outcome, Session};

pub const WINDOW_LOW: i64 = 1001;
pub const WINDOW_HIGH: i64 = 1100;
pub const WINDOW_ROWS: u64 = (WINDOW_HIGH - WINDOW_LOW + 1) as u64;
pub const DOUBLE_DELTA: i64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Sequential,
    Random,
}

impl Window {
    pub fn snapshot_table(&self) -> &'static str {
        match self {
            Window::Sequential => "sel100seq",
            Window::Random => "sel100rand",
        }
    }

    /// Column the window is selected and joined on.
    pub fn column(&self) -> &'static str {
        match self {
            Window::Sequential => "col_key",
            Window::Random => "col_int",
        }
    }

    fn predicate(&self) -> String {
        format!(
            "updates.{} between {} and {}",
            self.column(),
            WINDOW_LOW,
            WINDOW_HIGH
        )
    }
}

/// Copies the window into its side table.
pub fn snapshot<C: Connection>(s: &mut Session<'_, C>, w: Window) -> BenchResult<Outcome> {
    let base = base_table_structure(&s.ctx().options.types);
    if settle(s.create_table(w.snapshot_table(), &base, None))?.is_none() {
        return Ok(Outcome::failed(0));
    }
    let sql = format!(
        "insert into {} select * from updates where {}",
        w.snapshot_table(),
        w.predicate()
    );
    Ok(Outcome::expecting(settle(s.execute(&sql))?, WINDOW_ROWS))
}

fn shift_sql(w: Window, delta: i64) -> String {
    format!(
        "update updates set col_double = col_double + ({}) where {}",
        delta,
        w.predicate()
    )
}

/// Adds `delta` to `col_double` over the window and commits.
pub fn shift_window<C: Connection>(
    s: &mut Session<'_, C>,
    w: Window,
    delta: i64,
) -> BenchResult<Outcome> {
    Ok(Outcome::rows(settle(s.execute(&shift_sql(w, delta)))?))
}

/// Rows of the window whose `col_double` differs from the snapshot.
/// `None` when the statement failed.
pub fn count_modified<C: Connection>(
    s: &mut Session<'_, C>,
    w: Window,
) -> BenchResult<Option<u64>> {
    let table = w.snapshot_table();
    let sql = format!(
        "select count(*) from updates, {t} \
         where updates.{c} = {t}.{c} \
         and not updates.col_double = {t}.col_double",
        t = table,
        c = w.column()
    );
    let value = settle(s.scalar(&sql))?;
    Ok(value.map(|v| v.as_i64().unwrap_or(0).max(0) as u64))
}

/// Passes only if exactly the whole window differs from the snapshot.
pub fn check<C: Connection>(s: &mut Session<'_, C>, w: Window) -> BenchResult<Outcome> {
    Ok(Outcome::expecting(count_modified(s, w)?, WINDOW_ROWS))
}

pub fn drop_snapshot<C: Connection>(s: &mut Session<'_, C>, w: Window) -> BenchResult<Outcome> {
    let sql = format!("drop table {}", w.snapshot_table());
    let done = settle(s.execute(&sql))?;
    Ok(Outcome {
        result: 0,
        failed: done.is_none(),
    })
}

pub fn mu_sel_100_seq<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    snapshot(s, Window::Sequential)
}

pub fn mu_sel_100_rand<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    snapshot(s, Window::Random)
}

/// The sequential modification is always rolled back, so after the whole
/// cross-section the window carries a net shift of `-DOUBLE_DELTA`.
pub fn mu_mod_100_seq<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = shift_sql(Window::Sequential, DOUBLE_DELTA);
    Ok(Outcome::rows(settle(s.execute_aborted(&sql))?))
}

pub fn mu_mod_100_rand<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    shift_window(s, Window::Random, DOUBLE_DELTA)
}

pub fn mu_unmod_100_seq<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    shift_window(s, Window::Sequential, -DOUBLE_DELTA)
}

pub fn mu_unmod_100_rand<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    shift_window(s, Window::Random, -DOUBLE_DELTA)
}

pub fn mu_checkmod_100_seq<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    check(s, Window::Sequential)
}

pub fn mu_checkmod_100_rand<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    check(s, Window::Random)
}

pub fn mu_drop_sel100_seq<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    drop_snapshot(s, Window::Sequential)
}

pub fn mu_drop_sel100_rand<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    drop_snapshot(s, Window::Random)
}
