use super::{settle, Outcome, Session};
use crate::backend::Connection;
use crate::error::BenchResult;
use crate::random::gen_random_key_excluding;

// Key 1 never exists: record 1 is stored under key 0.
const MISSING_KEY: u64 = 1;

pub fn o_mode_tiny<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    Ok(Outcome::rows(settle(s.count_rows("select * from tiny"))?))
}

pub fn o_mode_100k<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    Ok(Outcome::rows(settle(
        s.count_rows("select * from hundred where col_key <= 1000"),
    )?))
}

/// Information retrieval: point lookup of a random `updates` row.
pub fn mu_ir_select<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let key = gen_random_key_excluding(s.ctx().tuple_count, MISSING_KEY);
    let sql = format!(
        "select col_key, col_code, col_date, col_signed, col_name from updates where col_key = {}",
        key
    );
    Ok(Outcome::rows(settle(s.count_rows(&sql))?))
}

/// OLTP: single row update of a random `updates` row.
pub fn mu_oltp_update<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let key = gen_random_key_excluding(s.ctx().tuple_count, MISSING_KEY);
    let sql = format!(
        "update updates set col_signed = col_signed + 1 where col_key = {}",
        key
    );
    Ok(Outcome::rows(settle(s.execute(&sql))?))
}
