use super::schema::base_table_structure;
use super::{settle, settle_rejected, Outcome, Session};
use crate::backend::Connection;
use crate::error::BenchResult;

const UPDATES_COLUMNS: &str = "col_key, col_int, col_signed, col_code, col_double, col_name";

fn rows<C: Connection>(s: &mut Session<'_, C>, sql: &str) -> BenchResult<Outcome> {
    Ok(Outcome::rows(settle(s.count_rows(sql))?))
}

fn rows_expecting<C: Connection>(
    s: &mut Session<'_, C>,
    sql: &str,
    expected: u64,
) -> BenchResult<Outcome> {
    Ok(Outcome::expecting(settle(s.count_rows(sql))?, expected))
}

fn affected<C: Connection>(s: &mut Session<'_, C>, sql: &str) -> BenchResult<Outcome> {
    Ok(Outcome::rows(settle(s.execute(sql))?))
}

fn scalar<C: Connection>(s: &mut Session<'_, C>, sql: &str) -> BenchResult<Outcome> {
    Ok(Outcome::scalar(settle(s.scalar(sql))?))
}

// ---------- Selections ----------

pub fn sel_1_cl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = format!("select {} from updates where col_key = 1000", UPDATES_COLUMNS);
    rows_expecting(s, &sql, 1)
}

pub fn sel_1_ncl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = format!(
        "select {} from updates where col_code = 'BENCHMARKS'",
        UPDATES_COLUMNS
    );
    rows_expecting(s, &sql, 1)
}

pub fn sel_100_cl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = format!("select {} from updates where col_key <= 100", UPDATES_COLUMNS);
    rows(s, &sql)
}

pub fn sel_100_ncl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = format!("select {} from updates where col_int <= 100", UPDATES_COLUMNS);
    rows_expecting(s, &sql, 100)
}

pub fn sel_10pct_ncl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = format!(
        "select {} from tenpct where col_name = 'THE+ASAP+BENCHMARKS+'",
        UPDATES_COLUMNS
    );
    rows(s, &sql)
}

fn sel_variable_select<C: Connection>(s: &mut Session<'_, C>, bound: i64) -> BenchResult<Outcome> {
    let sql = format!(
        "select {} from tenpct where col_signed < {}",
        UPDATES_COLUMNS, bound
    );
    rows(s, &sql)
}

pub fn sel_variable_select_low<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    sel_variable_select(s, -500_000_000)
}

pub fn sel_variable_select_high<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    sel_variable_select(s, -250_000_000)
}

pub fn table_scan<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    rows(s, "select * from uniques where col_int = 1")
}

// ---------- Joins ----------

pub fn join_2<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = s.ctx().joins.join_2();
    rows(s, sql)
}

pub fn join_2_cl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = s.ctx().joins.join_2_cl();
    rows(s, sql)
}

pub fn join_2_ncl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = s.ctx().joins.join_2_ncl();
    rows(s, sql)
}

pub fn join_3_cl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = s.ctx().joins.join_3_cl();
    rows(s, sql)
}

pub fn join_3_ncl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = s.ctx().joins.join_3_ncl();
    rows(s, sql)
}

pub fn join_4_cl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = s.ctx().joins.join_4_cl();
    rows(s, sql)
}

pub fn join_4_ncl<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let sql = s.ctx().joins.join_4_ncl();
    rows(s, sql)
}

// ---------- Projections ----------

pub fn proj_100<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    rows(s, "select distinct col_address, col_signed from hundred")
}

pub fn proj_10pct<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    rows(s, "select distinct col_signed from tenpct")
}

// ---------- Aggregates ----------

pub fn agg_func<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    rows(s, "select min(col_key) from hundred group by col_name")
}

pub fn agg_scal<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    scalar(s, "select min(col_key) from uniques")
}

pub fn agg_simple_report<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    scalar(
        s,
        "select avg(updates.col_decim) from updates \
         where updates.col_key in \
         (select updates.col_key from updates, hundred \
         where hundred.col_key = updates.col_key \
         and updates.col_decim > 980000000)",
    )
}

pub fn agg_info_retrieval<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    scalar(
        s,
        "select count(col_key) from tenpct \
         where col_name = 'THE+ASAP+BENCHMARKS+' \
         and col_int <= 100000000 \
         and col_signed between 1 and 99999999 \
         and not (col_float between -450000000 and 450000000) \
         and col_double > 600000000 \
         and col_decim < -600000000",
    )
}

pub fn agg_create_view<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let done = settle(s.execute(
        "create view reportview(col_key, col_signed, col_date, col_decim, col_name, col_code, col_int) as \
         select updates.col_key, updates.col_signed, updates.col_date, updates.col_decim, \
         hundred.col_name, hundred.col_code, hundred.col_int \
         from updates, hundred \
         where updates.col_key = hundred.col_key",
    ))?;
    Ok(Outcome {
        result: 0,
        failed: done.is_none(),
    })
}

pub fn agg_subtotal_report<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    rows(
        s,
        "select avg(col_signed), min(col_signed), max(col_signed), \
         max(col_date), min(col_date), \
         count(distinct col_name), count(col_name), col_code, col_int \
         from reportview \
         where col_decim > 980000000 \
         group by col_code, col_int",
    )
}

pub fn agg_total_report<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    rows(
        s,
        "select avg(col_signed), min(col_signed), max(col_signed), \
         max(col_date), min(col_date), \
         count(distinct col_name), count(col_name), count(col_code), count(col_int) \
         from reportview \
         where col_decim > 980000000",
    )
}

// ---------- Bulk operations ----------

pub fn bulk_save<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let base = base_table_structure(&s.ctx().options.types);
    if settle(s.create_table("saveupdates", &base, None))?.is_none() {
        return Ok(Outcome::failed(0));
    }
    affected(
        s,
        "insert into saveupdates select * from updates where col_key between 5000 and 5999",
    )
}

pub fn bulk_modify<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(
        s,
        "update updates set col_key = col_key - 100000 where col_key between 5000 and 5999",
    )
}

pub fn bulk_append<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(s, "insert into updates select * from saveupdates")
}

pub fn bulk_delete<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(s, "delete from updates where col_key < 0")
}

// ---------- Single row updates ----------

/// Inserting an existing key must be refused while indexes are in place.
pub fn upd_append_duplicate<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    if !s.ctx().options.use_indexes {
        return Ok(Outcome::ok(0));
    }
    let rejected = settle_rejected(s.execute(
        "insert into updates values (6000, 0, 60000, 39997.90, 50005.00, 50005.00, \
         '11/10/1985', 'CONTROLLER', 'ALICE IN WONDERLAND', \
         'UNIVERSITY OF ILLINOIS AT CHICAGO')",
    ))?;
    Ok(if rejected {
        Outcome::ok(0)
    } else {
        Outcome::failed(1)
    })
}

pub fn upd_remove_duplicate<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(s, "delete from updates where col_key = 6000 and col_int = 0")
}

pub fn upd_app_t_mid<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(
        s,
        "insert into updates values (5005, 5005, 50005, 50005.00, 50005.00, 50005.00, \
         '1/1/1988', 'CONTROLLER', 'ALICE IN WONDERLAND', \
         'UNIVERSITY OF ILLINOIS AT CHICAGO')",
    )
}

pub fn upd_mod_t_mid<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(s, "update updates set col_key = '-5000' where col_key = 5005")
}

pub fn upd_del_t_mid<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(
        s,
        "delete from updates where (col_key = '5005') or (col_key = '-5000')",
    )
}

pub fn upd_app_t_end<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(
        s,
        "insert into updates values (1000000001, 50005, 50005, 50005.00, 50005.00, 50005.00, \
         '1/1/1988', 'CONTROLLER', 'ALICE IN WONDERLAND', \
         'UNIVERSITY OF ILLINOIS AT CHICAGO')",
    )
}

pub fn upd_mod_t_end<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(s, "update updates set col_key = -1000 where col_key = 1000000001")
}

pub fn upd_del_t_end<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(s, "delete from updates where col_key = -1000")
}

pub fn upd_mod_t_cod<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(
        s,
        "update updates set col_code = 'SQL+GROUPS' where col_key = 5005",
    )
}

pub fn upd_mod_t_int<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    affected(s, "update updates set col_int = 50015 where col_key = 5005")
}
