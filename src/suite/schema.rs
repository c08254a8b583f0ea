use super::{settle, settle_rejected, Outcome, Session, SqlTypes};
use crate::backend::{Connection, ForeignKey, IndexKind};
use crate::error::BenchResult;
use crate::log_debug;

/// Column list shared by the four wide tables and every side table.
pub fn base_table_structure(types: &SqlTypes) -> String {
    format!(
        "col_key {int} not null, \
         col_int {int} not null, \
         col_signed {int} not null, \
         col_float {float} not null, \
         col_double {double} not null, \
         col_decim {decimal}(18,2) not null, \
         col_date {char}(20) not null, \
         col_code {char}(10) not null, \
         col_name {char}(20) not null, \
         col_address {varchar}(80) not null",
        int = types.integer,
        float = types.float,
        double = types.double,
        decimal = types.decimal,
        char = types.char,
        varchar = types.varchar,
    )
}

pub fn create_tables<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let types = &s.ctx().options.types;
    let base = base_table_structure(types);
    let tiny = format!("col_key {} not null", types.integer);
    let tables = [
        ("uniques", base.as_str(), "col_key"),
        ("hundred", base.as_str(), "col_key"),
        ("updates", base.as_str(), "col_key"),
        ("tenpct", base.as_str(), "col_key, col_code"),
        ("tiny", tiny.as_str(), "col_key"),
    ];
    let mut failed = false;
    for (name, columns, pk) in tables {
        failed |= settle(s.create_table(name, columns, Some(pk)))?.is_none();
    }
    Ok(Outcome { result: 0, failed })
}

fn index<C: Connection>(
    s: &mut Session<'_, C>,
    kind: IndexKind,
    name: &str,
    table: &str,
    columns: &str,
) -> BenchResult<Outcome> {
    let options = &s.ctx().options;
    let supported = match kind {
        IndexKind::Btree => true,
        IndexKind::Clustered => options.supports_clustered,
        IndexKind::Hash => options.supports_hash,
    };
    if !options.use_indexes || !supported {
        log_debug!("Skipping {:?} index {}", kind, name);
        return Ok(Outcome::ok(0));
    }
    let done = settle(s.create_index(kind, name, table, columns))?;
    Ok(Outcome {
        result: 0,
        failed: done.is_none(),
    })
}

pub fn create_idx_uniques_key_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Clustered, "uniques_key_bt", "uniques", "col_key")
}

pub fn create_idx_updates_key_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Clustered, "updates_key_bt", "updates", "col_key")
}

pub fn create_idx_hundred_key_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Clustered, "hundred_key_bt", "hundred", "col_key")
}

pub fn create_idx_tenpct_key_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Clustered, "tenpct_key_bt", "tenpct", "col_key")
}

pub fn create_idx_tenpct_key_code_bt<C: Connection>(
    s: &mut Session<'_, C>,
) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "tenpct_key_code_bt", "tenpct", "col_key, col_code")
}

pub fn create_idx_tiny_key_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "tiny_key_bt", "tiny", "col_key")
}

pub fn create_idx_tenpct_int_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "tenpct_int_bt", "tenpct", "col_int")
}

pub fn create_idx_tenpct_signed_bt<C: Connection>(
    s: &mut Session<'_, C>,
) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "tenpct_signed_bt", "tenpct", "col_signed")
}

pub fn create_idx_uniques_code_h<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Hash, "uniques_code_h", "uniques", "col_code")
}

pub fn create_idx_tenpct_double_bt<C: Connection>(
    s: &mut Session<'_, C>,
) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "tenpct_double_bt", "tenpct", "col_double")
}

pub fn create_idx_updates_decim_bt<C: Connection>(
    s: &mut Session<'_, C>,
) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "updates_decim_bt", "updates", "col_decim")
}

pub fn create_idx_tenpct_float_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "tenpct_float_bt", "tenpct", "col_float")
}

pub fn create_idx_updates_int_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "updates_int_bt", "updates", "col_int")
}

pub fn create_idx_tenpct_decim_bt<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "tenpct_decim_bt", "tenpct", "col_decim")
}

// Named as a hash index, built as a B-tree on every backend.
pub fn create_idx_hundred_code_h<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "hundred_code_h", "hundred", "col_code")
}

pub fn create_idx_tenpct_name_h<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Hash, "tenpct_name_h", "tenpct", "col_name")
}

pub fn create_idx_updates_code_h<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Hash, "updates_code_h", "updates", "col_code")
}

pub fn create_idx_tenpct_code_h<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    index(s, IndexKind::Hash, "tenpct_code_h", "tenpct", "col_code")
}

pub fn create_idx_updates_double_bt<C: Connection>(
    s: &mut Session<'_, C>,
) -> BenchResult<Outcome> {
    index(s, IndexKind::Btree, "updates_double_bt", "updates", "col_double")
}

pub fn create_idx_hundred_foreign<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    if !s.ctx().options.use_indexes {
        return Ok(Outcome::ok(0));
    }
    let done = settle(s.create_foreign_key(&ForeignKey {
        name: "fk_hundred_updates",
        table: "hundred",
        column: "col_signed",
        ref_table: "updates",
        ref_column: "col_key",
    }))?;
    Ok(Outcome {
        result: 0,
        failed: done.is_none(),
    })
}

pub fn drop_updates_keys<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let options = &s.ctx().options;
    if !options.use_indexes {
        return Ok(Outcome::ok(0));
    }
    let mut names = vec!["updates_int_bt", "updates_double_bt", "updates_decim_bt"];
    if options.supports_hash {
        names.push("updates_code_h");
    }
    let mut failed = false;
    for name in names {
        failed |= settle(s.execute(&format!("drop index {}", name)))?.is_none();
    }
    Ok(Outcome { result: 0, failed })
}

/// Snapshots the `hundred` row with `col_int = 0`, checks that the foreign
/// key rejects a dangling `col_signed` and removes the row.
/// [`integrity_restore`] puts it back.
pub fn integrity_test<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let base = base_table_structure(&s.ctx().options.types);
    let mut failed = settle(s.create_table("integrity_temp", &base, None))?.is_none();
    failed |= settle(s.execute("insert into integrity_temp select * from hundred where col_int = 0"))?
        .is_none();

    let rejected = settle_rejected(
        s.execute("update hundred set col_signed = '-500000000' where col_int = 0"),
    )?;
    failed |= !rejected;

    failed |= settle(s.execute("delete from hundred where col_int = 0"))?.is_none();
    Ok(Outcome { result: 0, failed })
}

pub fn integrity_restore<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<Outcome> {
    let restored = settle(s.execute("insert into hundred select * from integrity_temp"))?;
    let dropped = settle(s.execute("drop table integrity_temp"))?;
    Ok(Outcome {
        result: restored.unwrap_or(0) as i64,
        failed: restored.is_none() || dropped.is_none(),
    })
}

/// Brings a loaded database back to its post-creation state before a
/// (repeated) single-user battery. Failures are expected and ignored.
pub fn setup_database<C: Connection>(s: &mut Session<'_, C>) -> BenchResult<()> {
    for sql in ["drop view reportview", "drop table saveupdates"] {
        if settle_rejected(s.execute(sql))? {
            log_debug!("setup: {} had nothing to drop", sql);
        }
    }
    if s.ctx().options.use_indexes {
        for (name, column) in [
            ("updates_double_bt", "col_double"),
            ("updates_decim_bt", "col_decim"),
        ] {
            if settle_rejected(s.create_index(IndexKind::Btree, name, "updates", column))? {
                log_debug!("setup: index {} already exists", name);
            }
        }
    }
    Ok(())
}
