//! The AS3AP test catalog.
//!
//! Every test is a plain function taking a [`Session`] and returning an
//! [`Outcome`]. The [`TestRegistry`] maps test names to those functions and
//! to the isolation level each one runs under.

mod dialect;
mod multi_user;
mod registry;
mod schema;
mod sequences;
mod session;
mod single_user;

pub use dialect::{JoinQueries, Sql87, Sql92, SqlDialect};
pub use registry::{TestEntry, TestFn, TestRegistry, TestRegistryBuilder};
pub use schema::{base_table_structure, setup_database};
pub use sequences::{
    create_index_sequence, CROSS_SECTION, DROP_SIDE_TABLES, SINGLE_USER_SEQUENCE, VERIFY_WINDOWS,
};
pub use session::Session;

use crate::backend::Value;
use crate::error::{BackendError, BenchResult};
use crate::log_warn;

/// Column type names used when building table definitions.
#[derive(Debug, Clone)]
pub struct SqlTypes {
    pub integer: String,
    pub float: String,
    pub double: String,
    pub decimal: String,
    pub char: String,
    pub varchar: String,
}

impl Default for SqlTypes {
    fn default() -> Self {
        SqlTypes {
            integer: "integer".to_string(),
            float: "float".to_string(),
            double: "double precision".to_string(),
            decimal: "decimal".to_string(),
            char: "char".to_string(),
            varchar: "varchar".to_string(),
        }
    }
}

/// Backend capabilities and switches that change what the tests do.
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub use_indexes: bool,
    pub supports_clustered: bool,
    pub supports_hash: bool,
    pub types: SqlTypes,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        SuiteOptions {
            use_indexes: true,
            supports_clustered: false,
            supports_hash: false,
            types: SqlTypes::default(),
        }
    }
}

/// Read-only state shared by every test of a battery.
pub struct SuiteContext {
    pub options: SuiteOptions,
    /// Rows in `updates` when the battery started.
    pub tuple_count: u64,
    pub joins: Box<dyn JoinQueries>,
}

impl SuiteContext {
    pub fn new(options: SuiteOptions, tuple_count: u64, dialect: SqlDialect) -> Self {
        SuiteContext {
            options,
            tuple_count,
            joins: dialect.joins(),
        }
    }
}

/// What a single test run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    pub result: i64,
    pub failed: bool,
}

impl Outcome {
    pub fn ok(result: i64) -> Self {
        Outcome {
            result,
            failed: false,
        }
    }

    pub fn failed(result: i64) -> Self {
        Outcome {
            result,
            failed: true,
        }
    }

    /// Row count of a statement, failed if the statement failed.
    pub fn rows(rows: Option<u64>) -> Self {
        match rows {
            Some(n) => Outcome::ok(n as i64),
            None => Outcome::failed(0),
        }
    }

    /// Integer view of a scalar result. `NULL` reads as 0.
    pub fn scalar(value: Option<Value>) -> Self {
        match value {
            Some(v) => Outcome::ok(v.as_i64().unwrap_or(0)),
            None => Outcome::failed(0),
        }
    }

    /// Like [`Outcome::rows`], also failed unless exactly `expected` rows came back.
    pub fn expecting(rows: Option<u64>, expected: u64) -> Self {
        match rows {
            Some(n) if n == expected => Outcome::ok(n as i64),
            Some(n) => Outcome::failed(n as i64),
            None => Outcome::failed(0),
        }
    }
}

/// Splits backend errors into per-test failures and fatal ones.
///
/// A rejected statement is logged and becomes `Ok(None)`. A broken connection
/// is returned as an error so that the runner stops.
pub fn settle<T>(res: Result<T, BackendError>) -> BenchResult<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            log_warn!("{}", e);
            Ok(None)
        }
    }
}

/// Like [`settle`] for statements that are supposed to be rejected.
/// Returns true when the backend refused the statement.
pub fn settle_rejected<T>(res: Result<T, BackendError>) -> BenchResult<bool> {
    match res {
        Ok(_) => Ok(false),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(_) => Ok(true),
    }
}
