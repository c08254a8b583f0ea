pub mod backend;
pub mod config;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod random;
pub mod runner;
pub mod scheduler;
pub mod suite;
pub mod verifier;

mod logger;

pub use logger::init_logger;

pub mod prelude {
    pub use crate::backend::{
        Backend, Connection, IsolationLevel, NullBackend, SqliteBackend, Value,
    };
    pub use crate::config::{As3apConfig, BackendKind, RunStep};
    pub use crate::dataset::{Dataset, DatasetGenerator, Relation};
    pub use crate::driver::{As3ap, PhaseReport, RunSummary};
    pub use crate::error::{BackendError, BenchError, BenchResult};
    pub use crate::runner::{CollectingSink, EventSink, LogSink, ResultEvent, SingleUserRunner};
    pub use crate::scheduler::{ConcurrencyScheduler, PhaseDuration, PhaseStat, WorkerStat};
    pub use crate::suite::{SqlDialect, SuiteContext, SuiteOptions, TestRegistry};
}
