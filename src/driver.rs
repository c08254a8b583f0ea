//! Top-level AS3AP run: create the database, then walk the run sequence.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::backend::{Backend, Connection, IsolationLevel, TxnGuard, Value};
use crate::config::{As3apConfig, RunStep};
use crate::dataset::{read_stream, write_streams, Dataset, DatasetGenerator, Relation};
use crate::error::{BackendError, BenchResult};
use crate::runner::{emit_progress, emit_result, EventSink, ResultEvent, SingleUserRunner};
use crate::scheduler::{ConcurrencyScheduler, PhaseStat};
use crate::suite::{
    create_index_sequence, settle, setup_database, Session, SqlDialect, SuiteContext,
    TestRegistry, CROSS_SECTION, DROP_SIDE_TABLES, SINGLE_USER_SEQUENCE, VERIFY_WINDOWS,
};
use crate::{log_error, log_info, log_warn};

const IR_OP: &str = "mu_ir_select";
const OLTP_OP: &str = "mu_oltp_update";

/// Throughput of one measured multi-user phase.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub label: &'static str,
    pub workers: usize,
    pub iterations: u64,
    pub failures: u64,
    pub elapsed: Duration,
    pub throughput: f64,
    /// Failed tests of the cross-section worker. Always 0 for uniform phases.
    pub cross_section_failures: usize,
}

impl PhaseReport {
    fn new(label: &'static str, phase: &PhaseStat) -> Self {
        let report = PhaseReport {
            label,
            workers: phase.workers,
            iterations: phase.iterations(),
            failures: phase.stat.failures,
            elapsed: phase.elapsed,
            throughput: phase.throughput(),
            cross_section_failures: phase.cross_section.iter().filter(|e| e.failed).count(),
        };
        log_info!(
            "{}\t{:.4}\t returned in {:?}",
            report.label,
            report.throughput,
            report.elapsed
        );
        report
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub tuple_count: u64,
    pub database_size_mb: u64,
    pub workers: usize,
    pub single_user: Vec<ResultEvent>,
    pub phases: Vec<PhaseReport>,
    pub multi_user_skipped: bool,
}

impl RunSummary {
    pub fn failed_tests(&self) -> Vec<&str> {
        self.single_user
            .iter()
            .filter(|e| e.failed)
            .map(|e| e.name.as_str())
            .collect()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut out = String::new();
        out.push_str(&format!("tuples: {}\n", self.tuple_count));
        out.push_str(&format!("database size (MB): {}\n", self.database_size_mb));
        out.push_str(&format!("users: {}\n", self.workers));
        out.push_str(&format!(
            "single user tests: {} ({} failed)\n",
            self.single_user.len(),
            self.failed_tests().len()
        ));
        if self.multi_user_skipped {
            out.push_str("multi user: skipped\n");
        }
        for p in &self.phases {
            out.push_str(&format!("{}\n", p.label));
            out.push_str(&format!("  throughput: {:.4}\n", p.throughput));
            out.push_str(&format!("  iterations: {}\n", p.iterations));
            out.push_str(&format!("  failures: {}\n", p.failures));
            out.push_str(&format!("  elapsed: {:?}\n", p.elapsed));
        }
        write!(f, "{}", out)
    }
}

pub struct As3ap<'a, B: Backend> {
    backend: &'a B,
    config: As3apConfig,
    registry: TestRegistry<B::Conn>,
    sink: &'a dyn EventSink,
}

impl<'a, B: Backend> As3ap<'a, B> {
    pub fn new(backend: &'a B, config: As3apConfig, sink: &'a dyn EventSink) -> Self {
        As3ap {
            backend,
            config,
            registry: TestRegistry::standard(),
            sink,
        }
    }

    pub fn config(&self) -> &As3apConfig {
        &self.config
    }

    fn context(&self, tuple_count: u64, dialect: SqlDialect) -> SuiteContext {
        SuiteContext::new(self.config.suite_options(), tuple_count, dialect)
    }

    /// Drops the database, creates the tables, generates and loads the data
    /// and builds the indexes. Returns the number of rows in `updates`.
    pub fn create_database(&self) -> BenchResult<u64> {
        emit_progress(
            self.sink,
            format!("Creating database on {}", self.backend.name()),
        );
        self.backend.create_database()?;
        let mut conn = self.backend.connect()?;
        let res = self.populate(&mut conn);
        let closed = conn.disconnect();
        let loaded = res?;
        closed?;
        Ok(loaded)
    }

    fn populate(&self, conn: &mut B::Conn) -> BenchResult<u64> {
        let ctx = self.context(self.config.tuples, SqlDialect::Sql87);
        let runner = SingleUserRunner::new(&self.registry, &ctx, self.sink);

        if runner.run_test(conn, "create_tables")?.failed {
            return Err(BackendError::statement("create_tables", "tables were not created").into());
        }

        emit_progress(
            self.sink,
            format!("Generating {} tuples", self.config.tuples),
        );
        let data = DatasetGenerator::new(self.config.tuples)
            .seed(self.config.seed)
            .generate();
        if let Some(dir) = &self.config.data_dir {
            write_streams(&data, dir)?;
        }

        let mut loaded = 0;
        for relation in Relation::ALL {
            let event = self.load_data(conn, &data, relation, self.config.data_dir.as_deref())?;
            if relation == Relation::Updates {
                loaded = event.result.max(0) as u64;
            }
        }

        if ctx.options.use_indexes {
            emit_progress(self.sink, "Building indexes");
            runner.run_sequence(conn, &create_index_sequence(&ctx.options))?;
        }
        Ok(loaded)
    }

    /// Loads one relation, from the files in `dir` when given and from
    /// `data` otherwise.
    pub fn load_data(
        &self,
        conn: &mut B::Conn,
        data: &Dataset,
        relation: Relation,
        dir: Option<&Path>,
    ) -> BenchResult<ResultEvent> {
        let table = relation.table_name();
        let start = Instant::now();
        let res = match dir {
            Some(dir) => {
                let mut reader = read_stream(dir, relation)?;
                let res = conn.bulk_load(table, &mut reader);
                if let Some(e) = reader.take_error() {
                    return Err(e.into());
                }
                res
            }
            None => conn.bulk_load(table, &mut data.stream(relation)),
        };
        let rows = settle(res)?;
        let event = ResultEvent {
            name: format!("load_{}", table),
            result: rows.unwrap_or(0) as i64,
            elapsed: start.elapsed(),
            failed: rows.is_none(),
        };
        emit_result(self.sink, &event);
        Ok(event)
    }

    /// Runs the whole benchmark. The main connection is closed on every
    /// exit path.
    pub fn run(&self) -> BenchResult<RunSummary> {
        let steps = self.config.steps()?;
        if self.config.create {
            self.create_database()?;
        }
        let mut conn = self.backend.connect()?;
        let res = self.run_steps(&mut conn, &steps);
        if let Err(e) = conn.disconnect() {
            log_warn!("disconnect: {}", e);
        }
        res
    }

    fn query_count(conn: &mut B::Conn) -> Result<Value, BackendError> {
        let mut txn = TxnGuard::begin(conn, IsolationLevel::ReadCommitted)?;
        let value = txn.conn().query_scalar("select count(*) from updates")?;
        txn.commit()?;
        Ok(value)
    }

    /// Rows in `updates`. A missing table counts as empty.
    fn count_updates(conn: &mut B::Conn) -> BenchResult<u64> {
        let counted = settle(Self::query_count(conn))?;
        Ok(counted
            .and_then(|v| v.as_i64())
            .map(|n| n.max(0) as u64)
            .unwrap_or(0))
    }

    fn run_steps(&self, conn: &mut B::Conn, steps: &[RunStep]) -> BenchResult<RunSummary> {
        let tuple_count = Self::count_updates(conn)?;
        let workers = self.config.worker_count(tuple_count);
        let mut summary = RunSummary {
            tuple_count,
            database_size_mb: As3apConfig::database_size_mb(tuple_count),
            workers,
            ..RunSummary::default()
        };
        if tuple_count == 0 {
            log_error!("updates is empty, nothing to run");
            return Ok(summary);
        }

        let mut dialect = SqlDialect::default();
        let mut batteries = 0;
        for step in steps {
            match step {
                RunStep::Sql87 | RunStep::Sql92 => {
                    if let Some(d) = step.dialect() {
                        dialect = d;
                    }
                }
                RunStep::SingleUser => {
                    let ctx = self.context(tuple_count, dialect);
                    if batteries > 0 || !self.config.create {
                        let mut s = Session::new(&mut *conn, &ctx, IsolationLevel::ReadCommitted);
                        setup_database(&mut s)?;
                    }
                    emit_progress(
                        self.sink,
                        format!("Single user tests ({})", ctx.joins.name()),
                    );
                    let runner = SingleUserRunner::new(&self.registry, &ctx, self.sink);
                    let events = runner.run_sequence(conn, SINGLE_USER_SEQUENCE)?;
                    summary.single_user.extend(events);
                    batteries += 1;
                }
                RunStep::MultiUser => {
                    let count = Self::count_updates(conn)?;
                    if count != tuple_count {
                        log_warn!(
                            "updates holds {} rows instead of {}, skipping multi user tests",
                            count,
                            tuple_count
                        );
                        summary.multi_user_skipped = true;
                        continue;
                    }
                    let ctx = self.context(tuple_count, dialect);
                    let phases = self.run_multi_user(conn, &ctx, workers)?;
                    summary.phases.extend(phases);
                }
            }
        }
        Ok(summary)
    }

    /// The eleven-step multi-user script. Backup (1) and recovery (6) are
    /// left to the operator.
    fn run_multi_user(
        &self,
        conn: &mut B::Conn,
        ctx: &SuiteContext,
        workers: usize,
    ) -> BenchResult<Vec<PhaseReport>> {
        let sched = ConcurrencyScheduler::new(self.backend, &self.registry, ctx, self.sink);
        let runner = SingleUserRunner::new(&self.registry, ctx, self.sink);
        let cfg = &self.config;
        let mut reports = Vec::with_capacity(4);

        emit_progress(
            self.sink,
            format!("Run IR test warm-up with {} users ({:?})", workers, cfg.warmup()),
        );
        sched.run_uniform(IR_OP, workers, cfg.warmup())?;

        emit_progress(self.sink, format!("Measure IR throughput ({:?})", cfg.measure()));
        let phase = sched.run_uniform(IR_OP, workers, cfg.measure())?;
        reports.push(PhaseReport::new("IR single user (tup/sec)", &phase));

        emit_progress(self.sink, "Run Mixed Workload IR test (Mix 3)");
        let phase = sched.run_mixed(CROSS_SECTION, IR_OP, workers, cfg.mixed())?;
        reports.push(PhaseReport::new("Mixed IR (tup/sec)", &phase));

        emit_progress(self.sink, "Check correctness of the sequential and random bulk updates");
        runner.run_sequence(conn, VERIFY_WINDOWS)?;

        emit_progress(self.sink, "Check correctness and remove the snapshot tables");
        runner.run_sequence(conn, VERIFY_WINDOWS)?;
        runner.run_sequence(conn, DROP_SIDE_TABLES)?;

        emit_progress(
            self.sink,
            format!("Run OLTP test warm-up ({:?})", cfg.warmup()),
        );
        sched.run_uniform(OLTP_OP, workers, cfg.warmup())?;

        emit_progress(self.sink, format!("Measure OLTP throughput ({:?})", cfg.measure()));
        let phase = sched.run_uniform(OLTP_OP, workers, cfg.measure())?;
        reports.push(PhaseReport::new("OLTP (tup/sec)", &phase));

        emit_progress(self.sink, "Run Mixed Workload OLTP test (Mix 4)");
        let phase = sched.run_mixed(CROSS_SECTION, OLTP_OP, workers, cfg.mixed())?;
        reports.push(PhaseReport::new("Mixed OLTP (tup/sec)", &phase));

        emit_progress(self.sink, "Check correctness and remove the snapshot tables");
        runner.run_sequence(conn, VERIFY_WINDOWS)?;
        runner.run_sequence(conn, DROP_SIDE_TABLES)?;

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NullBackend, SqliteBackend};
    use crate::error::BenchError;
    use crate::runner::CollectingSink;

    fn sqlite_config(dir: &Path, tuples: u64, sequence: &str) -> As3apConfig {
        As3apConfig {
            tuples,
            users: 2,
            warmup_secs: 0,
            measure_secs: 0,
            mixed_secs: 0,
            sequence: sequence.to_string(),
            db_path: dir.join("as3ap.db"),
            seed: Some(42),
            ..As3apConfig::default()
        }
    }

    fn single(sink: &CollectingSink, name: &str) -> ResultEvent {
        let events = sink.results_named(name);
        assert_eq!(events.len(), 1, "{} ran {} times", name, events.len());
        events[0].clone()
    }

    #[test]
    fn single_user_battery_on_thousand_tuples() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(dir.path(), 1000, "sql87;singleuser");
        let backend = SqliteBackend::new(&config.db_path);
        let sink = CollectingSink::new();
        let summary = As3ap::new(&backend, config, &sink).run().unwrap();

        assert_eq!(summary.tuple_count, 1000);
        assert_eq!(single(&sink, "load_updates").result, 1000);
        assert_eq!(single(&sink, "load_tenpct").result, 1000);
        assert_eq!(single(&sink, "load_tiny").result, 1);
        assert_eq!(single(&sink, "sel_1_cl").result, 1);
        assert_eq!(single(&sink, "sel_100_ncl").result, 100);
        for name in ["sel_100_cl", "proj_100", "sel_10pct_ncl"] {
            let event = single(&sink, name);
            assert!(!event.failed, "{} failed", name);
            assert_eq!(event.result, 100, "{}", name);
        }
        assert!(!single(&sink, "integrity_test").failed);
        assert_eq!(summary.single_user.len(), SINGLE_USER_SEQUENCE.len());
        assert!(summary.phases.is_empty());
    }

    #[test]
    fn generated_files_are_loaded_from_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let config = As3apConfig {
            data_dir: Some(data_dir.clone()),
            use_indexes: false,
            ..sqlite_config(dir.path(), 500, "")
        };
        let backend = SqliteBackend::new(&config.db_path);
        let sink = CollectingSink::new();
        let driver = As3ap::new(&backend, config, &sink);
        assert_eq!(driver.create_database().unwrap(), 500);

        for relation in Relation::ALL {
            assert!(data_dir.join(relation.file_name()).exists());
        }
        assert_eq!(single(&sink, "load_uniques").result, 500);
        assert_eq!(single(&sink, "load_tenpct").result, 500);
        assert!(sink.results_named("create_idx_updates_key_bt").is_empty());
    }

    #[test]
    fn multi_user_script_keeps_the_windows_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let config = sqlite_config(dir.path(), 2000, "sql92;multiuser");
        let backend = SqliteBackend::new(&config.db_path);
        let sink = CollectingSink::new();
        let summary = As3ap::new(&backend, config, &sink).run().unwrap();

        assert_eq!(summary.workers, 2);
        let labels: Vec<&str> = summary.phases.iter().map(|p| p.label).collect();
        assert_eq!(
            labels,
            vec![
                "IR single user (tup/sec)",
                "Mixed IR (tup/sec)",
                "OLTP (tup/sec)",
                "Mixed OLTP (tup/sec)"
            ]
        );
        assert_eq!(summary.phases[0].iterations, 2);
        // The mixed phases run the cross-section on one of the two users.
        assert_eq!(summary.phases[1].iterations, 1);

        for name in ["mu_checkmod_100_seq", "mu_checkmod_100_rand"] {
            let checks = sink.results_named(name);
            assert_eq!(checks.len(), 3);
            assert!(checks.iter().all(|e| !e.failed && e.result == 100), "{}", name);
        }
        for name in ["mu_drop_sel100_seq", "mu_drop_sel100_rand"] {
            assert_eq!(sink.results_named(name).len(), 2);
            assert!(sink.results_named(name).iter().all(|e| !e.failed));
        }
        assert_eq!(sink.results_named("sel_1_ncl").len(), 6);
        assert!(!sink.progress().is_empty());
    }

    #[test]
    fn empty_database_ends_the_run() {
        let backend = NullBackend::new();
        let config = As3apConfig {
            tuples: 100,
            ..As3apConfig::default()
        };
        let sink = CollectingSink::new();
        let summary = As3ap::new(&backend, config, &sink).run().unwrap();
        assert_eq!(summary.tuple_count, 0);
        assert!(summary.single_user.is_empty());
        assert!(summary.phases.is_empty());
        assert!(sink.results_named("sel_1_cl").is_empty());
        assert_eq!(backend.opened(), backend.closed());
    }

    #[test]
    fn dry_run_walks_every_step() {
        let backend = NullBackend::with_updates_rows(200);
        let config = As3apConfig {
            tuples: 200,
            users: 2,
            warmup_secs: 0,
            measure_secs: 0,
            mixed_secs: 0,
            seed: Some(1),
            ..As3apConfig::default()
        };
        let sink = CollectingSink::new();
        let summary = As3ap::new(&backend, config, &sink).run().unwrap();
        assert_eq!(summary.tuple_count, 200);
        assert_eq!(summary.single_user.len(), SINGLE_USER_SEQUENCE.len());
        assert!(!summary.multi_user_skipped);
        assert_eq!(summary.phases.len(), 4);
        assert_eq!(sink.results_named("mu_checkmod_100_seq").len(), 3);
        assert_eq!(backend.opened(), backend.closed());
    }

    #[test]
    fn refused_connection_is_an_error() {
        let backend = NullBackend::refusing();
        let config = As3apConfig {
            tuples: 100,
            create: false,
            ..As3apConfig::default()
        };
        let sink = CollectingSink::new();
        let res = As3ap::new(&backend, config, &sink).run();
        assert!(matches!(res, Err(BenchError::Backend(BackendError::Connection(_)))));
    }

    #[test]
    fn bad_sequence_fails_before_touching_the_backend() {
        let backend = NullBackend::new();
        let config = As3apConfig {
            sequence: "sql87;backup".to_string(),
            ..As3apConfig::default()
        };
        let sink = CollectingSink::new();
        let res = As3ap::new(&backend, config, &sink).run();
        assert!(matches!(res, Err(BenchError::InvalidConfig(_))));
        assert_eq!(backend.opened(), 0);
    }
}
