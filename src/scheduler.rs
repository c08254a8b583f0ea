//! Multi-user phases: many workers, one connection each.
//!
//! A phase starts every worker behind a barrier, lets them loop until the
//! main thread clears the run flag (or runs each of them exactly once), joins
//! them all and sums their statistics.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;

use crate::backend::{Backend, Connection};
use crate::error::{BenchError, BenchResult};
use crate::runner::{EventSink, ResultEvent, SingleUserRunner};
use crate::suite::{Session, SuiteContext, TestEntry, TestRegistry};
use crate::{log_debug, log_info, log_warn};

/// How long the looping workers of a phase keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseDuration {
    Timed(Duration),
    /// Every worker runs its operation exactly once.
    Once,
}

impl PhaseDuration {
    /// `0` means single-shot.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            PhaseDuration::Once
        } else {
            PhaseDuration::Timed(Duration::from_secs(secs))
        }
    }
}

const LATENCY_SIGFIG: u8 = 3;

/// Statistics of one worker, summed over all workers after the join.
#[derive(Debug)]
pub struct WorkerStat {
    pub iterations: u64,
    pub failures: u64,
    pub connect_failures: u64,
    /// Nanoseconds.
    pub total_latency: u64,
    pub min_latency: u64,
    pub max_latency: u64,
    pub latencies: Option<Histogram<u64>>,
}

impl Default for WorkerStat {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerStat {
    pub fn new() -> Self {
        WorkerStat {
            iterations: 0,
            failures: 0,
            connect_failures: 0,
            total_latency: 0,
            min_latency: u64::MAX,
            max_latency: 0,
            latencies: Histogram::new(LATENCY_SIGFIG).ok(),
        }
    }

    pub fn record(&mut self, latency: u64, failed: bool) {
        self.iterations += 1;
        if failed {
            self.failures += 1;
        }
        self.total_latency += latency;
        self.min_latency = std::cmp::min(self.min_latency, latency);
        self.max_latency = std::cmp::max(self.max_latency, latency);
        if let Some(h) = self.latencies.as_mut() {
            h.saturating_record(latency);
        }
    }

    pub fn add(&mut self, rhs: &WorkerStat) {
        self.iterations += rhs.iterations;
        self.failures += rhs.failures;
        self.connect_failures += rhs.connect_failures;

        self.total_latency += rhs.total_latency;
        self.min_latency = std::cmp::min(self.min_latency, rhs.min_latency);
        self.max_latency = std::cmp::max(self.max_latency, rhs.max_latency);
        if let (Some(h), Some(other)) = (self.latencies.as_mut(), rhs.latencies.as_ref()) {
            // Auto-resizing histograms accept any recorded value.
            let _ = h.add(other);
        }
    }

    pub fn mean_latency(&self) -> u64 {
        if self.iterations == 0 {
            0
        } else {
            self.total_latency / self.iterations
        }
    }

    pub fn latency_at_quantile(&self, q: f64) -> Option<u64> {
        self.latencies
            .as_ref()
            .filter(|h| h.len() > 0)
            .map(|h| h.value_at_quantile(q))
    }
}

impl std::fmt::Display for WorkerStat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let min = if self.iterations == 0 { 0 } else { self.min_latency };
        let mut out = String::new();
        out.push_str(&format!("  iterations: {}\n", self.iterations));
        out.push_str(&format!("  failures: {}\n", self.failures));
        out.push_str(&format!("  connect_failures: {}\n", self.connect_failures));
        out.push_str(&format!("  mean_latency: {}\n", self.mean_latency()));
        out.push_str(&format!("  min_latency: {}\n", min));
        out.push_str(&format!("  max_latency: {}\n", self.max_latency));
        if let Some(p99) = self.latency_at_quantile(0.99) {
            out.push_str(&format!("  p99_latency: {}\n", p99));
        }
        write!(f, "{}", out)
    }
}

/// Result of one phase.
#[derive(Debug)]
pub struct PhaseStat {
    pub workers: usize,
    pub elapsed: Duration,
    /// Looping workers only. The cross-section worker is not counted.
    pub stat: WorkerStat,
    pub cross_section: Vec<ResultEvent>,
}

impl PhaseStat {
    pub fn iterations(&self) -> u64 {
        self.stat.iterations
    }

    /// Iterations per second of wall time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stat.iterations as f64 / secs
        } else {
            0.0
        }
    }
}

enum WorkerOutcome {
    Looped(WorkerStat),
    Script(Vec<ResultEvent>),
}

pub struct ConcurrencyScheduler<'a, B: Backend> {
    backend: &'a B,
    registry: &'a TestRegistry<B::Conn>,
    ctx: &'a SuiteContext,
    sink: &'a dyn EventSink,
}

impl<'a, B: Backend> ConcurrencyScheduler<'a, B> {
    pub fn new(
        backend: &'a B,
        registry: &'a TestRegistry<B::Conn>,
        ctx: &'a SuiteContext,
        sink: &'a dyn EventSink,
    ) -> Self {
        ConcurrencyScheduler {
            backend,
            registry,
            ctx,
            sink,
        }
    }

    /// Every worker repeats `op` for `duration`.
    pub fn run_uniform(
        &self,
        op: &str,
        workers: usize,
        duration: PhaseDuration,
    ) -> BenchResult<PhaseStat> {
        self.run_phase(None, op, workers, duration)
    }

    /// Worker 0 runs `script` once while the other workers repeat
    /// `background` for `duration`. The phase ends when both are done.
    pub fn run_mixed(
        &self,
        script: &[&str],
        background: &str,
        workers: usize,
        duration: PhaseDuration,
    ) -> BenchResult<PhaseStat> {
        self.run_phase(Some(script), background, workers, duration)
    }

    fn run_phase(
        &self,
        script: Option<&[&str]>,
        op: &str,
        workers: usize,
        duration: PhaseDuration,
    ) -> BenchResult<PhaseStat> {
        if workers == 0 {
            return Err(BenchError::NoWorkers);
        }
        let entry = self.registry.get(op);
        if let Some(names) = script {
            // Fail on an unknown name before any worker starts.
            for name in names {
                self.registry.get(name);
            }
        }
        log_debug!(
            "phase {} on {} with {} workers ({:?})",
            op,
            self.backend.name(),
            workers,
            duration
        );

        let flag = AtomicBool::new(true);
        let barrier = Barrier::new(workers + 1);
        let (joined, elapsed) = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|id| {
                    let flag = &flag;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        match script {
                            Some(names) if id == 0 => WorkerOutcome::Script(self.script_worker(names)),
                            _ => WorkerOutcome::Looped(self.loop_worker(id, entry, flag, duration)),
                        }
                    })
                })
                .collect();

            barrier.wait();
            let start = Instant::now();
            if let PhaseDuration::Timed(d) = duration {
                thread::sleep(d);
                flag.store(false, Ordering::Release);
            }
            let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
            (joined, start.elapsed())
        });

        let mut stat = WorkerStat::new();
        let mut cross_section = Vec::new();
        for (id, res) in joined.into_iter().enumerate() {
            match res {
                Ok(WorkerOutcome::Looped(s)) => stat.add(&s),
                Ok(WorkerOutcome::Script(events)) => cross_section = events,
                Err(_) => return Err(BenchError::WorkerPanicked(id)),
            }
        }
        Ok(PhaseStat {
            workers,
            elapsed,
            stat,
            cross_section,
        })
    }

    fn loop_worker(
        &self,
        id: usize,
        entry: TestEntry<B::Conn>,
        flag: &AtomicBool,
        duration: PhaseDuration,
    ) -> WorkerStat {
        let mut stat = WorkerStat::new();
        let mut conn = match self.backend.connect() {
            Ok(conn) => conn,
            Err(e) => {
                log_warn!("worker {} could not connect: {}", id, e);
                stat.connect_failures += 1;
                return stat;
            }
        };

        match duration {
            PhaseDuration::Once => {
                self.run_op(id, &mut conn, entry, &mut stat);
            }
            PhaseDuration::Timed(_) => {
                while flag.load(Ordering::Acquire) {
                    if !self.run_op(id, &mut conn, entry, &mut stat) {
                        break;
                    }
                }
            }
        }

        if let Err(e) = conn.disconnect() {
            log_warn!("worker {} disconnect: {}", id, e);
        }
        stat
    }

    /// Returns false once the connection is unusable.
    fn run_op(
        &self,
        id: usize,
        conn: &mut B::Conn,
        entry: TestEntry<B::Conn>,
        stat: &mut WorkerStat,
    ) -> bool {
        let start = Instant::now();
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut session = Session::new(&mut *conn, self.ctx, entry.isolation);
            (entry.op)(&mut session)
        }));
        let latency = start.elapsed().as_nanos() as u64;
        match res {
            Ok(Ok(outcome)) => {
                stat.record(latency, outcome.failed);
                true
            }
            Ok(Err(e)) => {
                log_warn!("worker {} stopped: {}", id, e);
                stat.record(latency, true);
                false
            }
            Err(_) => {
                log_warn!("worker {}: operation panicked", id);
                stat.record(latency, true);
                true
            }
        }
    }

    fn script_worker(&self, names: &[&str]) -> Vec<ResultEvent> {
        let mut conn = match self.backend.connect() {
            Ok(conn) => conn,
            Err(e) => {
                log_warn!("cross-section worker could not connect: {}", e);
                return Vec::new();
            }
        };
        let runner = SingleUserRunner::new(self.registry, self.ctx, self.sink);
        let start = Instant::now();
        let res = panic::catch_unwind(AssertUnwindSafe(|| runner.run_sequence(&mut conn, names)));
        let events = match res {
            Ok(Ok(events)) => events,
            Ok(Err(e)) => {
                log_warn!("cross-section stopped: {}", e);
                Vec::new()
            }
            Err(_) => {
                log_warn!("cross-section panicked");
                Vec::new()
            }
        };
        log_info!("CrossSectionTests ({:?})", start.elapsed());
        if let Err(e) = conn.disconnect() {
            log_warn!("cross-section disconnect: {}", e);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NullBackend, NullConnection};
    use crate::runner::CollectingSink;
    use crate::suite::{Outcome, SqlDialect, SuiteOptions, CROSS_SECTION};
    use rstest::rstest;

    fn noop(_s: &mut Session<'_, NullConnection>) -> BenchResult<Outcome> {
        Ok(Outcome::ok(0))
    }

    fn select(s: &mut Session<'_, NullConnection>) -> BenchResult<Outcome> {
        Ok(Outcome::rows(crate::suite::settle(s.count_rows("select 1"))?))
    }

    fn always_fails(_s: &mut Session<'_, NullConnection>) -> BenchResult<Outcome> {
        Ok(Outcome::failed(0))
    }

    fn explodes(_s: &mut Session<'_, NullConnection>) -> BenchResult<Outcome> {
        panic!("boom");
    }

    fn registry() -> TestRegistry<NullConnection> {
        TestRegistry::builder()
            .test("noop", noop)
            .test("select", select)
            .test("always_fails", always_fails)
            .test("explodes", explodes)
            .build()
    }

    fn ctx() -> SuiteContext {
        SuiteContext::new(SuiteOptions::default(), 2000, SqlDialect::Sql87)
    }

    #[test]
    fn phase_duration_from_secs() {
        assert_eq!(PhaseDuration::from_secs(0), PhaseDuration::Once);
        assert_eq!(
            PhaseDuration::from_secs(3),
            PhaseDuration::Timed(Duration::from_secs(3))
        );
    }

    #[test]
    fn zero_workers_is_an_error() {
        let backend = NullBackend::new();
        let (registry, ctx, sink) = (registry(), ctx(), CollectingSink::new());
        let sched = ConcurrencyScheduler::new(&backend, &registry, &ctx, &sink);
        let res = sched.run_uniform("noop", 0, PhaseDuration::Once);
        assert!(matches!(res, Err(BenchError::NoWorkers)));
        assert_eq!(backend.opened(), 0);
    }

    #[test]
    fn once_runs_each_worker_a_single_time() {
        let backend = NullBackend::new();
        let (registry, ctx, sink) = (registry(), ctx(), CollectingSink::new());
        let sched = ConcurrencyScheduler::new(&backend, &registry, &ctx, &sink);
        let phase = sched.run_uniform("noop", 4, PhaseDuration::Once).unwrap();
        assert_eq!(phase.iterations(), 4);
        assert_eq!(phase.stat.failures, 0);
        assert_eq!(backend.opened(), 4);
        assert_eq!(backend.closed(), 4);
    }

    #[test]
    fn timed_phase_stops_at_the_deadline() {
        let backend = NullBackend::with_statement_delay(Duration::from_millis(1));
        let (registry, ctx, sink) = (registry(), ctx(), CollectingSink::new());
        let sched = ConcurrencyScheduler::new(&backend, &registry, &ctx, &sink);
        let d = Duration::from_millis(200);
        let phase = sched
            .run_uniform("select", 3, PhaseDuration::Timed(d))
            .unwrap();
        assert!(phase.elapsed >= d);
        assert!(phase.elapsed < d + Duration::from_secs(5));
        assert!(phase.iterations() >= 3);
        assert!(phase.throughput() > 0.0);
        assert_eq!(backend.opened(), backend.closed());
        assert!(phase.stat.latency_at_quantile(0.5).is_some());
    }

    fn timed_iterations(workers: usize) -> u64 {
        let backend = NullBackend::with_statement_delay(Duration::from_millis(2));
        let (registry, ctx, sink) = (registry(), ctx(), CollectingSink::new());
        let sched = ConcurrencyScheduler::new(&backend, &registry, &ctx, &sink);
        let phase = sched
            .run_uniform(
                "select",
                workers,
                PhaseDuration::Timed(Duration::from_millis(300)),
            )
            .unwrap();
        phase.iterations()
    }

    #[rstest]
    #[case(1, 2)]
    #[case(2, 4)]
    #[case(1, 4)]
    fn more_workers_never_lower_iterations(#[case] fewer: usize, #[case] more: usize) {
        let low = timed_iterations(fewer);
        let high = timed_iterations(more);
        assert!(low > 0);
        assert!(high >= low, "{} workers: {}, {} workers: {}", fewer, low, more, high);
    }

    #[test]
    fn failures_and_panics_stay_inside_the_worker() {
        let backend = NullBackend::new();
        let (registry, ctx, sink) = (registry(), ctx(), CollectingSink::new());
        let sched = ConcurrencyScheduler::new(&backend, &registry, &ctx, &sink);

        let phase = sched.run_uniform("always_fails", 2, PhaseDuration::Once).unwrap();
        assert_eq!(phase.stat.failures, 2);

        let phase = sched.run_uniform("explodes", 2, PhaseDuration::Once).unwrap();
        assert_eq!(phase.iterations(), 2);
        assert_eq!(phase.stat.failures, 2);
        assert_eq!(backend.opened(), 4);
        assert_eq!(backend.closed(), 4);
    }

    #[test]
    fn refused_connections_are_counted() {
        let backend = NullBackend::refusing();
        let (registry, ctx, sink) = (registry(), ctx(), CollectingSink::new());
        let sched = ConcurrencyScheduler::new(&backend, &registry, &ctx, &sink);
        let phase = sched.run_uniform("noop", 3, PhaseDuration::Once).unwrap();
        assert_eq!(phase.iterations(), 0);
        assert_eq!(phase.stat.connect_failures, 3);
    }

    #[test]
    fn mixed_runs_the_script_exactly_once() {
        let backend = NullBackend::new();
        let registry = TestRegistry::<NullConnection>::standard();
        let (ctx, sink) = (ctx(), CollectingSink::new());
        let sched = ConcurrencyScheduler::new(&backend, &registry, &ctx, &sink);
        let phase = sched
            .run_mixed(
                CROSS_SECTION,
                "mu_ir_select",
                3,
                PhaseDuration::Timed(Duration::from_millis(50)),
            )
            .unwrap();
        assert_eq!(phase.cross_section.len(), CROSS_SECTION.len());
        assert_eq!(sink.results().len(), CROSS_SECTION.len());
        assert_eq!(sink.results_named("sel_1_ncl").len(), 3);
        assert!(phase.iterations() >= 2);
        assert_eq!(backend.opened(), 3);
        assert_eq!(backend.closed(), 3);
    }

    #[test]
    fn mixed_with_one_worker_only_runs_the_script() {
        let backend = NullBackend::new();
        let registry = TestRegistry::<NullConnection>::standard();
        let (ctx, sink) = (ctx(), CollectingSink::new());
        let sched = ConcurrencyScheduler::new(&backend, &registry, &ctx, &sink);
        let phase = sched
            .run_mixed(CROSS_SECTION, "mu_oltp_update", 1, PhaseDuration::Once)
            .unwrap();
        assert_eq!(phase.iterations(), 0);
        assert_eq!(phase.cross_section.len(), CROSS_SECTION.len());
    }

    #[test]
    fn stats_are_summed() {
        let mut a = WorkerStat::new();
        a.record(10, false);
        a.record(30, true);
        let mut b = WorkerStat::new();
        b.record(5, false);
        a.add(&b);
        assert_eq!(a.iterations, 3);
        assert_eq!(a.failures, 1);
        assert_eq!(a.min_latency, 5);
        assert_eq!(a.max_latency, 30);
        assert_eq!(a.mean_latency(), 15);
        assert!(a.to_string().contains("iterations: 3"));
    }
}
