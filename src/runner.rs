//! Sequential execution of named tests and the events they produce.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::backend::Connection;
use crate::error::BenchResult;
use crate::suite::{Session, SuiteContext, TestRegistry};
use crate::{log_info, log_warn};

/// One finished test.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEvent {
    pub name: String,
    pub result: i64,
    pub elapsed: Duration,
    pub failed: bool,
}

impl std::fmt::Display for ResultEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.failed {
            write!(f, "-----> {} failed <-----", self.name)
        } else {
            write!(
                f,
                "{:>30} ({:?}) return value = {}",
                self.name, self.elapsed, self.result
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub message: String,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>) -> Self {
        ProgressEvent {
            message: message.into(),
        }
    }
}

/// Consumer of result and progress events. Shared by all workers of a phase.
pub trait EventSink: Sync {
    fn on_result(&self, event: &ResultEvent);
    fn on_progress(&self, event: &ProgressEvent);
}

/// Drops events. Results and progress are still logged by [`emit_result`]
/// and [`emit_progress`].
pub struct LogSink;

impl EventSink for LogSink {
    fn on_result(&self, _event: &ResultEvent) {}
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct CollectingSink {
    results: Mutex<Vec<ResultEvent>>,
    progress: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<ResultEvent> {
        self.results.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn progress(&self) -> Vec<ProgressEvent> {
        self.progress.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Results reported under `name`, in order.
    pub fn results_named(&self, name: &str) -> Vec<ResultEvent> {
        self.results()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn on_result(&self, event: &ResultEvent) {
        let mut results = self.results.lock().unwrap_or_else(|p| p.into_inner());
        results.push(event.clone());
    }

    fn on_progress(&self, event: &ProgressEvent) {
        let mut progress = self.progress.lock().unwrap_or_else(|p| p.into_inner());
        progress.push(event.clone());
    }
}

pub fn emit_result(sink: &dyn EventSink, event: &ResultEvent) {
    if event.failed {
        log_warn!("{}", event);
    } else {
        log_info!("{}", event);
    }
    sink.on_result(event);
}

pub fn emit_progress(sink: &dyn EventSink, message: impl Into<String>) {
    let event = ProgressEvent::new(message);
    log_info!("{}", event.message);
    sink.on_progress(&event);
}

/// Runs registry tests one after another on a single connection.
pub struct SingleUserRunner<'a, C: Connection> {
    registry: &'a TestRegistry<C>,
    ctx: &'a SuiteContext,
    sink: &'a dyn EventSink,
}

impl<'a, C: Connection> SingleUserRunner<'a, C> {
    pub fn new(registry: &'a TestRegistry<C>, ctx: &'a SuiteContext, sink: &'a dyn EventSink) -> Self {
        SingleUserRunner {
            registry,
            ctx,
            sink,
        }
    }

    /// Runs one test under its registered isolation level.
    ///
    /// A failed test is reported and returned. A connection failure is
    /// returned as an error without an event.
    pub fn run_test(&self, conn: &mut C, name: &str) -> BenchResult<ResultEvent> {
        let entry = self.registry.get(name);
        let mut session = Session::new(conn, self.ctx, entry.isolation);
        let start = Instant::now();
        let outcome = (entry.op)(&mut session)?;
        let event = ResultEvent {
            name: name.to_string(),
            result: outcome.result,
            elapsed: start.elapsed(),
            failed: outcome.failed,
        };
        emit_result(self.sink, &event);
        Ok(event)
    }

    /// Runs `names` in order. Failed tests do not stop the sequence.
    pub fn run_sequence(&self, conn: &mut C, names: &[&str]) -> BenchResult<Vec<ResultEvent>> {
        let mut events = Vec::with_capacity(names.len());
        for name in names {
            events.push(self.run_test(conn, name)?);
        }
        Ok(events)
    }
}
