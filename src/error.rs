use thiserror::Error;

/// Failures reported by a database backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The connection can no longer be used. Fatal for the runner or worker
    /// that owns it.
    #[error("connection failure: {0}")]
    Connection(String),
    /// A single statement was rejected. Recorded as a failed test.
    #[error("statement failed: {message} [{sql}]")]
    Statement { sql: String, message: String },
    #[error("no cursor is open")]
    NoCursor,
    #[error("cursor is not positioned on a row")]
    NoRow,
}

impl BackendError {
    pub fn statement(sql: &str, message: impl ToString) -> Self {
        BackendError::Statement {
            sql: sql.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BackendError::Connection(_))
    }
}

#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record stream error: {0}")]
    Csv(#[from] csv::Error),
    #[error("a phase needs at least one worker")]
    NoWorkers,
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type BenchResult<T> = Result<T, BenchError>;
