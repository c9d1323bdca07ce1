use crate::device::{GpuError, GpuErrorCode};
use crate::resource::{DecodeError, ResourceError};

/// Failure returned from a task body.
///
/// Any `Err` reaching the dispatch loop is fatal to the worker pool: the
/// scheduler records it, stops, and wakes every worker.
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The task body panicked; the payload message is preserved.
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    /// GPU error codes outstanding when the failure was raised, if any.
    pub fn gpu_codes(&self) -> &[GpuErrorCode] {
        match self {
            TaskError::Gpu(err) => err.codes(),
            _ => &[],
        }
    }
}

/// A fatal task failure together with where it happened.
#[derive(thiserror::Error, Debug)]
#[error("task `{task}` failed on worker `{worker}`")]
pub struct TaskFailure {
    pub worker: String,
    pub task: String,
    #[source]
    pub error: TaskError,
}

/// Errors surfaced by scheduler lifecycle calls.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("task scheduler is already running")]
    AlreadyRunning,

    #[error("failed to spawn worker thread `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker pool stopped after a fatal task failure")]
    TaskFailed(#[source] TaskFailure),

    #[error("{count} worker thread(s) panicked outside task dispatch")]
    WorkerPanicked { count: usize },
}

impl SchedulerError {
    /// Returns the recorded task failure, if this error carries one.
    pub fn task_failure(&self) -> Option<&TaskFailure> {
        match self {
            SchedulerError::TaskFailed(failure) => Some(failure),
            _ => None,
        }
    }
}
