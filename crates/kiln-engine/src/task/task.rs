use super::{Scheduler, TaskError, TaskFlags};

/// Outcome of a single task invocation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TaskStatus {
    /// Work remains; the scheduler resubmits the task.
    Continue,
    /// The task is finished and is dropped.
    Done,
}

/// A unit of deferred work.
///
/// `flags` is queried whenever the task is classified into a queue and when a
/// worker checks eligibility. It must not change while the task is queued; a
/// multi-stage task may report different flags after `run` advances its own
/// stage, and is reclassified when resubmitted.
pub trait Task: Send + 'static {
    fn flags(&self) -> TaskFlags;

    /// Runs the task once. Never called with the queue lock held, so the body
    /// may freely submit more work to `scheduler`.
    fn run(&mut self, scheduler: &Scheduler) -> Result<TaskStatus, TaskError>;

    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed task.
pub struct FnTask<F> {
    flags: TaskFlags,
    name: &'static str,
    body: F,
}

impl<F> FnTask<F>
where
    F: FnMut(&Scheduler) -> Result<TaskStatus, TaskError> + Send + 'static,
{
    pub fn new(flags: TaskFlags, body: F) -> Self {
        Self {
            flags,
            name: "fn-task",
            body,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<F> Task for FnTask<F>
where
    F: FnMut(&Scheduler) -> Result<TaskStatus, TaskError> + Send + 'static,
{
    fn flags(&self) -> TaskFlags {
        self.flags
    }

    fn run(&mut self, scheduler: &Scheduler) -> Result<TaskStatus, TaskError> {
        (self.body)(scheduler)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Wraps a one-shot closure into a task that always reports `Done`.
pub fn once<G>(
    flags: TaskFlags,
    body: G,
) -> FnTask<impl FnMut(&Scheduler) -> Result<TaskStatus, TaskError> + Send + 'static>
where
    G: FnOnce(&Scheduler) -> Result<(), TaskError> + Send + 'static,
{
    let mut body = Some(body);
    FnTask::new(flags, move |scheduler| {
        if let Some(body) = body.take() {
            body(scheduler)?;
        }
        Ok(TaskStatus::Done)
    })
}
