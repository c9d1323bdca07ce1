use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use super::queue::{BoxedTask, QueueSet};
use super::{QueueCounts, SchedulerConfig, Task, TaskError, TaskFailure, TaskFlags, TaskStatus};

/// Handle to a task scheduler.
///
/// Cloning is cheap and every clone drives the same queues. Independent
/// schedulers do not share any state, so tests can run several side by side.
#[derive(Clone)]
pub struct Scheduler {
    pub(super) shared: Arc<Shared>,
}

/// Non-owning scheduler handle for back-references (resource destructors)
/// that must not keep the scheduler alive.
#[derive(Clone, Default)]
pub struct WeakScheduler {
    shared: Weak<Shared>,
}

impl WeakScheduler {
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.shared.upgrade().map(|shared| Scheduler { shared })
    }
}

pub(super) struct Shared {
    pub(super) config: SchedulerConfig,

    /// The four queues and the running flag, guarded together so that a worker
    /// checking "running" and "anything eligible" sees a consistent state.
    pub(super) state: Mutex<State>,

    /// Signalled on submission and on stop.
    pub(super) available: Condvar,

    /// Join handles of workers spawned by `start`. Threads that call
    /// `become_worker` themselves are not tracked here.
    pub(super) handles: Mutex<Vec<JoinHandle<()>>>,

    /// First fatal failure of the current generation.
    pub(super) failure: Mutex<Option<TaskFailure>>,

    pub(super) counters: Counters,
}

pub(super) struct State {
    pub(super) queues: QueueSet,
    pub(super) running: bool,
}

#[derive(Default)]
pub(super) struct Counters {
    executed: AtomicU64,
    resubmitted: AtomicU64,
    failed: AtomicU64,
}

/// Dispatch counters since the scheduler was created.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SchedulerStats {
    /// Task invocations, including ones that failed.
    pub executed: u64,
    /// Invocations that returned `Continue`.
    pub resubmitted: u64,
    pub failed: u64,
}

impl Scheduler {
    /// Creates a stopped scheduler with empty queues.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State {
                    queues: QueueSet::default(),
                    running: false,
                }),
                available: Condvar::new(),
                handles: Mutex::new(Vec::new()),
                failure: Mutex::new(None),
                counters: Counters::default(),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Returns `true` if both handles drive the same scheduler.
    pub fn ptr_eq(&self, other: &Scheduler) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Current queue occupancy.
    pub fn pending(&self) -> QueueCounts {
        self.shared.state.lock().queues.counts()
    }

    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.shared.counters;
        SchedulerStats {
            executed: counters.executed.load(Ordering::Relaxed),
            resubmitted: counters.resubmitted.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Returns `true` once a task failed in the current generation.
    pub fn has_failed(&self) -> bool {
        self.shared.failure.lock().is_some()
    }

    /// Takes the recorded fatal failure, if any.
    pub fn take_fatal_error(&self) -> Option<TaskFailure> {
        self.shared.failure.lock().take()
    }

    /// Queues `task` and wakes a worker. Callable from any thread, including
    /// from inside a running task.
    pub fn submit<T: Task>(&self, task: T) {
        self.submit_boxed(Box::new(task));
    }

    pub fn submit_boxed(&self, task: Box<dyn Task>) {
        let mut state = self.shared.state.lock();
        let kind = state.queues.push(task);
        log::trace!("task queued in {kind:?}");
        self.wake(&state.queues);
    }

    /// Wakes enough workers for the queued work.
    ///
    /// A single notification may land on a worker that cannot run a pinned
    /// task, so pending dedicated work wakes everyone.
    fn wake(&self, queues: &QueueSet) {
        if queues.counts().dedicated() > 0 {
            self.shared.available.notify_all();
        } else {
            self.shared.available.notify_one();
        }
    }

    /// Marks the scheduler stopped and wakes every waiting worker. Does not
    /// join anything.
    pub(crate) fn request_stop(&self) {
        let mut state = self.shared.state.lock();
        if state.running {
            log::debug!("task scheduler stop requested");
        }
        state.running = false;
        drop(state);
        self.shared.available.notify_all();
    }

    /// Turns the calling thread into a worker until the scheduler stops.
    ///
    /// `capabilities` advertises which pinned tasks this thread may run; only
    /// the `MAIN_THREAD` and `GPU_THREAD` bits are considered. Returns
    /// immediately if the scheduler is not running.
    pub fn become_worker(&self, capabilities: TaskFlags) {
        let capabilities = capabilities.required();
        let worker = current_worker_name();
        log::debug!("worker `{worker}` started with capabilities {capabilities:?}");

        while let Some(task) = self.next_task(capabilities) {
            self.dispatch(task, &worker);
        }

        log::debug!("worker `{worker}` exiting");
    }

    /// Blocks until an eligible task is available or the scheduler stops.
    fn next_task(&self, capabilities: TaskFlags) -> Option<BoxedTask> {
        let mut state = self.shared.state.lock();
        loop {
            if !state.running {
                return None;
            }

            if let Some(task) = state.queues.pop_eligible(capabilities) {
                if !state.queues.is_empty() {
                    self.wake(&state.queues);
                }
                return Some(task);
            }

            self.shared.available.wait(&mut state);
        }
    }

    /// Runs one task outside the queue lock and applies its outcome.
    fn dispatch(&self, mut task: BoxedTask, worker: &str) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run(self)));
        self.shared.counters.executed.fetch_add(1, Ordering::Relaxed);

        match outcome {
            Ok(Ok(TaskStatus::Continue)) => {
                self.shared
                    .counters
                    .resubmitted
                    .fetch_add(1, Ordering::Relaxed);
                self.submit_boxed(task);
            }
            Ok(Ok(TaskStatus::Done)) => drop(task),
            Ok(Err(error)) => self.fail(worker, task, error),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.fail(worker, task, TaskError::Panicked(message));
            }
        }
    }

    /// Records a fatal failure and stops the pool, then drops the failing task.
    fn fail(&self, worker: &str, task: BoxedTask, error: TaskError) {
        let task_name = task.name().to_owned();
        self.shared.counters.failed.fetch_add(1, Ordering::Relaxed);

        let codes = error.gpu_codes();
        if codes.is_empty() {
            log::error!("task `{task_name}` failed on worker `{worker}`: {error}");
        } else {
            log::error!(
                "task `{task_name}` failed on worker `{worker}`: {error} (gpu errors: {codes:?})"
            );
        }

        {
            let mut failure = self.shared.failure.lock();
            if failure.is_none() {
                *failure = Some(TaskFailure {
                    worker: worker.to_owned(),
                    task: task_name,
                    error,
                });
            }
        }

        // Stop before dropping: the task's drop may take a while or submit more work.
        self.request_stop();
        drop(task);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Scheduler")
            .field("running", &state.running)
            .field("pending", &state.queues.counts())
            .finish_non_exhaustive()
    }
}

pub(super) fn current_worker_name() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_owned(),
        None => format!("{:?}", current.id()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
