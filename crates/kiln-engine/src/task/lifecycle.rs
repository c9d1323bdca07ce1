use std::num::NonZeroUsize;
use std::thread;

use super::{Scheduler, SchedulerError, Task, TaskError, TaskFlags, TaskStatus};

/// How many pool threads `Scheduler::start` spawns.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WorkerCount {
    Exact(usize),
    /// One thread per available core, minus one when the calling thread will
    /// also run `become_worker`.
    Auto { main_participates: bool },
}

impl WorkerCount {
    pub fn resolve(self) -> usize {
        match self {
            WorkerCount::Exact(count) => count,
            WorkerCount::Auto { main_participates } => {
                let cores = thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1);
                if main_participates {
                    cores.saturating_sub(1)
                } else {
                    cores
                }
            }
        }
    }
}

impl From<usize> for WorkerCount {
    fn from(count: usize) -> Self {
        WorkerCount::Exact(count)
    }
}

impl From<bool> for WorkerCount {
    fn from(main_participates: bool) -> Self {
        WorkerCount::Auto { main_participates }
    }
}

impl Scheduler {
    /// Marks the scheduler running and spawns the pool.
    ///
    /// Pool threads advertise no capabilities; main/GPU work is drained by
    /// threads that call [`Scheduler::become_worker`] themselves.
    pub fn start(&self, count: impl Into<WorkerCount>) -> Result<(), SchedulerError> {
        let workers = count.into().resolve();
        let mut handles = self.shared.handles.lock();

        {
            let mut state = self.shared.state.lock();
            if state.running {
                return Err(SchedulerError::AlreadyRunning);
            }
            state.running = true;
        }
        self.shared.failure.lock().take();

        for index in 0..workers {
            let name = self.shared.config.thread_name(index);
            let mut builder = thread::Builder::new().name(name.clone());
            if let Some(stack_size) = self.shared.config.thread_stack_size {
                builder = builder.stack_size(stack_size);
            }

            let scheduler = self.clone();
            match builder.spawn(move || scheduler.become_worker(TaskFlags::NONE)) {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    drop(handles);
                    log::error!("failed to spawn worker `{name}`: {source}");
                    // The spawn error is the one worth reporting.
                    let _ = self.stop(true);
                    return Err(SchedulerError::Spawn { name, source });
                }
            }
        }

        log::info!("task scheduler started with {workers} pool worker(s)");
        Ok(())
    }

    /// Stops the scheduler and joins every pool worker.
    ///
    /// Tasks already running finish first. With `dequeue_all` the remaining
    /// queued tasks are discarded; otherwise they stay queued for a later
    /// `start`. Must not be called from a thread that is still inside
    /// `become_worker`.
    ///
    /// Returns the recorded failure if a task failed during this generation.
    pub fn stop(&self, dequeue_all: bool) -> Result<(), SchedulerError> {
        self.request_stop();

        let handles = std::mem::take(&mut *self.shared.handles.lock());
        let current = thread::current().id();
        let mut panicked = 0;
        for handle in handles {
            if handle.thread().id() == current {
                log::warn!("stop called from a pool worker; it will exit on its own");
                continue;
            }
            if handle.join().is_err() {
                panicked += 1;
            }
        }

        if dequeue_all {
            let discarded = self.discard_queued();
            if discarded > 0 {
                log::debug!("discarded {discarded} queued task(s)");
            }
        }

        log::info!("task scheduler stopped");

        if let Some(failure) = self.take_fatal_error() {
            return Err(SchedulerError::TaskFailed(failure));
        }
        if panicked > 0 {
            return Err(SchedulerError::WorkerPanicked { count: panicked });
        }
        Ok(())
    }

    /// Drops every queued task outside the lock. Dropping a task may queue a
    /// cleanup task, so this repeats until the queues stay empty.
    fn discard_queued(&self) -> usize {
        let mut discarded = 0;
        loop {
            let drained = self.shared.state.lock().queues.drain();
            if drained.is_empty() {
                return discarded;
            }
            discarded += drained.len();
            drop(drained);
        }
    }
}

/// Requests shutdown from inside a task body.
///
/// Running it flips the scheduler to stopped and wakes every worker; workers
/// return from `become_worker` after their current task. Joining is left to
/// whoever calls [`Scheduler::stop`].
#[derive(Debug, Copy, Clone)]
pub struct StopTask {
    flags: TaskFlags,
}

impl StopTask {
    /// A high-priority stop task that any worker may run.
    pub fn new() -> Self {
        Self {
            flags: TaskFlags::HIGH_PRIORITY,
        }
    }

    pub fn with_flags(flags: TaskFlags) -> Self {
        Self { flags }
    }
}

impl Default for StopTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for StopTask {
    fn flags(&self) -> TaskFlags {
        self.flags
    }

    fn run(&mut self, scheduler: &Scheduler) -> Result<TaskStatus, TaskError> {
        scheduler.request_stop();
        Ok(TaskStatus::Done)
    }

    fn name(&self) -> &str {
        "stop"
    }
}
