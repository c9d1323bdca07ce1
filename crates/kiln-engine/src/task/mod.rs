//! Affinity-aware task scheduler.
//!
//! Work is expressed as [`Task`]s carrying [`TaskFlags`]. Tasks pinned to the
//! main or GPU thread are only handed to workers advertising that capability;
//! everything else runs on whichever worker gets there first. A task that
//! returns [`TaskStatus::Continue`] goes back into the queues, which is how
//! multi-stage work (decode, then upload) advances without blocking a thread.
//!
//! Any task error or panic is fatal: the scheduler records it, stops, and
//! every worker returns from [`Scheduler::become_worker`].

mod config;
mod error;
mod flags;
mod lifecycle;
mod queue;
mod scheduler;
mod task;


pub use config::SchedulerConfig;
pub use error::{SchedulerError, TaskError, TaskFailure};
pub use flags::TaskFlags;
pub use lifecycle::{StopTask, WorkerCount};
pub use queue::QueueCounts;
pub use scheduler::{Scheduler, SchedulerStats, WeakScheduler};
pub use task::{FnTask, Task, TaskStatus, once};
