use std::collections::VecDeque;

use super::{Task, TaskFlags};

pub(crate) type BoxedTask = Box<dyn Task>;

/// Snapshot of how many tasks sit in each queue.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct QueueCounts {
    pub dedicated_high: usize,
    pub dedicated_normal: usize,
    pub general_high: usize,
    pub general_normal: usize,
}

impl QueueCounts {
    /// Tasks pinned to the main/GPU thread.
    pub fn dedicated(&self) -> usize {
        self.dedicated_high + self.dedicated_normal
    }

    pub fn general(&self) -> usize {
        self.general_high + self.general_normal
    }

    pub fn total(&self) -> usize {
        self.dedicated() + self.general()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum QueueKind {
    DedicatedHigh,
    DedicatedNormal,
    GeneralHigh,
    GeneralNormal,
}

impl QueueKind {
    pub(crate) fn classify(flags: TaskFlags) -> Self {
        match (flags.needs_dedicated_thread(), flags.is_high_priority()) {
            (true, true) => QueueKind::DedicatedHigh,
            (true, false) => QueueKind::DedicatedNormal,
            (false, true) => QueueKind::GeneralHigh,
            (false, false) => QueueKind::GeneralNormal,
        }
    }
}

/// Scan order for a worker advertising a main/GPU capability.
const DEDICATED_SCAN: [QueueKind; 4] = [
    QueueKind::DedicatedHigh,
    QueueKind::DedicatedNormal,
    QueueKind::GeneralHigh,
    QueueKind::GeneralNormal,
];

/// Scan order for a plain pool worker.
const GENERAL_SCAN: [QueueKind; 2] = [QueueKind::GeneralHigh, QueueKind::GeneralNormal];

/// Four FIFOs split by {dedicated thread, any thread} x {high, normal}.
///
/// Not synchronized; the scheduler guards it with its single queue mutex.
#[derive(Default)]
pub(crate) struct QueueSet {
    dedicated_high: VecDeque<BoxedTask>,
    dedicated_normal: VecDeque<BoxedTask>,
    general_high: VecDeque<BoxedTask>,
    general_normal: VecDeque<BoxedTask>,
}

impl QueueSet {
    fn queue_mut(&mut self, kind: QueueKind) -> &mut VecDeque<BoxedTask> {
        match kind {
            QueueKind::DedicatedHigh => &mut self.dedicated_high,
            QueueKind::DedicatedNormal => &mut self.dedicated_normal,
            QueueKind::GeneralHigh => &mut self.general_high,
            QueueKind::GeneralNormal => &mut self.general_normal,
        }
    }

    /// Appends `task` to the tail of the queue its current flags select.
    pub(crate) fn push(&mut self, task: BoxedTask) -> QueueKind {
        let kind = QueueKind::classify(task.flags());
        self.queue_mut(kind).push_back(task);
        kind
    }

    /// Removes the first task, in scan order, that a worker advertising
    /// `capabilities` may run.
    ///
    /// O(queue length): tasks the worker cannot satisfy are skipped, not
    /// reordered.
    pub(crate) fn pop_eligible(&mut self, capabilities: TaskFlags) -> Option<BoxedTask> {
        let order: &[QueueKind] = if capabilities.needs_dedicated_thread() {
            &DEDICATED_SCAN
        } else {
            &GENERAL_SCAN
        };

        for &kind in order {
            let queue = self.queue_mut(kind);
            if let Some(index) = queue
                .iter()
                .position(|task| task.flags().satisfied_by(capabilities))
            {
                return queue.remove(index);
            }
        }
        None
    }

    pub(crate) fn counts(&self) -> QueueCounts {
        QueueCounts {
            dedicated_high: self.dedicated_high.len(),
            dedicated_normal: self.dedicated_normal.len(),
            general_high: self.general_high.len(),
            general_normal: self.general_normal.len(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.counts().total()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes every queued task. The caller drops them after releasing the lock.
    pub(crate) fn drain(&mut self) -> Vec<BoxedTask> {
        let mut drained = Vec::with_capacity(self.len());
        for kind in DEDICATED_SCAN {
            drained.extend(self.queue_mut(kind).drain(..));
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Scheduler, TaskError, TaskStatus};

    struct Tagged {
        tag: &'static str,
        flags: TaskFlags,
    }

    impl Task for Tagged {
        fn flags(&self) -> TaskFlags {
            self.flags
        }

        fn run(&mut self, _scheduler: &Scheduler) -> Result<TaskStatus, TaskError> {
            Ok(TaskStatus::Done)
        }

        fn name(&self) -> &str {
            self.tag
        }
    }

    fn push(queues: &mut QueueSet, tag: &'static str, flags: TaskFlags) -> QueueKind {
        queues.push(Box::new(Tagged { tag, flags }))
    }

    fn pop(queues: &mut QueueSet, capabilities: TaskFlags) -> Option<String> {
        queues
            .pop_eligible(capabilities)
            .map(|task| task.name().to_owned())
    }

    #[test]
    fn classify_by_affinity_and_priority() {
        let mut queues = QueueSet::default();
        assert_eq!(push(&mut queues, "a", TaskFlags::NONE), QueueKind::GeneralNormal);
        assert_eq!(push(&mut queues, "b", TaskFlags::HIGH_PRIORITY), QueueKind::GeneralHigh);
        assert_eq!(push(&mut queues, "c", TaskFlags::GPU_THREAD), QueueKind::DedicatedNormal);
        assert_eq!(
            push(&mut queues, "d", TaskFlags::MAIN_THREAD | TaskFlags::HIGH_PRIORITY),
            QueueKind::DedicatedHigh
        );
        assert_eq!(
            queues.counts(),
            QueueCounts {
                dedicated_high: 1,
                dedicated_normal: 1,
                general_high: 1,
                general_normal: 1,
            }
        );
    }

    #[test]
    fn general_worker_never_sees_dedicated_tasks() {
        let mut queues = QueueSet::default();
        push(&mut queues, "main", TaskFlags::MAIN_THREAD | TaskFlags::HIGH_PRIORITY);
        push(&mut queues, "gpu", TaskFlags::GPU_THREAD);

        assert!(queues.pop_eligible(TaskFlags::NONE).is_none());
        assert_eq!(queues.len(), 2);
    }

    #[test]
    fn dedicated_worker_scans_dedicated_high_first() {
        let mut queues = QueueSet::default();
        push(&mut queues, "general", TaskFlags::NONE);
        push(&mut queues, "general-high", TaskFlags::HIGH_PRIORITY);
        push(&mut queues, "gpu", TaskFlags::GPU_THREAD);
        push(&mut queues, "gpu-high", TaskFlags::GPU_THREAD | TaskFlags::HIGH_PRIORITY);

        let caps = TaskFlags::MAIN_THREAD | TaskFlags::GPU_THREAD;
        assert_eq!(pop(&mut queues, caps).as_deref(), Some("gpu-high"));
        assert_eq!(pop(&mut queues, caps).as_deref(), Some("gpu"));
        assert_eq!(pop(&mut queues, caps).as_deref(), Some("general-high"));
        assert_eq!(pop(&mut queues, caps).as_deref(), Some("general"));
        assert!(queues.is_empty());
    }

    #[test]
    fn unsatisfied_tasks_are_skipped_in_place() {
        let mut queues = QueueSet::default();
        push(&mut queues, "gpu-1", TaskFlags::GPU_THREAD);
        push(&mut queues, "main", TaskFlags::MAIN_THREAD);
        push(&mut queues, "gpu-2", TaskFlags::GPU_THREAD);

        // A main-only worker takes the main task and leaves both GPU tasks queued.
        assert_eq!(pop(&mut queues, TaskFlags::MAIN_THREAD).as_deref(), Some("main"));
        assert!(queues.pop_eligible(TaskFlags::MAIN_THREAD).is_none());
        assert_eq!(queues.counts().dedicated_normal, 2);

        assert_eq!(pop(&mut queues, TaskFlags::GPU_THREAD).as_deref(), Some("gpu-1"));
        assert_eq!(pop(&mut queues, TaskFlags::GPU_THREAD).as_deref(), Some("gpu-2"));
    }

    #[test]
    fn fifo_within_a_queue() {
        let mut queues = QueueSet::default();
        for tag in ["one", "two", "three", "four"] {
            push(&mut queues, tag, TaskFlags::NONE);
        }

        let order: Vec<String> = std::iter::from_fn(|| pop(&mut queues, TaskFlags::NONE)).collect();
        assert_eq!(order, ["one", "two", "three", "four"]);
    }

    #[test]
    fn drain_empties_every_queue() {
        let mut queues = QueueSet::default();
        push(&mut queues, "a", TaskFlags::NONE);
        push(&mut queues, "b", TaskFlags::GPU_THREAD);
        push(&mut queues, "c", TaskFlags::HIGH_PRIORITY);

        assert_eq!(queues.drain().len(), 3);
        assert!(queues.is_empty());
    }
}
