use bitflags::bitflags;

bitflags! {
    /// Affinity and priority requirements of a task.
    ///
    /// The same type doubles as the capability set a worker advertises: a
    /// worker created with `MAIN_THREAD | GPU_THREAD` may run tasks that
    /// require either. `HIGH_PRIORITY` carries no meaning as a capability.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TaskFlags: u32 {
        /// No affinity, normal priority.
        const NONE = 0;
        /// Must run on the thread that owns the UI/event loop.
        const MAIN_THREAD = 1 << 0;
        /// Must run on the thread that owns the GPU context.
        const GPU_THREAD = 1 << 1;
        /// Preferred over normal-priority tasks eligible for the same worker.
        const HIGH_PRIORITY = 1 << 2;
    }
}

impl TaskFlags {
    /// Bits that pin a task to a designated thread.
    pub const DEDICATED: Self = Self::MAIN_THREAD.union(Self::GPU_THREAD);

    /// Returns the thread-affinity subset of these flags.
    #[inline]
    pub fn required(self) -> Self {
        self.intersection(Self::DEDICATED)
    }

    /// Returns `true` if a designated thread is required (or, for a worker,
    /// advertised).
    #[inline]
    pub fn needs_dedicated_thread(self) -> bool {
        self.intersects(Self::DEDICATED)
    }

    #[inline]
    pub fn is_high_priority(self) -> bool {
        self.contains(Self::HIGH_PRIORITY)
    }

    /// Returns `true` if a worker advertising `capabilities` may run a task
    /// carrying these flags.
    #[inline]
    pub fn satisfied_by(self, capabilities: TaskFlags) -> bool {
        capabilities.contains(self.required())
    }
}
