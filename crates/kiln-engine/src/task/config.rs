/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker threads are named `<prefix>-<index>`; the names show up in logs
    /// and failure reports.
    pub thread_name_prefix: String,

    /// Stack size for spawned workers. `None` keeps the platform default.
    pub thread_stack_size: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "kiln-worker".to_string(),
            thread_stack_size: None,
        }
    }
}

impl SchedulerConfig {
    pub(crate) fn thread_name(&self, index: usize) -> String {
        format!("{}-{index}", self.thread_name_prefix)
    }
}
