//! Loader configuration.

/// Default number of worker units.
pub const DEFAULT_WORKER_COUNT: u32 = 4;

/// Settings for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Number of worker units to spawn.
    pub worker_count: u32,
    /// Events a worker may queue before it waits for the coordinator.
    pub event_capacity: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            event_capacity: 64,
        }
    }
}

impl LoaderConfig {
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: u32) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    #[must_use]
    pub fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity.max(1);
        self
    }
}
