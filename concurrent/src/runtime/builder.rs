use super::scheduler::TaskScheduler;
use crate::error::{Error, ErrorHook, default_hook};

use std::sync::Arc;

/// Builder for configuring and creating a scheduler.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = TaskScheduler::builder()
///     .error_hook(|error| eprintln!("lost failure: {error}"))
///     .build();
/// ```
pub struct SchedulerBuilder {
    /// Receives failures of tasks nobody observed.
    hook: ErrorHook,
}

impl SchedulerBuilder {
    /// Creates a builder with the default configuration.
    ///
    /// By default, unobserved failures are reported with `tracing::error!`.
    pub fn new() -> Self {
        Self {
            hook: default_hook(),
        }
    }

    /// Sets the hook invoked when a task fails and no continuation ever
    /// observed the failure.
    pub fn error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.hook = Arc::new(hook);
        self
    }

    pub(crate) fn shared_hook(mut self, hook: ErrorHook) -> Self {
        self.hook = hook;
        self
    }

    /// Builds the scheduler.
    pub fn build(self) -> TaskScheduler {
        TaskScheduler::with_hook(self.hook)
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
