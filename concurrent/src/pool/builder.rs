use super::{Bootstrap, ThreadPool};
use crate::error::{Error, ErrorHook, default_hook};
use crate::runtime::scheduler::TaskScheduler;

use std::io;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

/// Builder for configuring and creating a [`ThreadPool`].
///
/// # Examples
///
/// ```rust,ignore
/// let pool = ThreadPool::builder()
///     .size(4)
///     .queue_capacity(64)
///     .thread_name("io")
///     .build()?;
/// ```
pub struct ThreadPoolBuilder {
    /// Number of worker threads.
    pub(crate) size: usize,

    /// Run once on every worker before it accepts work.
    pub(crate) bootstrap: Option<Bootstrap>,

    /// Capacity of the submission queue; `None` means unbounded.
    pub(crate) capacity: Option<usize>,

    /// Prefix of worker thread names.
    pub(crate) name: String,

    /// Receives job and task failures nobody observed.
    pub(crate) hook: ErrorHook,
}

impl ThreadPoolBuilder {
    /// Creates a builder with the default configuration.
    ///
    /// By default:
    /// - one worker per available CPU,
    /// - an unbounded submission queue,
    /// - unobserved failures reported with `tracing::error!`.
    pub fn new() -> Self {
        Self {
            size: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            bootstrap: None,
            capacity: None,
            name: "concurrent-worker".to_string(),
            hook: default_hook(),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn size(mut self, n: usize) -> Self {
        assert!(n > 0, "thread pool size must be greater than zero");
        self.size = n;
        self
    }

    /// Sets the per-thread initialization callback.
    ///
    /// It receives the worker's own scheduler, which is entered for the
    /// duration of the call, so it may start tasks there.
    pub fn bootstrap<F>(mut self, bootstrap: F) -> Self
    where
        F: Fn(&TaskScheduler) + Send + Sync + 'static,
    {
        self.bootstrap = Some(Arc::new(bootstrap));
        self
    }

    /// Bounds the submission queue to `capacity` pending items.
    ///
    /// Submitting to a full queue fails with [`Error::QueueFull`].
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than zero");
        self.capacity = Some(capacity);
        self
    }

    /// Sets the prefix of worker thread names; workers are named
    /// `{prefix}-{index}`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.name = prefix.into();
        self
    }

    /// Sets the hook invoked with failures that no continuation observed.
    pub fn error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.hook = Arc::new(hook);
        self
    }

    /// Spawns the workers and returns the pool.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the first worker thread that failed to
    /// spawn. Workers already started are shut down first.
    pub fn build(self) -> io::Result<ThreadPool> {
        ThreadPool::spawn(self)
    }
}

impl Default for ThreadPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
