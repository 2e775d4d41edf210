use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

/// The outcome delivered to every continuation.
///
/// `Ok(value)` is a successful completion, `Err(error)` a failure. Each
/// awaitable settles exactly once and hands a clone of its outcome to every
/// registered continuation.
pub type Outcome<T> = Result<T, Error>;

/// Errors produced by tasks, timers, jobs and the scheduler itself.
///
/// The error is cheap to clone so that a single failure can fan out to any
/// number of continuations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The body of a task or pool job returned an error.
    #[error("task body failed: {0}")]
    Body(Arc<dyn StdError + Send + Sync + 'static>),

    /// The body of a task or pool job panicked.
    #[error("task body panicked: {0}")]
    Panicked(String),

    /// A task was handed to `start` while already started.
    #[error("task has already been started")]
    DuplicateStart,

    /// The runtime was used outside of the context it requires.
    #[error("scheduler misuse: {0}")]
    Misuse(&'static str),

    /// Work was submitted to a pool that has been closed.
    #[error("thread pool is closed")]
    PoolClosed,

    /// The bounded submission queue of a pool is full.
    #[error("thread pool submission queue is full")]
    QueueFull,

    /// A timeout elapsed before the awaited operation settled.
    #[error("operation timed out")]
    TimedOut,

    /// A suspended task was dropped before it could finish.
    #[error("task has been disposed")]
    Disposed,
}

impl Error {
    /// Wraps an arbitrary error raised by a task body.
    ///
    /// ```rust,ignore
    /// Err(Error::failed(std::io::Error::other("boom")))
    /// ```
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Error::Body(Arc::from(error.into()))
    }

    /// Returns the wrapped body error if it is of type `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Error::Body(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Builds a [`Error::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Error::Panicked(message)
    }
}

/// Hook invoked with failures that no continuation ever observed.
pub type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync + 'static>;

/// The default hook: reports the failure through `tracing`.
pub(crate) fn default_hook() -> ErrorHook {
    Arc::new(|error: &Error| {
        tracing::error!(%error, "unobserved failure");
    })
}
