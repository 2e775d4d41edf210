use super::completion::Completion;
use crate::awaitable::{Awaitable, Continuation};
use crate::error::{Error, ErrorHook, Outcome, default_hook};

use std::fmt;
use std::sync::Arc;

/// An awaitable settled explicitly by user code, from any thread.
///
/// `Deferred` is the building block for custom awaitables: hand a clone to
/// the producer, await another clone in a task. The first call to
/// [`resolve`](Self::resolve) or [`fail`](Self::fail) wins; later calls
/// are ignored.
///
/// # Examples
///
/// ```rust,ignore
/// let deferred = Deferred::new();
/// let producer = deferred.clone();
///
/// std::thread::spawn(move || producer.resolve(321));
///
/// let task = Task::new(async move { Ok(2 * await_on(deferred).await?) });
/// ```
pub struct Deferred<T> {
    completion: Arc<Completion<T>>,
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// Creates an unsettled deferred.
    pub fn new() -> Self {
        Self::with_hook(default_hook())
    }

    /// Creates an unsettled deferred reporting unobserved failures to
    /// `hook`.
    pub fn with_hook(hook: ErrorHook) -> Self {
        Self {
            completion: Arc::new(Completion::new(hook)),
        }
    }

    /// Settles with a value. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settles with an error. Returns `false` if already settled.
    pub fn fail(&self, error: Error) -> bool {
        self.settle(Err(error))
    }

    /// Settles with `outcome`. Returns `false` if already settled.
    pub fn settle(&self, outcome: Outcome<T>) -> bool {
        self.completion.complete(outcome)
    }

    /// Returns `true` once settled.
    pub fn is_settled(&self) -> bool {
        self.completion.is_settled()
    }
}

impl<T: Clone + Send + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Awaitable for Deferred<T> {
    type Output = T;

    fn continue_with(&self, continuation: Continuation<T>) {
        self.completion.subscribe(continuation);
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            completion: self.completion.clone(),
        }
    }
}

impl<T: Clone> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.completion.is_settled())
            .finish()
    }
}
