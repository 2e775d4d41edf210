use crate::awaitable::{Awaitable, Continuation};
use crate::sync::completion::Completion;

use std::fmt;
use std::sync::Arc;

/// Handle to work submitted to a [`ThreadPool`](super::ThreadPool).
///
/// A `Job` is the only awaitable whose completion crosses threads: the work
/// runs on a worker thread, while continuations are usually registered
/// from a task on the submitting thread. Delivery happens exactly once per
/// continuation, whichever side gets there first.
///
/// Continuations registered before the work finishes run on the worker
/// thread; those registered afterwards run on the registering thread.
pub struct Job<T> {
    pub(crate) completion: Arc<Completion<T>>,
}

impl<T: Clone + Send + 'static> Job<T> {
    /// Returns `true` once the work has finished.
    pub fn is_settled(&self) -> bool {
        self.completion.is_settled()
    }
}

impl<T: Clone + Send + 'static> Awaitable for Job<T> {
    type Output = T;

    fn continue_with(&self, continuation: Continuation<T>) {
        self.completion.subscribe(continuation);
    }
}

impl<T> Clone for Job<T> {
    fn clone(&self) -> Self {
        Self {
            completion: self.completion.clone(),
        }
    }
}

impl<T: Clone> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("settled", &self.completion.is_settled())
            .finish()
    }
}
