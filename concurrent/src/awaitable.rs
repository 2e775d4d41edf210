//! The awaitable capability and the intrinsic `await` operation.
//!
//! Everything a task can suspend on implements [`Awaitable`]: tasks,
//! timers, pool jobs, deferreds, and any user-defined type. An awaitable
//! settles exactly once and hands its [`Outcome`] to every continuation
//! registered on it.

use crate::error::{Error, Outcome};
use crate::runtime::context;

use parking_lot::Mutex;

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// A callback invoked exactly once with the outcome of an awaitable.
///
/// Continuations are `Send` because a [`Job`](crate::Job) completes
/// on a worker thread and runs its continuations there.
pub type Continuation<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

/// Anything that can settle once and notify continuations.
///
/// Registering a continuation on an awaitable that has already settled
/// invokes it immediately, on the caller's stack, with the stored outcome.
/// Implementations must never drop a registered continuation without
/// calling it once the awaitable settles.
///
/// # Examples
///
/// ```rust,ignore
/// struct Ready(u32);
///
/// impl Awaitable for Ready {
///     type Output = u32;
///
///     fn continue_with(&self, continuation: Continuation<u32>) {
///         continuation(Ok(self.0));
///     }
/// }
/// ```
pub trait Awaitable {
    /// The value produced on success.
    type Output;

    /// Registers `continuation` to be invoked once this awaitable settles.
    fn continue_with(&self, continuation: Continuation<Self::Output>);

    /// Returns `true` while nothing can settle this awaitable until it is
    /// started, as with a task never handed to a scheduler.
    fn is_unstarted(&self) -> bool {
        false
    }
}

/// Runs a batch of continuations so that a panicking one cannot starve the
/// rest.
///
/// Every continuation is invoked; the first panic is re-raised by
/// [`finish`](Self::finish) once delivery is over.
#[derive(Default)]
pub(crate) struct Delivery {
    panic: Option<Box<dyn Any + Send>>,
}

impl Delivery {
    /// Invokes `continuation` with `outcome`, holding back a panic.
    pub(crate) fn call<T>(&mut self, continuation: Continuation<T>, outcome: Outcome<T>) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| continuation(outcome))) {
            self.panic.get_or_insert(payload);
        }
    }

    /// Re-raises the first panic caught during delivery, if any.
    pub(crate) fn finish(self) {
        if let Some(payload) = self.panic {
            panic::resume_unwind(payload);
        }
    }
}

/// Suspends the running task until `awaitable` settles.
///
/// Resolves to the delivered value, or to the delivered error at the await
/// point. If the awaitable has already settled the task continues without
/// yielding to the scheduler.
///
/// Awaiting outside of a running task resolves to [`Error::Misuse`].
///
/// # Examples
///
/// ```rust,ignore
/// let task = Task::new(async {
///     let value = await_on(job).await?;
///     Ok(value * 2)
/// });
/// ```
pub fn await_on<A>(awaitable: A) -> Await<A>
where
    A: Awaitable,
    A::Output: Send + 'static,
{
    Await {
        awaitable: Some(awaitable),
        slot: None,
    }
}

/// Shared landing place for an outcome and the waker of the suspended task.
struct Slot<T> {
    outcome: Option<Outcome<T>>,
    waker: Option<Waker>,
}

/// Future returned by [`await_on`].
pub struct Await<A: Awaitable> {
    /// The awaitable, taken on first poll when the continuation is registered.
    awaitable: Option<A>,

    /// Set once the continuation has been registered.
    slot: Option<Arc<Mutex<Slot<A::Output>>>>,
}

// The awaitable is never pinned: it is only borrowed to register a
// continuation and then dropped.
impl<A: Awaitable> Unpin for Await<A> {}

impl<A> Future for Await<A>
where
    A: Awaitable,
    A::Output: Send + 'static,
{
    type Output = Outcome<A::Output>;

    /// Registers the continuation on first poll, then waits for it.
    ///
    /// The slot lock orders the two sides: the continuation either runs
    /// before the waker is stored (and the outcome is picked up here), or
    /// after it (and wakes the task).
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(awaitable) = this.awaitable.take() {
            if !context::in_task() {
                return Poll::Ready(Err(Error::Misuse(
                    "await must be called from within a running task",
                )));
            }

            let slot = Arc::new(Mutex::new(Slot {
                outcome: None,
                waker: None,
            }));
            let landing = slot.clone();

            awaitable.continue_with(Box::new(move |outcome| {
                let waker = {
                    let mut slot = landing.lock();
                    slot.outcome = Some(outcome);
                    slot.waker.take()
                };

                if let Some(waker) = waker {
                    waker.wake();
                }
            }));

            this.slot = Some(slot);
        }

        let Some(slot) = this.slot.as_ref() else {
            return Poll::Ready(Err(Error::Misuse("await polled after completion")));
        };

        let mut guard = slot.lock();

        if let Some(outcome) = guard.outcome.take() {
            drop(guard);
            this.slot = None;
            return Poll::Ready(outcome);
        }

        guard.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}
