use crate::awaitable::{Continuation, Delivery};
use crate::error::{ErrorHook, Outcome};

use parking_lot::Mutex;

use std::mem;

/// Delivery state of a completion.
enum State<T> {
    /// Not settled yet; continuations wait here in registration order.
    Pending(Vec<Continuation<T>>),

    /// Settled. `delivered` records whether any continuation received the
    /// outcome.
    Settled {
        outcome: Outcome<T>,
        delivered: bool,

        /// Registered while the settling thread was still delivering;
        /// that thread runs them after the earlier ones.
        queued: Vec<Continuation<T>>,

        /// Set while the settling thread runs continuations.
        delivering: bool,
    },
}

/// A one-shot outcome that may be settled and observed from any thread.
///
/// This is the only state in the runtime shared across threads besides the
/// wakeup queues. Settling and registering both go through one lock, so
/// whichever side comes second performs the delivery: a continuation
/// registered before settlement is invoked by the settling thread, one
/// registered after is invoked immediately by the registering thread.
/// Either way it runs exactly once, in registration order, and never while
/// the lock is held.
pub(crate) struct Completion<T> {
    state: Mutex<State<T>>,

    /// Receives a failure that no continuation ever observed.
    hook: ErrorHook,
}

impl<T: Clone> Completion<T> {
    /// Creates a pending completion.
    pub(crate) fn new(hook: ErrorHook) -> Self {
        Self {
            state: Mutex::new(State::Pending(Vec::new())),
            hook,
        }
    }

    /// Settles with `outcome` and runs the waiting continuations.
    ///
    /// Returns `false` if the completion was already settled, in which case
    /// `outcome` is discarded.
    pub(crate) fn complete(&self, outcome: Outcome<T>) -> bool {
        let mut continuations = {
            let mut state = self.state.lock();

            let State::Pending(waiting) = &mut *state else {
                return false;
            };

            let continuations = mem::take(waiting);
            *state = State::Settled {
                outcome: outcome.clone(),
                delivered: !continuations.is_empty(),
                queued: Vec::new(),
                delivering: true,
            };

            continuations
        };

        let mut delivery = Delivery::default();

        loop {
            for continuation in continuations {
                delivery.call(continuation, outcome.clone());
            }

            let mut state = self.state.lock();

            let State::Settled {
                delivered,
                queued,
                delivering,
                ..
            } = &mut *state
            else {
                break;
            };

            if queued.is_empty() {
                *delivering = false;
                break;
            }

            *delivered = true;
            continuations = mem::take(queued);
        }

        delivery.finish();
        true
    }

    /// Registers `continuation`, running it now if already settled.
    pub(crate) fn subscribe(&self, continuation: Continuation<T>) {
        let outcome = {
            let mut state = self.state.lock();

            match &mut *state {
                State::Pending(waiting) => {
                    waiting.push(continuation);
                    return;
                }
                State::Settled {
                    queued,
                    delivering: true,
                    ..
                } => {
                    queued.push(continuation);
                    return;
                }
                State::Settled { outcome, delivered, .. } => {
                    *delivered = true;
                    outcome.clone()
                }
            }
        };

        continuation(outcome);
    }

    /// Returns `true` once settled.
    pub(crate) fn is_settled(&self) -> bool {
        matches!(*self.state.lock(), State::Settled { .. })
    }
}

impl<T> Drop for Completion<T> {
    /// Surfaces a failure that no continuation ever observed.
    fn drop(&mut self) {
        if let State::Settled {
            outcome: Err(error),
            delivered: false,
            ..
        } = self.state.get_mut()
        {
            (self.hook)(error);
        }
    }
}
