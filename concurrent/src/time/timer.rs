use crate::awaitable::{Awaitable, Continuation, Delivery, await_on};
use crate::error::{Error, Outcome};
use crate::runtime::context::current_scheduler;

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Registration state of a timer.
enum TimerState {
    /// Not yet registered with any scheduler.
    Idle,

    /// Registered in a wheel; continuations wait for the deadline.
    Armed(Vec<Continuation<()>>),

    /// Fired or cancelled.
    Settled(Outcome<()>),
}

/// Shared state of a [`Timer`], also held by the scheduler's wheel.
pub(crate) struct TimerShared {
    duration: Duration,
    state: RefCell<TimerState>,

    /// Cancellation flag shared with the wheel entry.
    cancelled: Arc<AtomicBool>,
}

impl TimerShared {
    /// Settles the timer, delivering `outcome` to every continuation.
    ///
    /// Settling an already settled timer is a no-op.
    pub(crate) fn settle(&self, outcome: Outcome<()>) {
        let continuations = {
            let mut state = self.state.borrow_mut();

            if matches!(*state, TimerState::Settled(_)) {
                return;
            }

            match mem::replace(&mut *state, TimerState::Settled(outcome.clone())) {
                TimerState::Armed(continuations) => continuations,
                _ => Vec::new(),
            }
        };

        let mut delivery = Delivery::default();

        for continuation in continuations {
            delivery.call(continuation, outcome.clone());
        }

        delivery.finish();
    }
}

/// A leaf awaitable that completes once a duration has elapsed.
///
/// A timer registers nothing on creation. The first continuation (or the
/// first await) inserts it into the wheel of the scheduler entered on the
/// current thread, with a deadline of registration time plus duration. It
/// then completes exactly once, with `Ok(())`, during a scheduler pass that
/// observes the deadline.
///
/// Timers with equal deadlines fire in registration order.
///
/// # Examples
///
/// ```rust,ignore
/// let task = Task::new(async {
///     Timer::from_millis(100).await_timeout().await?;
///     Ok("done")
/// });
/// ```
#[derive(Clone)]
pub struct Timer {
    shared: Rc<TimerShared>,
}

impl Timer {
    /// Creates a timer that fires `duration` after it is first awaited.
    pub fn new(duration: Duration) -> Self {
        Self {
            shared: Rc::new(TimerShared {
                duration,
                state: RefCell::new(TimerState::Idle),
                cancelled: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Creates a timer from a duration in milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// The configured duration.
    pub fn duration(&self) -> Duration {
        self.shared.duration
    }

    /// Returns `true` once the timer has fired or been cancelled.
    pub fn is_settled(&self) -> bool {
        matches!(*self.shared.state.borrow(), TimerState::Settled(_))
    }

    /// Suspends the running task until the timer fires.
    pub async fn await_timeout(&self) -> Outcome<()> {
        await_on(self.clone()).await
    }

    /// Cancels the timer.
    ///
    /// A cancelled timer never fires and no longer keeps its scheduler
    /// waiting. Continuations still pending receive [`Error::Disposed`].
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
        self.shared.settle(Err(Error::Disposed));
    }

    /// Flag that cancels the timer from any thread.
    ///
    /// Setting it only marks the wheel entry; pending continuations are
    /// settled by the owning scheduler on its next pass.
    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.shared.cancelled.clone()
    }
}

impl Awaitable for Timer {
    type Output = ();

    fn continue_with(&self, continuation: Continuation<()>) {
        let settled = match &*self.shared.state.borrow() {
            TimerState::Settled(outcome) => Some(outcome.clone()),
            _ => None,
        };

        if let Some(outcome) = settled {
            continuation(outcome);
            return;
        }

        let mut state = self.shared.state.borrow_mut();

        if let TimerState::Armed(continuations) = &mut *state {
            continuations.push(continuation);
            return;
        }

        let Some(handle) = current_scheduler() else {
            drop(state);
            continuation(Err(Error::Misuse(
                "timers must be awaited within the context of a scheduler",
            )));
            return;
        };

        let deadline = Instant::now() + self.shared.duration;
        *state = TimerState::Armed(vec![continuation]);
        drop(state);

        tracing::trace!(duration = ?self.shared.duration, "timer armed");
        handle.schedule_timer(deadline, self.shared.cancelled.clone(), self.shared.clone());
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("duration", &self.shared.duration)
            .field("settled", &self.is_settled())
            .finish()
    }
}
