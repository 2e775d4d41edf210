use crate::awaitable::{Awaitable, Continuation};
use crate::error::Error;
use crate::time::timer::Timer;

use parking_lot::Mutex;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Races `awaitable` against a timer of `duration`.
///
/// The returned awaitable settles with the outcome of `awaitable` if it
/// settles first, or with [`Error::TimedOut`] once the timer fires. The
/// loser is not interrupted: a late outcome is discarded, and the timer is
/// cancelled as soon as `awaitable` wins.
///
/// If the timer itself fails (no scheduler is entered, or the scheduler
/// is dropped first), that error is delivered instead.
///
/// # Examples
///
/// ```rust,ignore
/// match await_on(timeout(Duration::from_millis(50), job)).await {
///     Ok(value) => println!("{value}"),
///     Err(Error::TimedOut) => println!("too slow"),
///     Err(e) => return Err(e),
/// }
/// ```
pub fn timeout<A>(duration: Duration, awaitable: A) -> Timeout<A>
where
    A: Awaitable,
{
    Timeout {
        awaitable,
        timer: Timer::new(duration),
    }
}

/// Awaitable returned by [`timeout`].
pub struct Timeout<A> {
    awaitable: A,
    timer: Timer,
}

impl<A> Awaitable for Timeout<A>
where
    A: Awaitable,
    A::Output: Send + 'static,
{
    type Output = A::Output;

    fn continue_with(&self, continuation: Continuation<A::Output>) {
        let winner = Arc::new(Mutex::new(Some(continuation)));

        let on_timer = winner.clone();
        self.timer.continue_with(Box::new(move |outcome| {
            // Once the awaitable has won, the slot is empty and the
            // cancelled timer's outcome is dropped here.
            let continuation = on_timer.lock().take();

            let Some(continuation) = continuation else {
                return;
            };

            match outcome {
                Ok(()) => {
                    tracing::debug!("timeout elapsed");
                    continuation(Err(Error::TimedOut));
                }
                Err(error) => continuation(Err(error)),
            }
        }));

        let cancel = self.timer.cancel_flag();
        self.awaitable.continue_with(Box::new(move |outcome| {
            let continuation = winner.lock().take();

            if let Some(continuation) = continuation {
                cancel.store(true, Ordering::Release);
                continuation(outcome);
            }
        }));
    }
}
