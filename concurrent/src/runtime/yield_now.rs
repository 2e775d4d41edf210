use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that yields execution back to the scheduler exactly once.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    /// On the first poll, the task wakes itself and returns
    /// `Poll::Pending`, which puts it at the back of the ready queue.
    /// On the second poll, the future completes.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.0 {
            self.0 = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        Poll::Ready(())
    }
}

/// Yields execution back to the scheduler.
///
/// Tasks never yield implicitly; a long-running body can call this to let
/// the other ready tasks of its scheduler make progress.
///
/// # Examples
///
/// ```rust,ignore
/// Task::new(async {
///     for chunk in work {
///         process(chunk);
///         yield_now().await;
///     }
///     Ok(())
/// });
/// ```
pub async fn yield_now() {
    YieldOnce(false).await
}
