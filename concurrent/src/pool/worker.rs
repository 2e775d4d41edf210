use super::{Bootstrap, WorkItem};
use crate::error::{Error, ErrorHook};
use crate::runtime::scheduler::TaskScheduler;

use crossbeam::channel::{self, Receiver, select};

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// A worker thread of a [`ThreadPool`](super::ThreadPool).
///
/// Each worker owns an independent cooperative scheduler that lives and
/// dies with the thread. The execution loop is:
/// 1. Run the bootstrap once, with the scheduler entered
/// 2. Run every task of the scheduler that is ready or due
/// 3. Wait for a submission, a wakeup of one of its tasks, or the next
///    timer deadline, whichever comes first
/// 4. Run a received item inside the scheduler context, then loop
///
/// Once the submission queue is closed and drained, tasks that are ready
/// run one last time; tasks still suspended are disposed with the
/// scheduler.
pub(crate) struct Worker {
    /// Index of the worker within its pool.
    id: usize,

    /// Consumer side of the shared submission queue.
    receiver: Receiver<WorkItem>,

    /// Per-thread initialization, run before any item.
    bootstrap: Option<Bootstrap>,

    /// Hook for the worker's scheduler.
    hook: ErrorHook,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        receiver: Receiver<WorkItem>,
        bootstrap: Option<Bootstrap>,
        hook: ErrorHook,
    ) -> Self {
        Self {
            id,
            receiver,
            bootstrap,
            hook,
        }
    }

    /// Runs the worker loop until the submission queue is closed and
    /// drained.
    pub(crate) fn run(self) {
        let span = tracing::info_span!("worker", id = self.id);
        let _enter = span.enter();

        let scheduler = TaskScheduler::builder().shared_hook(self.hook).build();

        let (doorbell, wakeups) = channel::bounded(1);
        scheduler.set_doorbell(doorbell);

        if let Some(bootstrap) = &self.bootstrap {
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| scheduler.enter(|| bootstrap(&scheduler))));

            if let Err(payload) = result {
                let error = Error::from_panic(payload);
                tracing::error!(%error, "worker bootstrap panicked");
            }
        }

        tracing::debug!("worker started");

        loop {
            let deadline = turn(&scheduler);
            let timer = deadline.map_or_else(channel::never, channel::at);

            select! {
                recv(self.receiver) -> item => match item {
                    Ok(item) => execute(&scheduler, item),
                    Err(_) => break,
                },
                recv(wakeups) -> _ => {},
                recv(timer) -> _ => {},
            }
        }

        turn(&scheduler);

        tracing::debug!(pending = scheduler.live_tasks(), "worker stopped");
    }
}

/// Runs one submitted item with the worker's scheduler entered.
fn execute(scheduler: &TaskScheduler, item: WorkItem) {
    // Job panics are caught inside the item; this only sees panics from
    // continuations that ran during completion.
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| scheduler.enter(item))) {
        let error = Error::from_panic(payload);
        tracing::error!(%error, "job continuation panicked");
    }
}

/// Runs every ready task and due timer, returning the next deadline.
fn turn(scheduler: &TaskScheduler) -> Option<Instant> {
    match panic::catch_unwind(AssertUnwindSafe(|| scheduler.turn())) {
        Ok(Ok(deadline)) => deadline,
        Ok(Err(error)) => {
            tracing::warn!(%error, "worker scheduler did not run");
            None
        }
        // The panicking task is settled; the rest stay queued.
        Err(payload) => {
            let error = Error::from_panic(payload);
            tracing::error!(%error, "task continuation panicked");
            Some(Instant::now())
        }
    }
}
