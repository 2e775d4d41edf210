use crate::runtime::queue::WakeQueue;
use crate::runtime::task::TaskId;

use std::sync::Arc;
use std::task::{Wake, Waker};

/// Waker of a task, bound to the wakeup queue of its scheduler.
///
/// Waking never touches the scheduler's ready queue directly: it only
/// records the task identifier in the thread-safe [`WakeQueue`], which the
/// scheduler drains on its own thread. This makes the waker safe to use
/// from worker threads.
struct TaskWaker {
    /// Wakeup queue of the scheduler owning the task.
    queue: Arc<WakeQueue>,

    /// The task to wake.
    id: TaskId,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.queue.push(self.id);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.queue.push(self.id);
    }
}

/// Creates a [`Waker`] that reschedules task `id` on its scheduler.
pub(crate) fn make_waker(queue: Arc<WakeQueue>, id: TaskId) -> Waker {
    Waker::from(Arc::new(TaskWaker { queue, id }))
}
