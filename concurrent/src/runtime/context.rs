use crate::runtime::scheduler::Handle;
use crate::runtime::task::TaskId;

use std::cell::{Cell, RefCell};

thread_local! {
    /// Thread-local handle to the scheduler currently entered on this thread.
    ///
    /// Installed by [`enter_context`] for the duration of a scheduler loop or
    /// an explicit `enter`, so that timers and `Task::spawn` can reach the
    /// scheduler without explicit parameter passing.
    pub(crate) static CURRENT_SCHEDULER: RefCell<Option<Handle>> =
        const { RefCell::new(None) };

    /// Identifier of the task being polled on this thread, if any.
    pub(crate) static CURRENT_TASK: Cell<Option<TaskId>> = const { Cell::new(None) };
}

/// Restores the previous scheduler when dropped, even on unwind.
struct SchedulerGuard(Option<Handle>);

impl Drop for SchedulerGuard {
    fn drop(&mut self) {
        let prev = self.0.take();
        CURRENT_SCHEDULER.with(|cell| *cell.borrow_mut() = prev);
    }
}

/// Restores the previously running task when dropped.
struct TaskGuard(Option<TaskId>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        CURRENT_TASK.with(|cell| cell.set(self.0));
    }
}

/// Enters the execution context of a scheduler for the current thread.
///
/// The scheduler handle is installed for the duration of the closure `f`;
/// the previous context is restored afterwards.
pub(crate) fn enter_context<R>(handle: Handle, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_SCHEDULER.with(|cell| cell.borrow_mut().replace(handle));
    let _guard = SchedulerGuard(prev);

    f()
}

/// Marks `id` as the running task for the duration of `f`.
pub(crate) fn enter_task<R>(id: TaskId, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_TASK.with(|cell| cell.replace(Some(id)));
    let _guard = TaskGuard(prev);

    f()
}

/// Returns the scheduler entered on this thread, if any.
pub(crate) fn current_scheduler() -> Option<Handle> {
    CURRENT_SCHEDULER.with(|cell| cell.borrow().clone())
}

/// Returns `true` while a task body is being executed on this thread.
pub(crate) fn in_task() -> bool {
    CURRENT_TASK.with(|cell| cell.get().is_some())
}

/// Returns `true` when called from inside a running task.
///
/// # Examples
///
/// ```rust,ignore
/// assert!(!concurrent::task::is_running());
/// ```
pub fn is_running() -> bool {
    in_task()
}
