use super::TaskState;
use crate::awaitable::{Awaitable, Continuation, Delivery};
use crate::error::{Error, ErrorHook, Outcome};
use crate::local::Context;
use crate::runtime::context::current_scheduler;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{self, Poll};

/// Type-erased view of a task used by the scheduler.
///
/// The `Runnable` trait abstracts the specific return type of a task,
/// allowing a scheduler to manage a heterogeneous collection of tasks
/// through `Rc<dyn Runnable>`.
pub(crate) trait Runnable {
    /// Current lifecycle state.
    fn state(&self) -> TaskState;

    /// Overwrites the lifecycle state.
    fn set_state(&self, state: TaskState);

    /// The task-local context the body runs in.
    fn context(&self) -> Context;

    /// Installs the hook used to report a failure nobody observed.
    fn attach(&self, hook: ErrorHook);

    /// Resumes the body. Returns `true` once the task is terminal.
    fn poll(&self, cx: &mut task::Context<'_>) -> bool;

    /// Drops the body of a live task and fails it with [`Error::Disposed`].
    fn dispose(&self);
}

/// Shared state of a task.
pub(crate) struct TaskCore<T> {
    /// Current lifecycle state.
    state: Cell<TaskState>,

    /// The body; `None` once the task is terminal.
    future: RefCell<Option<Pin<Box<dyn Future<Output = Outcome<T>>>>>>,

    /// Stored outcome, set exactly once on reaching a terminal state.
    result: RefCell<Option<Outcome<T>>>,

    /// Continuations awaiting delivery, in registration order.
    continuations: RefCell<Vec<Continuation<T>>>,

    /// Set while `settle` is running continuations.
    delivering: Cell<bool>,

    /// Task-local context captured at creation.
    context: Context,

    /// Whether the outcome has been handed to anyone.
    observed: Cell<bool>,

    /// Failure hook of the scheduler the task was started on.
    hook: RefCell<Option<ErrorHook>>,
}

impl<T: Clone + 'static> TaskCore<T> {
    /// Moves the task to its terminal state and delivers `outcome` to every
    /// registered continuation, in registration order.
    ///
    /// Continuations registered while delivery is in progress are queued
    /// behind the pending ones rather than run ahead of them.
    fn settle(&self, outcome: Outcome<T>) {
        self.state.set(if outcome.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        });

        *self.result.borrow_mut() = Some(outcome.clone());
        self.delivering.set(true);

        let mut delivery = Delivery::default();

        loop {
            let continuations = mem::take(&mut *self.continuations.borrow_mut());

            if continuations.is_empty() {
                break;
            }

            self.observed.set(true);

            for continuation in continuations {
                delivery.call(continuation, outcome.clone());
            }
        }

        self.delivering.set(false);
        delivery.finish();
    }

    fn register(&self, continuation: Continuation<T>) {
        let settled = self.result.borrow().clone();

        match settled {
            Some(outcome) if !self.delivering.get() => {
                self.observed.set(true);
                continuation(outcome);
            }
            _ => self.continuations.borrow_mut().push(continuation),
        }
    }
}

impl<T: Clone + 'static> Runnable for TaskCore<T> {
    fn state(&self) -> TaskState {
        self.state.get()
    }

    fn set_state(&self, state: TaskState) {
        self.state.set(state);
    }

    fn context(&self) -> Context {
        self.context.clone()
    }

    fn attach(&self, hook: ErrorHook) {
        *self.hook.borrow_mut() = Some(hook);
    }

    fn poll(&self, cx: &mut task::Context<'_>) -> bool {
        let mut slot = self.future.borrow_mut();

        let Some(future) = slot.as_mut() else {
            return true;
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(cx))) {
            Ok(Poll::Pending) => return false,
            Ok(Poll::Ready(outcome)) => outcome,
            Err(payload) => Err(Error::from_panic(payload)),
        };

        *slot = None;
        drop(slot);

        match &outcome {
            Ok(_) => tracing::trace!("task completed"),
            Err(error) => tracing::debug!(%error, "task failed"),
        }

        self.settle(outcome);
        true
    }

    fn dispose(&self) {
        if self.state.get().is_terminal() {
            return;
        }

        // Dropping the body may run arbitrary destructors; keep the borrow
        // short so they can still inspect the task.
        let body = self.future.borrow_mut().take();
        drop(body);

        self.settle(Err(Error::Disposed));
    }
}

impl<T> Drop for TaskCore<T> {
    /// Surfaces a failure that no continuation ever observed.
    fn drop(&mut self) {
        if self.observed.get() {
            return;
        }

        if let Some(Err(error)) = self.result.get_mut() {
            if matches!(error, Error::Disposed) {
                return;
            }

            if let Some(hook) = self.hook.get_mut() {
                hook(error);
            }
        }
    }
}

/// A suspendable unit of cooperative work.
///
/// A `Task` wraps a body (a future producing an [`Outcome`]) and is driven
/// by a [`TaskScheduler`](crate::TaskScheduler). It is itself an
/// [`Awaitable`]: any number of continuations may be registered on it, and
/// they all receive the outcome once the task completes or fails.
///
/// Cloning a `Task` clones the handle, not the work.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = TaskScheduler::new();
/// let task = Task::new(async { Ok(2 + 3) });
///
/// scheduler.start(&task)?;
/// scheduler.run()?;
///
/// assert_eq!(task.outcome().unwrap()?, 5);
/// ```
pub struct Task<T> {
    pub(crate) core: Rc<TaskCore<T>>,
}

impl<T: Clone + 'static> Task<T> {
    /// Creates a task in the [`Created`](TaskState::Created) state.
    ///
    /// The body captures the task-local [`Context`] that is current at
    /// creation time. Nothing runs until the task is started.
    pub fn new<F>(body: F) -> Self
    where
        F: Future<Output = Outcome<T>> + 'static,
    {
        Self::with_context(Context::current(), body)
    }

    /// Creates a task whose body runs in `context`.
    pub fn with_context<F>(context: Context, body: F) -> Self
    where
        F: Future<Output = Outcome<T>> + 'static,
    {
        Self {
            core: Rc::new(TaskCore {
                state: Cell::new(TaskState::Created),
                future: RefCell::new(Some(Box::pin(body))),
                result: RefCell::new(None),
                continuations: RefCell::new(Vec::new()),
                delivering: Cell::new(false),
                context,
                observed: Cell::new(false),
                hook: RefCell::new(None),
            }),
        }
    }

    /// Creates a task and starts it on the scheduler of the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Misuse`] when no scheduler is entered on this thread.
    pub fn spawn<F>(body: F) -> Result<Self, Error>
    where
        F: Future<Output = Outcome<T>> + 'static,
    {
        Self::spawn_with_context(Context::current(), body)
    }

    /// Like [`spawn`](Self::spawn), with the body running in `context`.
    pub fn spawn_with_context<F>(context: Context, body: F) -> Result<Self, Error>
    where
        F: Future<Output = Outcome<T>> + 'static,
    {
        let handle = current_scheduler().ok_or(Error::Misuse(
            "spawn must be called within the context of a scheduler",
        ))?;

        let task = Self::with_context(context, body);
        handle.start(task.core.clone())?;

        Ok(task)
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.core.state.get()
    }

    /// Returns `true` once the task has completed or failed.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Returns a clone of the outcome if the task is terminal.
    ///
    /// Reading the outcome counts as observing it.
    pub fn outcome(&self) -> Option<Outcome<T>> {
        let outcome = self.core.result.borrow().clone();

        if outcome.is_some() {
            self.core.observed.set(true);
        }

        outcome
    }
}

impl<T: Clone + 'static> Awaitable for Task<T> {
    type Output = T;

    /// Registers an observer of the task's outcome.
    ///
    /// Invoked immediately if the task is already terminal; otherwise it is
    /// queued behind previously registered continuations. Does not affect
    /// scheduling.
    fn continue_with(&self, continuation: Continuation<T>) {
        self.core.register(continuation);
    }

    fn is_unstarted(&self) -> bool {
        self.state() == TaskState::Created
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("state", &self.core.state.get())
            .finish_non_exhaustive()
    }
}
