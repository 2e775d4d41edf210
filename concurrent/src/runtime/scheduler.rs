use super::builder::SchedulerBuilder;
use crate::awaitable::Awaitable;
use crate::error::{Error, ErrorHook, Outcome};
use crate::runtime::context::enter_context;
use crate::runtime::context::enter_task;
use crate::runtime::queue::WakeQueue;
use crate::runtime::task::waker::make_waker;
use crate::runtime::task::{Runnable, Task, TaskId, TaskState};
use crate::time::TimerShared;
use crate::time::wheel::{Expiry, TimerWheel};
use crate::utils::Slab;

use crossbeam::channel::Sender;
use parking_lot::Mutex;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::Context;
use std::time::Instant;

/// Shared handle to the state of a scheduler.
///
/// Handles never leave the scheduler's thread; other threads reach the
/// scheduler only through its [`WakeQueue`].
pub(crate) type Handle = Rc<Core>;

/// A live task and the sequence number it was started with.
struct Entry {
    seq: u64,
    task: Rc<dyn Runnable>,
}

/// State of one cooperative loop.
pub(crate) struct Core {
    /// Live (started, non-terminal) tasks.
    tasks: RefCell<Slab<Entry>>,

    /// Tasks eligible to run, in FIFO order.
    ready: RefCell<VecDeque<TaskId>>,

    /// Pending timers ordered by deadline.
    timers: RefCell<TimerWheel<Rc<TimerShared>>>,

    /// Thread-safe wakeups routed back to this loop.
    wakeups: Arc<WakeQueue>,

    /// Receives failures nobody observed.
    hook: ErrorHook,

    /// Set while `run` or `block_on` drives the loop.
    running: Cell<bool>,

    /// Sequence number of the next started task.
    next_seq: Cell<u64>,
}

/// What the loop does once no task is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    /// Return immediately.
    Never,

    /// Sleep until pending timers are due; return when none remain.
    Timers,

    /// Park until a timer is due or a wakeup arrives from another thread.
    Forever,
}

/// Clears the running flag when the loop exits, even on unwind.
struct LoopGuard<'a>(&'a Cell<bool>);

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Core {
    fn new(hook: ErrorHook) -> Self {
        Self {
            tasks: RefCell::new(Slab::new()),
            ready: RefCell::new(VecDeque::new()),
            timers: RefCell::new(TimerWheel::new()),
            wakeups: Arc::new(WakeQueue::new()),
            hook,
            running: Cell::new(false),
            next_seq: Cell::new(0),
        }
    }

    /// Enqueues a freshly created task.
    pub(crate) fn start(&self, task: Rc<dyn Runnable>) -> Result<TaskId, Error> {
        if task.state() != TaskState::Created {
            return Err(Error::DuplicateStart);
        }

        task.attach(self.hook.clone());

        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let index = self.tasks.borrow_mut().insert(Entry {
            seq,
            task: task.clone(),
        });
        let id = TaskId { index, seq };

        task.set_state(TaskState::Ready);
        self.ready.borrow_mut().push_back(id);

        tracing::trace!(?id, "task started");
        Ok(id)
    }

    /// Inserts a timer into the wheel.
    pub(crate) fn schedule_timer(
        &self,
        deadline: Instant,
        cancelled: Arc<AtomicBool>,
        timer: Rc<TimerShared>,
    ) {
        self.timers.borrow_mut().insert(deadline, cancelled, timer);
    }

    fn lookup(&self, id: TaskId) -> Option<Rc<dyn Runnable>> {
        self.tasks
            .borrow()
            .get(id.index)
            .filter(|entry| entry.seq == id.seq)
            .map(|entry| entry.task.clone())
    }

    /// Moves every woken, suspended task onto the ready queue.
    ///
    /// Wakeups for tasks that are not suspended (already ready, finished,
    /// or replaced in their slot) are ignored.
    fn apply_wakeups(&self) {
        for id in self.wakeups.drain() {
            let Some(task) = self.lookup(id) else {
                continue;
            };

            if task.state() == TaskState::Suspended {
                task.set_state(TaskState::Ready);
                self.ready.borrow_mut().push_back(id);
            }
        }
    }

    /// Fires every due timer and settles cancelled ones.
    fn fire_timers(&self) {
        let expired = self.timers.borrow_mut().pop_expired(Instant::now());

        for (timer, expiry) in expired {
            match expiry {
                Expiry::Fired => {
                    tracing::trace!("timer fired");
                    timer.settle(Ok(()));
                }
                Expiry::Cancelled => timer.settle(Err(Error::Disposed)),
            }
        }
    }

    /// Resumes one ready task until it finishes or suspends.
    fn poll_task(&self, id: TaskId) {
        let Some(task) = self.lookup(id) else {
            return;
        };

        if task.state() != TaskState::Ready {
            return;
        }

        task.set_state(TaskState::Running);

        let waker = make_waker(self.wakeups.clone(), id);
        let mut cx = Context::from_waker(&waker);

        let finished = enter_task(id, || task.context().run(|| task.poll(&mut cx)));

        if finished {
            // The slab borrow ends before the entry is dropped, so the
            // task's destructor may use the scheduler.
            let entry = self.tasks.borrow_mut().remove(id.index);
            drop(entry);
        } else if task.state() == TaskState::Running {
            tracing::trace!(?id, "task suspended");
            task.set_state(TaskState::Suspended);
        }
    }

    /// Drives the loop.
    ///
    /// Processes wakeups, due timers and the ready queue until `done`
    /// returns `true` or nothing is left to do. What happens once the ready
    /// queue is empty depends on `wait`.
    fn drive(&self, done: &dyn Fn() -> bool, wait: Wait) {
        loop {
            if done() {
                return;
            }

            self.apply_wakeups();
            self.fire_timers();
            self.apply_wakeups();

            let next = self.ready.borrow_mut().pop_front();

            if let Some(id) = next {
                self.poll_task(id);
                continue;
            }

            if done() {
                return;
            }

            let deadline = self.next_deadline();

            match (wait, deadline) {
                (Wait::Never, _) | (Wait::Timers, None) => return,
                _ => self.wakeups.park(deadline),
            }
        }
    }

    /// Deadline of the earliest pending timer.
    fn next_deadline(&self) -> Option<Instant> {
        self.timers.borrow().next_deadline()
    }

    fn begin(&self) -> Result<LoopGuard<'_>, Error> {
        if self.running.replace(true) {
            return Err(Error::Misuse("scheduler is already running"));
        }

        Ok(LoopGuard(&self.running))
    }
}

impl Drop for Core {
    /// Disposes every task and timer still pending.
    ///
    /// Their continuations receive [`Error::Disposed`] instead of being
    /// dropped silently.
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().drain();
        let timers = self.timers.get_mut().drain();

        if !tasks.is_empty() {
            tracing::debug!(count = tasks.len(), "disposing live tasks");
        }

        for entry in tasks {
            entry.task.dispose();
        }

        for timer in timers {
            timer.settle(Err(Error::Disposed));
        }
    }
}

/// A single-threaded cooperative task scheduler.
///
/// `TaskScheduler` is responsible for:
/// - holding the ready queue of started tasks,
/// - resuming tasks until they finish or suspend on an awaitable,
/// - owning the timer wheel and firing due timers,
/// - receiving wakeups from other threads (pool jobs) safely.
///
/// There is no global scheduler: every thread that wants cooperative
/// scheduling owns its own instance. Dropping the scheduler disposes the
/// tasks and timers it still holds.
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = TaskScheduler::new();
///
/// scheduler.start(&Task::new(async {
///     Timer::from_millis(10).await_timeout().await?;
///     Ok(())
/// }))?;
///
/// scheduler.run()?;
/// ```
pub struct TaskScheduler {
    core: Handle,
}

impl TaskScheduler {
    /// Creates a scheduler with the default configuration.
    pub fn new() -> Self {
        SchedulerBuilder::new().build()
    }

    /// Returns a builder to configure a scheduler.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub(crate) fn with_hook(hook: ErrorHook) -> Self {
        Self {
            core: Rc::new(Core::new(hook)),
        }
    }

    /// Enqueues `task` on the ready queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateStart`] if the task has already been
    /// started, on this or any other scheduler.
    pub fn start<T: Clone + 'static>(&self, task: &Task<T>) -> Result<(), Error> {
        self.core.start(task.core.clone())?;
        Ok(())
    }

    /// Runs ready tasks and due timers until there is nothing left to do.
    ///
    /// Tasks run in FIFO order, each until it finishes or suspends. When
    /// only timers are pending, the thread sleeps until they are due.
    /// Tasks suspended on awaitables that settle elsewhere (pool jobs,
    /// deferreds) do not keep `run` waiting: call `run` again once they
    /// have settled, or use [`block_on`](Self::block_on).
    ///
    /// Calling `run` on an idle scheduler returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Misuse`] if the scheduler is already running on
    /// this thread (re-entrant call from a task body).
    pub fn run(&self) -> Result<(), Error> {
        let _guard = self.core.begin()?;

        enter_context(self.core.clone(), || self.core.drive(&|| false, Wait::Timers));
        Ok(())
    }

    /// Drives the loop until `awaitable` settles and returns its outcome.
    ///
    /// Unlike [`run`](Self::run), this parks the thread while waiting for
    /// completions from other threads. It never returns if the awaitable
    /// cannot settle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Misuse`] if the scheduler is already running, or if
    /// `awaitable` is a task that was never started.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let job = pool.submit(|| Ok("Hello"))?;
    /// assert_eq!(scheduler.block_on(job)?, "Hello");
    /// ```
    pub fn block_on<A>(&self, awaitable: A) -> Outcome<A::Output>
    where
        A: Awaitable,
        A::Output: Send + 'static,
    {
        let _guard = self.core.begin()?;

        if awaitable.is_unstarted() {
            return Err(Error::Misuse("block_on called on a task that was never started"));
        }

        let slot = Arc::new(Mutex::new(None));
        let landing = slot.clone();
        let wakeups = self.core.wakeups.clone();

        enter_context(self.core.clone(), || {
            awaitable.continue_with(Box::new(move |outcome| {
                *landing.lock() = Some(outcome);
                wakeups.notify();
            }));

            self.core.drive(&|| slot.lock().is_some(), Wait::Forever);
        });

        let outcome = slot.lock().take();
        outcome.ok_or(Error::Misuse("block_on returned before the awaitable settled"))?
    }

    /// Runs whatever is ready or due right now, without sleeping.
    ///
    /// Returns the deadline of the earliest timer still pending, so the
    /// caller can wait for it alongside its own event sources.
    pub(crate) fn turn(&self) -> Result<Option<Instant>, Error> {
        let _guard = self.core.begin()?;

        enter_context(self.core.clone(), || self.core.drive(&|| false, Wait::Never));
        Ok(self.core.next_deadline())
    }

    /// Rings `doorbell` whenever another thread wakes a task of this
    /// scheduler.
    pub(crate) fn set_doorbell(&self, doorbell: Sender<()>) {
        self.core.wakeups.set_doorbell(doorbell);
    }

    /// Runs `f` with this scheduler entered on the current thread.
    ///
    /// Inside `f`, [`Task::spawn`] starts tasks here and timers register
    /// with this scheduler's wheel.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        enter_context(self.core.clone(), f)
    }

    /// Number of started tasks that have not reached a terminal state.
    pub fn live_tasks(&self) -> usize {
        self.core.tasks.borrow().len()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}
