use crate::runtime::task::TaskId;

use crossbeam::channel::Sender;
use parking_lot::{Condvar, Mutex};

use std::collections::VecDeque;
use std::time::Instant;

/// Thread-safe wakeup queue of a scheduler.
///
/// This is the only path by which another thread (or a continuation running
/// anywhere) can make a task ready again. Wakers push the identifier of the
/// suspended task here; the owning scheduler drains the queue on its own
/// thread and moves the tasks onto its ready queue.
///
/// It also lets the scheduler thread park while it waits for timers or
/// cross-thread completions.
pub(crate) struct WakeQueue {
    /// Pending wakeups plus a bare notification flag.
    state: Mutex<WakeState>,

    /// Condition variable used to unpark the scheduler thread.
    condvar: Condvar,
}

struct WakeState {
    /// Identifiers of tasks woken since the last drain, in arrival order.
    woken: VecDeque<TaskId>,

    /// Set by [`WakeQueue::notify`] when no task needs waking.
    notified: bool,

    /// Rung on every wakeup, for owners that wait on a channel instead of
    /// parking on the condvar.
    doorbell: Option<Sender<()>>,
}

impl WakeState {
    fn ring(&self) {
        if let Some(doorbell) = &self.doorbell {
            // A full doorbell already has a ring pending.
            let _ = doorbell.try_send(());
        }
    }
}

impl WakeQueue {
    /// Creates an empty wakeup queue.
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(WakeState {
                woken: VecDeque::new(),
                notified: false,
                doorbell: None,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Records a wakeup for `id` and unparks the scheduler thread.
    pub(crate) fn push(&self, id: TaskId) {
        let mut state = self.state.lock();
        state.woken.push_back(id);
        state.ring();
        drop(state);

        self.condvar.notify_one();
    }

    /// Unparks the scheduler thread without waking any task.
    pub(crate) fn notify(&self) {
        let mut state = self.state.lock();
        state.notified = true;
        state.ring();
        drop(state);

        self.condvar.notify_one();
    }

    /// Installs a channel rung on every later wakeup.
    pub(crate) fn set_doorbell(&self, doorbell: Sender<()>) {
        self.state.lock().doorbell = Some(doorbell);
    }

    /// Takes every pending wakeup, in arrival order.
    pub(crate) fn drain(&self) -> Vec<TaskId> {
        self.state.lock().woken.drain(..).collect()
    }

    /// Parks the current thread until a wakeup or notification arrives,
    /// or until `deadline` passes.
    ///
    /// Returns immediately if something is already pending, so a wakeup
    /// sent between the last drain and this call is never missed.
    pub(crate) fn park(&self, deadline: Option<Instant>) {
        let mut state = self.state.lock();

        if state.woken.is_empty() && !state.notified {
            match deadline {
                Some(deadline) => {
                    let _ = self.condvar.wait_until(&mut state, deadline);
                }
                None => self.condvar.wait(&mut state),
            }
        }

        state.notified = false;
    }
}
