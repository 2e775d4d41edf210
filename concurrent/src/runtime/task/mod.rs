//! Cooperative task primitives.
//!
//! This module defines the core abstractions used by a scheduler to
//! represent, resume, and observe cooperative tasks.
//!
//! It includes:
//! - task state management,
//! - wakers that route wakeups back to the owning scheduler,
//! - the [`Task`] handle and the type-erased runnable view of it.

pub(crate) mod core;
pub(crate) mod state;
pub(crate) mod waker;

pub(crate) use self::core::Runnable;

pub use self::core::Task;
pub use crate::runtime::context::is_running;
pub use state::TaskState;

/// Identifies a live task inside one scheduler.
///
/// `index` addresses the slot holding the task; `seq` is unique per start,
/// so a stale wakeup for a finished task never reaches the task that
/// reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TaskId {
    pub(crate) index: usize,
    pub(crate) seq: u64,
}
