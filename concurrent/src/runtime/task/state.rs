/// Lifecycle state of a [`Task`](super::Task).
///
/// ```text
/// Created ──start──▶ Ready ──resume──▶ Running ──return──▶ Completed
///                      ▲                  │    └──raise───▶ Failed
///                      └────wakeup─── Suspended ◀─await──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// The task exists but has not been handed to a scheduler.
    Created,

    /// The task sits in a scheduler's ready queue.
    Ready,

    /// The task body is being executed.
    ///
    /// At most one task per scheduler observes this state at a time.
    Running,

    /// The task awaits an awaitable that has not settled yet.
    Suspended,

    /// The body returned a value.
    Completed,

    /// The body returned an error or panicked.
    Failed,
}

impl TaskState {
    /// Returns `true` for [`Completed`](Self::Completed) and
    /// [`Failed`](Self::Failed).
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}
