//! Thread-safe awaitables.
//!
//! - [`Deferred`]: an awaitable settled by user code from any thread.
//!
//! Both `Deferred` and pool jobs are built on the same one-shot,
//! lock-guarded completion cell.

mod deferred;

pub(crate) mod completion;

pub use deferred::Deferred;
