//! # Concurrent
//!
//! **Concurrent** is a cooperative task scheduler for the **Nebula**
//! ecosystem: single-threaded tasks with explicit suspension points,
//! timers, and a worker-thread pool whose results are awaited from the
//! cooperative loop.
//!
//! Every thread that wants cooperative scheduling owns its own
//! [`TaskScheduler`]; there is no global runtime. Tasks run one at a time,
//! in FIFO order, and only yield when they await something. Parallelism
//! exists only across the workers of a [`ThreadPool`], and the only state
//! crossing threads is a job's completion and a scheduler's wakeup queue.
//!
//! It offers:
//!
//! - **Tasks** wrapping a body that produces an [`Outcome`]
//! - **The [`Awaitable`] capability**, shared by tasks, timers, jobs,
//!   deferreds and user types
//! - **Timers** fired in deadline order, plus a [`timeout`] combinator
//! - **A thread pool** bridging blocking work back into the loop
//! - **Task-local [`Context`]** variables
//! - **Macros** `#[concurrent::main]` and `#[concurrent::test]`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use concurrent::{Task, TaskScheduler, ThreadPool, Timer, await_on};
//!
//! fn main() -> Result<(), concurrent::Error> {
//!     let scheduler = TaskScheduler::new();
//!     let pool = ThreadPool::new(2, |_| {})?;
//!
//!     let job = pool.submit(|| Ok("Hello"))?;
//!     let task = Task::new(async move {
//!         Timer::from_millis(50).await_timeout().await?;
//!         await_on(job).await
//!     });
//!
//!     scheduler.start(&task)?;
//!     println!("{}", scheduler.block_on(task)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: Task handles, lifecycle states and task introspection
//! - [`time`]: Timers and the timeout combinator

mod awaitable;
mod error;
mod local;
mod pool;
mod runtime;
mod sync;
mod utils;

pub mod time;

pub use awaitable::{Await, Awaitable, Continuation, await_on};
pub use error::{Error, ErrorHook, Outcome};
pub use local::{Context, ContextVar};
pub use pool::{Job, ThreadPool, ThreadPoolBuilder};
pub use runtime::builder::SchedulerBuilder;
pub use runtime::scheduler::TaskScheduler;
pub use runtime::task;
pub use runtime::task::{Task, TaskState};
pub use runtime::yield_now::yield_now;
pub use sync::Deferred;
pub use time::{Timer, timeout};

pub use concurrent_macros::*;
