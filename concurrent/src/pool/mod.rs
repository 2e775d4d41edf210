//! Worker-thread pool.
//!
//! This module lets blocking code run off the cooperative loop while its
//! result is still awaited from a task.
//!
//! It is composed of:
//! - [`ThreadPool`]: the workers and the shared submission queue,
//! - [`ThreadPoolBuilder`]: pool configuration,
//! - [`Job`]: the awaitable handle of one submitted item.

mod builder;
mod core;
mod job;
mod worker;

pub use self::core::ThreadPool;
pub use builder::ThreadPoolBuilder;
pub use job::Job;

use crate::runtime::scheduler::TaskScheduler;

use std::sync::Arc;

/// Type-erased unit of work sent to the workers.
pub(crate) type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Per-worker initialization callback.
pub(crate) type Bootstrap = Arc<dyn Fn(&TaskScheduler) + Send + Sync + 'static>;
