//! Core runtime components.
//!
//! This module contains the cooperative scheduler and the task machinery it
//! drives.
//!
//! It is responsible for:
//! - resuming tasks in FIFO order until they finish or suspend,
//! - routing wakeups from any thread back to the owning scheduler,
//! - providing the per-thread scheduler context,
//! - enabling cooperative multitasking via yielding.

mod queue;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod scheduler;
pub(crate) mod yield_now;

pub mod task;
