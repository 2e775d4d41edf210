//! Timers and time-based combinators.
//!
//! This module provides the timer subsystem of the scheduler:
//! - [`Timer`], a leaf awaitable that completes after a duration,
//! - [`timeout`], which races an awaitable against a timer.
//!
//! Pending timers live in the timer wheel of the scheduler they were first
//! awaited on, and fire during that scheduler's `run`.

mod timeout;
mod timer;

pub(crate) mod wheel;

#[doc(inline)]
pub use timeout::{Timeout, timeout};

#[doc(inline)]
pub use timer::Timer;

pub(crate) use timer::TimerShared;
