//! Internal utilities.
//!
//! Small data structures shared by the scheduler that are not part of the
//! public API.

pub(crate) mod slab;

pub(crate) use slab::Slab;
