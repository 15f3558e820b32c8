//! Core runtime components.
//!
//! This module contains the substrate the synchronization primitives are
//! built on:
//!
//! - hosting tasks and tracking which task executes on a thread,
//! - the suspend/resume state machine of a task,
//! - cooperative cancellation,
//! - the wait-strategy protocol and the wait-list containers primitives
//!   park their contenders in.
//!
//! Most users will interact with the primitives in [`crate::sync`] and
//! the free functions in [`crate::time`] rather than using these
//! components directly.

pub(crate) mod context;

pub mod task;
pub mod wait;
