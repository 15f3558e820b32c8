//! Wait strategies and wait lists.
//!
//! A primitive that needs to suspend a task expresses the suspension as
//! a [`WaitStrategy`]: the task host calls
//! [`setup_wakeups`](WaitStrategy::setup_wakeups) after the task is
//! marked as about to sleep but before it parks, and
//! [`disable_wakeups`](WaitStrategy::disable_wakeups) once the sleep
//! ends. Running the registration inside that window is what makes a
//! lost wakeup impossible: the primitive re-checks its state and
//! enqueues the task while the two are jointly consistent.
//!
//! The wait-list containers the strategies enqueue into live here too:
//! a locked FIFO for the general case and a single-slot atomic cell for
//! primitives that can guarantee at most one concurrent waiter.

mod light;
mod list;
mod strategy;

pub use strategy::{EarlyWakeup, WaitStrategy};

pub(crate) use light::WaitListLight;
pub(crate) use list::{WaitList, WaitersScopeCounter};
