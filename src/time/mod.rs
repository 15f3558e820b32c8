//! Deadlines and deadline-bounded suspension.
//!
//! This module provides the time vocabulary of the runtime:
//!
//! - [`Deadline`] for expressing "until when" a wait may run,
//! - [`sleep_until`] and [`sleep_for`] for suspending the current task.

mod deadline;

pub use deadline::Deadline;

use crate::runtime::context;
use crate::runtime::task::WakeupSource;
use crate::runtime::wait::{EarlyWakeup, WaitStrategy};

use std::time::Duration;

/// Wait strategy that registers no wakeups: only the deadline, a
/// cancellation request, or an explicitly targeted wakeup can end the
/// sleep.
struct TimerWaitStrategy;

impl WaitStrategy for TimerWaitStrategy {
    fn setup_wakeups(&self) -> EarlyWakeup {
        EarlyWakeup(false)
    }

    fn disable_wakeups(&self) {}
}

/// Suspends the current task until `deadline`.
///
/// Returns the reason the sleep ended: [`WakeupSource::Deadline`] when
/// the deadline was reached, [`WakeupSource::CancelRequest`] when a
/// cancellation was delivered first. An unreachable deadline makes the
/// sleep unbounded.
///
/// # Panics
///
/// Panics when called from a thread that is not hosting a task.
pub fn sleep_until(deadline: Deadline) -> WakeupSource {
    let current = context::current();
    current.sleep(&TimerWaitStrategy, deadline)
}

/// Suspends the current task for `duration`.
///
/// Shorthand for [`sleep_until`] with a deadline `duration` from now.
pub fn sleep_for(duration: Duration) -> WakeupSource {
    sleep_until(Deadline::after(duration))
}
