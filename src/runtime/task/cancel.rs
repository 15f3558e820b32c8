use crate::runtime::context;
use crate::runtime::task::TaskContext;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Cancellation state of a task: a sticky request flag plus a block
/// depth counting nested [`CancellationBlocker`] scopes.
pub(crate) struct CancelState {
    requested: AtomicBool,
    blocked: AtomicUsize,
}

impl CancelState {
    pub(crate) fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            blocked: AtomicUsize::new(0),
        }
    }

    pub(crate) fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub(crate) fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst) > 0
    }

    /// Whether a cancellation should fire right now: requested and not
    /// suppressed by a blocker scope.
    pub(crate) fn should_deliver(&self) -> bool {
        self.is_requested() && !self.is_blocked()
    }

    pub(crate) fn block(&self) {
        self.blocked.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn unblock(&self) {
        let previous = self.blocked.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "cancellation unblocked more times than blocked");
    }
}

/// Scoped suppression of cancellation delivery for the current task.
///
/// While at least one blocker is alive, a cancellation request is
/// recorded but not delivered: sleeps inside the scope cannot end with
/// [`WakeupSource::CancelRequest`](super::WakeupSource::CancelRequest).
/// The deferred request fires at the next cancellable sleep after the
/// last blocker is dropped.
///
/// Blockers nest; the scope ends when every blocker has been dropped.
pub struct CancellationBlocker {
    context: Arc<TaskContext>,
}

impl CancellationBlocker {
    /// Blocks cancellation delivery for the current task until drop.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread that is not hosting a task.
    pub fn new() -> Self {
        let context = context::current();
        context.cancel_state().block();
        log::trace!("task {}: cancellation blocked", context.id());
        Self { context }
    }
}

impl Default for CancellationBlocker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CancellationBlocker {
    fn drop(&mut self) {
        self.context.cancel_state().unblock();
        log::trace!("task {}: cancellation unblocked", self.context.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::task::{self, WakeupSource, spawn};
    use crate::runtime::wait::{EarlyWakeup, WaitStrategy};
    use crate::time::Deadline;
    use std::time::Duration;

    struct NoWakeups;

    impl WaitStrategy for NoWakeups {
        fn setup_wakeups(&self) -> EarlyWakeup {
            EarlyWakeup(false)
        }

        fn disable_wakeups(&self) {}
    }

    #[test]
    fn request_ends_a_cancellable_sleep() {
        let handle = spawn(|| {
            let current = task::current();
            current.sleep(&NoWakeups, Deadline::unreachable())
        });
        handle.context().request_cancel();
        assert_eq!(handle.join(), WakeupSource::CancelRequest);
    }

    #[test]
    fn pending_request_fires_before_the_next_sleep() {
        let handle = spawn(|| {
            let current = task::current();
            // Requesting against a task that is awake defers delivery.
            current.request_cancel();
            assert!(current.is_cancel_requested());
            current.sleep(&NoWakeups, Deadline::unreachable())
        });
        assert_eq!(handle.join(), WakeupSource::CancelRequest);
    }

    #[test]
    fn blocker_defers_delivery_until_the_scope_ends() {
        let handle = spawn(|| {
            let current = task::current();
            let first = {
                let _no_cancels = CancellationBlocker::new();
                current.sleep(&NoWakeups, Deadline::after(Duration::from_millis(20)))
            };
            let second = current.sleep(&NoWakeups, Deadline::unreachable());
            (first, second)
        });

        handle.context().request_cancel();
        let (first, second) = handle.join();

        // Inside the scope the sleep runs to its deadline; the deferred
        // request fires at the first cancellable sleep afterwards.
        assert_eq!(first, WakeupSource::Deadline);
        assert_eq!(second, WakeupSource::CancelRequest);
    }

    #[test]
    fn blockers_nest() {
        let handle = spawn(|| {
            let current = task::current();
            let outer = CancellationBlocker::new();
            {
                let _inner = CancellationBlocker::new();
            }
            assert!(current.cancel_state().is_blocked());
            drop(outer);
            assert!(!current.cancel_state().is_blocked());
        });
        handle.join();
    }
}
