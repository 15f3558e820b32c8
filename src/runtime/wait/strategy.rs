/// Outcome of [`WaitStrategy::setup_wakeups`].
///
/// `EarlyWakeup(true)` means the awaited condition was met while
/// registering: the task host returns from the sleep immediately
/// instead of parking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EarlyWakeup(pub bool);

/// Two-phase suspension contract between a primitive and the task host.
///
/// [`TaskContext::sleep`](crate::task::TaskContext::sleep) drives the
/// strategy: `setup_wakeups` runs after the task is armed for sleep but
/// before it parks, under whatever synchronization the primitive needs;
/// `disable_wakeups` runs when the sleep ends, on every path, and must
/// de-register the task so that no stale wakeup can target it
/// afterwards. Tokens held by the strategy (such as waiter-count
/// scopes) are released by its drop.
pub trait WaitStrategy {
    /// Re-checks the awaited condition and registers the task for
    /// wakeups when it has to sleep.
    fn setup_wakeups(&self) -> EarlyWakeup;

    /// De-registers the task from any wait list it was appended to.
    fn disable_wakeups(&self);
}
