use super::cancel::CancelState;
use crate::runtime::context;
use crate::runtime::wait::WaitStrategy;
use crate::time::Deadline;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

/// The reason a suspended task resumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WakeupSource {
    /// Woken intentionally by the primitive the task was waiting on.
    WaitList,
    /// The sleep deadline was reached.
    Deadline,
    /// A cancellation request was delivered.
    CancelRequest,
    /// Initial wakeup handed to a task before it has waited on anything.
    Bootstrap,
    /// A wakeup with no associated reason.
    Spurious,
}

impl WakeupSource {
    /// True iff the wait ended because the awaited primitive woke the
    /// task, as opposed to a deadline, a cancellation, or a stray wakeup.
    pub fn has_wait_succeeded(self) -> bool {
        matches!(self, WakeupSource::WaitList)
    }
}

/// Signal slot a sleeping task parks on.
///
/// `armed` is true from just before the wait strategy registers wakeups
/// until the sleep commits its outcome; only an armed slot accepts a
/// wakeup. The first source to land wins.
struct SleepSignal {
    armed: bool,
    source: Option<WakeupSource>,
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity and suspension state of a cooperatively-scheduled task.
///
/// A `TaskContext` is shared between the task it describes and whoever
/// may wake that task. Identity is the address of the context (contexts
/// are never moved out of their `Arc`), with a numeric [`id`](Self::id)
/// for display.
///
/// The suspension protocol is two-phase. [`sleep`](Self::sleep) arms the
/// signal slot *before* asking the wait strategy to register wakeups, so
/// a wakeup delivered between registration and parking is recorded
/// rather than lost. Once the sleep commits an outcome (a delivered
/// wakeup, the deadline, or cancellation), late wakeups bounce off and
/// report non-delivery.
pub struct TaskContext {
    id: u64,
    signal: Mutex<SleepSignal>,
    wakeup_cv: Condvar,
    cancel: CancelState,
}

impl TaskContext {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            signal: Mutex::new(SleepSignal {
                armed: false,
                source: None,
            }),
            wakeup_cv: Condvar::new(),
            cancel: CancelState::new(),
        }
    }

    /// Numeric identifier of the task, unique within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this context belongs to the task executing on this thread.
    pub fn is_current(&self) -> bool {
        context::try_current().is_some_and(|current| std::ptr::eq(current.as_ref(), self))
    }

    /// Suspends the current task until `strategy` reports completion, a
    /// wakeup is delivered, or `deadline` is reached.
    ///
    /// The sequence is:
    ///
    /// 1. the signal slot is armed;
    /// 2. `strategy.setup_wakeups()` runs; a `true` early wakeup means
    ///    the awaited condition was met while registering and the task
    ///    does not park;
    /// 3. the task parks until a source lands in the slot or the
    ///    deadline passes;
    /// 4. `strategy.disable_wakeups()` de-registers the task, making
    ///    stale wakeups impossible after return.
    ///
    /// An already-reached deadline returns [`WakeupSource::Deadline`]
    /// without consulting the strategy at all, and a pending deliverable
    /// cancellation returns [`WakeupSource::CancelRequest`] the same way.
    ///
    /// # Panics
    ///
    /// Panics if called for a context other than the current task's: a
    /// task may only put itself to sleep.
    pub fn sleep(&self, strategy: &dyn WaitStrategy, deadline: Deadline) -> WakeupSource {
        assert!(self.is_current(), "a task may only put itself to sleep");

        if deadline.is_reached() {
            return WakeupSource::Deadline;
        }

        // Arm under the signal lock; a cancellation racing with the arm
        // either lands here or is observed by the flag check.
        {
            let mut signal = self.signal.lock().unwrap();
            signal.armed = true;
            signal.source = None;
            if self.cancel.should_deliver() {
                signal.armed = false;
                return WakeupSource::CancelRequest;
            }
        }

        let early = strategy.setup_wakeups();
        if early.0 {
            self.disarm();
            strategy.disable_wakeups();
            return WakeupSource::WaitList;
        }

        log::trace!("task {} parking", self.id);
        let source = self.park(deadline);
        log::trace!("task {} woke up: {:?}", self.id, source);

        strategy.disable_wakeups();
        source
    }

    /// Disarms the slot, discarding a source that landed in the window.
    fn disarm(&self) {
        let mut signal = self.signal.lock().unwrap();
        signal.armed = false;
        signal.source = None;
    }

    fn park(&self, deadline: Deadline) -> WakeupSource {
        let mut signal = self.signal.lock().unwrap();
        loop {
            if let Some(source) = signal.source.take() {
                signal.armed = false;
                return source;
            }
            match deadline.time_left() {
                None => {
                    signal = self.wakeup_cv.wait(signal).unwrap();
                }
                Some(left) if left.is_zero() => {
                    signal.armed = false;
                    return WakeupSource::Deadline;
                }
                Some(left) => {
                    signal = self.wakeup_cv.wait_timeout(signal, left).unwrap().0;
                }
            }
        }
    }

    /// Delivers a wakeup to this task.
    ///
    /// Returns true iff the task was armed for sleep and no other source
    /// had landed yet; the task will then return from its sleep with
    /// `source`. A stale wakeup (the sleep already committed another
    /// outcome, or the task is not sleeping at all) is dropped and
    /// reported as undelivered, which lets the waker redirect it.
    ///
    /// A [`WakeupSource::CancelRequest`] is additionally dropped while
    /// the task is inside a cancellation-blocked region.
    pub fn wakeup(&self, source: WakeupSource) -> bool {
        let mut signal = self.signal.lock().unwrap();
        if source == WakeupSource::CancelRequest && self.cancel.is_blocked() {
            return false;
        }
        if signal.armed && signal.source.is_none() {
            signal.source = Some(source);
            self.wakeup_cv.notify_one();
            true
        } else {
            false
        }
    }

    /// Requests cooperative cancellation of this task.
    ///
    /// The request is sticky. If the task is sleeping and cancellation
    /// is not blocked, a [`WakeupSource::CancelRequest`] wakeup is
    /// delivered immediately; otherwise the request is deferred and
    /// fires at the task's next cancellable sleep.
    pub fn request_cancel(&self) {
        self.cancel.request();
        if !self.wakeup(WakeupSource::CancelRequest) {
            log::trace!("task {}: cancellation deferred", self.id);
        }
    }

    /// Whether cancellation has been requested, delivered or not.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_requested()
    }

    pub(crate) fn cancel_state(&self) -> &CancelState {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::task::{self, spawn};
    use crate::runtime::wait::EarlyWakeup;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct NoWakeups;

    impl WaitStrategy for NoWakeups {
        fn setup_wakeups(&self) -> EarlyWakeup {
            EarlyWakeup(false)
        }

        fn disable_wakeups(&self) {}
    }

    #[test]
    fn task_ids_are_distinct() {
        let a = TaskContext::new();
        let b = TaskContext::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn is_current_only_inside_the_task() {
        let handle = spawn(|| {
            assert!(task::current().is_current());
        });
        assert!(!handle.context().is_current());
        handle.join();
    }

    #[test]
    fn wakeup_outside_of_sleep_is_not_delivered() {
        let context = TaskContext::new();
        assert!(!context.wakeup(WakeupSource::WaitList));
        assert!(!context.wakeup(WakeupSource::Spurious));
    }

    #[test]
    fn delivered_source_ends_the_sleep() {
        let handle = spawn(|| {
            let current = task::current();
            current.sleep(&NoWakeups, Deadline::unreachable())
        });
        // Keep delivering until the sleeper is armed; an early wakeup
        // aimed at a task that has not parked yet must bounce, not land.
        while !handle.context().wakeup(WakeupSource::Bootstrap) {
            std::thread::yield_now();
        }
        assert_eq!(handle.join(), WakeupSource::Bootstrap);
    }

    #[test]
    fn second_wakeup_loses_the_race() {
        let handle = spawn(|| {
            let current = task::current();
            current.sleep(&NoWakeups, Deadline::unreachable())
        });
        while !handle.context().wakeup(WakeupSource::Spurious) {
            std::thread::yield_now();
        }
        assert!(!handle.context().wakeup(WakeupSource::WaitList));
        assert_eq!(handle.join(), WakeupSource::Spurious);
    }

    #[test]
    fn deadline_commits_when_nothing_arrives() {
        let source = spawn(|| {
            let current = task::current();
            current.sleep(&NoWakeups, Deadline::after(Duration::from_millis(10)))
        })
        .join();
        assert_eq!(source, WakeupSource::Deadline);
    }

    #[test]
    fn reached_deadline_skips_the_strategy() {
        struct Untouchable;

        impl WaitStrategy for Untouchable {
            fn setup_wakeups(&self) -> EarlyWakeup {
                panic!("strategy consulted for an already-reached deadline");
            }

            fn disable_wakeups(&self) {
                panic!("strategy consulted for an already-reached deadline");
            }
        }

        let source = spawn(|| {
            let current = task::current();
            current.sleep(&Untouchable, Deadline::passed())
        })
        .join();
        assert_eq!(source, WakeupSource::Deadline);
    }

    #[test]
    fn early_wakeup_skips_the_park() {
        struct Immediate {
            disabled: Arc<AtomicUsize>,
        }

        impl WaitStrategy for Immediate {
            fn setup_wakeups(&self) -> EarlyWakeup {
                EarlyWakeup(true)
            }

            fn disable_wakeups(&self) {
                self.disabled.fetch_add(1, Ordering::SeqCst);
            }
        }

        let disabled = Arc::new(AtomicUsize::new(0));
        let observed = disabled.clone();
        let source = spawn(move || {
            let current = task::current();
            current.sleep(
                &Immediate { disabled: observed },
                Deadline::unreachable(),
            )
        })
        .join();
        assert_eq!(source, WakeupSource::WaitList);
        assert_eq!(disabled.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "only put itself to sleep")]
    fn sleeping_another_task_is_fatal() {
        let foreign = spawn(|| std::thread::sleep(Duration::from_millis(50)));
        let context = foreign.context().clone();
        spawn(move || {
            context.sleep(&NoWakeups, Deadline::unreachable());
        })
        .join();
    }
}
