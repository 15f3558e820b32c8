use crate::runtime::context;
use crate::runtime::task::{CancellationBlocker, TaskContext};
use crate::runtime::wait::{
    EarlyWakeup, WaitList, WaitListLight, WaitStrategy, WaitersScopeCounter,
};
use crate::time::Deadline;

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::time::Duration;

/// Wait-list capability required by [`MutexImpl`].
///
/// Each variant supplies its own slow-path wait strategy (how a
/// contender re-checks the owner cell and enqueues itself without
/// losing a wakeup) and its own release-side wakeup.
pub(crate) trait Waiters: Default + Send + Sync + 'static {
    type Strategy<'a>: WaitStrategy
    where
        Self: 'a;

    /// Builds the slow-path wait strategy for `current`.
    fn strategy<'a>(
        mutex: &'a MutexImpl<Self>,
        current: &'a Arc<TaskContext>,
    ) -> Self::Strategy<'a>;

    /// Wakes one waiter after the owner cell has been cleared.
    fn wakeup_next(&self);
}

/// The mutex state machine shared by both wait-list variants.
///
/// State is an atomic owner cell plus a container of suspended
/// contenders:
///
/// - a null owner means the mutex is free;
/// - a non-null owner is the task that acquired and has not released;
/// - only the owning task may call [`unlock`](Self::unlock).
///
/// The owner pointer is compared by address only and never
/// dereferenced: a task stays alive for as long as it holds a lock.
///
/// Acquisition runs a single CAS fast path first and falls back to the
/// wait-strategy slow path under contention. Release clears the cell
/// and wakes one waiter; it does not hand ownership over, so the woken
/// waiter re-runs the acquisition CAS and may lose it to a fast-path
/// arrival, in which case it queues up again.
///
/// Precondition violations (locking twice from one task, releasing
/// from a non-owner, dropping while locked) are programming errors and
/// abort with a panic.
pub(crate) struct MutexImpl<W: Waiters> {
    owner: AtomicPtr<TaskContext>,
    waiters: W,
}

impl<W: Waiters> MutexImpl<W> {
    pub(crate) fn new() -> Self {
        Self {
            owner: AtomicPtr::new(ptr::null_mut()),
            waiters: W::default(),
        }
    }

    /// Single-CAS acquisition attempt. Acquire ordering on success pairs
    /// with the release in [`unlock`](Self::unlock), making everything
    /// the previous owner did visible to the new one.
    fn lock_fast_path(&self, current: &TaskContext) -> bool {
        let current = (current as *const TaskContext).cast_mut();
        match self.owner.compare_exchange(
            ptr::null_mut(),
            current,
            Ordering::Acquire,
            Ordering::Relaxed,
        ) {
            Ok(_) => true,
            Err(observed) => {
                assert!(
                    observed != current,
                    "mutex is locked twice from the same task"
                );
                false
            }
        }
    }

    /// Check-and-lock used from inside the wait strategies.
    ///
    /// SeqCst so the failing read of the owner cell is ordered against
    /// the release side's clear-then-inspect-waiters sequence; with
    /// anything weaker the releaser could observe an empty wait list
    /// while this contender observes the lock still held, and the
    /// wakeup would fall between them.
    fn try_lock_with(&self, current: &TaskContext) -> bool {
        let current = (current as *const TaskContext).cast_mut();
        match self.owner.compare_exchange(
            ptr::null_mut(),
            current,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => true,
            Err(observed) => {
                assert!(
                    observed != current,
                    "mutex is locked twice from the same task"
                );
                false
            }
        }
    }

    fn lock_slow_path(&self, current: &Arc<TaskContext>, deadline: Deadline) -> bool {
        // A slow-path acquisition must not end early: plain lock() has
        // no failure channel and try_lock_until() reports only
        // timeouts, so cancellation stays blocked for the whole wait.
        let _block_cancels = CancellationBlocker::new();
        let strategy = W::strategy(self, current);
        let mut consumed_wakeup = false;
        loop {
            let source = current.sleep(&strategy, deadline);
            if self.owner.load(Ordering::Acquire) == Arc::as_ptr(current).cast_mut() {
                return true;
            }
            if !source.has_wait_succeeded() {
                // Giving up while holding a consumed release notification
                // would strand the remaining waiters behind a free mutex;
                // pass it on instead. A redundant pass is absorbed by the
                // recipient's own retry loop.
                if consumed_wakeup {
                    self.waiters.wakeup_next();
                }
                return false;
            }
            // Woken without the lock: a fast-path arrival won the owner
            // cell first. Queue up again.
            consumed_wakeup = true;
        }
    }

    /// Blocks the current task until it holds the mutex.
    pub(crate) fn lock(&self) {
        let locked = self.try_lock_until(Deadline::unreachable());
        debug_assert!(locked, "unbounded acquisition cannot time out");
    }

    /// Attempts to acquire without suspension.
    pub(crate) fn try_lock(&self) -> bool {
        let current = context::current();
        self.lock_fast_path(&current)
    }

    /// Attempts to acquire, suspending up to `deadline`.
    pub(crate) fn try_lock_until(&self, deadline: Deadline) -> bool {
        let current = context::current();
        self.lock_fast_path(&current) || self.lock_slow_path(&current, deadline)
    }

    /// Releases the mutex and wakes one waiter.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is not locked or the current task is not the
    /// owner.
    pub(crate) fn unlock(&self) {
        let current = context::current();
        let previous = self.owner.swap(ptr::null_mut(), Ordering::SeqCst);
        assert!(!previous.is_null(), "mutex is unlocked while not locked");
        assert!(
            previous == Arc::as_ptr(&current).cast_mut(),
            "mutex is unlocked by a task that does not own it"
        );
        self.waiters.wakeup_next();
    }
}

impl<W: Waiters> Drop for MutexImpl<W> {
    fn drop(&mut self) {
        assert!(
            self.owner.get_mut().is_null(),
            "mutex is dropped while locked"
        );
    }
}

/// Slow-path strategy for the locked FIFO wait list.
///
/// The owner re-check and the append run under the wait-list lock, the
/// same lock the release-side wakeup takes, so a wakeup cannot slip
/// between "observed locked" and "enqueued".
pub(crate) struct HeavyWaitStrategy<'a> {
    mutex: &'a MutexImpl<WaitList>,
    current: &'a Arc<TaskContext>,
    _waiter_token: WaitersScopeCounter<'a>,
}

impl WaitStrategy for HeavyWaitStrategy<'_> {
    fn setup_wakeups(&self) -> EarlyWakeup {
        let mut queue = self.mutex.waiters.lock();
        if self.mutex.try_lock_with(self.current) {
            return EarlyWakeup(true);
        }
        queue.append(self.current.clone());
        EarlyWakeup(false)
    }

    fn disable_wakeups(&self) {
        let mut queue = self.mutex.waiters.lock();
        queue.remove(self.current);
    }
}

impl Waiters for WaitList {
    type Strategy<'a>
        = HeavyWaitStrategy<'a>
    where
        Self: 'a;

    fn strategy<'a>(
        mutex: &'a MutexImpl<Self>,
        current: &'a Arc<TaskContext>,
    ) -> HeavyWaitStrategy<'a> {
        HeavyWaitStrategy {
            mutex,
            current,
            // Counted before the strategy can append and released only
            // when the whole wait is over, so the release side can
            // trust a zero reading.
            _waiter_token: WaitersScopeCounter::new(&mutex.waiters),
        }
    }

    fn wakeup_next(&self) {
        // No sleepies, no lock: the uncontended release never touches
        // the queue.
        if self.sleepies() == 0 {
            return;
        }
        let mut queue = self.lock();
        queue.wakeup_one();
    }
}

/// Slow-path strategy for the single-slot wait list.
///
/// There is no queue lock to hide behind, so after the append the owner
/// cell is read once more: a release in the window may have fired its
/// wakeup at a still-empty slot, and the append is undone in favor of
/// retrying the acquisition.
pub(crate) struct LightWaitStrategy<'a> {
    mutex: &'a MutexImpl<WaitListLight>,
    current: &'a Arc<TaskContext>,
}

impl WaitStrategy for LightWaitStrategy<'_> {
    fn setup_wakeups(&self) -> EarlyWakeup {
        if self.mutex.try_lock_with(self.current) {
            return EarlyWakeup(true);
        }
        self.mutex.waiters.append(self.current.clone());
        if self.mutex.owner.load(Ordering::SeqCst).is_null() {
            self.mutex.waiters.remove(self.current);
            return EarlyWakeup(true);
        }
        EarlyWakeup(false)
    }

    fn disable_wakeups(&self) {
        self.mutex.waiters.remove(self.current);
    }
}

impl Waiters for WaitListLight {
    type Strategy<'a>
        = LightWaitStrategy<'a>
    where
        Self: 'a;

    fn strategy<'a>(
        mutex: &'a MutexImpl<Self>,
        current: &'a Arc<TaskContext>,
    ) -> LightWaitStrategy<'a> {
        LightWaitStrategy { mutex, current }
    }

    fn wakeup_next(&self) {
        self.wakeup_one();
    }
}

/// Mutual exclusion between cooperative tasks, guarding a value.
///
/// `Mutex<T>` suspends tasks, not threads: a contender that cannot
/// acquire the lock is parked through the runtime's wait protocol and
/// woken by the release. The uncontended case is a single atomic
/// operation in each direction and never looks at the wait list.
///
/// Acquisition can be bounded by a [`Deadline`]
/// ([`try_lock_until`](Self::try_lock_until)) or attempted without
/// suspension at all ([`try_lock`](Self::try_lock)).
///
/// The mutex is not reentrant: locking it again from the owning task is
/// a programming error and panics.
pub struct Mutex<T> {
    state: MutexImpl<WaitList>,
    data: UnsafeCell<T>,
}

// Safety: the state machine guarantees exclusive access to `data`
// between lock and unlock, so sharing the mutex is as safe as sending
// the value itself.
unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    /// Creates a new mutex wrapping the given value.
    ///
    /// The mutex starts out unlocked with no waiters.
    pub fn new(value: T) -> Self {
        Self {
            state: MutexImpl::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the mutex, suspending the current task until it is held.
    ///
    /// # Panics
    ///
    /// Panics when called from a non-task thread or when the current
    /// task already holds this mutex.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock();
        MutexGuard {
            mutex: self,
            _not_send: PhantomData,
        }
    }

    /// Attempts to acquire the mutex without suspension.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.state.try_lock().then(|| MutexGuard {
            mutex: self,
            _not_send: PhantomData,
        })
    }

    /// Attempts to acquire the mutex, suspending up to `deadline`.
    ///
    /// Returns `None` when the deadline is reached first. An
    /// unreachable deadline makes this equivalent to
    /// [`lock`](Self::lock).
    pub fn try_lock_until(&self, deadline: Deadline) -> Option<MutexGuard<'_, T>> {
        self.state.try_lock_until(deadline).then(|| MutexGuard {
            mutex: self,
            _not_send: PhantomData,
        })
    }

    /// Attempts to acquire the mutex, suspending up to `duration` from
    /// now.
    pub fn try_lock_for(&self, duration: Duration) -> Option<MutexGuard<'_, T>> {
        self.try_lock_until(Deadline::after(duration))
    }

    /// Consumes the mutex, returning the guarded value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Returns a mutable reference to the guarded value.
    ///
    /// The exclusive borrow statically guarantees there are no other
    /// users, so no locking takes place.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

/// Guard returned by the locking operations of [`Mutex`].
///
/// Releases the mutex on drop. The guard is not `Send`: the release
/// must run on the task that acquired.
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the guard proves this task holds the lock.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the guard proves this task holds the lock.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.state.unlock();
    }
}
