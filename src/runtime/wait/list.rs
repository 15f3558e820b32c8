use crate::runtime::task::{TaskContext, WakeupSource};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// FIFO wait list of task handles, guarded by an explicit lock.
///
/// All queue mutation goes through a [`WaitListLock`] obtained from
/// [`lock`](Self::lock); holding the guard is the proof that check-and-
/// append sequences are atomic with respect to the wakeup side, which
/// takes the same lock.
///
/// The [`sleepies`](Self::sleepies) hint is readable without the lock.
/// It counts waiters from before they can enqueue until after they have
/// left the queue (see [`WaitersScopeCounter`]), so a zero reading
/// proves there is no one to wake.
pub(crate) struct WaitList {
    sleepies: AtomicUsize,
    queue: Mutex<VecDeque<Arc<TaskContext>>>,
}

impl WaitList {
    pub(crate) fn new() -> Self {
        Self {
            sleepies: AtomicUsize::new(0),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Acquires the queue lock.
    pub(crate) fn lock(&self) -> WaitListLock<'_> {
        WaitListLock {
            queue: self.queue.lock().unwrap(),
        }
    }

    /// Upper-bound hint of the number of current waiters.
    ///
    /// SeqCst so the unlock-side "skip the lock when zero" read is
    /// ordered against the waiter's increment-then-observe-owner
    /// sequence; see the counter token for the pairing.
    pub(crate) fn sleepies(&self) -> usize {
        self.sleepies.load(Ordering::SeqCst)
    }
}

impl Default for WaitList {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaitList {
    fn drop(&mut self) {
        let queue = self.queue.get_mut().unwrap();
        assert!(queue.is_empty(), "wait list dropped with pending waiters");
    }
}

/// Exclusive access to the queue of a [`WaitList`].
pub(crate) struct WaitListLock<'a> {
    queue: MutexGuard<'a, VecDeque<Arc<TaskContext>>>,
}

impl WaitListLock<'_> {
    /// Appends `task` to the tail of the queue.
    pub(crate) fn append(&mut self, task: Arc<TaskContext>) {
        debug_assert!(
            !self.queue.iter().any(|queued| Arc::ptr_eq(queued, &task)),
            "task is already waiting on this list"
        );
        self.queue.push_back(task);
    }

    /// Removes `task` wherever it sits in the queue.
    ///
    /// Removing a task that is not queued is a no-op: the task may have
    /// been popped by a wakeup already.
    pub(crate) fn remove(&mut self, task: &TaskContext) {
        self.queue
            .retain(|queued| !std::ptr::eq(queued.as_ref(), task));
    }

    /// Pops waiters from the head until a wakeup is delivered.
    ///
    /// A popped waiter whose sleep has already committed another outcome
    /// (its deadline passed concurrently) cannot consume the wakeup; the
    /// next waiter in line gets it instead, so a single release never
    /// strands the rest of the queue behind a dead head.
    pub(crate) fn wakeup_one(&mut self) {
        while let Some(task) = self.queue.pop_front() {
            if task.wakeup(WakeupSource::WaitList) {
                return;
            }
        }
    }
}

/// RAII token counting a waiter for the lifetime of its wait.
///
/// Constructed before the waiter can enqueue and dropped only after it
/// has left the queue for good, keeping the [`WaitList::sleepies`] hint
/// an upper bound at all times.
pub(crate) struct WaitersScopeCounter<'a> {
    list: &'a WaitList,
}

impl<'a> WaitersScopeCounter<'a> {
    pub(crate) fn new(list: &'a WaitList) -> Self {
        list.sleepies.fetch_add(1, Ordering::SeqCst);
        Self { list }
    }
}

impl Drop for WaitersScopeCounter<'_> {
    fn drop(&mut self) {
        self.list.sleepies.fetch_sub(1, Ordering::SeqCst);
    }
}
