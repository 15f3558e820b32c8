//! Synchronization primitives for cooperative tasks.
//!
//! The primitives here suspend *tasks*, not threads: a task that cannot
//! immediately acquire a lock is parked through the runtime's wait
//! protocol and woken when the resource becomes available.
//!
//! The current primitives include:
//! - [`Mutex`] — mutual exclusion with deadline-bounded acquisition.
//!
//! ## Design notes
//!
//! - Uncontended acquisition and release are a single atomic operation
//!   each; the wait list is only ever touched by contenders.
//! - A release does not hand the lock to a waiter directly. The woken
//!   waiter races with fresh arrivals and queues up again if it loses,
//!   which keeps the common path free of any queue bookkeeping.
//! - Mutexes are safe to share between tasks using `Arc`; they must not
//!   move while contenders reference them, which the borrow in the
//!   guard already guarantees.

mod mutex;

pub use mutex::{Mutex, MutexGuard};
