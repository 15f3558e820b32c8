use crate::runtime::task::{TaskContext, WakeupSource};

use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Single-slot wait list for primitives that guarantee at most one
/// concurrent waiter.
///
/// The slot is a lone atomic pointer, so appending, removing, and
/// waking are all lock-free. The guarantee is the caller's to uphold:
/// a primitive funnels contenders through some other atomic (such as an
/// owner cell) so that only one of them can be enqueued at a time.
///
/// While occupied, the slot holds one strong reference to the waiting
/// task; whoever swaps the pointer out becomes responsible for it.
pub(crate) struct WaitListLight {
    waiter: AtomicPtr<TaskContext>,
}

impl WaitListLight {
    pub(crate) fn new() -> Self {
        Self {
            waiter: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Stores `task` as the waiter.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already occupied: a second concurrent
    /// waiter violates the single-waiter contract.
    pub(crate) fn append(&self, task: Arc<TaskContext>) {
        let fresh = Arc::into_raw(task).cast_mut();
        let previous = self.waiter.swap(fresh, Ordering::SeqCst);
        assert!(
            previous.is_null(),
            "a single-slot wait list holds at most one waiter"
        );
    }

    /// Clears the slot if it still holds `task`.
    ///
    /// A slot that is empty or holds a different occupant is left
    /// untouched: the wakeup side may have claimed the pointer first.
    pub(crate) fn remove(&self, task: &TaskContext) {
        let expected = (task as *const TaskContext).cast_mut();
        if self
            .waiter
            .compare_exchange(expected, ptr::null_mut(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // We won the pointer back; balance the reference count of
            // the handle stored by `append`.
            unsafe { drop(Arc::from_raw(expected.cast_const())) };
        }
    }

    /// Publishes a wakeup to the current occupant, if any.
    pub(crate) fn wakeup_one(&self) {
        let occupant = self.waiter.swap(ptr::null_mut(), Ordering::SeqCst);
        if occupant.is_null() {
            return;
        }
        let task = unsafe { Arc::from_raw(occupant.cast_const()) };
        task.wakeup(WakeupSource::WaitList);
    }
}

impl Default for WaitListLight {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaitListLight {
    fn drop(&mut self) {
        let occupant = *self.waiter.get_mut();
        assert!(
            occupant.is_null(),
            "single-slot wait list dropped with a pending waiter"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Arc<TaskContext> {
        Arc::new(TaskContext::new())
    }

    #[test]
    fn append_then_remove_clears_the_slot() {
        let list = WaitListLight::new();
        let task = context();
        list.append(task.clone());
        list.remove(&task);
        // Only our local handle remains.
        assert_eq!(Arc::strong_count(&task), 1);
    }

    #[test]
    fn remove_of_a_foreign_task_is_a_no_op() {
        let list = WaitListLight::new();
        let occupant = context();
        let stranger = context();
        list.append(occupant.clone());
        list.remove(&stranger);
        assert_eq!(Arc::strong_count(&occupant), 2);
        list.remove(&occupant);
    }

    #[test]
    fn wakeup_consumes_the_occupant() {
        let list = WaitListLight::new();
        let task = context();
        list.append(task.clone());
        list.wakeup_one();
        assert_eq!(Arc::strong_count(&task), 1);
        // The slot is empty again; a later remove must not touch it.
        list.remove(&task);
    }

    #[test]
    fn wakeup_on_an_empty_slot_is_a_no_op() {
        let list = WaitListLight::new();
        list.wakeup_one();
    }

    #[test]
    #[should_panic(expected = "at most one waiter")]
    fn second_append_is_fatal() {
        // Leak the list: unwinding out of the second append leaves the
        // slot occupied, which the destructor treats as fatal too.
        let list = std::mem::ManuallyDrop::new(WaitListLight::new());
        list.append(context());
        list.append(context());
    }
}
