use crate::runtime::task::TaskContext;

use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    /// Context of the task currently executing on this thread.
    ///
    /// Installed for the duration of a task body and consulted by every
    /// operation that needs to know "who is asking": acquiring a mutex,
    /// going to sleep, blocking cancellation.
    static CURRENT_TASK: RefCell<Option<Arc<TaskContext>>> = const { RefCell::new(None) };
}

/// Runs `f` with `task` installed as the current task of this thread.
///
/// The previous registration (if any) is restored afterwards, so nested
/// hosting does not clobber the outer task.
pub(crate) fn enter_task<R>(task: Arc<TaskContext>, f: impl FnOnce() -> R) -> R {
    CURRENT_TASK.with(|cell| {
        let previous = cell.replace(Some(task));

        let out = f();

        cell.replace(previous);
        out
    })
}

/// Returns the context of the task executing on this thread.
///
/// # Panics
///
/// Panics when called from a thread that is not hosting a task. Threads
/// outside the runtime have no task identity and cannot participate in
/// task-aware synchronization.
pub fn current() -> Arc<TaskContext> {
    try_current().expect("not running inside a task")
}

/// Returns the context of the task executing on this thread, or `None`
/// when called from a non-task thread.
pub fn try_current() -> Option<Arc<TaskContext>> {
    CURRENT_TASK.with(|cell| cell.borrow().clone())
}
