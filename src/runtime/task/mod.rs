//! Task hosting.
//!
//! A *task* is the unit of cooperative execution. Each task carries a
//! [`TaskContext`] holding its identity, its suspension state, and its
//! cancellation state; synchronization primitives interact with tasks
//! exclusively through that context.
//!
//! [`spawn`] hosts a task body on a dedicated worker thread. How tasks
//! map onto threads is invisible to the primitives: they only ever
//! suspend the current task and deliver wakeups to a context.

mod cancel;
mod context;

pub use cancel::CancellationBlocker;
pub use context::{TaskContext, WakeupSource};

pub use crate::runtime::context::{current, try_current};

use crate::runtime::context::enter_task;

use std::panic;
use std::sync::Arc;
use std::thread;

/// Handle to a spawned task.
///
/// Dropping the handle detaches the task; it keeps running to
/// completion. Use [`join`](Self::join) to wait for the result.
pub struct JoinHandle<T> {
    context: Arc<TaskContext>,
    thread: thread::JoinHandle<T>,
}

impl<T> JoinHandle<T> {
    /// Context of the spawned task.
    pub fn context(&self) -> &Arc<TaskContext> {
        &self.context
    }

    /// Requests cooperative cancellation of the task.
    ///
    /// See [`TaskContext::request_cancel`] for delivery semantics.
    pub fn request_cancel(&self) {
        self.context.request_cancel();
    }

    /// Waits for the task to finish and returns its result.
    ///
    /// A panic raised inside the task is propagated to the joiner.
    pub fn join(self) -> T {
        match self.thread.join() {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

/// Spawns `f` as a task with its own context.
///
/// The task starts immediately. The returned handle can be used to wait
/// for completion or to request cancellation.
///
/// # Panics
///
/// Panics if the host fails to allocate a worker thread for the task.
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let context = Arc::new(TaskContext::new());
    log::trace!("spawning task {}", context.id());

    let task = context.clone();
    let thread = thread::Builder::new()
        .name(format!("task-{}", context.id()))
        .spawn(move || enter_task(task, f))
        .expect("failed to spawn a worker thread for the task");

    JoinHandle { context, thread }
}
