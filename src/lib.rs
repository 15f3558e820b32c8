//! # Filament
//!
//! **Filament** is the cooperative-synchronization core of a lightweight
//! task runtime. Its contenders are not operating-system threads but
//! tasks with an explicit suspend/resume protocol, and its centerpiece is
//! a mutex built from three moving parts:
//!
//! - an atomic **owner cell** giving a lock-free, single-CAS fast path,
//! - a **wait-list** of suspended contenders (a locked FIFO for the
//!   general case, a single-slot atomic cell for primitives that can
//!   guarantee one waiter),
//! - a two-phase **wait-strategy protocol** between a primitive and the
//!   task host that closes the window where a wakeup could be lost
//!   between "observed locked" and "went to sleep".
//!
//! On top of that, the crate provides the minimal task substrate the
//! protocol needs:
//!
//! - **Task hosting** with identity, suspension, wakeup delivery, and
//!   cooperative cancellation (`task::spawn`, [`task::TaskContext`])
//! - **Deadline-bounded waits** ([`time::Deadline`], [`time::sleep_for`],
//!   [`time::sleep_until`])
//! - **Mutual exclusion** with deadline-bounded acquisition
//!   ([`sync::Mutex`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use filament::sync::Mutex;
//! use filament::task;
//! use std::sync::Arc;
//!
//! let counter = Arc::new(Mutex::new(0u64));
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let counter = counter.clone();
//!         task::spawn(move || {
//!             *counter.lock() += 1;
//!         })
//!     })
//!     .collect();
//!
//! for worker in workers {
//!     worker.join();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`sync`] — mutual exclusion between tasks
//! - [`task`] — task hosting, suspension, and cancellation
//! - [`time`] — deadlines and deadline-bounded sleeps

mod runtime;

pub mod sync;
pub mod time;

pub use runtime::task;
pub use runtime::wait;
