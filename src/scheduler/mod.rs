//! Deferred dispatch of continuations.
//!
//! Cells never run observers inline. Every continuation is handed to a
//! [`Schedule`] implementation as a [`Task`] and runs on a later turn:
//!
//! ```text
//! settle(cell) ──► schedule(task₁) ──► schedule(task₂) ──► return
//!                        │                   │
//!   later turn:     task₁() ─────────► task₂()      (enqueue order kept)
//! ```
//!
//! - [`Schedule`]: the collaborator contract
//! - [`SchedulerHandle`]: the cloneable handle every cell carries
//! - [`queue`]: [`MicrotaskQueue`], a FIFO implementation drained by the host
//! - [`config`]: [`QueueConfig`] and its environment overrides

pub mod config;
pub mod queue;

pub use config::{ConfigError, QueueConfig};
pub use queue::{MicrotaskQueue, QueueError, QueueStats};

use core::fmt;
use std::sync::Arc;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks on a later turn of execution.
///
/// Implementations must not run `task` inside the `schedule` call and must
/// run tasks scheduled from one thread in the order they were scheduled.
pub trait Schedule: Send + Sync {
    /// Queues `task` to run later.
    fn schedule(&self, task: Task);
}

impl<F> Schedule for F
where
    F: Fn(Task) + Send + Sync,
{
    fn schedule(&self, task: Task) {
        self(task);
    }
}

/// Shared handle to a scheduler.
///
/// Cells created from a handle keep a clone of it, and so do the cells
/// derived from them through chaining and combinators.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<dyn Schedule>,
}

impl SchedulerHandle {
    /// Wraps a scheduler in a new handle.
    pub fn new<S: Schedule + 'static>(scheduler: S) -> Self {
        Self {
            inner: Arc::new(scheduler),
        }
    }

    /// Wraps an already shared scheduler.
    #[must_use]
    pub fn from_arc(inner: Arc<dyn Schedule>) -> Self {
        Self { inner }
    }

    /// Queues a task on the underlying scheduler.
    pub fn schedule(&self, task: Task) {
        self.inner.schedule(task);
    }

    /// Returns true if both handles point at the same scheduler.
    #[must_use]
    pub fn same_scheduler(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S: Schedule + 'static> From<Arc<S>> for SchedulerHandle {
    fn from(inner: Arc<S>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("scheduler", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}
