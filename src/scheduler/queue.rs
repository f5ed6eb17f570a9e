//! FIFO microtask queue.
//!
//! A thread-safe unbounded queue of continuations. Any thread may schedule
//! into it; the host decides when to drain it, one task per [`turn`] or until
//! idle with [`run_until_idle`]. Tasks scheduled while draining run in the same
//! drain, after everything queued before them.
//!
//! [`turn`]: MicrotaskQueue::turn
//! [`run_until_idle`]: MicrotaskQueue::run_until_idle

use super::config::QueueConfig;
use super::{Schedule, SchedulerHandle, Task};
use core::fmt;
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error returned when a drain cannot reach idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The drain ran its whole task budget and work was still queued.
    #[error("drain budget exhausted after {executed} tasks ({remaining} still queued)")]
    DrainBudgetExhausted {
        /// Tasks run by this drain.
        executed: u64,
        /// Tasks left in the queue.
        remaining: usize,
    },
}

/// Counters for a queue's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks ever scheduled.
    pub enqueued: u64,
    /// Tasks ever run.
    pub executed: u64,
}

struct QueueInner {
    tasks: SegQueue<Task>,
    config: QueueConfig,
    enqueued: AtomicU64,
    executed: AtomicU64,
}

impl Schedule for QueueInner {
    fn schedule(&self, task: Task) {
        let seq = self.enqueued.fetch_add(1, Ordering::Relaxed);
        if self.config.trace_tasks {
            tracing::trace!(seq, queued = self.tasks.len(), "microtask enqueued");
        }
        self.tasks.push(task);
    }
}

/// A FIFO queue of deferred continuations.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct MicrotaskQueue {
    inner: Arc<QueueInner>,
}

impl MicrotaskQueue {
    /// Creates a queue with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Creates a queue with the given configuration.
    #[must_use]
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                tasks: SegQueue::new(),
                config,
                enqueued: AtomicU64::new(0),
                executed: AtomicU64::new(0),
            }),
        }
    }

    /// Returns a scheduler handle that enqueues into this queue.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::from(Arc::clone(&self.inner))
    }

    /// Returns the queue configuration.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Returns true if no task is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.tasks.is_empty()
    }

    /// Returns lifetime counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.inner.enqueued.load(Ordering::Relaxed),
            executed: self.inner.executed.load(Ordering::Relaxed),
        }
    }

    /// Runs the oldest queued task, if any. Returns whether one ran.
    pub fn turn(&self) -> bool {
        let Some(task) = self.inner.tasks.pop() else {
            return false;
        };
        let seq = self.inner.executed.fetch_add(1, Ordering::Relaxed);
        if self.inner.config.trace_tasks {
            tracing::trace!(seq, "microtask running");
        }
        task();
        true
    }

    /// Runs tasks until the queue is empty.
    ///
    /// Returns the number of tasks run. Stops early with
    /// [`QueueError::DrainBudgetExhausted`] once the configured budget is spent
    /// while work remains; the remaining tasks stay queued.
    pub fn run_until_idle(&self) -> Result<u64, QueueError> {
        let budget = self.inner.config.max_tasks_per_drain;
        let mut executed = 0_u64;
        loop {
            if budget.is_some_and(|max| executed >= max) && !self.is_empty() {
                let remaining = self.len();
                tracing::debug!(executed, remaining, "microtask drain budget exhausted");
                return Err(QueueError::DrainBudgetExhausted {
                    executed,
                    remaining,
                });
            }
            if !self.turn() {
                break;
            }
            executed += 1;
        }
        if executed > 0 {
            tracing::trace!(executed, "microtask queue idle");
        }
        Ok(executed)
    }
}

impl Default for MicrotaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("queued", &self.len())
            .field("stats", &self.stats())
            .field("config", &self.inner.config)
            .finish()
    }
}
