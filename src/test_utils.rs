//! Helpers for the crate's unit tests.
//!
//! Continuations never run inline, so most tests build a cell on a
//! [`test_queue`], settle it, and then [`drain`] the queue before asserting.
//! The queue carries [`TEST_DRAIN_BUDGET`], which turns a cell that keeps
//! rescheduling itself into a test failure instead of a hang. Task tracing is
//! on, so a failing test's captured log lists every dispatched continuation.

use crate::scheduler::{MicrotaskQueue, QueueConfig, SchedulerHandle};
use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Drain budget used by test queues. Low enough to turn a runaway
/// rescheduling loop into a test failure quickly.
pub const TEST_DRAIN_BUDGET: u64 = 100_000;

/// Installs a trace-level subscriber that writes through the test harness.
/// Later calls are no-ops.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Create a queue with the test drain budget and task tracing on.
#[must_use]
pub fn test_queue() -> (MicrotaskQueue, SchedulerHandle) {
    init_test_logging();
    let queue = MicrotaskQueue::with_config(
        QueueConfig::new()
            .max_tasks_per_drain(TEST_DRAIN_BUDGET)
            .trace_tasks(true),
    );
    let handle = queue.handle();
    (queue, handle)
}

/// Drain `queue`, panicking if it does not go idle within budget.
pub fn drain(queue: &MicrotaskQueue) -> u64 {
    match queue.run_until_idle() {
        Ok(executed) => {
            tracing::debug!(executed, "test queue drained");
            executed
        }
        Err(err) => panic!("test queue did not go idle: {err}"),
    }
}

/// Marks the start of a test in the captured log.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Marks a step inside a test.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Marks a test as finished, with optional key/value fields.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Logs expected and actual values, then asserts `cond`.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
