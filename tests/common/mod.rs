#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use pledge::{MicrotaskQueue, Promise, QueueConfig, SchedulerHandle, Settlement, Thenable, ThenMember};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED5EED;
/// Drain budget for integration test queues.
pub const TEST_DRAIN_BUDGET: u64 = 100_000;

const PROPTEST_SEED_ENV: &str = "PLEDGE_PROPTEST_SEED";
const PROPTEST_MAX_SHRINK_ITERS_ENV: &str = "PLEDGE_PROPTEST_MAX_SHRINK_ITERS";

/// Configuration for property tests with optional deterministic seed support.
#[derive(Debug, Clone)]
pub struct PropertyTestConfig {
    /// Fixed seed for reproducibility (overrides CI default when set).
    pub seed: Option<u64>,
    /// Number of successful cases required.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl PropertyTestConfig {
    /// Build a config with defaults for property tests.
    #[must_use]
    pub fn new(cases: u32) -> Self {
        Self {
            seed: read_proptest_seed(),
            cases,
            max_shrink_iters: read_max_shrink_iters()
                .unwrap_or(ProptestConfig::default().max_shrink_iters),
        }
    }

    /// Convert into a ProptestConfig, applying deterministic seed rules.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        let mut config = ProptestConfig::with_cases(self.cases);

        // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
        if matches!(config.rng_seed, RngSeed::Random) {
            if let Some(seed) = self.seed {
                config.rng_seed = RngSeed::Fixed(seed);
            }
        }

        config.max_shrink_iters = self.max_shrink_iters;
        config
    }
}

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    PropertyTestConfig::new(cases).to_proptest_config()
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }

    // If CI is set and no explicit seed is provided, use a fixed seed.
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }

    None
}

fn read_max_shrink_iters() -> Option<u32> {
    std::env::var(PROPTEST_MAX_SHRINK_ITERS_ENV)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
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

/// Create a queue with the test drain budget.
#[must_use]
pub fn test_queue() -> (MicrotaskQueue, SchedulerHandle) {
    init_test_logging();
    let queue = MicrotaskQueue::with_config(QueueConfig::new().max_tasks_per_drain(TEST_DRAIN_BUDGET));
    let handle = queue.handle();
    (queue, handle)
}

/// Drain `queue`, panicking if it does not go idle within budget.
pub fn drain(queue: &MicrotaskQueue) -> u64 {
    queue
        .run_until_idle()
        .unwrap_or_else(|err| panic!("test queue did not go idle: {err}"))
}

/// Returns the fulfilled value, panicking on any other state.
pub fn expect_value<T: Clone + Send + std::fmt::Debug + 'static>(promise: &Promise<T>) -> T {
    match promise.settlement() {
        Some(Settlement::Fulfilled(value)) => value,
        other => panic!("expected fulfilled, got {other:?}"),
    }
}

/// Returns the rejection reason, panicking on any other state.
pub fn expect_reason<T: Clone + Send + std::fmt::Debug + 'static>(
    promise: &Promise<T>,
) -> pledge::Error {
    match promise.settlement() {
        Some(Settlement::Rejected(reason)) => reason,
        other => panic!("expected rejected, got {other:?}"),
    }
}

/// A thenable built from a closure, standing in for a foreign promise type.
pub struct FnThenable<F>(pub F);

impl<T, F> Thenable<T> for FnThenable<F>
where
    F: Fn() -> pledge::Result<ThenMember<T>> + Send + Sync,
{
    fn then_member(&self) -> pledge::Result<ThenMember<T>> {
        (self.0)()
    }
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log test completion.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
}
