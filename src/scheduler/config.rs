//! Configuration for the microtask queue.
//!
//! # Configuration Precedence
//!
//! 1. **Programmatic**: builder setters applied after loading
//! 2. **Environment variables**: `PLEDGE_*` values read by [`QueueConfig::from_env`]
//! 3. **Defaults**: [`QueueConfig::default()`]
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `PLEDGE_MAX_DRAIN_TASKS` | `u64` or `unlimited` | `max_tasks_per_drain` |
//! | `PLEDGE_TRACE_TASKS` | `bool` | `trace_tasks` |

use thiserror::Error;

/// Environment variable name for the per-drain task budget.
pub const ENV_MAX_DRAIN_TASKS: &str = "PLEDGE_MAX_DRAIN_TASKS";
/// Environment variable name for per-task trace events.
pub const ENV_TRACE_TASKS: &str = "PLEDGE_TRACE_TASKS";

/// Default number of tasks a single drain may run.
pub const DEFAULT_MAX_TASKS_PER_DRAIN: u64 = 1_000_000;

/// Error returned when configuration cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable is set to an unparseable value.
    #[error("invalid value for {var}: {detail}")]
    InvalidEnv {
        /// The offending variable.
        var: &'static str,
        /// What was expected and what was found.
        detail: String,
    },
}

/// Configuration for a [`MicrotaskQueue`](super::MicrotaskQueue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum tasks one `run_until_idle` call may execute.
    ///
    /// Bounds drains that never go idle (a continuation that keeps
    /// rescheduling itself). `None` disables the limit.
    pub max_tasks_per_drain: Option<u64>,
    /// Emit a trace event for every task enqueued and run.
    pub trace_tasks: bool,
}

impl QueueConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_tasks_per_drain: Some(DEFAULT_MAX_TASKS_PER_DRAIN),
            trace_tasks: false,
        }
    }

    /// Loads defaults, then applies `PLEDGE_*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();
        apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Sets the per-drain task budget.
    #[must_use]
    pub const fn max_tasks_per_drain(mut self, tasks: u64) -> Self {
        self.max_tasks_per_drain = Some(tasks);
        self
    }

    /// Disables the per-drain task budget.
    #[must_use]
    pub const fn no_drain_limit(mut self) -> Self {
        self.max_tasks_per_drain = None;
        self
    }

    /// Sets whether every task emits trace events.
    #[must_use]
    pub const fn trace_tasks(mut self, value: bool) -> Self {
        self.trace_tasks = value;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies overrides from `lookup`; only variables it returns are applied.
pub(crate) fn apply_overrides<F>(config: &mut QueueConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_MAX_DRAIN_TASKS) {
        config.max_tasks_per_drain = parse_budget(ENV_MAX_DRAIN_TASKS, &val)?;
    }
    if let Some(val) = lookup(ENV_TRACE_TASKS) {
        config.trace_tasks = parse_bool(ENV_TRACE_TASKS, &val)?;
    }
    Ok(())
}

fn parse_budget(var: &'static str, val: &str) -> Result<Option<u64>, ConfigError> {
    let trimmed = val.trim();
    if trimmed.eq_ignore_ascii_case("unlimited") {
        return Ok(None);
    }
    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidEnv {
            var,
            detail: format!("expected unsigned integer or \"unlimited\", got {val:?} ({e})"),
        })
}

fn parse_bool(var: &'static str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            detail: format!("expected bool (true/false/1/0/yes/no), got {val:?}"),
        }),
    }
}
