//! Lifecycle state and settled outcome of a deferred value cell.
//!
//! A cell moves through exactly one transition:
//!
//! ```text
//! Pending ──fulfill──► Fulfilled(T)
//!    └─────reject────► Rejected(Error)
//! ```
//!
//! [`State`] is the field-less tag used for inspection and logging;
//! [`Settlement`] carries the value or reason once the transition happened.

use crate::error::Error;
use core::fmt;

/// The three-state lifecycle of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not yet settled.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

impl State {
    /// Returns true if the cell is no longer pending.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Fulfilled => f.write_str("fulfilled"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}

/// The outcome of a settled cell.
#[derive(Debug, Clone)]
pub enum Settlement<T> {
    /// Settled with a value.
    Fulfilled(T),
    /// Settled with a rejection reason.
    Rejected(Error),
}

impl<T> Settlement<T> {
    /// Returns the lifecycle tag of this outcome.
    #[must_use]
    pub const fn state(&self) -> State {
        match self {
            Self::Fulfilled(_) => State::Fulfilled,
            Self::Rejected(_) => State::Rejected,
        }
    }

    /// Returns true if this outcome is `Fulfilled`.
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Returns true if this outcome is `Rejected`.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns the value, if fulfilled.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Fulfilled(v) => Some(v),
            Self::Rejected(_) => None,
        }
    }

    /// Consumes the outcome, returning the value if fulfilled.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Fulfilled(v) => Some(v),
            Self::Rejected(_) => None,
        }
    }

    /// Returns the reason, if rejected.
    #[must_use]
    pub const fn reason(&self) -> Option<&Error> {
        match self {
            Self::Fulfilled(_) => None,
            Self::Rejected(e) => Some(e),
        }
    }

    /// Maps the fulfilled value using the provided function.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Settlement<U> {
        match self {
            Self::Fulfilled(v) => Settlement::Fulfilled(f(v)),
            Self::Rejected(e) => Settlement::Rejected(e),
        }
    }

    /// Converts this outcome into a standard `Result`.
    #[allow(clippy::result_large_err)]
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Self::Fulfilled(v) => Ok(v),
            Self::Rejected(e) => Err(e),
        }
    }
}

impl<T> From<Result<T, Error>> for Settlement<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(v) => Self::Fulfilled(v),
            Err(e) => Self::Rejected(e),
        }
    }
}
