//! Error types and error handling strategy for pledge.
//!
//! Every rejection reason carried by a [`Promise`](crate::Promise) is an
//! [`Error`]. Error handling follows these principles:
//!
//! - Errors are explicit and typed: the [`ErrorKind`] says who failed
//! - Protocol violations (self-resolution, adoption cycles) have reserved kinds
//! - Panics inside user continuations are caught and converted to
//!   [`ErrorKind::HandlerPanicked`], never unwound through the scheduler
//! - Nothing in the core retries; retry policy belongs to the caller
//!
//! # Error Categories
//!
//! - **User**: reasons supplied by user code (`reject`, `Err` from a handler)
//! - **Handler**: user code that panicked instead of returning
//! - **Protocol**: resolution-procedure violations detected by the cell
//! - **Aggregate**: combinators reporting several reasons at once
//! - **Internal**: invariant breakage inside the crate

use core::fmt;
use std::any::Any;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === User ===
    /// Reason supplied by user code.
    User,

    // === Handler ===
    /// A continuation, setup routine or thenable member panicked.
    HandlerPanicked,

    // === Protocol ===
    /// A cell was resolved with itself.
    SelfResolution,
    /// A cell adopted a chain of cells leading back to itself.
    AdoptionCycle,
    /// Reading a thenable's `then` member failed.
    ThenableInspection,

    // === Aggregate ===
    /// Every input of an `any` combinator rejected.
    AllRejected,

    // === Internal ===
    /// Internal error (bug).
    Internal,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::User => ErrorCategory::User,
            Self::HandlerPanicked => ErrorCategory::Handler,
            Self::SelfResolution | Self::AdoptionCycle | Self::ThenableInspection => {
                ErrorCategory::Protocol
            }
            Self::AllRejected => ErrorCategory::Aggregate,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns true if this kind is raised by the resolution procedure itself
    /// rather than by user code.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self.category(), ErrorCategory::Protocol)
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// User-originated reasons.
    User,
    /// Panics caught around user code.
    Handler,
    /// Resolution-procedure violations.
    Protocol,
    /// Several reasons reported together.
    Aggregate,
    /// Internal errors.
    Internal,
}

/// The rejection reason type used throughout pledge.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    aggregated: Option<Arc<[Error]>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            aggregated: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns true if the resolution procedure raised this error.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        self.kind.is_protocol_violation()
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the reasons carried by an aggregate error, in input order.
    ///
    /// Empty for every kind other than [`ErrorKind::AllRejected`].
    #[must_use]
    pub fn aggregated(&self) -> &[Self] {
        self.aggregated.as_deref().unwrap_or(&[])
    }

    /// Creates a user error with a message.
    #[must_use]
    pub fn user(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(msg)
    }

    /// Creates the error a cell rejects with when resolved with itself.
    #[must_use]
    pub fn self_resolution() -> Self {
        Self::new(ErrorKind::SelfResolution).with_message("promise resolved with itself")
    }

    /// Creates the error a cell rejects with when its adoption chain loops.
    #[must_use]
    pub fn adoption_cycle(depth: usize) -> Self {
        Self::new(ErrorKind::AdoptionCycle)
            .with_message(format!("adoption chain returns to its origin after {depth} links"))
    }

    /// Creates an error for a failed `then` member read.
    #[must_use]
    pub fn thenable_inspection(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ThenableInspection).with_message(detail)
    }

    /// Creates an aggregate error from every input's reason.
    #[must_use]
    pub fn all_rejected(reasons: Vec<Self>) -> Self {
        let count = reasons.len();
        let mut err = Self::new(ErrorKind::AllRejected)
            .with_message(format!("all {count} inputs rejected"));
        err.aggregated = Some(reasons.into());
        err
    }

    /// Creates a handler-panicked error from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::new(ErrorKind::HandlerPanicked).with_message(payload_to_string(payload))
    }

    /// Creates an internal error (bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }
}

fn payload_to_string(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Self::user(msg)
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Self::user(msg)
    }
}

/// Extension trait for adding context to Results.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }
}

/// A specialized Result type for pledge operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;
