//! Pledge: single-settlement deferred values with Promises/A+ resolution.
//!
//! # Overview
//!
//! A [`Promise`] is a cell that starts pending and settles once, either
//! fulfilled with a value or rejected with an [`Error`]. Continuations chained
//! onto it never run inline: they are handed to a [`Schedule`] implementation
//! and run on a later turn, in the order they were registered.
//!
//! # Core Guarantees
//!
//! - **Single settlement**: a cell transitions out of pending at most once
//! - **Deferred dispatch**: no continuation runs inside `then` or inside the call that settles
//! - **Registration order**: observers of one cell run in the order they were added
//! - **Interoperability**: foreign [`Thenable`]s are assimilated through the resolution procedure
//! - **Protocol safety**: self-resolution and native adoption cycles reject instead of hanging
//! - **Panic containment**: a panicking continuation rejects its derived cell
//!
//! # Module Structure
//!
//! - [`promise`]: the cell, its [`Resolver`] and the resolution procedure
//! - [`combinator`]: `all`, `race`, `all_settled` and `any`
//! - [`scheduler`]: the scheduling seam and the [`MicrotaskQueue`]
//! - [`types`]: lifecycle [`State`] and [`Settlement`] outcomes
//! - [`error`]: rejection reasons
//!
//! # Example
//!
//! ```
//! use pledge::{MicrotaskQueue, Promise, Resolution, Settlement};
//!
//! let queue = MicrotaskQueue::new();
//! let handle = queue.handle();
//!
//! let (promise, resolver) = Promise::pending(&handle);
//! let doubled = promise.and_then(|v: i32| Ok(Resolution::Value(v * 2)));
//! resolver.fulfill(21);
//!
//! queue.run_until_idle().unwrap();
//! assert_eq!(doubled.settlement().and_then(Settlement::into_value), Some(42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]

pub mod combinator;
pub mod error;
pub mod promise;
pub mod scheduler;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenient access to core types
pub use combinator::{all, all_settled, any, race};
pub use error::{Error, ErrorCategory, ErrorKind, Result, ResultExt};
pub use promise::{Promise, Resolution, Resolver, ThenFn, ThenMember, Thenable};
pub use scheduler::{
    ConfigError, MicrotaskQueue, QueueConfig, QueueError, QueueStats, Schedule, SchedulerHandle,
    Task,
};
pub use types::{Settlement, State};
