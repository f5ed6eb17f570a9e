//! The settling side of a cell.

use super::{Inner, Promise, Resolution};
use crate::error::Error;
use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Settles one cell, at most once.
///
/// Clones share a single guard. The first call to [`resolve`](Self::resolve),
/// [`fulfill`](Self::fulfill) or [`reject`](Self::reject) on any clone locks
/// the resolver in, even when it adopts a still-pending promise; every later
/// call is ignored and returns `false`.
pub struct Resolver<T> {
    cell: Arc<Inner<T>>,
    called: Arc<AtomicBool>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            called: Arc::clone(&self.called),
        }
    }
}

impl<T: Clone + Send + 'static> Resolver<T> {
    pub(super) fn new(cell: Arc<Inner<T>>) -> Self {
        Self {
            cell,
            called: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock_in(&self) -> bool {
        !self.called.swap(true, Ordering::AcqRel)
    }

    /// Resolves the cell with `resolution`, running the full resolution
    /// procedure. Returns whether this call locked the resolver in.
    pub fn resolve(&self, resolution: impl Into<Resolution<T>>) -> bool {
        if !self.lock_in() {
            tracing::trace!("resolver already used, resolve ignored");
            return false;
        }
        self.cell.resolve(resolution.into());
        true
    }

    /// Fulfills the cell with a plain value.
    pub fn fulfill(&self, value: T) -> bool {
        self.resolve(Resolution::Value(value))
    }

    /// Rejects the cell with `reason`.
    pub fn reject(&self, reason: Error) -> bool {
        if !self.lock_in() {
            tracing::trace!(kind = ?reason.kind(), "resolver already used, reject ignored");
            return false;
        }
        self.cell.reject(reason);
        true
    }

    /// Returns true once any clone has been used.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.called.load(Ordering::Acquire)
    }

    /// Returns the cell this resolver settles.
    #[must_use]
    pub fn promise(&self) -> Promise<T> {
        Promise::from_inner(Arc::clone(&self.cell))
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("locked", &self.is_locked())
            .field("state", &self.cell.state())
            .finish()
    }
}
