//! The resolution procedure.
//!
//! Resolving a cell with a candidate decides how the cell settles:
//!
//! 1. the cell itself: reject with [`ErrorKind::SelfResolution`]
//! 2. another native cell: follow it, unless its adoption chain leads back
//!    here, which rejects with [`ErrorKind::AdoptionCycle`]
//! 3. a [`Thenable`]: read its `then` member once; a callable member is
//!    invoked on a later turn with a fresh single-use [`Resolver`]
//! 4. anything else: fulfill with it
//!
//! Following another cell never recurses synchronously. The follower
//! subscribes to the followed cell and settles when it does.
//!
//! [`ErrorKind::SelfResolution`]: crate::ErrorKind::SelfResolution
//! [`ErrorKind::AdoptionCycle`]: crate::ErrorKind::AdoptionCycle

use super::{Inner, Promise, Resolver};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// A candidate a cell can be resolved with.
pub enum Resolution<T> {
    /// A plain value. Fulfills the cell directly.
    Value(T),
    /// Another cell. Its outcome is adopted.
    Promise(Promise<T>),
    /// A foreign object exposing a `then` member.
    Thenable(Arc<dyn Thenable<T>>),
}

impl<T> Resolution<T> {
    /// Wraps a foreign thenable.
    pub fn thenable(thenable: impl Thenable<T> + 'static) -> Self {
        Self::Thenable(Arc::new(thenable))
    }
}

impl<T> From<Promise<T>> for Resolution<T> {
    fn from(promise: Promise<T>) -> Self {
        Self::Promise(promise)
    }
}

impl<T> From<Arc<dyn Thenable<T>>> for Resolution<T> {
    fn from(thenable: Arc<dyn Thenable<T>>) -> Self {
        Self::Thenable(thenable)
    }
}

/// A callable `then` member.
///
/// It receives a resolver for the adopting cell. Only the first settlement
/// through that resolver, or through any of its clones, has effect.
pub type ThenFn<T> = Box<dyn FnOnce(Resolver<T>) -> Result<()> + Send>;

/// What reading a thenable's `then` member produced.
pub enum ThenMember<T> {
    /// A callable member; the thenable drives settlement through it.
    Callable(ThenFn<T>),
    /// The member exists but cannot be called. The object is an ordinary
    /// value and fulfills the cell as-is.
    NotCallable(T),
}

impl<T> ThenMember<T> {
    /// Wraps a closure as a callable member.
    pub fn callable<F>(then: F) -> Self
    where
        F: FnOnce(Resolver<T>) -> Result<()> + Send + 'static,
    {
        Self::Callable(Box::new(then))
    }
}

/// A foreign object that may take part in resolution.
///
/// [`then_member`](Thenable::then_member) is read exactly once per
/// resolution. An `Err` or a panic from the read rejects the adopting cell.
pub trait Thenable<T>: Send + Sync {
    /// Reads the `then` member.
    fn then_member(&self) -> Result<ThenMember<T>>;
}

/// A native cell viewed as a thenable is adopted like any native cell, so the
/// identity and cycle checks still apply.
impl<T: Clone + Send + 'static> Thenable<T> for Promise<T> {
    fn then_member(&self) -> Result<ThenMember<T>> {
        let source = self.clone();
        Ok(ThenMember::callable(move |resolver: Resolver<T>| {
            resolver.resolve(source);
            Ok(())
        }))
    }
}

impl<T: Clone + Send + 'static> Inner<T> {
    /// Runs the resolution procedure for `resolution`. No-op once settled.
    pub(super) fn resolve(self: &Arc<Self>, resolution: Resolution<T>) {
        if !self.is_pending() {
            return;
        }
        match resolution {
            Resolution::Value(value) => self.fulfill(value),
            Resolution::Promise(other) => self.adopt(other.inner),
            Resolution::Thenable(thenable) => self.assimilate(&thenable),
        }
    }

    fn adopt(self: &Arc<Self>, other: Arc<Self>) {
        if Arc::ptr_eq(self, &other) {
            tracing::debug!(cell = ?Arc::as_ptr(self), "promise resolved with itself");
            self.reject(Error::self_resolution());
            return;
        }
        if let Some(depth) = other.chain_reaches(self) {
            tracing::debug!(cell = ?Arc::as_ptr(self), depth, "promise adoption cycle");
            self.reject(Error::adoption_cycle(depth));
            return;
        }

        self.core.lock().following = Some(Arc::downgrade(&other));
        tracing::trace!(
            cell = ?Arc::as_ptr(self),
            followed = ?Arc::as_ptr(&other),
            "promise adopting"
        );

        let on_ok = Arc::clone(self);
        let on_err = Arc::clone(self);
        other.subscribe(
            Box::new(move |value| on_ok.fulfill(value)),
            Box::new(move |reason| on_err.reject(reason)),
        );
    }

    /// Walks the adoption links starting at `self`. Returns the number of
    /// links in the loop if the walk reaches `target`.
    fn chain_reaches(self: &Arc<Self>, target: &Arc<Self>) -> Option<usize> {
        let mut visited = HashSet::new();
        let mut current = Arc::clone(self);
        let mut depth = 1;
        while visited.insert(Arc::as_ptr(&current)) {
            let next = current.core.lock().following.as_ref().and_then(Weak::upgrade)?;
            depth += 1;
            if Arc::ptr_eq(&next, target) {
                return Some(depth);
            }
            current = next;
        }
        // A loop that does not pass through `target`.
        None
    }

    fn assimilate(self: &Arc<Self>, thenable: &Arc<dyn Thenable<T>>) {
        let member = match catch_unwind(AssertUnwindSafe(|| thenable.then_member())) {
            Ok(Ok(member)) => member,
            Ok(Err(reason)) => {
                tracing::debug!(error = %reason, "thenable member read failed");
                self.reject(reason);
                return;
            }
            Err(payload) => {
                let reason = Error::thenable_inspection(format!(
                    "reading then panicked: {}",
                    Error::from_panic(payload.as_ref()).message().unwrap_or("unknown panic")
                ));
                tracing::debug!(error = %reason, "thenable member read panicked");
                self.reject(reason);
                return;
            }
        };

        match member {
            ThenMember::NotCallable(value) => self.fulfill(value),
            ThenMember::Callable(then) => {
                let resolver = Resolver::new(Arc::clone(self));
                self.scheduler
                    .schedule(Box::new(move || invoke_then(then, resolver)));
            }
        }
    }
}

/// Calls a thenable's `then` with a fresh resolver.
///
/// A failure after the resolver already fired is dropped.
fn invoke_then<T: Clone + Send + 'static>(then: ThenFn<T>, resolver: Resolver<T>) {
    let guard = resolver.clone();
    let reason = match catch_unwind(AssertUnwindSafe(move || then(resolver))) {
        Ok(Ok(())) => return,
        Ok(Err(reason)) => reason,
        Err(payload) => Error::from_panic(payload.as_ref()),
    };
    if !guard.reject(reason) {
        tracing::trace!("thenable failure after resolution swallowed");
    }
}
