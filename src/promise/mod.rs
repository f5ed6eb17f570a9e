//! Single-settlement deferred value cells.
//!
//! A [`Promise`] starts pending and settles exactly once, to a value or to an
//! [`Error`]. Observers registered with [`then`](Promise::then) and friends run
//! on a later turn of the cell's scheduler, whether they were registered before
//! or after settlement.
//!
//! ```text
//!               ┌───────────── resolve(Value) ────────────► Fulfilled(T)
//!   Pending ────┼── resolve(Promise | Thenable) ─► follow ─┐
//!               └───────────── reject(Error) ─────────────►├► Rejected(Error)
//!                                                          └► Fulfilled(T)
//! ```
//!
//! # Invariants
//!
//! 1. State moves `Pending → Fulfilled` or `Pending → Rejected` once, ever.
//! 2. Observer lists only grow while pending and are drained exactly once,
//!    in registration order, at settlement.
//! 3. No observer runs inside the call that settles the cell or registers it.
//! 4. No user code runs while a cell's lock is held.
//! 5. A cell never settles with itself as its own value.
//! 6. An observer registered after settlement reaches the scheduler after
//!    every observer registered before it, even when the two registrations
//!    race on different threads.

mod resolution;
mod resolver;

pub use resolution::{Resolution, ThenFn, ThenMember, Thenable};
pub use resolver::Resolver;

use crate::error::{Error, Result};
use crate::scheduler::{SchedulerHandle, Task};
use crate::types::{Settlement, State};
use core::fmt;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

type FulfillObserver<T> = Box<dyn FnOnce(T) + Send>;
type RejectObserver = Box<dyn FnOnce(Error) + Send>;

enum CellState<T> {
    Pending {
        fulfill_observers: SmallVec<[FulfillObserver<T>; 2]>,
        reject_observers: SmallVec<[RejectObserver; 2]>,
    },
    Fulfilled(T),
    Rejected(Error),
}

struct Core<T> {
    state: CellState<T>,
    /// The cell this one adopted, while both are pending. Only read by the
    /// adoption cycle check.
    following: Option<Weak<Inner<T>>>,
    /// `Some` while the settling thread is still handing drained observers
    /// to the scheduler. Late registrations queue here behind them.
    backlog: Option<Vec<Task>>,
}

pub(crate) struct Inner<T> {
    scheduler: SchedulerHandle,
    core: Mutex<Core<T>>,
}

impl<T: Clone + Send + 'static> Inner<T> {
    fn new(scheduler: SchedulerHandle) -> Arc<Self> {
        Arc::new(Self {
            scheduler,
            core: Mutex::new(Core {
                state: CellState::Pending {
                    fulfill_observers: SmallVec::new(),
                    reject_observers: SmallVec::new(),
                },
                following: None,
                backlog: None,
            }),
        })
    }

    fn state(&self) -> State {
        match self.core.lock().state {
            CellState::Pending { .. } => State::Pending,
            CellState::Fulfilled(_) => State::Fulfilled,
            CellState::Rejected(_) => State::Rejected,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.core.lock().state, CellState::Pending { .. })
    }

    fn settlement(&self) -> Option<Settlement<T>> {
        match &self.core.lock().state {
            CellState::Pending { .. } => None,
            CellState::Fulfilled(v) => Some(Settlement::Fulfilled(v.clone())),
            CellState::Rejected(e) => Some(Settlement::Rejected(e.clone())),
        }
    }

    /// Settles as fulfilled and schedules every fulfillment observer.
    fn fulfill(&self, value: T) {
        let (observers, discarded) = {
            let mut core = self.core.lock();
            let CellState::Pending {
                fulfill_observers,
                reject_observers,
            } = &mut core.state
            else {
                return;
            };
            let drained = (
                std::mem::take(fulfill_observers),
                std::mem::take(reject_observers),
            );
            core.state = CellState::Fulfilled(value.clone());
            core.following = None;
            core.backlog = Some(Vec::new());
            drained
        };
        drop(discarded);
        tracing::trace!(
            cell = ?(self as *const Self),
            observers = observers.len(),
            "promise fulfilled"
        );
        self.dispatch(observers.into_iter().map(|observer| -> Task {
            let value = value.clone();
            Box::new(move || observer(value))
        }));
    }

    /// Settles as rejected and schedules every rejection observer.
    fn reject(&self, reason: Error) {
        let (observers, discarded) = {
            let mut core = self.core.lock();
            let CellState::Pending {
                fulfill_observers,
                reject_observers,
            } = &mut core.state
            else {
                return;
            };
            let drained = (
                std::mem::take(reject_observers),
                std::mem::take(fulfill_observers),
            );
            core.state = CellState::Rejected(reason.clone());
            core.following = None;
            core.backlog = Some(Vec::new());
            drained
        };
        drop(discarded);
        tracing::trace!(
            cell = ?(self as *const Self),
            observers = observers.len(),
            kind = ?reason.kind(),
            "promise rejected"
        );
        self.dispatch(observers.into_iter().map(|observer| -> Task {
            let reason = reason.clone();
            Box::new(move || observer(reason))
        }));
    }

    /// Hands the drained observers to the scheduler, then everything that was
    /// registered meanwhile, until the backlog stays empty.
    fn dispatch(&self, drained: impl Iterator<Item = Task>) {
        for task in drained {
            self.scheduler.schedule(task);
        }
        loop {
            let late = {
                let mut core = self.core.lock();
                let late = core.backlog.as_mut().map(std::mem::take).unwrap_or_default();
                if late.is_empty() {
                    core.backlog = None;
                }
                late
            };
            if late.is_empty() {
                break;
            }
            tracing::trace!(observers = late.len(), "dispatching late observers");
            for task in late {
                self.scheduler.schedule(task);
            }
        }
    }

    /// Registers one observer per outcome. A settled cell schedules the
    /// matching observer right away instead of queueing it, unless its
    /// settlement is still being dispatched.
    fn subscribe(&self, on_fulfilled: FulfillObserver<T>, on_rejected: RejectObserver) {
        let task = {
            let mut core = self.core.lock();
            let task: Task = match &mut core.state {
                CellState::Pending {
                    fulfill_observers,
                    reject_observers,
                } => {
                    fulfill_observers.push(on_fulfilled);
                    reject_observers.push(on_rejected);
                    return;
                }
                CellState::Fulfilled(v) => {
                    let v = v.clone();
                    Box::new(move || on_fulfilled(v))
                }
                CellState::Rejected(e) => {
                    let e = e.clone();
                    Box::new(move || on_rejected(e))
                }
            };
            if let Some(backlog) = core.backlog.as_mut() {
                backlog.push(task);
                return;
            }
            task
        };
        self.scheduler.schedule(task);
    }
}

/// Runs a continuation and feeds its outcome into `target`.
///
/// `Err` and panics both reject `target`; nothing escapes to the scheduler.
fn run_handler<U, H>(target: &Arc<Inner<U>>, handler: H)
where
    U: Clone + Send + 'static,
    H: FnOnce() -> Result<Resolution<U>>,
{
    match catch_unwind(AssertUnwindSafe(handler)) {
        Ok(Ok(resolution)) => target.resolve(resolution),
        Ok(Err(reason)) => target.reject(reason),
        Err(payload) => {
            let reason = Error::from_panic(payload.as_ref());
            tracing::debug!(error = %reason, "promise continuation panicked");
            target.reject(reason);
        }
    }
}

/// A deferred value cell.
///
/// Cloning yields another handle to the same cell.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    fn from_inner(inner: Arc<Inner<T>>) -> Self {
        Self { inner }
    }

    /// Creates a pending cell and runs `setup` on it immediately.
    ///
    /// `setup` receives the cell's [`Resolver`]. An `Err` returned from
    /// `setup`, or a panic inside it, rejects the cell unless the resolver
    /// already fired.
    #[must_use]
    pub fn new<F>(scheduler: &SchedulerHandle, setup: F) -> Self
    where
        F: FnOnce(Resolver<T>) -> Result<()>,
    {
        let (promise, resolver) = Self::pending(scheduler);
        let guard = resolver.clone();
        let failure = match catch_unwind(AssertUnwindSafe(move || setup(resolver))) {
            Ok(Ok(())) => None,
            Ok(Err(reason)) => Some(reason),
            Err(payload) => Some(Error::from_panic(payload.as_ref())),
        };
        if let Some(reason) = failure {
            if !guard.reject(reason) {
                tracing::trace!("setup failure after resolution ignored");
            }
        }
        promise
    }

    /// Creates a pending cell and the resolver that settles it.
    #[must_use]
    pub fn pending(scheduler: &SchedulerHandle) -> (Self, Resolver<T>) {
        let inner = Inner::new(scheduler.clone());
        let resolver = Resolver::new(Arc::clone(&inner));
        (Self::from_inner(inner), resolver)
    }

    /// Creates a cell resolved with `resolution`.
    ///
    /// Runs the full resolution procedure: a plain value fulfills the cell,
    /// a promise or thenable is followed.
    #[must_use]
    pub fn resolved(scheduler: &SchedulerHandle, resolution: impl Into<Resolution<T>>) -> Self {
        let inner = Inner::new(scheduler.clone());
        inner.resolve(resolution.into());
        Self::from_inner(inner)
    }

    /// Creates a cell already fulfilled with `value`.
    #[must_use]
    pub fn fulfilled(scheduler: &SchedulerHandle, value: T) -> Self {
        Self::resolved(scheduler, Resolution::Value(value))
    }

    /// Creates a cell already rejected with `reason`.
    #[must_use]
    pub fn rejected(scheduler: &SchedulerHandle, reason: Error) -> Self {
        let inner = Inner::new(scheduler.clone());
        inner.reject(reason);
        Self::from_inner(inner)
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.state()
    }

    /// Returns true if the cell has not settled yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.is_pending()
    }

    /// Returns a copy of the outcome, once settled.
    #[must_use]
    pub fn settlement(&self) -> Option<Settlement<T>> {
        self.inner.settlement()
    }

    /// Returns the scheduler this cell dispatches observers on.
    #[must_use]
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.inner.scheduler
    }

    /// Returns true if both handles refer to the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers raw observers without deriving a new cell.
    pub(crate) fn observe<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + Send + 'static,
        R: FnOnce(Error) + Send + 'static,
    {
        self.inner
            .subscribe(Box::new(on_fulfilled), Box::new(on_rejected));
    }

    /// Chains both outcomes into a new cell.
    ///
    /// Whichever handler matches the settlement runs on a later turn. Its
    /// `Ok` output goes through the new cell's resolution procedure, so
    /// returning another promise re-chains; an `Err` or a panic rejects the
    /// new cell.
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Resolution<U>> + Send + 'static,
        R: FnOnce(Error) -> Result<Resolution<U>> + Send + 'static,
    {
        let derived = Inner::new(self.inner.scheduler.clone());
        let on_ok = Arc::clone(&derived);
        let on_err = Arc::clone(&derived);
        self.observe(
            move |value| run_handler(&on_ok, move || on_fulfilled(value)),
            move |reason| run_handler(&on_err, move || on_rejected(reason)),
        );
        Promise::from_inner(derived)
    }

    /// Chains the fulfilled outcome; a rejection is forwarded unchanged.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Resolution<U>> + Send + 'static,
    {
        let derived = Inner::new(self.inner.scheduler.clone());
        let on_ok = Arc::clone(&derived);
        let on_err = Arc::clone(&derived);
        self.observe(
            move |value| run_handler(&on_ok, move || on_fulfilled(value)),
            move |reason| on_err.reject(reason),
        );
        Promise::from_inner(derived)
    }

    /// Chains the rejected outcome; a value is forwarded unchanged.
    pub fn catch<R>(&self, on_rejected: R) -> Self
    where
        R: FnOnce(Error) -> Result<Resolution<T>> + Send + 'static,
    {
        let derived = Inner::new(self.inner.scheduler.clone());
        let on_ok = Arc::clone(&derived);
        let on_err = Arc::clone(&derived);
        self.observe(
            move |value| on_ok.fulfill(value),
            move |reason| run_handler(&on_err, move || on_rejected(reason)),
        );
        Self::from_inner(derived)
    }

    /// Maps the fulfilled value into a new cell.
    pub fn map<U, F>(&self, f: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |value| Ok(Resolution::Value(f(value))))
    }

    /// Runs `f` on either outcome, then forwards the original outcome.
    ///
    /// If `f` fails or panics, the new cell rejects with that failure instead.
    pub fn finally<F>(&self, f: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let derived = Inner::new(self.inner.scheduler.clone());
        let slot = Arc::new(Mutex::new(Some(f)));
        let (ok_slot, err_slot) = (Arc::clone(&slot), slot);
        let on_ok = Arc::clone(&derived);
        let on_err = Arc::clone(&derived);
        self.observe(
            move |value| {
                run_handler(&on_ok, move || {
                    run_cleanup(&ok_slot)?;
                    Ok(Resolution::Value(value))
                });
            },
            move |reason| {
                run_handler(&on_err, move || {
                    run_cleanup(&err_slot)?;
                    Err(reason)
                });
            },
        );
        Self::from_inner(derived)
    }
}

fn run_cleanup<F>(slot: &Mutex<Option<F>>) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let cleanup = slot.lock().take();
    cleanup.map_or(Ok(()), |f| f())
}

impl<T: Clone + Send + 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
