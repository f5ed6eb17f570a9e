//! Combinators over collections of deferred values.
//!
//! - [`all`]: every input fulfills; values in input order, first rejection wins
//! - [`race`]: the first input to settle decides
//! - [`all_settled`]: every input settles; outcomes in input order
//! - [`any`]: the first fulfillment wins; all rejections are aggregated
//!
//! Each input is a [`Resolution`], so plain values, native promises and
//! thenables can be mixed. Native promises are observed as they are; values
//! and thenables are first wrapped in a cell of their own. Inputs are
//! collected before any of them is observed; the input count is fixed at
//! call time. Every combinator returns
//! a fresh cell on the given scheduler and settles it at most once.

pub mod all;
pub mod all_settled;
pub mod any;
pub mod race;

pub use all::all;
pub use all_settled::all_settled;
pub use any::any;
pub use race::race;

use crate::error::{Error, Result};
use crate::promise::{Promise, Resolution};
use crate::scheduler::SchedulerHandle;

/// Turns every input into a cell to observe.
///
/// A native promise is used directly, so one that is already settled is
/// dispatched on the same turn as a plain value placed after it.
fn settle_inputs<T, I>(scheduler: &SchedulerHandle, inputs: I) -> Vec<Promise<T>>
where
    T: Clone + Send + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T>>,
{
    inputs
        .into_iter()
        .map(|input| {
            let input: Resolution<T> = input.into();
            match input {
                Resolution::Promise(promise) => promise,
                other => Promise::resolved(scheduler, other),
            }
        })
        .collect()
}

/// Per-input result slots, filled in any order and read back in input order.
struct Slots<V> {
    values: Vec<Option<V>>,
    remaining: usize,
}

impl<V> Slots<V> {
    fn new(len: usize) -> Self {
        Self {
            values: (0..len).map(|_| None).collect(),
            remaining: len,
        }
    }

    /// Stores the outcome of input `index`. Returns every outcome, in input
    /// order, once the last slot is filled.
    fn fill(&mut self, index: usize, value: V) -> Result<Option<Vec<V>>> {
        let len = self.values.len();
        let slot = self.values.get_mut(index).ok_or_else(|| {
            Error::internal(format!("combinator slot {index} out of range for {len} inputs"))
        })?;
        if slot.replace(value).is_none() {
            self.remaining -= 1;
        }
        if self.remaining > 0 {
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut self.values).into_iter().flatten().collect()))
    }
}
