//! `all`: wait for every input to fulfill.
//!
//! ```text
//! all([a, b, c]):
//!   every input fulfills      → Fulfilled([va, vb, vc])   (input order)
//!   any input rejects         → Rejected(first reason)
//!   no inputs                 → Fulfilled([])
//! ```

use super::{settle_inputs, Slots};
use crate::promise::{Promise, Resolution};
use crate::scheduler::SchedulerHandle;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fulfills with every input's value, in input order, once all fulfill.
///
/// Rejects with the first rejection observed. Later settlements of other
/// inputs are ignored.
pub fn all<T, I>(scheduler: &SchedulerHandle, inputs: I) -> Promise<Vec<T>>
where
    T: Clone + Send + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T>>,
{
    let inputs = settle_inputs(scheduler, inputs);
    let (result, resolver) = Promise::pending(scheduler);
    tracing::trace!(inputs = inputs.len(), "all started");

    if inputs.is_empty() {
        resolver.fulfill(Vec::new());
        return result;
    }

    let slots = Arc::new(Mutex::new(Slots::new(inputs.len())));
    for (index, input) in inputs.into_iter().enumerate() {
        let slots = Arc::clone(&slots);
        let on_ok = resolver.clone();
        let on_err = resolver.clone();
        input.observe(
            move |value| {
                let filled = slots.lock().fill(index, value);
                match filled {
                    Ok(Some(values)) => {
                        on_ok.fulfill(values);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        on_ok.reject(err);
                    }
                }
            },
            move |reason| {
                if on_err.reject(reason) {
                    tracing::trace!(index, "all rejected by input");
                }
            },
        );
    }
    result
}
