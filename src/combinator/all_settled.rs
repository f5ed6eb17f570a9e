//! `all_settled`: wait for every input to settle, whatever the outcome.

use super::{settle_inputs, Slots};
use crate::error::Result;
use crate::promise::{Promise, Resolution, Resolver};
use crate::scheduler::SchedulerHandle;
use crate::types::Settlement;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fulfills with every input's outcome, in input order. Never rejects.
pub fn all_settled<T, I>(scheduler: &SchedulerHandle, inputs: I) -> Promise<Vec<Settlement<T>>>
where
    T: Clone + Send + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T>>,
{
    let inputs = settle_inputs(scheduler, inputs);
    let (result, resolver) = Promise::pending(scheduler);
    tracing::trace!(inputs = inputs.len(), "all_settled started");

    if inputs.is_empty() {
        resolver.fulfill(Vec::new());
        return result;
    }

    let slots = Arc::new(Mutex::new(Slots::new(inputs.len())));
    for (index, input) in inputs.into_iter().enumerate() {
        let ok_slots = Arc::clone(&slots);
        let err_slots = Arc::clone(&slots);
        let on_ok = resolver.clone();
        let on_err = resolver.clone();
        input.observe(
            move |value| {
                let filled = ok_slots.lock().fill(index, Settlement::Fulfilled(value));
                settle_with(&on_ok, filled);
            },
            move |reason| {
                let filled = err_slots.lock().fill(index, Settlement::Rejected(reason));
                settle_with(&on_err, filled);
            },
        );
    }
    result
}

fn settle_with<T>(resolver: &Resolver<Vec<Settlement<T>>>, filled: Result<Option<Vec<Settlement<T>>>>)
where
    T: Clone + Send + 'static,
{
    match filled {
        Ok(Some(outcomes)) => {
            resolver.fulfill(outcomes);
        }
        Ok(None) => {}
        Err(err) => {
            resolver.reject(err);
        }
    }
}
