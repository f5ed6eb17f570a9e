//! `any`: the first input to fulfill wins.
//!
//! ```text
//! any([a, b]):
//!   first fulfillment observed → Fulfilled(value)
//!   every input rejects        → Rejected(AllRejected[ra, rb])   (input order)
//!   no inputs                  → Rejected(AllRejected[])
//! ```

use super::{settle_inputs, Slots};
use crate::error::Error;
use crate::promise::{Promise, Resolution};
use crate::scheduler::SchedulerHandle;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fulfills with the first value observed.
///
/// If every input rejects, rejects with [`ErrorKind::AllRejected`] carrying
/// each reason in input order.
///
/// [`ErrorKind::AllRejected`]: crate::ErrorKind::AllRejected
pub fn any<T, I>(scheduler: &SchedulerHandle, inputs: I) -> Promise<T>
where
    T: Clone + Send + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T>>,
{
    let inputs = settle_inputs(scheduler, inputs);
    let (result, resolver) = Promise::pending(scheduler);
    tracing::trace!(inputs = inputs.len(), "any started");

    if inputs.is_empty() {
        resolver.reject(Error::all_rejected(Vec::new()));
        return result;
    }

    let reasons = Arc::new(Mutex::new(Slots::new(inputs.len())));
    for (index, input) in inputs.into_iter().enumerate() {
        let reasons = Arc::clone(&reasons);
        let on_ok = resolver.clone();
        let on_err = resolver.clone();
        input.observe(
            move |value| {
                if on_ok.fulfill(value) {
                    tracing::trace!(index, "any fulfilled by input");
                }
            },
            move |reason| {
                let filled = reasons.lock().fill(index, reason);
                match filled {
                    Ok(Some(reasons)) => {
                        on_err.reject(Error::all_rejected(reasons));
                    }
                    Ok(None) => {}
                    Err(err) => {
                        on_err.reject(err);
                    }
                }
            },
        );
    }
    result
}
