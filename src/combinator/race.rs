//! `race`: the first input to settle decides.
//!
//! ```text
//! race([a, b]):
//!   first settlement observed → same outcome
//!   no inputs                 → stays pending forever
//! ```

use super::settle_inputs;
use crate::promise::{Promise, Resolution};
use crate::scheduler::SchedulerHandle;

/// Settles like the first input observed to settle.
///
/// Native promises and plain values that are already settled when `race` is
/// called are dispatched in input order, so the earliest of them wins. A
/// thenable settles one turn later at the soonest. With no inputs the result
/// never settles.
pub fn race<T, I>(scheduler: &SchedulerHandle, inputs: I) -> Promise<T>
where
    T: Clone + Send + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T>>,
{
    let inputs = settle_inputs(scheduler, inputs);
    let (result, resolver) = Promise::pending(scheduler);
    if inputs.is_empty() {
        tracing::debug!("race over no inputs never settles");
        return result;
    }
    tracing::trace!(inputs = inputs.len(), "race started");

    for (index, input) in inputs.into_iter().enumerate() {
        let on_ok = resolver.clone();
        let on_err = resolver.clone();
        input.observe(
            move |value| {
                if on_ok.fulfill(value) {
                    tracing::trace!(index, "race won by fulfillment");
                }
            },
            move |reason| {
                if on_err.reject(reason) {
                    tracing::trace!(index, "race won by rejection");
                }
            },
        );
    }
    result
}
