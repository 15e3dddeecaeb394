//! Per-request record of the problem document that was sent.

use std::cell::OnceCell;
use std::sync::Arc;

use tracing::warn;

use crate::handler::{BoxedHandler, handler_fn};
use crate::problem::ProblemDetails;

/// Holds the problem document written for the current request, if any.
///
/// Populated by [`ProblemWriter::write`](crate::ProblemWriter::write), at
/// most once, while the handler chain runs. Meant to be read afterwards, for
/// example by request logging wrapped around the chain.
#[derive(Debug, Default)]
pub struct ProblemContext {
    details: OnceCell<Arc<ProblemDetails>>,
}

impl ProblemContext {
    /// The problem document sent for this request, if one was.
    pub fn details(&self) -> Option<&ProblemDetails> {
        self.details.get().map(Arc::as_ref)
    }

    pub(crate) fn record(&self, details: Arc<ProblemDetails>) {
        if self.details.set(details).is_err() {
            warn!("problem details already recorded for this request; keeping the first");
        }
    }
}

/// Attaches an empty [`ProblemContext`] to every request before calling `next`.
pub fn context(next: BoxedHandler) -> BoxedHandler {
    handler_fn(move |w, req| {
        req.problem = Some(ProblemContext::default());
        next.call(w, req);
    })
}
