//! Middleware layer.
//!
//! Everything here has the shape `Fn(BoxedHandler) -> BoxedHandler` and is
//! registered with [`Router::layer`](crate::Router::layer). The first layer
//! registered is the outermost.
//!
//! - [`context`] — attaches a [`ProblemContext`] so code running after the
//!   handler can see which problem document, if any, was sent.
//! - [`converter`] — replaces bodiless error responses with RFC 9457
//!   problem documents.
//! - [`recoverer`] — turns handler panics into `500` problem documents.
//!
//! A typical stack:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use problemdetails::middleware::{context, converter, recoverer};
//! use problemdetails::{ProblemWriter, Router};
//!
//! let writer = Arc::new(ProblemWriter::new());
//! let app = Router::new()
//!     .layer(context)
//!     .layer(converter(Arc::clone(&writer), |req, status| {
//!         tracing::warn!(path = req.path(), %status, "converted error response");
//!     }))
//!     .layer(recoverer(writer, 0));
//! ```

mod context;
mod convert;
mod interceptor;
mod panic_site;
mod recover;

pub use context::{ProblemContext, context};
pub use convert::converter;
pub use interceptor::Interceptor;
pub use recover::recoverer;

pub(crate) use panic_site::message as panic_message;
