//! # problemdetails
//!
//! A minimal HTTP framework whose failure responses all speak one format:
//! RFC 9457 problem details.
//!
//! ## The contract
//!
//! Handlers stream into a [`ResponseWriter`]. Three middleware layers sit
//! between the router and the handler:
//!
//! - [`middleware::converter`] — a handler that sets `404` (or any status
//!   >= 400) and writes no body gets an `application/problem+json` body
//!   instead of an empty one. Success responses stream through untouched.
//! - [`middleware::recoverer`] — a panicking handler produces a `500`
//!   problem document whose `detail` names the panic and, optionally, where
//!   it happened. [`Abort`] panics are never converted; they drop the
//!   connection.
//! - [`middleware::context`] — lets logging that runs after the handler see
//!   which problem document was sent.
//!
//! Problem bodies are rendered by one [`ProblemWriter`], passed explicitly
//! to each layer.
//!
//! What's left for the framework:
//!
//! - Radix-tree routing — O(path-length) lookup via [`matchit`]
//! - hyper connection handling, HTTP/1.1 and HTTP/2
//! - Graceful shutdown — SIGTERM / Ctrl-C, drains in-flight requests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use http::StatusCode;
//! use problemdetails::middleware::{context, converter, recoverer};
//! use problemdetails::{ProblemWriter, Request, ResponseWriter, ResponseWriterExt, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), problemdetails::Error> {
//!     let writer = Arc::new(ProblemWriter::new());
//!     let app = Router::new()
//!         .layer(context)
//!         .layer(converter(Arc::clone(&writer), |_req, _status| {}))
//!         .layer(recoverer(writer, 0))
//!         .get("/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! fn get_user(w: &mut dyn ResponseWriter, req: &mut Request) {
//!     match req.param("id") {
//!         Some("42") => { let _ = w.json(StatusCode::OK, br#"{"id":42}"#); }
//!         // becomes a problem document on the way out
//!         _ => w.write_header(StatusCode::NOT_FOUND),
//!     }
//! }
//! ```

mod channel;
mod config;
mod error;
mod handler;
mod problem;
mod recorder;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use config::Config;
pub use error::Error;
pub use handler::{Abort, BoxedHandler, Handler, Middleware, abort, handler_fn};
pub use problem::{ABOUT_BLANK, PROBLEM_JSON, ProblemDetails, ProblemWriter, default_writer, install_default};
pub use recorder::Recorder;
pub use request::Request;
pub use response::{ContentType, ResponseWriter, ResponseWriterExt};
pub use router::{App, Router};
pub use server::{Server, serve_with_shutdown};
