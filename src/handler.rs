//! Handler trait, type erasure, and the middleware shape.
//!
//! # How handlers are stored
//!
//! The router holds handlers of *different* concrete types in one table, so
//! each is erased behind `Arc<dyn Handler>`:
//!
//! ```text
//! fn hello(w: &mut dyn ResponseWriter, req: &mut Request) { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! Arc::new(hello)                                                  ← BoxedHandler
//!        ↓ middleware wraps it at build time
//! converter(recoverer(hello))                                      ← still a BoxedHandler
//!        ↓
//! handler.call(&mut writer, &mut req)   at request time            ← one vtable dispatch per layer
//! ```
//!
//! # Why handlers are synchronous
//!
//! An async handler that returns a finished `Response` is the usual shape for
//! a hyper framework. It does not fit here, for two reasons:
//!
//! - The converter has to see the status *before* any body bytes leave, and
//!   decide whether to replace them. That needs a writer the middleware can
//!   wrap, not a value handed back after the fact.
//! - Panic recovery reads the panic site from thread-local state that the
//!   panic hook fills in. A future can hop threads at every `.await`; a
//!   synchronous call stays on one thread from entry to unwind.
//!
//! So handlers write into a [`ResponseWriter`] and return nothing, and the
//! server runs each request's chain with `tokio::task::spawn_blocking`:
//!
//! ```text
//! connection task (async)            blocking-pool thread
//! ───────────────────────            ──────────────────────────────
//! collect request body
//! spawn_blocking ──────────────────► app.handle(&mut writer, req)
//! await head  ◄──── oneshot ──────── writer.write_header(status)
//! stream body ◄──── mpsc (16) ────── writer.write(bytes) …
//! ```
//!
//! A handler may block on I/O. Every layer of the chain sees the request on
//! exactly one thread from start to finish. A handler that streams faster
//! than the client reads blocks in `write` until the channel drains.

use std::sync::Arc;

use crate::request::Request;
use crate::response::ResponseWriter;

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function or closure with the signature
///
/// ```text
/// Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static
/// ```
///
/// Closures passed straight to a `impl Handler` parameter need annotated
/// argument types; [`handler_fn`] infers them.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, w: &mut dyn ResponseWriter, req: &mut Request);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
{
    fn call(&self, w: &mut dyn ResponseWriter, req: &mut Request) {
        self(w, req)
    }
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// A middleware wraps the next handler in the chain and returns the wrapper.
pub type Middleware = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static>;

/// Boxes a closure as a handler, inferring its argument types.
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Panic payload that tears the connection down without a response.
///
/// Raise it with [`abort`] when the client must observe a dropped connection
/// (for example after detecting that the peer is gone). The
/// [`recoverer`](crate::middleware::recoverer) re-raises it untouched, the
/// server closes the connection, and nothing is logged above debug level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Abort;

/// Aborts the current response. See [`Abort`].
pub fn abort() -> ! {
    std::panic::panic_any(Abort)
}
