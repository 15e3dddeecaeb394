//! Panic recovery.

use std::panic;
use std::sync::Arc;

use http::StatusCode;
use http::header::CONNECTION;
use tracing::{debug, error};

use super::panic_site::{self, Caught};
use crate::handler::{Abort, BoxedHandler, handler_fn};
use crate::problem::ProblemWriter;
use crate::request::Request;

/// What to do with a caught panic.
#[derive(Debug, Eq, PartialEq)]
enum Recovery {
    /// The handler asked for the connection to be dropped; keep unwinding.
    Repropagate,
    /// A protocol upgrade is in flight; a JSON body would corrupt it.
    Silent,
    /// Answer with a 500 problem document.
    Convert,
}

fn classify(caught: &Caught, req: &Request) -> Recovery {
    if caught.payload.is::<Abort>() {
        Recovery::Repropagate
    } else if req
        .headers()
        .get(CONNECTION)
        .is_some_and(|v| v.as_bytes() == b"Upgrade")
    {
        Recovery::Silent
    } else {
        Recovery::Convert
    }
}

/// Middleware that recovers panics and answers `500 Internal Server Error`
/// with a problem document.
///
/// The `detail` field reads `panic: '<message>'`, followed by
/// ` at <file>:<line>` when `stack_frame_idx >= 0`. Offset 0 names the
/// function that panicked, 1 its caller, and so on; this middleware's own
/// frames and the unwinding machinery are already skipped. If the frame
/// cannot be resolved the location is left out. Negative values never
/// report a location. `<file>` is the path recorded in the binary's debug
/// info, usually absolute.
///
/// A payload re-raised with `resume_unwind` has no site of its own and is
/// reported without a location.
///
/// Two panics are not converted:
/// - [`Abort`] is re-raised unchanged so the server drops the connection.
/// - Requests carrying `Connection: Upgrade` get nothing written.
///
/// If the handler had already started the body, the problem document is
/// appended on a best-effort basis and the client may see a mangled
/// response.
pub fn recoverer(writer: Arc<ProblemWriter>, stack_frame_idx: i32) -> impl Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static {
    let offset = usize::try_from(stack_frame_idx).ok();
    move |next: BoxedHandler| {
        let writer = Arc::clone(&writer);
        handler_fn(move |w, req| {
            let Err(caught) = panic_site::catch(offset.is_some(), || next.call(&mut *w, &mut *req)) else {
                return;
            };

            match classify(&caught, req) {
                Recovery::Repropagate => panic::resume_unwind(caught.payload),
                Recovery::Silent => {
                    debug!(path = req.path(), "panic during protocol upgrade; nothing written");
                }
                Recovery::Convert => {
                    let detail = describe(caught, offset);
                    error!(path = req.path(), %detail, "recovered from handler panic");
                    writer.write(w, req, StatusCode::INTERNAL_SERVER_ERROR, &detail, None);
                }
            }
        })
    }
}

fn describe(caught: Caught, offset: Option<usize>) -> String {
    let message = panic_site::message(caught.payload.as_ref());
    let location = offset.zip(caught.site).and_then(|(n, mut site)| site.frame(n));
    match location {
        Some((file, line)) => format!("panic: '{message}' at {file}:{line}"),
        None => format!("panic: '{message}'"),
    }
}
