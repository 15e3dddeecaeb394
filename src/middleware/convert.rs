//! Rewrites bodiless error responses into problem documents.

use std::sync::Arc;

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY};
use http::{HeaderMap, StatusCode};
use tracing::debug;

use super::Interceptor;
use crate::handler::{BoxedHandler, handler_fn};
use crate::problem::{PROBLEM_JSON, ProblemWriter};
use crate::request::Request;
use crate::response::ResponseWriter;

/// Middleware that turns error responses into RFC 9457 problem documents.
///
/// The downstream chain writes through an [`Interceptor`]. When it returns
/// having recorded a status >= 400 without sending any body bytes, and the
/// content type is not already `application/problem+json`, the response is
/// replaced: `Content-Encoding`, `Vary` and `Content-Length` are dropped,
/// `writer` sends a problem document for that status, and `on_convert` is
/// called with the request and status.
///
/// Responses whose body already started are never touched. A recorded
/// status with no body (e.g. `204`) is committed on the handler's behalf.
pub fn converter<F>(writer: Arc<ProblemWriter>, on_convert: F) -> impl Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static
where
    F: Fn(&Request, StatusCode) + Send + Sync + 'static,
{
    let on_convert = Arc::new(on_convert);
    move |next: BoxedHandler| {
        let writer = Arc::clone(&writer);
        let on_convert = Arc::clone(&on_convert);
        handler_fn(move |w, req| {
            let mut ri = Interceptor::new(w);
            next.call(&mut ri, req);

            match ri.status() {
                Some(status) if needs_conversion(&ri, status) => {
                    let w = ri.into_inner();
                    strip_body_headers(w.headers_mut());
                    debug!(status = status.as_u16(), path = req.path(), "converting error response to problem details");
                    writer.write(w, req, status, "", None);
                    (*on_convert)(req, status);
                }
                Some(_) => ri.flush_status(),
                None => {}
            }
        })
    }
}

fn needs_conversion(ri: &Interceptor<'_>, status: StatusCode) -> bool {
    status.as_u16() >= 400 && !ri.is_committed() && !is_problem_json(ri.headers())
}

fn is_problem_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .is_some_and(|ct| ct.as_bytes().starts_with(PROBLEM_JSON.as_bytes()))
}

/// These describe the body the handler meant to send, which never will be.
fn strip_body_headers(headers: &mut HeaderMap) {
    headers.remove(CONTENT_ENCODING);
    headers.remove(VARY);
    headers.remove(CONTENT_LENGTH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ProblemDetails;
    use crate::{Recorder, ResponseWriterExt};
    use bytes::Bytes;
    use http::HeaderValue;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(String, StatusCode)>>>;

    fn run<H>(handler: H) -> (Recorder, Vec<(String, StatusCode)>)
    where
        H: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync + 'static,
    {
        let calls: Calls = Arc::default();
        let sink = Arc::clone(&calls);
        let layer = converter(Arc::new(ProblemWriter::new()), move |req, status| {
            sink.lock().unwrap().push((req.path().to_owned(), status));
        });
        let chain = layer(handler_fn(handler));

        let mut req: Request = http::Request::builder().uri("/widgets/1").body(Bytes::new()).unwrap().into();
        let mut rec = Recorder::new();
        chain.call(&mut rec, &mut req);

        let calls = calls.lock().unwrap().clone();
        (rec, calls)
    }

    #[test]
    fn bodiless_404_becomes_problem_document() {
        let (rec, calls) = run(|w, _req| {
            w.write_header(StatusCode::NOT_FOUND);
            let _ = w.write(b"");
        });

        assert_eq!(rec.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(rec.header_writes(), 1);
        let sent = rec.sent_headers().unwrap();
        assert!(sent[CONTENT_TYPE].as_bytes().starts_with(PROBLEM_JSON.as_bytes()));

        let pd: ProblemDetails = serde_json::from_slice(rec.body()).unwrap();
        assert_eq!(pd.status, 404);
        assert_eq!(pd.title, "Not Found");
        assert_eq!(pd.instance, "/widgets/1");
        assert!(pd.detail.is_empty());

        assert_eq!(calls, vec![("/widgets/1".to_owned(), StatusCode::NOT_FOUND)]);
    }

    #[test]
    fn stale_body_headers_are_dropped() {
        let (rec, _) = run(|w, _req| {
            let h = w.headers_mut();
            h.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
            h.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            h.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
            h.insert(CONTENT_LENGTH, HeaderValue::from_static("512"));
            w.write_header(StatusCode::SERVICE_UNAVAILABLE);
        });

        let sent = rec.sent_headers().unwrap();
        assert_eq!(sent[CONTENT_TYPE], PROBLEM_JSON);
        assert!(sent.get(CONTENT_ENCODING).is_none());
        assert!(sent.get(VARY).is_none());
        assert!(sent.get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn error_with_body_passes_through() {
        let (rec, calls) = run(|w, _req| {
            let _ = w.text(StatusCode::BAD_REQUEST, "missing field `name`");
        });

        assert_eq!(rec.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(rec.body_str(), "missing field `name`");
        assert!(calls.is_empty());
    }

    #[test]
    fn existing_problem_document_is_left_alone() {
        let (rec, calls) = run(|w, _req| {
            w.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/problem+json; charset=utf-8"));
            w.write_header(StatusCode::UNPROCESSABLE_ENTITY);
        });

        assert_eq!(rec.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(rec.body().is_empty());
        assert_eq!(rec.header_writes(), 1);
        assert!(calls.is_empty());
    }

    #[test]
    fn no_content_is_committed_once() {
        let (rec, calls) = run(|w, _req| w.write_header(StatusCode::NO_CONTENT));

        assert_eq!(rec.status(), Some(StatusCode::NO_CONTENT));
        assert_eq!(rec.header_writes(), 1);
        assert!(rec.body().is_empty());
        assert!(calls.is_empty());
    }

    #[test]
    fn success_bytes_are_forwarded_unchanged() {
        let (rec, _) = run(|w, _req| {
            for chunk in [&b"alpha,"[..], b"beta,", b"gamma"] {
                w.write(chunk).unwrap();
            }
        });

        assert_eq!(rec.status(), Some(StatusCode::OK));
        assert_eq!(rec.body(), b"alpha,beta,gamma");
        assert_eq!(rec.header_writes(), 1);
    }

    #[test]
    fn handler_that_writes_nothing_is_left_to_the_server() {
        let (rec, calls) = run(|_w, _req| {});

        assert_eq!(rec.status(), None);
        assert_eq!(rec.header_writes(), 0);
        assert!(calls.is_empty());
    }
}
