//! The response channel handlers write to.
//!
//! A handler does not return a response value. It is handed a
//! [`ResponseWriter`] and streams into it: set headers, commit a status,
//! write body bytes. Committing is one-way. Once the status line has gone
//! out, later header changes and status calls have no effect on the wire.
//! That is the property the middleware in [`crate::middleware`] works around.

use std::io;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// An outgoing HTTP response channel.
///
/// Implementations:
/// - the server's channel-backed writer (one per request)
/// - [`Interceptor`](crate::middleware::Interceptor), which defers commitment
/// - [`Recorder`](crate::Recorder), an in-memory writer for tests
pub trait ResponseWriter {
    /// Headers that will be sent when the status is committed.
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commits `status` and the current headers. Only the first call counts.
    fn write_header(&mut self, status: StatusCode);

    /// Writes body bytes, committing `200 OK` first if nothing was committed.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers(&self) -> &HeaderMap { (**self).headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { (**self).headers_mut() }
    fn write_header(&mut self, status: StatusCode) { (**self).write_header(status) }
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { (**self).write(buf) }
}

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseWriterExt::respond`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Problem,      // application/problem+json  (RFC 9457)
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Problem     => "application/problem+json",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Convenience methods available on every [`ResponseWriter`].
pub trait ResponseWriterExt: ResponseWriter {
    /// Writes all of `buf`, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole response body",
                    ));
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Sets the content type, commits `status`, and writes `body`.
    fn respond(&mut self, status: StatusCode, content_type: ContentType, body: &[u8]) -> io::Result<()> {
        self.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        self.write_header(status);
        self.write_all(body)
    }

    fn text(&mut self, status: StatusCode, body: &str) -> io::Result<()> {
        self.respond(status, ContentType::Text, body.as_bytes())
    }

    fn json(&mut self, status: StatusCode, body: &[u8]) -> io::Result<()> {
        self.respond(status, ContentType::Json, body)
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriterExt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Recorder;

    /// Accepts at most `chunk` bytes per call.
    struct Trickle {
        inner: Recorder,
        chunk: usize,
    }

    impl ResponseWriter for Trickle {
        fn headers(&self) -> &HeaderMap { self.inner.headers() }
        fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }
        fn write_header(&mut self, status: StatusCode) { self.inner.write_header(status) }
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.inner.write(&buf[..n])
        }
    }

    #[test]
    fn write_all_retries_short_writes() {
        let mut w = Trickle { inner: Recorder::new(), chunk: 3 };
        w.write_all(b"hello world").unwrap();
        assert_eq!(w.inner.body(), b"hello world");
    }

    #[test]
    fn respond_sets_content_type_before_commit() {
        let mut rec = Recorder::new();
        rec.text(StatusCode::CREATED, "made").unwrap();

        assert_eq!(rec.status(), Some(StatusCode::CREATED));
        assert_eq!(
            rec.sent_headers().unwrap().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(rec.body_str(), "made");
    }
}
