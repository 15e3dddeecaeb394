//! A [`ResponseWriter`] decorator that defers the status commit.

use std::io;

use http::{HeaderMap, StatusCode};

use crate::response::ResponseWriter;

/// Wraps the real response channel for the duration of one handler call.
///
/// `write_header` only records the status. The real channel is committed on
/// the first `write` that carries bytes, or on any write while the recorded
/// status is below 400. An empty write under an error status is swallowed,
/// which keeps the "set 4xx, write nothing" case uncommitted so the
/// [`converter`](super::converter) can still replace the body afterwards.
///
/// Headers are not intercepted: `headers`/`headers_mut` go straight to the
/// wrapped channel.
///
/// The interceptor lives on the stack of the middleware that binds it and
/// borrows the channel, so a fresh one per request costs no allocation and
/// cannot outlive the request.
pub struct Interceptor<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
    committed: bool,
}

impl<'a> Interceptor<'a> {
    /// Binds a fresh interceptor to `inner`: no status, not committed.
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self { inner, status: None, committed: false }
    }

    /// The last status recorded by `write_header`, or the implicit `200 OK`
    /// of a first write.
    pub fn status(&self) -> Option<StatusCode> { self.status }

    /// Whether the real channel's status line has been committed.
    pub fn is_committed(&self) -> bool { self.committed }

    /// Commits a recorded status that no write ever flushed (e.g. `204`).
    pub fn flush_status(&mut self) {
        if let (false, Some(status)) = (self.committed, self.status) {
            self.inner.write_header(status);
            self.committed = true;
        }
    }

    /// Releases the wrapped channel.
    pub fn into_inner(self) -> &'a mut dyn ResponseWriter {
        self.inner
    }
}

impl ResponseWriter for Interceptor<'_> {
    fn headers(&self) -> &HeaderMap { self.inner.headers() }

    fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }

    fn write_header(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.committed {
            if buf.is_empty() && self.status.is_some_and(|s| s.as_u16() >= 400) {
                return Ok(0);
            }
            let status = *self.status.get_or_insert(StatusCode::OK);
            self.inner.write_header(status);
            self.committed = true;
        }
        self.inner.write(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Recorder;
    use http::header::CONTENT_TYPE;

    #[test]
    fn fresh_interceptor_is_reset() {
        let mut rec = Recorder::new();
        {
            let mut ri = Interceptor::new(&mut rec);
            ri.write_header(StatusCode::IM_A_TEAPOT);
            ri.write(b"short and stout").unwrap();
            assert!(ri.is_committed());
        }
        let ri = Interceptor::new(&mut rec);
        assert_eq!(ri.status(), None);
        assert!(!ri.is_committed());
    }

    #[test]
    fn empty_write_under_error_status_is_swallowed() {
        let mut rec = Recorder::new();
        let mut ri = Interceptor::new(&mut rec);
        ri.write_header(StatusCode::NOT_FOUND);

        assert_eq!(ri.write(b"").unwrap(), 0);
        assert!(!ri.is_committed());
        drop(ri);
        assert_eq!(rec.header_writes(), 0);
    }

    #[test]
    fn empty_write_under_success_status_commits() {
        let mut rec = Recorder::new();
        let mut ri = Interceptor::new(&mut rec);
        ri.write_header(StatusCode::ACCEPTED);
        ri.write(b"").unwrap();

        assert!(ri.is_committed());
        drop(ri);
        assert_eq!(rec.status(), Some(StatusCode::ACCEPTED));
    }

    #[test]
    fn last_status_before_commit_wins() {
        let mut rec = Recorder::new();
        let mut ri = Interceptor::new(&mut rec);
        ri.write_header(StatusCode::NOT_FOUND);
        ri.write_header(StatusCode::CREATED);
        ri.write(b"{}").unwrap();
        drop(ri);

        assert_eq!(rec.status(), Some(StatusCode::CREATED));
        assert_eq!(rec.header_writes(), 1);
    }

    #[test]
    fn first_write_defaults_to_ok_then_streams() {
        let mut rec = Recorder::new();
        let mut ri = Interceptor::new(&mut rec);
        ri.headers_mut().insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        ri.write(b"chunk-1 ").unwrap();
        ri.write(b"chunk-2").unwrap();
        assert_eq!(ri.status(), Some(StatusCode::OK));
        drop(ri);

        assert_eq!(rec.status(), Some(StatusCode::OK));
        assert_eq!(rec.header_writes(), 1);
        assert_eq!(rec.body_str(), "chunk-1 chunk-2");
        assert_eq!(rec.sent_headers().unwrap()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn error_status_with_body_commits_as_is() {
        let mut rec = Recorder::new();
        let mut ri = Interceptor::new(&mut rec);
        ri.write_header(StatusCode::BAD_REQUEST);
        ri.write(b"nope").unwrap();
        assert!(ri.is_committed());
        drop(ri);

        assert_eq!(rec.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(rec.body_str(), "nope");
    }

    #[test]
    fn flush_status_commits_once() {
        let mut rec = Recorder::new();
        let mut ri = Interceptor::new(&mut rec);
        ri.flush_status();
        assert!(!ri.is_committed());

        ri.write_header(StatusCode::NO_CONTENT);
        ri.flush_status();
        ri.flush_status();
        drop(ri);

        assert_eq!(rec.status(), Some(StatusCode::NO_CONTENT));
        assert_eq!(rec.header_writes(), 1);
        assert!(rec.body().is_empty());
    }
}
