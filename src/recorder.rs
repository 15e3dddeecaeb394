//! In-memory [`ResponseWriter`] for tests.

use std::io;

use http::{HeaderMap, StatusCode};
use tracing::warn;

use crate::response::ResponseWriter;

/// Records everything written to it.
///
/// Commit semantics match the server's writer: the first `write_header`
/// wins, a `write` before any `write_header` commits `200 OK`, and the
/// headers visible to the client are the ones present at commit time
/// ([`sent_headers`](Recorder::sent_headers)).
#[derive(Debug, Default)]
pub struct Recorder {
    headers: HeaderMap,
    status: Option<StatusCode>,
    sent_headers: Option<HeaderMap>,
    body: Vec<u8>,
    header_writes: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, if any.
    pub fn status(&self) -> Option<StatusCode> { self.status }

    /// Headers as they were when the status was committed.
    pub fn sent_headers(&self) -> Option<&HeaderMap> { self.sent_headers.as_ref() }

    pub fn body(&self) -> &[u8] { &self.body }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }

    /// Number of `write_header` calls that reached this writer, including
    /// the implicit one made by a first `write`.
    pub fn header_writes(&self) -> usize { self.header_writes }
}

impl ResponseWriter for Recorder {
    fn headers(&self) -> &HeaderMap { &self.headers }

    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    fn write_header(&mut self, status: StatusCode) {
        self.header_writes += 1;
        if self.status.is_some() {
            warn!(%status, "superfluous write_header call");
            return;
        }
        self.status = Some(status);
        self.sent_headers = Some(self.headers.clone());
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}
