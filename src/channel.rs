//! The server's [`ResponseWriter`]: a head slot plus a streaming body channel.
//!
//! The handler chain runs on a blocking-pool thread and writes here. The
//! connection task waits for the head, hands hyper a response whose body
//! drains the channel, and the two sides proceed concurrently. The bounded
//! channel gives backpressure: a handler streaming faster than the client
//! reads blocks in `write`.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body::{Body, Frame};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::response::ResponseWriter;

/// Body chunks in flight between the handler thread and the connection.
pub(crate) const BODY_CHANNEL_CAPACITY: usize = 16;

/// Status and headers, sent once on commit.
pub(crate) struct Head {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

pub(crate) struct ChannelWriter {
    headers: HeaderMap,
    head: Option<oneshot::Sender<Head>>,
    body: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelWriter {
    pub fn new(head: oneshot::Sender<Head>, body: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self { headers: HeaderMap::new(), head: Some(head), body }
    }
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

impl ResponseWriter for ChannelWriter {
    fn headers(&self) -> &HeaderMap { &self.headers }

    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    fn write_header(&mut self, status: StatusCode) {
        match self.head.take() {
            Some(tx) => {
                // The receiver only goes away with the connection.
                let _ = tx.send(Head { status, headers: self.headers.clone() });
            }
            None => warn!(%status, "superfluous write_header call"),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.head.is_some() {
            self.write_header(StatusCode::OK);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.body
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| disconnected())?;
        Ok(buf.len())
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            // A handler that never wrote anything still answers 200.
            if self.head.is_some() {
                self.write_header(StatusCode::OK);
            }
            return;
        }
        // Unwinding. Without a head the connection task sees the dropped
        // sender and closes the connection. With one, the body is already
        // streaming: fail it so the client cannot mistake it for complete.
        if self.head.is_none() {
            let aborted = io::Error::new(io::ErrorKind::ConnectionAborted, "handler panicked mid-response");
            let _ = self.body.blocking_send(Err(aborted));
        }
    }
}

/// Response body fed by a [`ChannelWriter`].
pub(crate) struct ChannelBody {
    rx: mpsc::Receiver<io::Result<Bytes>>,
}

impl ChannelBody {
    pub fn new(rx: mpsc::Receiver<io::Result<Bytes>>) -> Self {
        Self { rx }
    }
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        self.rx.poll_recv(cx).map(|chunk| chunk.map(|res| res.map(Frame::data)))
    }
}
