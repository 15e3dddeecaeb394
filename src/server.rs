//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.
//!
//! # Request execution
//!
//! Each request's body is read in full, then its handler chain runs on the
//! blocking pool with a channel-backed [`ResponseWriter`](crate::ResponseWriter).
//! The response head goes to hyper as soon as the chain commits a status;
//! body bytes stream behind it. A chain that unwinds before committing gets
//! no response at all: the connection is closed.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

use crate::channel::{BODY_CHANNEL_CAPACITY, ChannelBody, ChannelWriter};
use crate::error::Error;
use crate::handler::Abort;
use crate::middleware::panic_message;
use crate::request::Request;
use crate::router::{App, Router};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use problemdetails::Server;
    /// let server = Server::bind("0.0.0.0:3000")?;
    /// # Ok::<(), problemdetails::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()? })
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "listening");
        serve_with_shutdown(listener, router, shutdown_signal()).await
    }
}

/// Serves `router` on an already-bound listener until `shutdown` resolves,
/// then drains in-flight connections.
pub async fn serve_with_shutdown<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), Error>
where
    F: Future<Output = ()>,
{
    let app = Arc::new(router.build()?);

    // JoinSet tracks every spawned connection task so we can wait for
    // them all to finish during graceful shutdown.
    let mut tasks = tokio::task::JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Check shutdown first so a SIGTERM immediately stops accepting
            // new connections, even if more are queued.
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let app = Arc::clone(&app);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| dispatch(Arc::clone(&app), req));

                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        debug!(peer = %remote_addr, "connection closed: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}

    info!("server stopped");
    Ok(())
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request, runs its chain, and returns as soon as the head is
/// committed. An `Err` makes hyper drop the connection without a response.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<ChannelBody>, Error> {
    let (head, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    let request = Request::new(head, body);

    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);

    let task = tokio::task::spawn_blocking(move || {
        let mut writer = ChannelWriter::new(head_tx, body_tx);
        app.handle(&mut writer, request);
    });

    match head_rx.await {
        Ok(head) => {
            tokio::spawn(reap(task));
            let mut response = http::Response::new(ChannelBody::new(body_rx));
            *response.status_mut() = head.status;
            *response.headers_mut() = head.headers;
            Ok(response)
        }
        Err(_) => Err(match task.await {
            Err(e) => unwound(e),
            Ok(()) => Error::Aborted,
        }),
    }
}

/// Logs a chain that failed after its head was already sent.
async fn reap(task: JoinHandle<()>) {
    if let Err(e) = task.await {
        let _ = unwound(e);
    }
}

fn unwound(e: JoinError) -> Error {
    if !e.is_panic() {
        return Error::Aborted;
    }
    let payload = e.into_panic();
    if payload.is::<Abort>() {
        debug!("handler aborted the response");
        Error::Aborted
    } else {
        let message = panic_message(payload.as_ref()).to_owned();
        error!(panic = %message, "unrecovered handler panic");
        Error::HandlerPanicked(message)
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by `kubectl` and the
/// Kubernetes control plane) and **SIGINT** (Ctrl-C, for local dev).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` is a future that never resolves; on non-Unix platforms
    // the SIGTERM arm is effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => info!("received Ctrl-C"),
        () = sigterm  => info!("received SIGTERM"),
    }
}
