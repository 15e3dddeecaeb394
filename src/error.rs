//! Unified error type.

use std::net::AddrParseError;

/// The error type returned by the crate's fallible operations.
///
/// Application-level failures (404, 500, etc.) are expressed as HTTP
/// responses, usually problem documents, not as `Error`s. This type surfaces
/// infrastructure failures: binding, serving, configuration, and requests
/// whose handler chain unwound without producing a response.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid address: {0}")]
    AddrParse(#[from] AddrParseError),

    #[error("invalid route `{path}`: {source}")]
    Route {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("http: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("a default problem writer is already installed")]
    DefaultWriterInstalled,

    /// The handler raised [`Abort`](crate::Abort); the connection is dropped
    /// without a response.
    #[error("response aborted by handler")]
    Aborted,

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),
}
