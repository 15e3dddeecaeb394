//! Configuration loading and validation.
//!
//! Values are read from `PROBLEM_*` environment variables, e.g.
//! `PROBLEM_STACK_FRAME_IDX=-1` or `PROBLEM_TYPE_BASE=https://errors.example.com`.

use http::header::HeaderName;
use serde::Deserialize;

use crate::error::Error;

/// Validated middleware configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Caller offset reported by the recoverer. Negative disables the
    /// `at <file>:<line>` suffix; 0 is the panicking function itself.
    #[serde(default = "default_stack_frame_idx")]
    pub stack_frame_idx: i32,

    /// Base URI for problem `type` values. Unset means `about:blank`.
    #[serde(default)]
    pub type_base: Option<String>,

    /// Request header copied into `traceId`. Empty disables it.
    #[serde(default = "default_trace_header")]
    pub trace_header: String,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_stack_frame_idx() -> i32 {
    0
}
fn default_trace_header() -> String {
    "x-request-id".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_frame_idx: default_stack_frame_idx(),
            type_base: None,
            trace_header: default_trace_header(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("PROBLEM").try_parsing(true))
            .build()?;

        let c: Config = cfg.try_deserialize()?;
        c.validate()?;
        Ok(c)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.trace_header_name()?;
        if self.type_base.as_deref().is_some_and(|b| b.trim().is_empty()) {
            return Err(Error::InvalidConfig("PROBLEM_TYPE_BASE must not be blank when set".into()));
        }
        Ok(())
    }

    /// The parsed trace header, or `None` when disabled.
    pub fn trace_header_name(&self) -> Result<Option<HeaderName>, Error> {
        if self.trace_header.is_empty() {
            return Ok(None);
        }
        HeaderName::from_bytes(self.trace_header.as_bytes())
            .map(Some)
            .map_err(|e| Error::InvalidConfig(format!("PROBLEM_TRACE_HEADER: {e}")))
    }
}
