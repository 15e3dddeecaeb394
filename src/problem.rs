//! RFC 9457 problem documents and the writer that emits them.
//!
//! [`ProblemWriter`] is the single place a problem body is produced. Both
//! the [`converter`](crate::middleware::converter) and the
//! [`recoverer`](crate::middleware::recoverer) take one explicitly; handlers
//! may also call it directly to send a problem with a custom detail or code.

use std::sync::{Arc, OnceLock};

use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::Config;
use crate::error::Error;
use crate::request::Request;
use crate::response::{ContentType, ResponseWriter, ResponseWriterExt};

/// Content-type prefix identifying a body that is already a problem document.
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Default `type` when no type base is configured (RFC 9457 §4.2.1).
pub const ABOUT_BLANK: &str = "about:blank";

/// An RFC 9457 problem details object.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance: String,

    /// Application error code, for grouping occurrences of the same failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Correlation id copied from the request.
    #[serde(rename = "traceId", default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Renders and sends [`ProblemDetails`] bodies.
#[derive(Clone, Debug)]
pub struct ProblemWriter {
    type_base: Option<String>,
    trace_header: Option<HeaderName>,
}

impl Default for ProblemWriter {
    fn default() -> Self {
        Self {
            type_base: None,
            trace_header: Some(HeaderName::from_static("x-request-id")),
        }
    }
}

impl ProblemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            type_base: config.type_base.clone(),
            trace_header: config.trace_header_name()?,
        })
    }

    /// Problem `type` URIs become `<base>/<status>` instead of `about:blank`.
    pub fn with_type_base(mut self, base: impl Into<String>) -> Self {
        self.type_base = Some(base.into());
        self
    }

    /// Request header whose value is copied into `traceId`. `None` disables it.
    pub fn with_trace_header(mut self, header: Option<HeaderName>) -> Self {
        self.trace_header = header;
        self
    }

    /// Builds the problem document for `status` without sending it.
    pub fn build(&self, req: &Request, status: StatusCode, detail: &str, code: Option<&str>) -> ProblemDetails {
        let kind = match &self.type_base {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), status.as_u16()),
            None => ABOUT_BLANK.to_owned(),
        };
        let trace_id = self
            .trace_header
            .as_ref()
            .and_then(|name| req.headers().get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        ProblemDetails {
            kind,
            title: status.canonical_reason().unwrap_or("Unknown Status").to_owned(),
            status: status.as_u16(),
            detail: detail.to_owned(),
            instance: req.path().to_owned(),
            code: code.map(str::to_owned),
            trace_id,
        }
    }

    /// Sends a problem document on `w` and returns it.
    ///
    /// Sending is best-effort. If `w` already committed a status (the
    /// handler streamed part of a body before failing) the status call is a
    /// no-op and the JSON lands after whatever was already sent. Write errors
    /// are logged and dropped; nothing is retried.
    ///
    /// When the request carries a problem context, the returned document is
    /// recorded there.
    pub fn write(
        &self,
        w: &mut dyn ResponseWriter,
        req: &Request,
        status: StatusCode,
        detail: &str,
        code: Option<&str>,
    ) -> Arc<ProblemDetails> {
        let details = Arc::new(self.build(req, status, detail, code));

        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Problem.as_str()));
        w.write_header(status);

        match serde_json::to_vec(details.as_ref()) {
            Ok(body) => {
                if let Err(e) = w.write_all(&body) {
                    debug!(error = %e, status = status.as_u16(), "failed to write problem details body");
                }
            }
            Err(e) => error!(error = %e, "failed to serialize problem details"),
        }

        if let Some(ctx) = req.problem_context() {
            ctx.record(Arc::clone(&details));
        }
        details
    }
}

// ── Default instance ──────────────────────────────────────────────────────────

static DEFAULT_WRITER: OnceLock<Arc<ProblemWriter>> = OnceLock::new();

/// Installs the process-wide default writer. Call once at startup, before
/// anything reads [`default_writer`].
pub fn install_default(writer: ProblemWriter) -> Result<(), Error> {
    DEFAULT_WRITER
        .set(Arc::new(writer))
        .map_err(|_| Error::DefaultWriterInstalled)
}

/// The process-wide default writer. Falls back to [`ProblemWriter::default`]
/// and freezes it if nothing was installed.
pub fn default_writer() -> Arc<ProblemWriter> {
    Arc::clone(DEFAULT_WRITER.get_or_init(|| Arc::new(ProblemWriter::default())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Recorder;
    use crate::middleware::ProblemContext;
    use bytes::Bytes;

    fn request(path: &str) -> Request {
        http::Request::builder()
            .uri(path)
            .header("x-request-id", "req-1")
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    #[test]
    fn build_fills_rfc9457_fields() {
        let pd = ProblemWriter::new().build(&request("/orders/9"), StatusCode::NOT_FOUND, "", None);

        assert_eq!(pd.kind, ABOUT_BLANK);
        assert_eq!(pd.title, "Not Found");
        assert_eq!(pd.status, 404);
        assert_eq!(pd.instance, "/orders/9");
        assert_eq!(pd.trace_id.as_deref(), Some("req-1"));
        assert!(pd.code.is_none());
    }

    #[test]
    fn type_base_and_code() {
        let writer = ProblemWriter::new()
            .with_type_base("https://errors.example.com/")
            .with_trace_header(None);
        let pd = writer.build(&request("/"), StatusCode::CONFLICT, "version mismatch", Some("E_VERSION"));

        assert_eq!(pd.kind, "https://errors.example.com/409");
        assert_eq!(pd.code.as_deref(), Some("E_VERSION"));
        assert!(pd.trace_id.is_none());
    }

    #[test]
    fn empty_fields_are_omitted_from_json() {
        let pd = ProblemWriter::new()
            .with_trace_header(None)
            .build(&request("/"), StatusCode::BAD_REQUEST, "", None);
        let json = serde_json::to_value(&pd).unwrap();

        assert_eq!(json["type"], "about:blank");
        assert!(json.get("detail").is_none());
        assert!(json.get("code").is_none());
        assert!(json.get("traceId").is_none());
    }

    #[test]
    fn write_sends_problem_json_and_records_context() {
        let mut req = request("/a");
        req.problem = Some(ProblemContext::default());
        let mut rec = Recorder::new();

        let written = ProblemWriter::new().write(&mut rec, &req, StatusCode::BAD_GATEWAY, "upstream", None);

        assert_eq!(rec.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(rec.sent_headers().unwrap()[CONTENT_TYPE], PROBLEM_JSON);
        let body: ProblemDetails = serde_json::from_slice(rec.body()).unwrap();
        assert_eq!(body, *written);
        assert_eq!(req.problem_details(), Some(written.as_ref()));
    }

    #[test]
    fn default_writer_is_frozen_after_first_read() {
        let first = default_writer();
        assert!(matches!(install_default(ProblemWriter::new()), Err(Error::DefaultWriterInstalled)));
        assert!(Arc::ptr_eq(&first, &default_writer()));
    }
}
