//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::middleware::ProblemContext;
use crate::problem::ProblemDetails;

/// An incoming HTTP request with its body already read.
///
/// Handlers receive it as `&mut Request`; middleware running after the
/// handler sees the same value, including anything recorded in its
/// [`ProblemContext`].
#[derive(Debug)]
pub struct Request {
    pub(crate) head: Parts,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) problem: Option<ProblemContext>,
}

impl Request {
    pub fn new(head: Parts, body: Bytes) -> Self {
        Self { head, body, params: HashMap::new(), problem: None }
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup returning the first value, if it is visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The problem context attached by [`context`](crate::middleware::context),
    /// if that middleware runs for this request.
    pub fn problem_context(&self) -> Option<&ProblemContext> {
        self.problem.as_ref()
    }

    /// The problem document written to this response, if any was written
    /// while a problem context was attached.
    pub fn problem_details(&self) -> Option<&ProblemDetails> {
        self.problem.as_ref().and_then(ProblemContext::details)
    }
}

impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (head, body) = req.into_parts();
        Self::new(head, body.into())
    }
}
