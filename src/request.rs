//! Incoming HTTP request handle.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

use crate::body::BoxError;

/// Type-erased inbound body stream.
pub type RequestBody = UnsyncBoxBody<Bytes, BoxError>;

/// An incoming HTTP request.
///
/// The body stream can be taken at most once; the body parser does that for
/// write-bearing methods and leaves the decoded form in [`Request::form`].
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<RequestBody>,
    form: Option<HashMap<String, String>>,
    params: HashMap<String, String>,
    path_params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn from_http<B>(req: http::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: Some(body.map_err(|e| -> BoxError { e.into() }).boxed_unsync()),
            form: None,
            params: HashMap::new(),
            path_params: HashMap::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Case-insensitive header lookup. Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Takes the raw body stream. Returns `None` once it has been taken.
    pub fn take_body(&mut self) -> Option<RequestBody> {
        self.body.take()
    }

    /// Whether the body stream has already been taken.
    pub fn body_taken(&self) -> bool {
        self.body.is_none()
    }

    /// The decoded `application/x-www-form-urlencoded` body, if parsed.
    pub fn form(&self) -> Option<&HashMap<String, String>> {
        self.form.as_ref()
    }

    pub fn set_form(&mut self, form: HashMap<String, String>) {
        self.form = Some(form);
    }

    /// Query-string parameters, populated by the matching route.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns a named path segment.
    ///
    /// For a route `/users/:id`, `req.path_param("id")` on `/users/42`
    /// returns `Some("42")`.
    pub fn path_param(&self, key: &str) -> Option<&str> {
        self.path_params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }
}
