//! Per-request state threaded through the middleware chain.

use std::time::Instant;

use bytes::Bytes;

use crate::body::{Body, BoxError};
use crate::log::Logger;
use crate::request::Request;
use crate::response::Response;

/// Everything one request carries through the pipeline.
///
/// Created by the server for each inbound request and dropped once the
/// response has been handed to the connection. Nothing in here is shared
/// with other requests except the cloned [`Logger`].
pub struct Context {
    pub request: Request,
    pub response: Response,
    /// Written by routes and middleware, consumed by the resolver.
    pub body: Body,
    log: Logger,
    started: Instant,
    matched: Option<String>,
}

impl Context {
    pub fn new<B>(request: http::Request<B>, log: Logger) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            request: Request::from_http(request),
            response: Response::new(),
            body: Body::Empty,
            log,
            started: Instant::now(),
            matched: None,
        }
    }

    pub fn log(&self) -> &Logger { &self.log }

    /// When this request entered the pipeline.
    pub fn started(&self) -> Instant { self.started }

    /// Path of the route that handled this request, if any did.
    pub fn matched_route(&self) -> Option<&str> {
        self.matched.as_deref()
    }

    pub(crate) fn set_matched(&mut self, path: &str) {
        self.matched = Some(path.to_owned());
    }
}

/// Builds a context with the default [`Logger`]. Handy in tests.
impl<B> From<http::Request<B>> for Context
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn from(request: http::Request<B>) -> Self {
        Self::new(request, Logger::default())
    }
}
