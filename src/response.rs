//! Outgoing HTTP response handle.
//!
//! Middleware adjusts status and headers on the handle as the request
//! travels through the chain. The resolver then closes it exactly once,
//! either with a buffered payload ([`Response::end`]) or with a stream
//! ([`Response::pipe`]).

use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use tracing::warn;

use crate::body::{BodyStream, BoxError};
use crate::error::HttpError;

/// Type-erased outbound body handed to hyper.
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::set_content_type`].
#[derive(Clone, Copy, Debug)]
pub enum ContentType {
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

enum Outgoing {
    Full(Bytes),
    Stream(BodyStream),
}

/// The response being assembled for one request.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    outgoing: Option<Outgoing>,
}

impl Response {
    pub(crate) fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), outgoing: None }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets a header from strings, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), HttpError> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
    }

    /// Sets `content-type` only when no middleware has chosen one yet.
    pub(crate) fn default_content_type(&mut self, content_type: ContentType) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.set_content_type(content_type);
        }
    }

    /// Whether [`end`](Self::end) or [`pipe`](Self::pipe) has been called.
    pub fn is_finished(&self) -> bool {
        self.outgoing.is_some()
    }

    /// Writes `body` as a single buffered payload and closes the response.
    pub fn end(&mut self, body: impl Into<Bytes>) {
        self.close(Outgoing::Full(body.into()));
    }

    /// Forwards `stream` to the client chunk by chunk and closes the response.
    pub fn pipe(&mut self, stream: BodyStream) {
        self.close(Outgoing::Stream(stream));
    }

    fn close(&mut self, outgoing: Outgoing) {
        if self.is_finished() {
            warn!("response already finished, ignoring second write");
            return;
        }
        self.outgoing = Some(outgoing);
    }

    /// Converts the handle into the `http` response sent on the wire.
    ///
    /// An unfinished response goes out with an empty body.
    pub fn into_http(self) -> http::Response<ResponseBody> {
        let body = match self.outgoing {
            None => full(Bytes::new()),
            Some(Outgoing::Full(bytes)) => full(bytes),
            Some(Outgoing::Stream(stream)) => {
                StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync()
            }
        };
        let mut res = http::Response::new(body);
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

fn full(bytes: Bytes) -> ResponseBody {
    Full::new(bytes)
        .map_err(|never| -> BoxError { match never {} })
        .boxed_unsync()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_end_is_ignored() {
        let mut res = Response::new();
        res.end("first");
        res.end("second");
        let body = res.into_http().into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "first");
    }

    #[tokio::test]
    async fn piped_stream_is_concatenated() {
        let mut res = Response::new();
        let chunks = futures::stream::iter(["a", "b", "c"].map(|c| Ok::<_, BoxError>(Bytes::from(c))));
        res.pipe(Box::pin(chunks));
        let body = res.into_http().into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "abc");
    }

    #[test]
    fn invalid_header_name_is_an_error() {
        let mut res = Response::new();
        assert!(res.set_header("bad header", "x").is_err());
        assert!(res.set_header("x-ok", "1").is_ok());
        assert_eq!(res.headers()["x-ok"], "1");
    }
}
