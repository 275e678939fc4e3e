//! The context body slot and the [`IntoBody`] conversion trait.
//!
//! Handlers return plain values; the router turns them into a [`Body`] and
//! parks it in `ctx.body`. The resolver reads it exactly once when it
//! finalizes the response.

use std::fmt;

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;

use crate::error::HttpError;

/// Boxed error used by request and response body streams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A lazy, possibly unbounded sequence of body chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// Whatever the pipeline has decided to send back.
#[derive(Default)]
pub enum Body {
    /// Nothing was set. Written as an empty payload.
    #[default]
    Empty,
    /// Written verbatim as `text/plain`.
    Text(String),
    /// Written verbatim, no content type implied.
    Bytes(Bytes),
    /// Serialized to JSON when written.
    Json(Value),
    /// Piped chunk by chunk to the response.
    Stream(BodyStream),
}

impl Body {
    /// Wraps any byte stream whose errors can be boxed.
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: futures::Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        use futures::TryStreamExt;
        Self::Stream(Box::pin(stream.map_err(|e| -> BoxError { e.into() })))
    }

    pub fn is_empty(&self) -> bool { matches!(self, Self::Empty) }

    /// Whether this body is a lazy byte sequence that must be piped.
    pub fn is_stream(&self) -> bool { matches!(self, Self::Stream(_)) }

    /// Moves the body out, leaving [`Body::Empty`] behind.
    pub fn take(&mut self) -> Self { std::mem::take(self) }

    /// The body as a JSON value, for envelope wrapping.
    ///
    /// Streams have no value representation and are handed back unchanged.
    pub(crate) fn into_value(self) -> Result<Value, Self> {
        match self {
            Self::Empty => Ok(Value::Null),
            Self::Text(s) => Ok(Value::String(s)),
            Self::Bytes(b) => Ok(Value::String(String::from_utf8_lossy(&b).into_owned())),
            Self::Json(v) => Ok(v),
            stream @ Self::Stream(_) => Err(stream),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Serializes `T` into a [`Body::Json`].
///
/// ```rust
/// use peel::{IntoBody, Json};
///
/// #[derive(serde::Serialize)]
/// struct Car { name: &'static str }
///
/// let body = Json(Car { name: "Audi r8" }).into_body().unwrap();
/// ```
pub struct Json<T>(pub T);

/// Conversion of a handler's return value into a [`Body`].
///
/// Implemented for text, bytes, JSON values, [`Json`] wrappers, `()` and
/// [`Body`] itself. Implement it on your own types to return them directly.
pub trait IntoBody {
    fn into_body(self) -> Result<Body, HttpError>;
}

impl IntoBody for Body {
    fn into_body(self) -> Result<Body, HttpError> { Ok(self) }
}

impl IntoBody for () {
    fn into_body(self) -> Result<Body, HttpError> { Ok(Body::Empty) }
}

impl IntoBody for &'static str {
    fn into_body(self) -> Result<Body, HttpError> { Ok(Body::Text(self.to_owned())) }
}

impl IntoBody for String {
    fn into_body(self) -> Result<Body, HttpError> { Ok(Body::Text(self)) }
}

impl IntoBody for Bytes {
    fn into_body(self) -> Result<Body, HttpError> { Ok(Body::Bytes(self)) }
}

impl IntoBody for Vec<u8> {
    fn into_body(self) -> Result<Body, HttpError> { Ok(Body::Bytes(self.into())) }
}

impl IntoBody for Value {
    fn into_body(self) -> Result<Body, HttpError> { Ok(Body::Json(self)) }
}

impl<T: Serialize> IntoBody for Json<T> {
    fn into_body(self) -> Result<Body, HttpError> {
        Ok(Body::Json(serde_json::to_value(&self.0)?))
    }
}
