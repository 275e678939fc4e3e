//! Error types.
//!
//! Two families live here. [`Error`] surfaces infrastructure failures:
//! binding the listener, loading configuration, registering a broken route.
//! [`HttpError`] is what a middleware or handler returns when the request
//! itself fails; it travels up the chain until the error boundary turns it
//! into a response.

use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// The error type returned by peel's fallible startup operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The listener could not be bound to `addr`.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other socket-level failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A route descriptor was rejected at registration.
    #[error("invalid route `{method} {path}`: {reason}")]
    InvalidRoute {
        method: String,
        path: String,
        reason: String,
    },

    /// Configuration could not be extracted from its sources.
    #[error("invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),
}

/// A request-time failure carrying an HTTP status and an optional message.
///
/// Every `std::error::Error` converts into an `HttpError` with status `500`
/// and the error's display text as message, so `?` works inside handlers:
///
/// ```rust
/// use peel::{HttpError, StatusCode};
///
/// fn parse(raw: &str) -> Result<u32, HttpError> {
///     let n: u32 = raw.parse()?; // 500 with the parse error's message
///     if n == 0 {
///         return Err(HttpError::new(StatusCode::BAD_REQUEST, "zero is not allowed"));
///     }
///     Ok(n)
/// }
/// ```
///
/// `HttpError` deliberately does not implement `std::error::Error` itself;
/// that is what makes the blanket conversion possible.
pub struct HttpError {
    status: StatusCode,
    message: Option<String>,
}

impl HttpError {
    /// An error with a status and a client-visible message.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: Some(message.into()) }
    }

    /// An error with a status and no message.
    pub fn status(status: StatusCode) -> Self {
        Self { status, message: None }
    }

    /// `500 Internal Server Error`, no message.
    pub fn internal() -> Self {
        Self::status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// `400 Bad Request` with a message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn message(&self) -> Option<&str> { self.message.as_deref() }
}

impl<E> From<E> for HttpError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: Some(e.to_string()),
        }
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError")
            .field("status", &self.status.as_u16())
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) => write!(f, "{}: {m}", self.status.as_u16()),
            None => write!(f, "{}", self.status),
        }
    }
}
