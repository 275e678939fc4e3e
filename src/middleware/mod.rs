//! Built-in middleware.
//!
//! The [`App`](crate::App) installs these itself, in a fixed order, ahead
//! of everything registered with [`App::with`](crate::App::with) or
//! [`App::route`](crate::App::route):
//!
//! ```text
//! Resolver → ErrorBoundary → Timer → BodyParser → user middleware & routes
//! ```
//!
//! The resolver sits outermost so that its finalize step runs after the
//! error boundary has turned any failure into a body. Each one is also a
//! plain [`Middleware`](crate::Middleware) and can be placed by hand on a
//! bare [`Queue`](crate::Queue).

mod body_parser;
mod error;
mod resolver;
mod timer;

pub use body_parser::BodyParser;
pub use error::ErrorBoundary;
pub use resolver::Resolver;
pub use timer::Timer;

#[cfg(test)]
pub(crate) mod test_util {
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};

    use crate::context::Context;

    pub(crate) fn ctx(method: &str, uri: &str, body: &'static str) -> Context {
        Context::from(
            http::Request::builder()
                .method(method)
                .uri(uri)
                .body(Full::new(Bytes::from_static(body.as_bytes())))
                .unwrap(),
        )
    }

    /// Consumes the context and collects what would go on the wire.
    pub(crate) async fn wire(ctx: Context) -> (http::StatusCode, http::HeaderMap, Bytes) {
        let res = ctx.response.into_http();
        let (parts, body) = res.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        (parts.status, parts.headers, bytes)
    }
}
