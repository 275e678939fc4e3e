use serde::Serialize;
use tracing::warn;

use crate::body::Body;
use crate::context::Context;
use crate::queue::{BoxFuture, Middleware, Next};
use crate::response::ContentType;

const NO_MESSAGE: &str = "Internal server error";

/// Wire shape of a failure. Field order is the serialized key order.
#[derive(Serialize)]
struct Failure<'a> {
    ok: bool,
    message: &'a str,
}

/// Turns failures from everything it wraps into a response.
///
/// The status comes from the [`HttpError`](crate::HttpError). The body is
/// `{"ok":false,"message":...}` when the error carries a message and the
/// text `Internal server error` otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorBoundary;

impl Middleware for ErrorBoundary {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a> {
        Box::pin(async move {
            let Err(err) = next.run(ctx).await else {
                return Ok(());
            };
            warn!(status = err.status_code().as_u16(), "request failed: {err}");

            ctx.response.set_status(err.status_code());
            let encoded = err
                .message()
                .map(|message| serde_json::to_vec(&Failure { ok: false, message }));
            ctx.body = match encoded {
                Some(Ok(bytes)) => {
                    ctx.response.set_content_type(ContentType::Json);
                    Body::Bytes(bytes.into())
                }
                _ => Body::Text(NO_MESSAGE.to_owned()),
            };
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::error::HttpError;
    use crate::middleware::test_util::ctx;
    use crate::queue::{Queue, from_fn};

    async fn run_failing(err: fn() -> HttpError) -> Context {
        let mut queue = Queue::new();
        queue.add(ErrorBoundary);
        queue.add(from_fn(move |_ctx, _next| Box::pin(async move { Err::<(), _>(err()) })));
        let mut ctx = ctx("GET", "/", "");
        queue.run_async(&mut ctx, None).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn message_becomes_json_body() {
        let ctx = run_failing(|| HttpError::new(StatusCode::IM_A_TEAPOT, "teapot")).await;
        assert_eq!(ctx.response.status(), StatusCode::IM_A_TEAPOT);
        match &ctx.body {
            Body::Bytes(b) => assert_eq!(b, r#"{"ok":false,"message":"teapot"}"#),
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(ctx.response.headers()["content-type"], "application/json");
    }

    #[tokio::test]
    async fn no_message_becomes_plain_text() {
        let ctx = run_failing(HttpError::internal).await;
        assert_eq!(ctx.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(&ctx.body, Body::Text(s) if s == NO_MESSAGE));
    }

    #[tokio::test]
    async fn success_passes_through() {
        let mut queue = Queue::new();
        queue.add(ErrorBoundary);
        let mut ctx = ctx("GET", "/", "");
        queue.run_async(&mut ctx, None).await.unwrap();
        assert_eq!(ctx.response.status(), StatusCode::OK);
        assert!(ctx.body.is_empty());
    }
}
