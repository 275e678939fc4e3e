use http::StatusCode;
use tracing::error;

use crate::body::Body;
use crate::context::Context;
use crate::queue::{BoxFuture, Middleware, Next};
use crate::response::ContentType;

/// Finalizes the response from `ctx.body`.
///
/// Sets `200 OK` on the way in, waits for the whole downstream chain, then
/// writes the body: streams are piped, everything else goes out as one
/// buffered payload (empty when nothing was set).
#[derive(Clone, Copy, Debug, Default)]
pub struct Resolver;

impl Middleware for Resolver {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a> {
        Box::pin(async move {
            ctx.response.set_status(StatusCode::OK);
            next.run(ctx).await?;
            finalize(ctx);
            Ok(())
        })
    }
}

fn finalize(ctx: &mut Context) {
    let res = &mut ctx.response;
    match ctx.body.take() {
        Body::Empty => res.end(""),
        Body::Text(text) => {
            res.default_content_type(ContentType::Text);
            res.end(text);
        }
        Body::Bytes(bytes) => res.end(bytes),
        Body::Json(value) => match serde_json::to_vec(&value) {
            Ok(bytes) => {
                res.default_content_type(ContentType::Json);
                res.end(bytes);
            }
            Err(e) => {
                error!("failed to serialize response body: {e}");
                res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                res.end("Internal server error");
            }
        },
        Body::Stream(stream) => res.pipe(stream),
    }
}
