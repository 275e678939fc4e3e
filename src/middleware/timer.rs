use std::time::Instant;

use http::header::HeaderValue;

use crate::context::Context;
use crate::queue::{BoxFuture, Middleware, Next};

/// Measures the downstream chain and reports it in `X-Response-Time`.
///
/// The value is whole milliseconds, rounded up, so it is never smaller than
/// the time actually spent downstream. Failed requests are timed too; the
/// failure is passed on unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timer;

pub(crate) const RESPONSE_TIME: &str = "x-response-time";

impl Middleware for Timer {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a> {
        Box::pin(async move {
            let start = Instant::now();
            let outcome = next.run(ctx).await;
            let ms = start.elapsed().as_micros().div_ceil(1000);

            if let Ok(value) = HeaderValue::try_from(format!("{ms}ms")) {
                ctx.response.headers_mut().insert(RESPONSE_TIME, value);
            }
            ctx.log().info(format_args!("response time: {ms}ms"));
            outcome
        })
    }
}
