use std::collections::HashMap;

use http::StatusCode;
use bytes::Bytes;
use http_body_util::{BodyExt, Collected, LengthLimitError, Limited};
use tracing::debug;

use crate::body::BoxError;
use crate::context::Context;
use crate::error::HttpError;
use crate::queue::{BoxFuture, Middleware, Next};

/// Buffers and decodes `application/x-www-form-urlencoded` request bodies.
///
/// `GET` requests pass straight through without touching the body stream.
/// For every other method the whole body is read before `next` runs, then
/// decoded into [`Request::form`](crate::Request::form). With a `limit`, a
/// body larger than that many bytes fails the request with `413`; a body
/// stream that errors while being read fails it with `400`.
///
/// Decoding is lenient: bad percent-escapes are kept as literal text and
/// invalid UTF-8 is replaced. When a key repeats, the last value wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct BodyParser {
    limit: Option<usize>,
}

impl BodyParser {
    pub fn new() -> Self {
        Self { limit: None }
    }

    pub fn limit(mut self, bytes: usize) -> Self {
        self.limit = Some(bytes);
        self
    }

    async fn parse(&self, ctx: &mut Context) -> Result<(), HttpError> {
        let Some(body) = ctx.request.take_body() else {
            return Ok(());
        };

        let bytes = match self.limit {
            Some(limit) => {
                let collect: BoxFuture<'_, Result<Collected<Bytes>, BoxError>> =
                    Box::pin(Limited::new(body, limit).collect());
                collect.await
                .map_err(|e: BoxError| match e.is::<LengthLimitError>() {
                    true => HttpError::new(StatusCode::PAYLOAD_TOO_LARGE, "request body too large"),
                    false => HttpError::bad_request(e.to_string()),
                })?
                .to_bytes()
            }
            None => body.collect().await.map_err(|e| HttpError::bad_request(e.to_string()))?.to_bytes(),
        };

        // Pairs in body order, so collecting keeps the last value per key.
        let form: HashMap<String, String> = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
            .map_err(|e| HttpError::bad_request(e.to_string()))?
            .into_iter()
            .collect();
        debug!(bytes = bytes.len(), fields = form.len(), "parsed request body");
        ctx.request.set_form(form);
        Ok(())
    }
}

impl Middleware for BodyParser {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a> {
        Box::pin(async move {
            if *ctx.request.method() != http::Method::GET {
                self.parse(ctx).await?;
            }
            next.run(ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::test_util::ctx;
    use crate::queue::{Queue, from_fn};

    fn queue(parser: BodyParser) -> Queue {
        let mut queue = Queue::new();
        queue.add(parser);
        queue
    }

    #[tokio::test]
    async fn get_leaves_the_stream_alone() {
        let mut ctx = ctx("GET", "/", "name=ignored");
        queue(BodyParser::new()).run_async(&mut ctx, None).await.unwrap();
        assert!(!ctx.request.body_taken());
        assert!(ctx.request.form().is_none());
    }

    #[tokio::test]
    async fn post_decodes_form_before_next() {
        let mut queue = queue(BodyParser::new());
        queue.add(from_fn(|ctx, next| {
            Box::pin(async move {
                let name = ctx.request.form().and_then(|f| f.get("name")).cloned();
                assert_eq!(name.as_deref(), Some("volvo xc90"));
                next.run(ctx).await
            })
        }));
        let mut ctx = ctx("POST", "/api/cars", "name=volvo+xc90");
        queue.run_async(&mut ctx, None).await.unwrap();
        assert!(ctx.request.body_taken());
        assert_eq!(ctx.request.form().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_post_body_gives_empty_form() {
        let mut ctx = ctx("DELETE", "/api/cars", "");
        queue(BodyParser::new()).run_async(&mut ctx, None).await.unwrap();
        assert!(ctx.request.form().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_keys_keep_the_last_value() {
        let mut ctx = ctx("POST", "/api/cars", "name=audi&name=bmw&color=%zz");
        queue(BodyParser::new()).run_async(&mut ctx, None).await.unwrap();
        let form = ctx.request.form().unwrap();
        assert_eq!(form["name"], "bmw");
        assert_eq!(form["color"], "%zz");
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let mut ctx = ctx("POST", "/", "name=a-rather-long-value");
        let err = queue(BodyParser::new().limit(4)).run_async(&mut ctx, None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
