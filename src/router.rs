//! Route descriptors and the route middleware.
//!
//! A route is not a lookup table entry. Every valid descriptor becomes one
//! middleware appended to the queue, so routes interleave with user
//! middleware in registration order. A route that does not match simply
//! calls `next`.
//!
//! Paths match exactly. A path containing `:name` segments is compiled into
//! a [`matchit`] pattern instead, and the captured segments are exposed via
//! [`Request::path_param`](crate::Request::path_param).

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::body::{Body, IntoBody};
use crate::context::Context;
use crate::error::{Error, HttpError};
use crate::handler::{BoxedHandler, FnHandler};
use crate::method::Method;
use crate::queue::{BoxFuture, Middleware, Next};

// ── ResponseSchema ────────────────────────────────────────────────────────────

/// Envelope applied to handler results: `{"status": <status>, "data": ...}`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ResponseSchema {
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "ok".to_owned()
}

impl Default for ResponseSchema {
    fn default() -> Self {
        Self { status: default_status() }
    }
}

impl ResponseSchema {
    fn wrap(&self, data: Body) -> Body {
        match data.into_value() {
            Ok(data) => Body::Json(json!({ "status": self.status, "data": data })),
            Err(stream) => {
                warn!("streaming bodies cannot be wrapped in a response schema");
                stream
            }
        }
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// A route descriptor: method, path, handler and an optional response schema.
///
/// ```rust,no_run
/// use peel::{BoxFuture, Context, HttpError, Route};
///
/// fn ping(_ctx: &mut Context) -> BoxFuture<'_, Result<&'static str, HttpError>> {
///     Box::pin(async { Ok("pong") })
/// }
///
/// let route = Route::get("/api/ping", ping);
/// ```
pub struct Route {
    method: String,
    path: String,
    handler: BoxedHandler,
    response_schema: Option<ResponseSchema>,
}

impl Route {
    /// A descriptor with a method given by name.
    ///
    /// The name is checked when the route is registered, not here: an
    /// unknown method makes the descriptor invalid and it is skipped.
    pub fn new<F, R>(method: impl Into<String>, path: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<R, HttpError>> + Send + Sync + 'static,
        R: IntoBody + 'static,
    {
        Self {
            method: method.into(),
            path: path.into(),
            handler: Arc::new(FnHandler::new(handler)),
            response_schema: None,
        }
    }

    pub fn on<F, R>(method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<R, HttpError>> + Send + Sync + 'static,
        R: IntoBody + 'static,
    {
        Self::new(method.as_str(), path, handler)
    }

    pub fn get<F, R>(path: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<R, HttpError>> + Send + Sync + 'static,
        R: IntoBody + 'static,
    {
        Self::new(Method::Get.as_str(), path, handler)
    }

    pub fn post<F, R>(path: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<R, HttpError>> + Send + Sync + 'static,
        R: IntoBody + 'static,
    {
        Self::new(Method::Post.as_str(), path, handler)
    }

    /// Wraps this route's results in `schema`, overriding the app default.
    pub fn response_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }

    /// Validates the descriptor and compiles it into route middleware.
    ///
    /// `default_schema` applies when the route has none of its own.
    pub(crate) fn compile(self, default_schema: Option<&ResponseSchema>) -> Result<RouteLayer, Error> {
        let invalid = |reason: &str| Error::InvalidRoute {
            method: self.method.clone(),
            path: self.path.clone(),
            reason: reason.to_owned(),
        };

        let method: Method = self.method.parse().map_err(|()| invalid("unknown method"))?;
        if self.path.is_empty() {
            return Err(invalid("empty path"));
        }
        let pattern = Pattern::parse(&self.path).map_err(|e| invalid(&e.to_string()))?;

        Ok(RouteLayer {
            method,
            pattern,
            handler: self.handler,
            response_schema: self.response_schema.or_else(|| default_schema.cloned()),
            path: self.path,
        })
    }
}

/// One route descriptor or a list of them, as accepted by
/// [`App::route`](crate::App::route).
pub enum Routes {
    One(Route),
    Many(Vec<Route>),
}

impl From<Route> for Routes {
    fn from(route: Route) -> Self { Self::One(route) }
}

impl From<Vec<Route>> for Routes {
    fn from(routes: Vec<Route>) -> Self { Self::Many(routes) }
}

impl IntoIterator for Routes {
    type Item = Route;
    type IntoIter = std::vec::IntoIter<Route>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Self::One(route) => vec![route].into_iter(),
            Self::Many(routes) => routes.into_iter(),
        }
    }
}

// ── Pattern ───────────────────────────────────────────────────────────────────

enum Pattern {
    Exact(String),
    Mask(MatchitRouter<()>),
}

impl Pattern {
    /// `/users/:id` becomes the matchit pattern `/users/{id}`.
    fn parse(path: &str) -> Result<Self, matchit::InsertError> {
        if !path.split('/').any(|seg| seg.starts_with(':')) {
            return Ok(Self::Exact(path.to_owned()));
        }
        let mask = path
            .split('/')
            .map(|seg| match seg.strip_prefix(':') {
                Some(name) => format!("{{{name}}}"),
                None => seg.to_owned(),
            })
            .collect::<Vec<_>>()
            .join("/");
        let mut router = MatchitRouter::new();
        router.insert(mask, ())?;
        Ok(Self::Mask(router))
    }

    /// Returns the captured segments when `path` matches.
    fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        match self {
            Self::Exact(expected) => (expected == path).then(HashMap::new),
            Self::Mask(router) => {
                let matched = router.at(path).ok()?;
                Some(matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect())
            }
        }
    }
}

// ── RouteLayer ────────────────────────────────────────────────────────────────

/// The middleware one route descriptor compiles into.
pub(crate) struct RouteLayer {
    method: Method,
    path: String,
    pattern: Pattern,
    handler: BoxedHandler,
    response_schema: Option<ResponseSchema>,
}

impl RouteLayer {
    async fn dispatch(&self, ctx: &mut Context) -> Result<(), HttpError> {
        if !self.method.matches(ctx.request.method()) || ctx.matched_route().is_some() {
            return Ok(());
        }
        let Some(path_params) = self.pattern.matches(ctx.request.path()) else {
            return Ok(());
        };

        let params = ctx.request.query().map(parse_query).unwrap_or_default();
        ctx.request.set_params(params);
        ctx.request.set_path_params(path_params);
        ctx.set_matched(&self.path);
        debug!(method = %self.method, path = %self.path, "route matched");

        let data = self.handler.call(ctx).await?;
        ctx.body = match &self.response_schema {
            Some(schema) => schema.wrap(data),
            None => data,
        };
        Ok(())
    }
}

impl Middleware for RouteLayer {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a> {
        Box::pin(async move {
            self.dispatch(ctx).await?;
            next.run(ctx).await
        })
    }
}

/// Decodes a query string. Malformed input yields no parameters.
fn parse_query(query: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http_body_util::Empty;
    use serde_json::Value;

    use super::*;
    use crate::queue::Queue;

    fn ctx(method: &str, uri: &str) -> Context {
        Context::from(
            http::Request::builder()
                .method(method)
                .uri(uri)
                .body(Empty::<Bytes>::new())
                .unwrap(),
        )
    }

    fn ping(_ctx: &mut Context) -> BoxFuture<'_, Result<&'static str, HttpError>> {
        Box::pin(async { Ok("pong") })
    }

    fn cars(_ctx: &mut Context) -> BoxFuture<'_, Result<Value, HttpError>> {
        Box::pin(async { Ok(json!(["Audi r8", "BMW i8"])) })
    }

    fn echo_params(ctx: &mut Context) -> BoxFuture<'_, Result<String, HttpError>> {
        Box::pin(async move {
            let id = ctx.request.path_param("id").unwrap_or("-").to_owned();
            let sort = ctx.request.param("sort").unwrap_or("-").to_owned();
            Ok(format!("{id}/{sort}"))
        })
    }

    fn queue_of(routes: Vec<Route>, schema: Option<&ResponseSchema>) -> Queue {
        let mut queue = Queue::new();
        for route in routes {
            queue.add(route.compile(schema).unwrap());
        }
        queue
    }

    #[tokio::test]
    async fn exact_match_sets_raw_body() {
        let queue = queue_of(vec![Route::get("/api/ping", ping)], None);
        let mut ctx = ctx("GET", "/api/ping");
        queue.run_async(&mut ctx, None).await.unwrap();
        assert!(matches!(&ctx.body, Body::Text(s) if s == "pong"));
        assert_eq!(ctx.matched_route(), Some("/api/ping"));
    }

    #[tokio::test]
    async fn schema_wraps_data() {
        let schema = ResponseSchema::default();
        let queue = queue_of(vec![Route::get("/api/cars", cars)], Some(&schema));
        let mut ctx = ctx("GET", "/api/cars");
        queue.run_async(&mut ctx, None).await.unwrap();
        match &ctx.body {
            Body::Json(v) => assert_eq!(v, &json!({"status": "ok", "data": ["Audi r8", "BMW i8"]})),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[tokio::test]
    async fn method_is_compared_case_insensitively() {
        let queue = queue_of(vec![Route::new("get", "/api/ping", ping)], None);
        let mut ctx = ctx("GET", "/api/ping");
        queue.run_async(&mut ctx, None).await.unwrap();
        assert!(!ctx.body.is_empty());
    }

    #[tokio::test]
    async fn mismatch_leaves_body_untouched() {
        let queue = queue_of(vec![Route::get("/api/ping", ping)], None);
        for (method, uri) in [("POST", "/api/ping"), ("GET", "/api/pong"), ("GET", "/api/ping/")] {
            let mut ctx = ctx(method, uri);
            queue.run_async(&mut ctx, None).await.unwrap();
            assert!(ctx.body.is_empty(), "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn query_string_does_not_affect_matching() {
        let queue = queue_of(vec![Route::get("/users/:id", echo_params)], None);
        let mut ctx = ctx("GET", "/users/42?sort=name+asc");
        queue.run_async(&mut ctx, None).await.unwrap();
        assert!(matches!(&ctx.body, Body::Text(s) if s == "42/name asc"));
        assert_eq!(ctx.request.param("sort"), Some("name asc"));
    }

    #[tokio::test]
    async fn first_match_wins() {
        fn second(_ctx: &mut Context) -> BoxFuture<'_, Result<&'static str, HttpError>> {
            Box::pin(async { Ok("second") })
        }
        let queue = queue_of(
            vec![Route::get("/api/ping", ping), Route::get("/api/ping", second)],
            None,
        );
        let mut ctx = ctx("GET", "/api/ping");
        queue.run_async(&mut ctx, None).await.unwrap();
        assert!(matches!(&ctx.body, Body::Text(s) if s == "pong"));
    }

    #[test]
    fn invalid_descriptors_are_rejected() {
        assert!(Route::new("PATCH", "/x", ping).compile(None).is_err());
        assert!(Route::new("GET", "", ping).compile(None).is_err());
        assert!(Route::new("update", "/x", ping).compile(None).is_ok());
    }

    #[test]
    fn route_schema_overrides_default() {
        let global = ResponseSchema { status: "global".into() };
        let own = ResponseSchema { status: "own".into() };
        let layer = Route::get("/x", ping).response_schema(own.clone()).compile(Some(&global)).unwrap();
        assert_eq!(layer.response_schema, Some(own));
    }
}
