//! # peel
//!
//! A minimal onion-model HTTP framework on top of hyper.
//!
//! Every request gets a [`Context`] that travels through one ordered
//! [`Queue`] of middleware. Each middleware does its work, calls `next`,
//! and may do more once everything downstream has settled. Routes are
//! middleware too: a route that does not match just passes the request on.
//!
//! ## The pipeline
//!
//! ```text
//! Resolver → ErrorBoundary → Timer → BodyParser → your middleware & routes
//!    │                                                       │
//!    └──────────── finalizes ctx.body ◄──────────────────────┘
//! ```
//!
//! - Body parsing: urlencoded forms land in [`Request::form`]
//! - Routing: exact paths, or `:name` masks via [`matchit`]
//! - Graceful shutdown: SIGTERM / Ctrl-C, drains in-flight requests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use peel::{App, BoxFuture, Config, Context, HttpError, Json, Route, from_fn};
//!
//! #[tokio::main]
//! async fn main() {
//!     App::new(Config::default().port(3000).timer(true))
//!         .with(from_fn(|ctx, next| {
//!             Box::pin(async move {
//!                 ctx.log().info(format!("{} {}", ctx.request.method(), ctx.request.path()));
//!                 next.run(ctx).await
//!             })
//!         }))
//!         .route(vec![
//!             Route::get("/api/ping", ping),
//!             Route::get("/api/users/:id", get_user),
//!         ])
//!         .go()
//!         .await;
//! }
//!
//! fn ping(_ctx: &mut Context) -> BoxFuture<'_, Result<&'static str, HttpError>> {
//!     Box::pin(async { Ok("pong") })
//! }
//!
//! fn get_user(ctx: &mut Context) -> BoxFuture<'_, Result<Json<Vec<String>>, HttpError>> {
//!     Box::pin(async move {
//!         let id = ctx.request.path_param("id").unwrap_or("unknown").to_owned();
//!         Ok(Json(vec![id]))
//!     })
//! }
//! ```

mod app;
mod body;
mod config;
mod context;
mod error;
mod handler;
mod log;
mod method;
mod queue;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use app::App;
pub use body::{Body, BodyStream, BoxError, IntoBody, Json};
pub use config::Config;
pub use context::Context;
pub use error::{Error, HttpError};
pub use http::StatusCode;
pub use log::Logger;
pub use method::Method;
pub use queue::{BoxFuture, Finish, FromFn, Middleware, Next, Queue, SharedMiddleware, Stack, from_fn};
pub use request::{Request, RequestBody};
pub use response::{ContentType, Response, ResponseBody};
pub use router::{ResponseSchema, Route, Routes};
pub use server::Service;
