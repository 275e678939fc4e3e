//! The middleware queue and its two execution strategies.
//!
//! # The onion
//!
//! Middleware registered first is the outermost layer. Its code before
//! `next.run(ctx).await` runs first, its code after runs last:
//!
//! ```text
//!   a ─┐ pre                                   ┌─ post  a
//!      b ─┐ pre                         ┌─ post  b
//!         c ─┐ pre             ┌─ post  c
//!            └── finish ───────┘
//! ```
//!
//! Composition is right to left: `k[n] = finish`, `k[i] = m[i](ctx, k[i+1])`,
//! and the queue invokes `k[0]`. A [`Next`] is consumed by
//! [`run`](Next::run), so a middleware can continue the chain at most once;
//! not calling it at all stops the chain there.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::HttpError;

/// A heap-allocated, type-erased future borrowing from the request.
pub type BoxFuture<'a, T = Result<(), HttpError>> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shareable, type-erased middleware.
pub type SharedMiddleware = Arc<dyn Middleware>;

// ── Middleware ────────────────────────────────────────────────────────────────

/// One layer of the onion.
///
/// Implement it directly on a struct, or wrap a closure with [`from_fn`].
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a>;

    /// Erases the concrete type so different middleware fit one list.
    fn shared(self) -> SharedMiddleware
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// Middleware built from a closure or function. See [`from_fn`].
pub struct FromFn<F>(F);

/// Turns a function or closure into [`Middleware`].
///
/// ```rust,no_run
/// use peel::{App, Config, from_fn};
///
/// let app = App::new(Config::default()).with(from_fn(|ctx, next| {
///     Box::pin(async move {
///         ctx.log().info("before");
///         next.run(ctx).await?;
///         ctx.log().info("after");
///         Ok(())
///     })
/// }));
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a> + Send + Sync + 'static,
{
    FromFn(f)
}

impl<F> Middleware for FromFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a> + Send + Sync + 'static,
{
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a> {
        (self.0)(ctx, next)
    }
}

// ── Finish ────────────────────────────────────────────────────────────────────

/// The innermost continuation, run when the last middleware calls `next`.
pub trait Finish: Send + Sync {
    fn finish<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a>;
}

impl<F> Finish for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync,
{
    fn finish<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a> {
        self(ctx)
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the chain, handed to each middleware.
pub struct Next<'a> {
    rest: &'a [SharedMiddleware],
    finish: Option<&'a dyn Finish>,
}

impl<'a> Next<'a> {
    /// Runs every downstream layer and resolves once they have all settled.
    pub async fn run(self, ctx: &mut Context) -> Result<(), HttpError> {
        match self.rest.split_first() {
            Some((head, tail)) => {
                let next = Next { rest: tail, finish: self.finish };
                head.handle(ctx, next).await
            }
            None => match self.finish {
                Some(finish) => finish.finish(ctx).await,
                None => Ok(()),
            },
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.rest.len())
            .field("finish", &self.finish.is_some())
            .finish()
    }
}

// ── Stack ─────────────────────────────────────────────────────────────────────

/// One middleware or an ordered list of them, as accepted by
/// [`Queue::add`] and [`App::with`](crate::App::with).
pub enum Stack {
    One(SharedMiddleware),
    Many(Vec<SharedMiddleware>),
}

impl<M: Middleware> From<M> for Stack {
    fn from(m: M) -> Self { Self::One(Arc::new(m)) }
}

impl From<Vec<SharedMiddleware>> for Stack {
    fn from(list: Vec<SharedMiddleware>) -> Self { Self::Many(list) }
}

/// Nests a whole queue, keeping its order.
impl From<Queue> for Stack {
    fn from(queue: Queue) -> Self { Self::Many(queue.stack) }
}

// ── Queue ─────────────────────────────────────────────────────────────────────

/// An ordered, append-only middleware sequence.
#[derive(Clone, Default)]
pub struct Queue {
    stack: Vec<SharedMiddleware>,
}

impl Queue {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Appends one or more middleware, preserving their order.
    pub fn add(&mut self, middleware: impl Into<Stack>) {
        match middleware.into() {
            Stack::One(m) => self.stack.push(m),
            Stack::Many(list) => self.stack.extend(list),
        }
    }

    pub fn len(&self) -> usize { self.stack.len() }
    pub fn is_empty(&self) -> bool { self.stack.is_empty() }

    /// Synchronous strategy: drives the chain to completion on the calling
    /// thread, blocking it until every layer has settled.
    ///
    /// Must not be called from an async task; the server uses it from the
    /// blocking pool. Middleware awaiting tokio I/O or timers still works
    /// there because the runtime keeps driving them on its own threads.
    pub fn run(&self, ctx: &mut Context, finish: Option<&dyn Finish>) -> Result<(), HttpError> {
        futures::executor::block_on(self.run_async(ctx, finish))
    }

    /// Asynchronous strategy: awaits every layer, so a middleware can work
    /// both before and after the rest of the chain.
    pub async fn run_async(
        &self,
        ctx: &mut Context,
        finish: Option<&dyn Finish>,
    ) -> Result<(), HttpError> {
        Next { rest: &self.stack, finish }.run(ctx).await
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue").field("len", &self.stack.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Empty;

    use super::*;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn ctx() -> Context {
        Context::from(http::Request::get("/").body(Empty::<Bytes>::new()).unwrap())
    }

    /// Records `name:in` before and `name:out` after the rest of the chain.
    struct Mark {
        name: &'static str,
        trace: Trace,
    }

    impl Middleware for Mark {
        fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a> {
            Box::pin(async move {
                self.trace.lock().unwrap().push(format!("{}:in", self.name));
                tokio::task::yield_now().await;
                next.run(ctx).await?;
                self.trace.lock().unwrap().push(format!("{}:out", self.name));
                Ok(())
            })
        }
    }

    /// Records its name and never calls `next`.
    struct Stop {
        trace: Trace,
    }

    impl Middleware for Stop {
        fn handle<'a>(&'a self, _ctx: &'a mut Context, _next: Next<'a>) -> BoxFuture<'a> {
            Box::pin(async move {
                self.trace.lock().unwrap().push("stop".to_owned());
                Ok(())
            })
        }
    }

    fn marks(names: &[&'static str], trace: &Trace) -> Queue {
        let mut queue = Queue::new();
        for &name in names {
            queue.add(Mark { name, trace: Arc::clone(trace) });
        }
        queue
    }

    fn recorded(trace: &Trace) -> Vec<String> {
        trace.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn onion_order_async() {
        let trace = Trace::default();
        let queue = marks(&["a", "b", "c"], &trace);
        queue.run_async(&mut ctx(), None).await.unwrap();
        assert_eq!(recorded(&trace), ["a:in", "b:in", "c:in", "c:out", "b:out", "a:out"]);
    }

    #[test]
    fn onion_order_sync() {
        let trace = Trace::default();
        let queue = marks(&["x", "y"], &trace);
        queue.run(&mut ctx(), None).unwrap();
        assert_eq!(recorded(&trace), ["x:in", "y:in", "y:out", "x:out"]);
    }

    #[tokio::test]
    async fn short_circuit_stops_downstream_but_unwinds_upstream() {
        let trace = Trace::default();
        let mut queue = marks(&["a"], &trace);
        queue.add(Stop { trace: Arc::clone(&trace) });
        queue.add(Mark { name: "never", trace: Arc::clone(&trace) });
        queue.run_async(&mut ctx(), None).await.unwrap();
        assert_eq!(recorded(&trace), ["a:in", "stop", "a:out"]);
    }

    #[test]
    fn short_circuit_sync() {
        let trace = Trace::default();
        let mut queue = marks(&["a", "b"], &trace);
        queue.add(Stop { trace: Arc::clone(&trace) });
        queue.add(Mark { name: "never", trace: Arc::clone(&trace) });
        queue.run(&mut ctx(), None).unwrap();
        assert_eq!(recorded(&trace), ["a:in", "b:in", "stop", "b:out", "a:out"]);
    }

    fn teapot(ctx: &mut Context) -> BoxFuture<'_> {
        Box::pin(async move {
            ctx.response.set_status(StatusCode::IM_A_TEAPOT);
            Ok(())
        })
    }

    #[tokio::test]
    async fn finish_runs_after_the_last_layer() {
        let trace = Trace::default();
        let queue = marks(&["a"], &trace);
        let mut ctx = ctx();
        queue.run_async(&mut ctx, Some(&teapot)).await.unwrap();
        assert_eq!(ctx.response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn errors_reach_the_caller_and_skip_post_work() {
        let trace = Trace::default();
        let mut queue = marks(&["a"], &trace);
        queue.add(from_fn(|_ctx, _next| {
            Box::pin(async { Err::<(), _>(HttpError::new(StatusCode::BAD_GATEWAY, "upstream")) })
        }));
        let err = queue.run_async(&mut ctx(), None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(recorded(&trace), ["a:in"]);
    }

    #[tokio::test]
    async fn add_accepts_a_list() {
        let trace = Trace::default();
        let mut queue = Queue::new();
        queue.add(vec![
            Mark { name: "one", trace: Arc::clone(&trace) }.shared(),
            Mark { name: "two", trace: Arc::clone(&trace) }.shared(),
        ]);
        assert_eq!(queue.len(), 2);
        queue.run_async(&mut ctx(), None).await.unwrap();
        assert_eq!(recorded(&trace), ["one:in", "two:in", "two:out", "one:out"]);
    }
}
