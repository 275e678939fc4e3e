//! Route handler type erasure.
//!
//! # How async handlers are stored
//!
//! Each route owns a handler of its own concrete type, yet every route
//! middleware has to call its handler the same way. The handler is hidden
//! behind a trait object (`dyn ErasedHandler`) that always yields a
//! [`Body`]:
//!
//! ```text
//! fn cars(ctx: &mut Context) -> BoxFuture<'_, Result<Json<Vec<Car>>, HttpError>>
//!        ↓ Route::get("/api/cars", cars)
//! Arc::new(FnHandler::new(cars))                   ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { cars(ctx).await?.into_body() })  ← BoxFuture
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use crate::body::{Body, IntoBody};
use crate::context::Context;
use crate::error::HttpError;
use crate::queue::BoxFuture;

/// Internal dispatch interface.
pub(crate) trait ErasedHandler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<Body, HttpError>>;
}

/// A type-erased handler shared by the route middleware and its clones.
pub(crate) type BoxedHandler = Arc<dyn ErasedHandler>;

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
/// `R` is the handler's success type.
pub(crate) struct FnHandler<F, R>(F, PhantomData<fn() -> R>);

impl<F, R> FnHandler<F, R> {
    pub(crate) fn new(f: F) -> Self {
        Self(f, PhantomData)
    }
}

impl<F, R> ErasedHandler for FnHandler<F, R>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<R, HttpError>> + Send + Sync + 'static,
    R: IntoBody + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<Body, HttpError>> {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await?.into_body() })
    }
}
