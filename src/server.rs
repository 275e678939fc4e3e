//! Connection handling, request dispatch and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`App::serve`](crate::App::serve), which lets `main` exit
//!    cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, info_span};

use crate::body::BoxError;
use crate::context::Context;
use crate::error::{Error, HttpError};
use crate::log::Logger;
use crate::queue::Queue;
use crate::response::{Response, ResponseBody};

// ── Service ───────────────────────────────────────────────────────────────────

/// The assembled pipeline: turns one `http::Request` into one response.
///
/// Cheap to clone; every connection task holds one. Also usable without a
/// socket, which is how the test suite drives whole applications.
#[derive(Clone)]
pub struct Service {
    queue: Arc<Queue>,
    log: Logger,
    blocking: bool,
}

impl Service {
    pub(crate) fn new(queue: Queue, log: Logger, blocking: bool) -> Self {
        Self { queue: Arc::new(queue), log, blocking }
    }

    /// Runs one request through the queue.
    ///
    /// A failure that escapes the queue (no error boundary installed) is
    /// logged and answered with its status and a bare reason phrase. A panic
    /// anywhere in the pipeline is logged and answered with `500`. Neither
    /// takes the connection or the server down.
    pub async fn call<B>(&self, req: http::Request<B>) -> http::Response<ResponseBody>
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let span = info_span!("request", method = %req.method(), path = %req.uri().path());
        let ctx = Context::new(req, self.log.clone());

        let (ctx, outcome) = if self.blocking {
            let queue = Arc::clone(&self.queue);
            let task = tokio::task::spawn_blocking(move || {
                let mut ctx = ctx;
                let outcome = span.in_scope(|| queue.run(&mut ctx, None));
                (ctx, outcome)
            });
            match task.await {
                Ok(done) => done,
                Err(e) => {
                    error!("request pipeline panicked: {e}");
                    return fallback(HttpError::internal());
                }
            }
        } else {
            let mut ctx = ctx;
            let run = self.queue.run_async(&mut ctx, None).instrument(span);
            let caught = AssertUnwindSafe(run).catch_unwind().await;
            match caught {
                Ok(outcome) => (ctx, outcome),
                Err(_) => {
                    error!("request pipeline panicked");
                    return fallback(HttpError::internal());
                }
            }
        };

        match outcome {
            Ok(()) => ctx.response.into_http(),
            Err(err) => {
                error!(status = err.status_code().as_u16(), "unhandled request failure: {err}");
                fallback(err)
            }
        }
    }
}

/// Response for a failure nothing inside the pipeline recovered from.
fn fallback(err: HttpError) -> http::Response<ResponseBody> {
    let status = err.status_code();
    let mut res = Response::new();
    res.set_status(status);
    res.end(status.canonical_reason().unwrap_or("Internal Server Error"));
    res.into_http()
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts connections on `listener` until `shutdown` resolves, then drains.
pub(crate) async fn serve(
    listener: TcpListener,
    service: Service,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Error> {
    info!(addr = %listener.local_addr()?, "peel listening");

    // One task per connection; kept so shutdown can wait on them.
    let mut tasks = tokio::task::JoinSet::new();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Shutdown wins over pending accepts.
            biased;

            () = &mut shutdown => {
                info!(connections = tasks.len(), "stopping, waiting on open connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("failed to accept connection: {e}");
                        continue;
                    }
                };

                let service = service.clone();
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection, not once
                    // per connection.
                    let svc = service_fn(move |req| {
                        let service = service.clone();
                        async move { Ok::<_, Infallible>(service.call(req).await) }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connections.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}

    info!("peel stopped");
    Ok(())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Completes when the process is asked to stop.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C). On
/// Windows only Ctrl-C is available. A signal that cannot be installed is
/// logged and never fires.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http_body_util::{BodyExt, Empty};

    use super::*;
    use crate::queue::from_fn;

    fn failing_queue() -> Queue {
        let mut queue = Queue::new();
        queue.add(from_fn(|_ctx, _next| {
            Box::pin(async { Err::<(), _>(HttpError::new(StatusCode::IM_A_TEAPOT, "teapot")) })
        }));
        queue
    }

    fn get() -> http::Request<Empty<Bytes>> {
        http::Request::get("/").body(Empty::new()).unwrap()
    }

    #[tokio::test]
    async fn escaped_failure_is_answered_not_propagated() {
        let service = Service::new(failing_queue(), Logger::default(), false);
        let res = service.call(get()).await;
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "I'm a teapot");
    }

    fn panicking_queue() -> Queue {
        let mut queue = Queue::new();
        queue.add(from_fn(|_ctx, _next| {
            Box::pin(async {
                let cars: Vec<&str> = Vec::new();
                Err::<(), _>(HttpError::bad_request(cars[3]))
            })
        }));
        queue
    }

    #[tokio::test]
    async fn panic_is_answered_with_500() {
        for blocking in [false, true] {
            let service = Service::new(panicking_queue(), Logger::default(), blocking);
            let res = service.call(get()).await;
            assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR, "blocking={blocking}");
            let body = res.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(body, "Internal Server Error");
        }
    }

    #[tokio::test]
    async fn blocking_mode_reaches_the_same_outcome() {
        let service = Service::new(failing_queue(), Logger::default(), true);
        let res = service.call(get()).await;
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    }
}
