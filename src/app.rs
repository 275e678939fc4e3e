//! The framework facade.

use std::future::Future;

use tokio::net::TcpListener;
use tracing::{error, warn};

use crate::config::Config;
use crate::error::Error;
use crate::log::Logger;
use crate::middleware::{BodyParser, ErrorBoundary, Resolver, Timer};
use crate::queue::{Queue, Stack};
use crate::router::Routes;
use crate::server::{self, Service};

/// An application: configuration, an injected logger and the middleware
/// and routes registered so far.
///
/// Registration methods return `self` so calls chain. Startup consumes the
/// `App`, so the queue cannot change once requests are being served and the
/// built-ins are installed exactly once.
///
/// ```rust,no_run
/// use peel::{App, BoxFuture, Config, Context, HttpError, Route};
///
/// fn ping(_ctx: &mut Context) -> BoxFuture<'_, Result<&'static str, HttpError>> {
///     Box::pin(async { Ok("pong") })
/// }
///
/// #[tokio::main]
/// async fn main() {
///     App::new(Config::default().timer(true))
///         .route(Route::get("/api/ping", ping))
///         .go()
///         .await;
/// }
/// ```
pub struct App {
    config: Config,
    queue: Queue,
    log: Logger,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config, queue: Queue::new(), log: Logger::default() }
    }

    /// Replaces the default logger handed to every request.
    pub fn logger(mut self, log: Logger) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Appends one middleware or a list of them.
    pub fn with(mut self, middleware: impl Into<Stack>) -> Self {
        self.queue.add(middleware);
        self
    }

    /// Registers one route descriptor or a list of them.
    ///
    /// Each valid descriptor becomes a route middleware appended after
    /// whatever was registered before it. Invalid descriptors (unknown
    /// method, empty path, malformed parameter mask) are logged and skipped.
    pub fn route(mut self, routes: impl Into<Routes>) -> Self {
        for route in routes.into() {
            match route.compile(self.config.response_schema.as_ref()) {
                Ok(layer) => self.queue.add(layer),
                Err(e) => warn!("{e}; route ignored"),
            }
        }
        self
    }

    /// Assembles the final pipeline.
    ///
    /// Built-ins go in front of everything registered, in a fixed order:
    /// resolver, error boundary, timer, body parser. Disabled ones are left
    /// out; the resolver is always present.
    pub fn into_service(self) -> Service {
        let mut pipeline = Queue::new();
        pipeline.add(Resolver);
        if self.config.error_handler {
            pipeline.add(ErrorBoundary);
        }
        if self.config.timer {
            pipeline.add(Timer);
        }
        if self.config.body_parser {
            let parser = match self.config.body_limit {
                Some(limit) => BodyParser::new().limit(limit),
                None => BodyParser::new(),
            };
            pipeline.add(parser);
        }
        pipeline.add(self.queue);
        Service::new(pipeline, self.log, !self.config.async_middleware)
    }

    /// Binds `(domain, port)` and serves until SIGTERM or Ctrl-C.
    pub async fn serve(self) -> Result<(), Error> {
        let addr = format!("{}:{}", self.config.domain, self.config.port);
        let listener = TcpListener::bind((self.config.domain.as_str(), self.config.port))
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener until SIGTERM or Ctrl-C.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), Error> {
        self.serve_with_shutdown(listener, server::shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` resolves, then drains
    /// in-flight connections.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let log = self.log.clone();
        let greeting = self.config.greeting_text(listener.local_addr()?);
        let service = self.into_service();
        log.info(greeting);
        server::serve(listener, service, shutdown).await
    }

    /// Starts the server. Any startup failure is logged and ends the
    /// process with exit status 1.
    pub async fn go(self) {
        if let Err(e) = self.serve().await {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
