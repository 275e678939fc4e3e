//! Application configuration.
//!
//! Build a [`Config`] in code with the builder methods, deserialize it from
//! any serde source, or let [`Config::load`] read `PEEL_*` environment
//! variables on top of the defaults:
//!
//! ```text
//! PEEL_PORT=8080 PEEL_TIMER=true PEEL_ASYNC_MIDDLEWARE=false ./server
//! ```

use std::net::SocketAddr;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::router::ResponseSchema;

/// Server and pipeline settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_domain")]
    pub domain: String,

    /// Logged once the listener is up. Defaults to
    /// `Server listening on <bound address>`.
    #[serde(default)]
    pub greeting: Option<String>,

    /// Install [`BodyParser`](crate::middleware::BodyParser).
    #[serde(default = "enabled")]
    pub body_parser: bool,

    /// Install [`Timer`](crate::middleware::Timer).
    #[serde(default)]
    pub timer: bool,

    /// Install [`ErrorBoundary`](crate::middleware::ErrorBoundary).
    #[serde(default = "enabled")]
    pub error_handler: bool,

    /// Envelope applied to every route without its own schema.
    #[serde(default)]
    pub response_schema: Option<ResponseSchema>,

    /// Run the queue with [`Queue::run_async`](crate::Queue::run_async) on
    /// the connection task. When off, each request runs through the
    /// blocking [`Queue::run`](crate::Queue::run) on tokio's blocking pool.
    #[serde(default = "enabled")]
    pub async_middleware: bool,

    /// Maximum request body the body parser will buffer, in bytes.
    #[serde(default)]
    pub body_limit: Option<usize>,
}

fn default_port() -> u16 {
    3000
}

fn default_domain() -> String {
    "localhost".to_owned()
}

fn enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            domain: default_domain(),
            greeting: None,
            body_parser: true,
            timer: false,
            error_handler: true,
            response_schema: None,
            async_middleware: true,
            body_limit: None,
        }
    }
}

impl Config {
    /// Defaults overlaid with `PEEL_`-prefixed environment variables.
    pub fn load() -> Result<Self, Error> {
        Self::figment().extract().map_err(|e| Error::Config(Box::new(e)))
    }

    /// The provider stack behind [`load`](Self::load), for merging in more
    /// sources (a TOML file, command-line overrides) before extracting.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("PEEL_"))
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    pub fn body_parser(mut self, on: bool) -> Self {
        self.body_parser = on;
        self
    }

    pub fn timer(mut self, on: bool) -> Self {
        self.timer = on;
        self
    }

    pub fn error_handler(mut self, on: bool) -> Self {
        self.error_handler = on;
        self
    }

    pub fn response_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn async_middleware(mut self, on: bool) -> Self {
        self.async_middleware = on;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }

    /// The configured greeting, or one naming the address actually bound.
    pub(crate) fn greeting_text(&self, bound: SocketAddr) -> String {
        self.greeting
            .clone()
            .unwrap_or_else(|| format!("Server listening on {bound}"))
    }
}
