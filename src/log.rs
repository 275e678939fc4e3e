//! The application logger handed to every request.
//!
//! peel does not install a subscriber. Events go through `tracing`; the
//! binary decides where they end up (`tracing_subscriber::fmt::init()` is
//! enough for local work).

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

/// Cloneable handle over `tracing`, tagged with the application name.
///
/// One `Logger` is injected into the [`App`](crate::App) at construction and
/// cloned into each request's [`Context`](crate::Context). Cloning is one
/// atomic increment.
#[derive(Clone, Debug)]
pub struct Logger {
    name: Arc<str>,
}

impl Logger {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn info(&self, message: impl fmt::Display) {
        info!(app = %self.name, "{message}");
    }

    pub fn warn(&self, message: impl fmt::Display) {
        warn!(app = %self.name, "{message}");
    }

    pub fn error(&self, message: impl fmt::Display) {
        error!(app = %self.name, "{message}");
    }
}

impl Default for Logger {
    fn default() -> Self { Self::new("peel") }
}
