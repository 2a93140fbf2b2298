//! Registry for global middleware
//!
//! Populated by `Server::use_middleware`, which `Application::run_middleware`
//! calls with the pending list.

use super::{into_boxed, BoxedMiddleware, Middleware};

/// Middleware that runs on every request, in the order it was added
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    global: Vec<BoxedMiddleware>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self { global: Vec::new() }
    }

    /// Append global middleware
    ///
    /// Global middleware runs before any route-specific middleware.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// registry.append(LoggingMiddleware)
    ///         .append(CorsMiddleware)
    /// ```
    pub fn append<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.global.push(into_boxed(middleware));
        self
    }

    /// Append already boxed middleware, keeping iteration order
    pub fn extend(&mut self, middleware: impl IntoIterator<Item = BoxedMiddleware>) {
        self.global.extend(middleware);
    }

    pub fn global_middleware(&self) -> &[BoxedMiddleware] {
        &self.global
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}
