//! Middleware for the request pipeline
//!
//! A middleware receives the request and a `Next` continuation. Calling
//! `next(request).await` runs the rest of the chain; returning without calling
//! it short-circuits.
//!
//! # Example
//!
//! ```rust,ignore
//! use ignition::{async_trait, Middleware, Next, Request, Response};
//!
//! pub struct TimingMiddleware;
//!
//! #[async_trait]
//! impl Middleware for TimingMiddleware {
//!     async fn handle(&self, request: Request, next: Next) -> Response {
//!         let started = std::time::Instant::now();
//!         let response = next(request).await;
//!         tracing::debug!(elapsed = ?started.elapsed(), "request finished");
//!         response
//!     }
//! }
//! ```

mod registry;

pub use registry::MiddlewareRegistry;

use crate::http::{Request, Response};
use crate::routing::BoxedHandler;
use crate::BoxFuture;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Continuation that runs the remainder of the chain
pub type Next = Arc<dyn Fn(Request) -> BoxFuture<Response> + Send + Sync>;

/// Shared, type-erased middleware
pub type BoxedMiddleware = Arc<dyn Middleware>;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: Request, next: Next) -> Response;
}

pub fn into_boxed<M: Middleware + 'static>(middleware: M) -> BoxedMiddleware {
    Arc::new(middleware)
}

/// Middleware built from an async closure
///
/// # Example
///
/// ```rust,ignore
/// app.install_middleware(middleware::from_fn(|req, next| async move {
///     next(req).await.header("X-Powered-By", "ignition")
/// }));
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FnMiddleware { f }
}

pub struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn handle(&self, request: Request, next: Next) -> Response {
        (self.f)(request, next).await
    }
}

/// Ordered middleware wrapped around a single handler
pub struct MiddlewareChain {
    middleware: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
        }
    }

    pub fn push(&mut self, middleware: BoxedMiddleware) {
        self.middleware.push(middleware);
    }

    pub fn extend(&mut self, middleware: impl IntoIterator<Item = BoxedMiddleware>) {
        self.middleware.extend(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run the chain; the first middleware pushed sees the request first
    pub async fn execute(self, request: Request, handler: Arc<BoxedHandler>) -> Response {
        let mut next: Next = Arc::new(move |req: Request| -> BoxFuture<Response> { handler(req) });

        for middleware in self.middleware.into_iter().rev() {
            let inner = next;
            next = Arc::new(move |req: Request| -> BoxFuture<Response> {
                let middleware = middleware.clone();
                let inner = inner.clone();
                Box::pin(async move { middleware.handle(req, inner).await })
            });
        }

        next(request).await
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, ResponseExt};
    use bytes::Bytes;
    use std::sync::Mutex;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Record {
        async fn handle(&self, request: Request, next: Next) -> Response {
            self.log.lock().unwrap().push(format!("{}:before", self.name));
            let response = next(request).await;
            self.log.lock().unwrap().push(format!("{}:after", self.name));
            response
        }
    }

    struct Deny;

    #[async_trait]
    impl Middleware for Deny {
        async fn handle(&self, _request: Request, _next: Next) -> Response {
            Err(HttpResponse::text("denied").status(403))
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/")
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    fn handler(log: Arc<Mutex<Vec<String>>>) -> Arc<BoxedHandler> {
        let handler: BoxedHandler = Box::new(move |_req: Request| -> BoxFuture<Response> {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push("handler".to_string());
                Ok(HttpResponse::text("ok"))
            })
        });
        Arc::new(handler)
    }

    #[tokio::test]
    async fn test_chain_runs_in_push_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.push(into_boxed(Record { name: "a", log: log.clone() }));
        chain.push(into_boxed(Record { name: "b", log: log.clone() }));

        let response = chain.execute(request(), handler(log.clone())).await;
        assert!(response.is_ok());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:before", "b:before", "handler", "b:after", "a:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.push(into_boxed(Deny));
        chain.push(into_boxed(Record { name: "a", log: log.clone() }));

        let response = chain.execute(request(), handler(log.clone())).await;
        assert_eq!(response.unwrap_err().status_code(), 403);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_fn() {
        let mut chain = MiddlewareChain::new();
        chain.push(into_boxed(from_fn(|req, next: Next| async move {
            next(req).await.header("X-Powered-By", "ignition")
        })));

        let log = Arc::new(Mutex::new(Vec::new()));
        let response = chain.execute(request(), handler(log)).await.unwrap();
        assert_eq!(response.header_value("x-powered-by"), Some("ignition"));
    }
}
