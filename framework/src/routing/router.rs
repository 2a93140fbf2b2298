use crate::http::{Request, Response};
use crate::middleware::{into_boxed, BoxedMiddleware, Middleware};
use crate::BoxFuture;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Type alias for route handlers
pub type BoxedHandler = Box<dyn Fn(Request) -> BoxFuture<Response> + Send + Sync>;

#[derive(Clone)]
struct RouteEntry {
    pattern: String,
    handler: Arc<BoxedHandler>,
}

/// Result of matching a request against the route table
pub struct RouteMatch {
    pub handler: Arc<BoxedHandler>,
    pub params: HashMap<String, String>,
    pub middleware: Vec<BoxedMiddleware>,
}

/// HTTP router
///
/// Paths use `{name}` captures, e.g. `/cache/{key}`.
pub struct Router {
    get_routes: MatchitRouter<RouteEntry>,
    post_routes: MatchitRouter<RouteEntry>,
    put_routes: MatchitRouter<RouteEntry>,
    delete_routes: MatchitRouter<RouteEntry>,
    /// Middleware assignments keyed by method and route pattern
    route_middleware: HashMap<(http::Method, String), Vec<BoxedMiddleware>>,
    /// Route name -> pattern
    names: HashMap<String, String>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            get_routes: MatchitRouter::new(),
            post_routes: MatchitRouter::new(),
            put_routes: MatchitRouter::new(),
            delete_routes: MatchitRouter::new(),
            route_middleware: HashMap::new(),
            names: HashMap::new(),
        }
    }

    fn insert<H, Fut>(mut self, method: http::Method, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: BoxedHandler =
            Box::new(move |req: Request| -> BoxFuture<Response> { Box::pin(handler(req)) });
        let entry = RouteEntry {
            pattern: path.to_string(),
            handler: Arc::new(handler),
        };
        let table = match method {
            http::Method::POST => &mut self.post_routes,
            http::Method::PUT => &mut self.put_routes,
            http::Method::DELETE => &mut self.delete_routes,
            _ => &mut self.get_routes,
        };
        if let Err(e) = table.insert(path, entry) {
            tracing::warn!(%method, path, error = %e, "route not registered");
        }
        RouteBuilder {
            router: self,
            last_method: method,
            last_path: path.to_string(),
        }
    }

    /// Register a GET route
    pub fn get<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::GET, path, handler)
    }

    /// Register a POST route
    pub fn post<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::POST, path, handler)
    }

    /// Register a PUT route
    pub fn put<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::PUT, path, handler)
    }

    /// Register a DELETE route
    pub fn delete<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.insert(http::Method::DELETE, path, handler)
    }

    /// Match a request and return the handler, extracted params and route middleware
    pub fn match_route(&self, method: &http::Method, path: &str) -> Option<RouteMatch> {
        let table = match *method {
            http::Method::GET => &self.get_routes,
            http::Method::POST => &self.post_routes,
            http::Method::PUT => &self.put_routes,
            http::Method::DELETE => &self.delete_routes,
            _ => return None,
        };

        let matched = table.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let middleware = self
            .route_middleware
            .get(&(method.clone(), matched.value.pattern.clone()))
            .cloned()
            .unwrap_or_default();

        Some(RouteMatch {
            handler: matched.value.handler.clone(),
            params,
            middleware,
        })
    }

    /// Build a URL for a named route
    ///
    /// # Example
    /// ```rust,ignore
    /// let url = router.url("cache.show", &[("key", "greeting")]);
    /// assert_eq!(url, Some("/cache/greeting".to_string()));
    /// ```
    pub fn url(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        let mut url = self.names.get(name)?.clone();
        for (key, value) in params {
            url = url.replace(&format!("{{{}}}", key), value);
        }
        Some(url)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder returned after registering a route, enabling `.name()` and `.middleware()`
pub struct RouteBuilder {
    router: Router,
    last_method: http::Method,
    last_path: String,
}

impl RouteBuilder {
    /// Name the most recently registered route
    pub fn name(mut self, name: &str) -> RouteBuilder {
        self.router
            .names
            .insert(name.to_string(), self.last_path.clone());
        self
    }

    /// Apply middleware to the most recently registered route
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// Router::new()
    ///     .get("/admin", admin_handler).middleware(AuthMiddleware)
    /// ```
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> RouteBuilder {
        self.router
            .route_middleware
            .entry((self.last_method.clone(), self.last_path.clone()))
            .or_default()
            .push(into_boxed(middleware));
        self
    }

    pub fn get<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router.get(path, handler)
    }

    pub fn post<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router.post(path, handler)
    }

    pub fn put<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router.put(path, handler)
    }

    pub fn delete<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router.delete(path, handler)
    }
}

impl From<RouteBuilder> for Router {
    fn from(builder: RouteBuilder) -> Self {
        builder.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{text, HttpResponse};
    use crate::middleware::Next;
    use async_trait::async_trait;
    use bytes::Bytes;

    struct Tag;

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(&self, request: Request, next: Next) -> Response {
            next(request).await
        }
    }

    async fn show(req: Request) -> Response {
        text(req.param("key").unwrap_or_default().to_string())
    }

    async fn store(_req: Request) -> Response {
        Ok(HttpResponse::new().status(201))
    }

    fn router() -> Router {
        Router::new()
            .get("/cache/{key}", show)
            .name("cache.show")
            .middleware(Tag)
            .put("/cache/{key}", store)
            .into()
    }

    #[test]
    fn test_match_extracts_params_and_route_middleware() {
        let router = router();

        let matched = router
            .match_route(&http::Method::GET, "/cache/greeting")
            .unwrap();
        assert_eq!(matched.params.get("key").map(String::as_str), Some("greeting"));
        assert_eq!(matched.middleware.len(), 1);

        let put = router.match_route(&http::Method::PUT, "/cache/greeting").unwrap();
        assert!(put.middleware.is_empty());
    }

    #[test]
    fn test_unmatched_method_and_path() {
        let router = router();
        assert!(router.match_route(&http::Method::POST, "/cache/x").is_none());
        assert!(router.match_route(&http::Method::GET, "/missing").is_none());
        assert!(router.match_route(&http::Method::PATCH, "/cache/x").is_none());
    }

    #[test]
    fn test_named_route_url() {
        let router = router();
        assert_eq!(
            router.url("cache.show", &[("key", "greeting")]),
            Some("/cache/greeting".to_string())
        );
        assert_eq!(router.url("unknown", &[]), None);
    }

    #[tokio::test]
    async fn test_handler_receives_request() {
        let router = router();
        let matched = router.match_route(&http::Method::GET, "/cache/abc").unwrap();
        let request: Request = http::Request::builder()
            .uri("/cache/abc")
            .body(Bytes::new())
            .unwrap()
            .into();

        let response = (matched.handler)(request.with_params(matched.params))
            .await
            .unwrap();
        assert_eq!(response.body(), "abc");
    }
}
