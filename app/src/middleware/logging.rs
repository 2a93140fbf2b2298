use ignition::{async_trait, Middleware, Next, Request, Response};
use std::time::Instant;

use super::RequestId;

/// Logs method, path, status and duration of every request
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, request: Request, next: Next) -> Response {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.path().to_string();
        let id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        let response = next(request).await;

        let status = match &response {
            Ok(res) | Err(res) => res.status_code(),
        };
        tracing::info!(
            request_id = %id,
            %method,
            path = %path,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request"
        );
        response
    }
}
