use ignition::{async_trait, Middleware, Next, Request, Response, ResponseExt};
use std::sync::atomic::{AtomicU64, Ordering};

pub const HEADER: &str = "X-Request-Id";

/// Request id stored in the request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Tags every request with an id, echoing it in the response
///
/// An incoming `X-Request-Id` header is kept; otherwise one is generated
/// from the start time and a per-process counter.
pub struct RequestIdMiddleware {
    counter: AtomicU64,
}

impl RequestIdMiddleware {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!(
            "{:x}-{:06x}",
            chrono::Utc::now().timestamp_millis(),
            seq & 0xff_ffff
        )
    }
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RequestIdMiddleware {
    async fn handle(&self, mut request: Request, next: Next) -> Response {
        let id = match request.header(HEADER) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.next_id(),
        };
        request.extensions_mut().insert(RequestId(id.clone()));

        next(request).await.header(HEADER, id)
    }
}
