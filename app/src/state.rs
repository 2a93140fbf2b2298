use ignition::{Application, CacheStore, DbConnection, Request, Response};
use std::future::Future;
use std::sync::Arc;

/// Handles shared by every controller
#[derive(Clone)]
pub struct AppState {
    pub name: String,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub db: Option<DbConnection>,
}

impl AppState {
    /// Snapshot the clients constructed by `run_db`
    pub fn from_app(app: &Application, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache: app.cache(),
            db: app.database(),
        }
    }
}

/// Adapt a `(state, request)` controller into a route handler
pub fn with<F, Fut>(state: &AppState, handler: F) -> impl Fn(Request) -> Fut + Send + Sync + 'static
where
    F: Fn(AppState, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let state = state.clone();
    move |req: Request| handler(state.clone(), req)
}
