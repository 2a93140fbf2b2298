//! Application bootstrap
//!
//! Installs clients, global middleware and lifecycle hooks. Nothing connects
//! here; `Application::run` invokes the factories.

use ignition::cache::{self, CacheConfig};
use ignition::config::AppConfig;
use ignition::database::{self, DatabaseConfig};
use ignition::{Application, MemoryCache};

use crate::middleware::{LoggingMiddleware, RequestIdMiddleware};
use crate::routes;
use crate::state::AppState;

pub fn register(app: &mut Application, config: &AppConfig) {
    let debug = config.debug;

    // Database is optional
    if let Some(db) = DatabaseConfig::from_env() {
        let logging = db.logging || debug;
        app.install_db(debug, database::installer(db.logging(logging)));
    }

    match CacheConfig::from_env() {
        Some(redis) => app.install_redis(debug, cache::installer(redis)),
        None => app.install_redis(debug, || async { Ok(MemoryCache::new()) }),
    }

    // Outermost first: the request id is assigned before anything is logged
    app.install_middleware(RequestIdMiddleware::new());
    app.install_middleware(LoggingMiddleware);

    let name = config.name.clone();
    app.prepare("routes", move |app| {
        let state = AppState::from_app(app, name);
        app.routes(routes::register(&state));
        Ok(())
    });

    app.starter("summary", |app| {
        tracing::info!(
            cache = app.cache().map(|c| c.backend()).unwrap_or("none"),
            database = app.database::<ignition::DbConnection>().is_some(),
            middleware = app.server().middleware().len(),
            "clients ready"
        );
        Ok(())
    });

    app.on_interrupt("notice", || async {
        tracing::info!("interrupt received; draining connections");
    });
}
