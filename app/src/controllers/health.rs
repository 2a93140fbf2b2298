use ignition::{HttpResponse, Request, Response};
use serde_json::{json, Value};

use crate::state::AppState;

/// Ping every installed client; 503 when any of them fails
pub async fn show(state: AppState, _req: Request) -> Response {
    let mut healthy = true;

    let cache = match &state.cache {
        Some(cache) => match cache.ping().await {
            Ok(()) => json!({ "backend": cache.backend(), "ok": true }),
            Err(e) => {
                healthy = false;
                json!({ "backend": cache.backend(), "ok": false, "error": e.to_string() })
            }
        },
        None => Value::Null,
    };

    let database = match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => json!({ "ok": true }),
            Err(e) => {
                healthy = false;
                json!({ "ok": false, "error": e.to_string() })
            }
        },
        None => Value::Null,
    };

    let body = json!({
        "status": if healthy { "ok" } else { "degraded" },
        "cache": cache,
        "database": database,
    });

    if healthy {
        Ok(HttpResponse::json(body))
    } else {
        Err(HttpResponse::json(body).status(503))
    }
}
