use ignition::{json, CacheStore, FrameworkError, HttpResponse, Request, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct StoreQuery {
    /// Seconds until the value expires
    ttl: Option<u64>,
}

fn client(state: &AppState) -> Result<Arc<dyn CacheStore>, HttpResponse> {
    state
        .cache
        .clone()
        .ok_or_else(|| HttpResponse::from(FrameworkError::cache("no cache installed")))
}

fn key(req: &Request) -> String {
    req.param("key").unwrap_or_default().to_string()
}

fn not_found(key: &str) -> HttpResponse {
    HttpResponse::json(json!({ "error": format!("no value for '{}'", key) })).status(404)
}

pub async fn show(state: AppState, req: Request) -> Response {
    let cache = client(&state)?;
    let key = key(&req);

    match cache.get(&key).await.map_err(HttpResponse::from)? {
        Some(value) => json(json!({ "key": key, "value": value })),
        None => Err(not_found(&key)),
    }
}

/// Store the raw request body under `key`, optionally with `?ttl=<seconds>`
pub async fn store(state: AppState, req: Request) -> Response {
    let cache = client(&state)?;
    let key = key(&req);
    let query: StoreQuery = req
        .query()
        .map_err(|e| HttpResponse::json(json!({ "error": e.to_string() })).status(400))?;
    let value = String::from_utf8(req.body().to_vec())
        .map_err(|_| HttpResponse::json(json!({ "error": "body must be UTF-8" })).status(400))?;

    cache
        .set(&key, &value, query.ttl.map(Duration::from_secs))
        .await
        .map_err(HttpResponse::from)?;

    Ok(HttpResponse::json(json!({ "key": key, "ttl": query.ttl })).status(201))
}

pub async fn destroy(state: AppState, req: Request) -> Response {
    let cache = client(&state)?;
    let key = key(&req);

    if cache.delete(&key).await.map_err(HttpResponse::from)? {
        Ok(HttpResponse::new().status(204))
    } else {
        Err(not_found(&key))
    }
}
