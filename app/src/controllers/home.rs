use ignition::{json, Request, Response};
use serde_json::json;

use crate::state::AppState;

pub async fn index(state: AppState, _req: Request) -> Response {
    json(json!({
        "name": state.name,
        "routes": ["/health", "/cache/{key}"],
    }))
}
