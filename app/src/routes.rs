use ignition::Router;

use crate::controllers;
use crate::state::{with, AppState};

pub fn register(state: &AppState) -> Router {
    Router::new()
        .get("/", with(state, controllers::home::index))
        .name("home")
        .get("/health", with(state, controllers::health::show))
        .name("health")
        .get("/cache/{key}", with(state, controllers::cache::show))
        .name("cache.show")
        .put("/cache/{key}", with(state, controllers::cache::store))
        .name("cache.store")
        .delete("/cache/{key}", with(state, controllers::cache::destroy))
        .name("cache.destroy")
        .into()
}
