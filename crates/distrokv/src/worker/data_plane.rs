//! Worker data plane: client reads and writes against the local store.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use distrokv_common::{KeyValue, SetKeyRequest, StatusResponse, constants::routes};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::control_plane::rejection;
use crate::storage::KeyValueStore;

/// Create the data-plane router
pub fn create_router(store: Arc<KeyValueStore>) -> Router {
    Router::new()
        .route(
            &format!("{}/{{key}}", routes::KEYS),
            get(get_key).put(set_key).delete(delete_key),
        )
        .route(routes::HEALTH, get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn get_key(State(store): State<Arc<KeyValueStore>>, Path(key): Path<String>) -> Response {
    match store.get(&key).await {
        Ok(value) => Json(KeyValue { key, value }).into_response(),
        Err(e) => rejection(&e).into_response(),
    }
}

async fn set_key(
    State(store): State<Arc<KeyValueStore>>,
    Path(key): Path<String>,
    Json(req): Json<SetKeyRequest>,
) -> Json<StatusResponse> {
    store.set(key, req.value).await;
    Json(StatusResponse::success("Key set"))
}

async fn delete_key(
    State(store): State<Arc<KeyValueStore>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<StatusResponse>) {
    match store.delete(&key).await {
        Ok(()) => (StatusCode::OK, Json(StatusResponse::success("Key deleted"))),
        Err(e) => rejection(&e),
    }
}

async fn health_check(State(store): State<Arc<KeyValueStore>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "keys": store.len().await,
    }))
}
