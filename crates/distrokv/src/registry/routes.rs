//! HTTP route handlers for the registry.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use distrokv_common::{
    HeartbeatRequest, KvError, NodeListResponse, RegisterNodeRequest, StatusResponse,
    constants::routes,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::NodeDirectory;

/// Shared registry state
#[derive(Clone)]
pub struct RegistryState {
    pub directory: Arc<NodeDirectory>,
}

/// Create the registry router
pub fn create_router(state: RegistryState) -> Router {
    Router::new()
        .route(routes::REGISTER, post(register_node))
        .route(routes::HEARTBEAT, post(node_heartbeat))
        .route(routes::NODES, get(get_node_list))
        .route(routes::HEALTH, get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn rejection(err: &KvError) -> (StatusCode, Json<StatusResponse>) {
    let code = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(StatusResponse::registry_failed(err.to_string())))
}

async fn register_node(
    State(state): State<RegistryState>,
    Json(req): Json<RegisterNodeRequest>,
) -> (StatusCode, Json<StatusResponse>) {
    tracing::info!(hostname = %req.hostname, ip = %req.ip_address, "Registration request");

    match state
        .directory
        .register_node(&req.hostname, &req.ip_address, &req.port_number)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse::registry_ok("Node registered successfully")),
        ),
        Err(e) => rejection(&e),
    }
}

async fn node_heartbeat(
    State(state): State<RegistryState>,
    Json(req): Json<HeartbeatRequest>,
) -> (StatusCode, Json<StatusResponse>) {
    match state
        .directory
        .record_heartbeat(&req.hostname, &req.ip_address, &req.port_number)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse::registry_ok("Heartbeat registered successfully")),
        ),
        Err(e) => rejection(&e),
    }
}

async fn get_node_list(State(state): State<RegistryState>) -> Json<NodeListResponse> {
    Json(NodeListResponse {
        node_list: state.directory.list_nodes().await,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    registered_nodes: usize,
}

async fn health_check(State(state): State<RegistryState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        registered_nodes: state.directory.len().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn router() -> (Router, Arc<NodeDirectory>) {
        let directory = Arc::new(NodeDirectory::new());
        let app = create_router(RegistryState {
            directory: directory.clone(),
        });
        (app, directory)
    }

    fn post_json(path: &str, body: &impl Serialize) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn register_req() -> RegisterNodeRequest {
        RegisterNodeRequest {
            hostname: "host1".to_string(),
            ip_address: "10.0.0.1".to_string(),
            port_number: "7001".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let (app, directory) = router();

        let resp = app.clone().oneshot(post_json("/register", &register_req())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: StatusResponse = read_json(resp).await;
        assert_eq!(body.status, "200");

        let resp = app.oneshot(post_json("/register", &register_req())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: StatusResponse = read_json(resp).await;
        assert_eq!(body.status, "500");

        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_heartbeat_unknown_node() {
        let (app, directory) = router();
        let req = HeartbeatRequest {
            hostname: "ghost".to_string(),
            ip_address: "10.0.0.9".to_string(),
            port_number: "7009".to_string(),
        };

        let resp = app.oneshot(post_json("/heartbeat", &req)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: StatusResponse = read_json(resp).await;
        assert!(!body.is_success());
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_node_list() {
        let (app, directory) = router();
        directory.register_node("host1", "10.0.0.1", "7001").await.unwrap();

        let resp = app
            .oneshot(Request::builder().uri("/nodes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: NodeListResponse = read_json(resp).await;
        assert_eq!(body.node_list.len(), 1);
        assert_eq!(body.node_list[0].node_hostname, "host1");
        assert_eq!(body.node_list[0].node_control_port, "7001");
    }
}
