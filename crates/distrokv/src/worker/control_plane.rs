//! Worker control plane: peer announcements and (future) replication.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use distrokv_common::{
    DeleteReplicationRequest, KvError, NewPeerRequest, PeerNode, SetReplicationRequest,
    StatusResponse, constants::routes,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::PeerTable;
use crate::transport::HttpChannel;

/// Shared control-plane state
#[derive(Clone)]
pub struct ControlPlaneState {
    pub peers: Arc<PeerTable>,
    /// This node, reported by `/health`
    pub node: PeerNode,
}

/// Create the control-plane router
pub fn create_router(state: ControlPlaneState) -> Router {
    Router::new()
        .route(routes::PEERS, post(register_new_peer).get(list_peers))
        .route(routes::REPLICATE_SET, post(replicate_set))
        .route(routes::REPLICATE_DELETE, post(replicate_delete))
        .route(routes::HEALTH, get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub(crate) fn rejection(err: &KvError) -> (StatusCode, Json<StatusResponse>) {
    let code = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(StatusResponse::failed(err.to_string())))
}

async fn register_new_peer(
    State(state): State<ControlPlaneState>,
    Json(req): Json<NewPeerRequest>,
) -> (StatusCode, Json<StatusResponse>) {
    tracing::info!(hostname = %req.hostname, ip = %req.ip_address, "Peer announcement");

    match state.peers.register_peer(PeerNode::from(req)).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse::success("Peer registered successfully")),
        ),
        Err(e) => rejection(&e),
    }
}

async fn list_peers(State(state): State<ControlPlaneState>) -> Json<Vec<PeerNode>> {
    Json(state.peers.snapshot().await)
}

// Replication is declared on the wire but not implemented yet
async fn replicate_set(Json(req): Json<SetReplicationRequest>) -> (StatusCode, Json<StatusResponse>) {
    tracing::debug!(key = %req.key, "Replicate-set request ignored");
    rejection(&KvError::NotImplemented("replication".to_string()))
}

async fn replicate_delete(
    Json(req): Json<DeleteReplicationRequest>,
) -> (StatusCode, Json<StatusResponse>) {
    tracing::debug!(key = %req.key, "Replicate-delete request ignored");
    rejection(&KvError::NotImplemented("replication".to_string()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    hostname: String,
    peers: usize,
}

async fn health_check(State(state): State<ControlPlaneState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        hostname: state.node.hostname.clone(),
        peers: state.peers.len().await,
    })
}

/// Client for a peer's control plane
#[derive(Clone, Debug)]
pub struct PeerClient {
    channel: HttpChannel,
}

impl PeerClient {
    pub fn new(channel: HttpChannel) -> Self {
        Self { channel }
    }

    /// `RegisterNewPeerServer`; a repeated announcement comes back as `Rejected`
    pub async fn register_peer(&self, req: &NewPeerRequest) -> Result<StatusResponse, KvError> {
        self.channel.call(routes::PEERS, req).await
    }

    /// Fetch the peer's current peer table
    pub async fn list_peers(&self) -> Result<Vec<PeerNode>, KvError> {
        self.channel.get_json(routes::PEERS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn router() -> (Router, Arc<PeerTable>) {
        let peers = Arc::new(PeerTable::new());
        let app = create_router(ControlPlaneState {
            peers: peers.clone(),
            node: PeerNode::new("host1", "10.0.0.1", "7001", "9001"),
        });
        (app, peers)
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

    fn announcement() -> NewPeerRequest {
        NewPeerRequest {
            hostname: "host2".to_string(),
            ip_address: "10.0.0.2".to_string(),
            control_plane_port: "7002".to_string(),
            data_plane_port: "9002".to_string(),
        }
    }

    #[tokio::test]
    async fn test_announce_then_repeat() {
        let (app, peers) = router();

        let resp = app.clone().oneshot(post_json("/peers", &announcement())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: StatusResponse = read_json(resp).await;
        assert_eq!(body.status, "Success");

        let resp = app.oneshot(post_json("/peers", &announcement())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: StatusResponse = read_json(resp).await;
        assert_eq!(body.status, "Failed");

        assert_eq!(peers.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_peers() {
        let (app, peers) = router();
        peers.register_peer(PeerNode::from(announcement())).await.unwrap();

        let resp = app
            .oneshot(Request::builder().uri("/peers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: Vec<PeerNode> = read_json(resp).await;
        assert_eq!(body, vec![PeerNode::new("host2", "10.0.0.2", "7002", "9002")]);
    }

    #[tokio::test]
    async fn test_replication_is_not_implemented() {
        let (app, _) = router();

        let set = SetReplicationRequest {
            key: "k".to_string(),
            value: "v".to_string(),
        };
        let resp = app.clone().oneshot(post_json("/replicate/set", &set)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        let body: StatusResponse = read_json(resp).await;
        assert_eq!(body.status, "Failed");

        let delete = DeleteReplicationRequest { key: "k".to_string() };
        let resp = app.oneshot(post_json("/replicate/delete", &delete)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
