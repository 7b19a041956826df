//! Worker node: bootstrap, heartbeat, and the control and data planes.

mod bootstrap;
mod control_plane;
mod data_plane;
mod heartbeat;
mod peers;

pub use bootstrap::{AnnounceReport, BootstrapReport};
pub use control_plane::{ControlPlaneState, PeerClient};
pub use heartbeat::Heartbeat;
pub use peers::PeerTable;

use anyhow::{Context, Result};
use distrokv_common::{HeartbeatRequest, PeerNode};
use futures::future::join_all;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{ClusterConfig, NodeConfig};
use crate::storage::KeyValueStore;
use crate::tasks::{serve_until_shutdown, spawn_supervised};
use crate::transport::{ConnectionCache, DialOptions};

/// A worker process's shared state
pub struct WorkerNode {
    identity: PeerNode,
    registry_addr: String,
    control_bind_addr: String,
    data_bind_addr: String,
    cluster: ClusterConfig,
    dial_options: DialOptions,
    peers: Arc<PeerTable>,
    store: Arc<KeyValueStore>,
    connections: Arc<ConnectionCache>,
}

impl WorkerNode {
    pub fn new(node: &NodeConfig, cluster: &ClusterConfig) -> Self {
        Self::with_connections(node, cluster, Arc::new(ConnectionCache::default()))
    }

    /// Build a worker that dials through an existing connection cache
    pub fn with_connections(
        node: &NodeConfig,
        cluster: &ClusterConfig,
        connections: Arc<ConnectionCache>,
    ) -> Self {
        Self {
            identity: PeerNode::new(
                node.hostname.clone(),
                node.ip_address.clone(),
                node.control_port.clone(),
                node.data_port.clone(),
            ),
            registry_addr: node.registry_addr.clone(),
            control_bind_addr: node.control_bind_addr(),
            data_bind_addr: node.data_bind_addr(),
            cluster: cluster.clone(),
            dial_options: cluster.dial_options(),
            peers: Arc::new(PeerTable::new()),
            store: Arc::new(KeyValueStore::new()),
            connections,
        }
    }

    /// This node as peers see it
    pub fn identity(&self) -> &PeerNode {
        &self.identity
    }

    pub fn peers(&self) -> &Arc<PeerTable> {
        &self.peers
    }

    pub fn store(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    pub fn connections(&self) -> &Arc<ConnectionCache> {
        &self.connections
    }

    /// The heartbeat loop for this node
    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat::new(
            self.connections.clone(),
            self.registry_addr.clone(),
            HeartbeatRequest {
                hostname: self.identity.hostname.clone(),
                ip_address: self.identity.ip_address.clone(),
                port_number: self.identity.control_port.clone(),
            },
            self.dial_options.clone(),
            self.cluster.heartbeat_interval(),
            self.cluster.heartbeat_timeout(),
        )
    }

    pub fn control_router(&self) -> axum::Router {
        control_plane::create_router(ControlPlaneState {
            peers: self.peers.clone(),
            node: self.identity.clone(),
        })
    }

    pub fn data_router(&self) -> axum::Router {
        data_plane::create_router(self.store.clone())
    }

    /// Spawn the heartbeat loop and the data-plane listener as supervised
    /// tasks. The control plane is started by [`WorkerNode::bootstrap`].
    pub fn start(&self, data: TcpListener, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        vec![
            spawn_supervised("heartbeat", self.heartbeat().run(shutdown.subscribe())),
            spawn_supervised(
                "data-plane",
                serve_until_shutdown("data-plane", data, self.data_router(), shutdown.subscribe()),
            ),
        ]
    }

    /// Bind both listeners, join the cluster, then serve until shutdown.
    ///
    /// Nothing is served if registration fails, and the data plane and
    /// heartbeat only start once bootstrap has succeeded.
    pub async fn run(self, shutdown: broadcast::Sender<()>) -> Result<()> {
        let control = TcpListener::bind(&self.control_bind_addr)
            .await
            .with_context(|| format!("Failed to bind control plane on {}", self.control_bind_addr))?;
        let data = TcpListener::bind(&self.data_bind_addr)
            .await
            .with_context(|| format!("Failed to bind data plane on {}", self.data_bind_addr))?;

        let control_plane = match self.bootstrap(control, &shutdown).await {
            Ok((_, control_plane)) => control_plane,
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "Bootstrap failed, shutting down");
                return Err(e);
            }
        };

        let mut handles = self.start(data, &shutdown);
        handles.push(control_plane);
        join_all(handles).await;

        tracing::info!(hostname = %self.identity.hostname, "Worker stopped");
        Ok(())
    }
}
