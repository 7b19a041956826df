//! Local peer table: this worker's view of the rest of the cluster.

use distrokv_common::{KvError, NodeSummary, PeerNode, identity};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Peers this node knows about.
///
/// Entries learned from a registry snapshot are keyed by hostname and
/// overwrite each other; entries announced directly by a peer are keyed by
/// `sha256(hostname + ip + control_port)` and are insert-only.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: Mutex<HashMap<String, PeerNode>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer that announced itself; rejects a repeated announcement
    pub async fn register_peer(&self, peer: PeerNode) -> Result<(), KvError> {
        let key = identity::peer_key(&peer.hostname, &peer.ip_address, &peer.control_port);
        let mut peers = self.peers.lock().await;

        if peers.contains_key(&key) {
            tracing::warn!(
                hostname = %peer.hostname,
                ip = %peer.ip_address,
                port = %peer.control_port,
                "Peer already exists, rejecting"
            );
            return Err(KvError::PeerAlreadyExists {
                hostname: peer.hostname,
                ip_address: peer.ip_address,
                control_port: peer.control_port,
            });
        }

        tracing::info!(
            hostname = %peer.hostname,
            ip = %peer.ip_address,
            control_port = %peer.control_port,
            data_port = %peer.data_port,
            "Peer registered"
        );
        peers.insert(key, peer);
        Ok(())
    }

    /// Merge a registry directory snapshot, skipping this node's own entry.
    ///
    /// Returns the number of peers taken from the snapshot.
    pub async fn merge_snapshot(
        &self,
        nodes: Vec<NodeSummary>,
        self_hostname: &str,
        self_ip: &str,
    ) -> usize {
        let mut peers = self.peers.lock().await;
        let mut merged = 0;

        for node in nodes {
            let peer = PeerNode::from(node);
            if peer.is_same_host(self_hostname, self_ip) {
                continue;
            }
            tracing::debug!(
                hostname = %peer.hostname,
                ip = %peer.ip_address,
                port = %peer.control_port,
                "Added peer from directory"
            );
            peers.insert(peer.hostname.clone(), peer);
            merged += 1;
        }

        merged
    }

    /// Copy of every peer
    pub async fn snapshot(&self) -> Vec<PeerNode> {
        self.peers.lock().await.values().cloned().collect()
    }

    /// First peer with the given hostname
    pub async fn find_by_hostname(&self, hostname: &str) -> Option<PeerNode> {
        self.peers
            .lock()
            .await
            .values()
            .find(|p| p.hostname == hostname)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }
}
