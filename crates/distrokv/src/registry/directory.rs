//! Node directory: the registry's record of every registered node.

use chrono::{DateTime, Utc};
use distrokv_common::{KvError, NodeSummary, identity};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// A node as the registry sees it
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredNode {
    pub hostname: String,
    pub ip_address: String,
    pub control_port: String,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
}

impl RegisteredNode {
    /// Public fields only
    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            node_hostname: self.hostname.clone(),
            node_ip: self.ip_address.clone(),
            node_control_port: self.control_port.clone(),
        }
    }

    /// Has this node gone longer than `max_age` without a heartbeat?
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => now - self.last_heartbeat_at > max_age,
            Err(_) => false,
        }
    }
}

/// Directory of registered nodes keyed by `sha256(hostname + ip)`.
///
/// A single mutex guards every read and write, listings included, so each
/// operation sees a consistent view.
#[derive(Debug, Default)]
pub struct NodeDirectory {
    nodes: Mutex<HashMap<String, RegisteredNode>>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. A second registration with the same hostname and IP
    /// is rejected and leaves the existing entry untouched.
    pub async fn register_node(
        &self,
        hostname: &str,
        ip_address: &str,
        control_port: &str,
    ) -> Result<(), KvError> {
        let key = identity::node_key(hostname, ip_address);
        let mut nodes = self.nodes.lock().await;

        if nodes.contains_key(&key) {
            tracing::warn!(
                hostname = %hostname,
                ip = %ip_address,
                "Node already registered, rejecting"
            );
            return Err(KvError::AlreadyRegistered {
                hostname: hostname.to_string(),
                ip_address: ip_address.to_string(),
            });
        }

        let now = Utc::now();
        nodes.insert(
            key,
            RegisteredNode {
                hostname: hostname.to_string(),
                ip_address: ip_address.to_string(),
                control_port: control_port.to_string(),
                registered_at: now,
                last_heartbeat_at: now,
            },
        );

        tracing::info!(
            hostname = %hostname,
            ip = %ip_address,
            port = %control_port,
            total = nodes.len(),
            "Node registered"
        );
        Ok(())
    }

    /// Refresh a registered node's heartbeat timestamp
    pub async fn record_heartbeat(
        &self,
        hostname: &str,
        ip_address: &str,
        control_port: &str,
    ) -> Result<(), KvError> {
        let key = identity::node_key(hostname, ip_address);
        let mut nodes = self.nodes.lock().await;

        match nodes.get_mut(&key) {
            Some(node) => {
                node.last_heartbeat_at = Utc::now();
                tracing::debug!(hostname = %hostname, ip = %ip_address, "Heartbeat recorded");
                Ok(())
            }
            None => {
                tracing::warn!(
                    hostname = %hostname,
                    ip = %ip_address,
                    port = %control_port,
                    "Heartbeat from unregistered node"
                );
                Err(KvError::NodeNotFound {
                    hostname: hostname.to_string(),
                    ip_address: ip_address.to_string(),
                })
            }
        }
    }

    /// Snapshot of every registered node's public fields
    pub async fn list_nodes(&self) -> Vec<NodeSummary> {
        let nodes = self.nodes.lock().await;
        nodes.values().map(RegisteredNode::summary).collect()
    }

    /// Full record for one node
    pub async fn get(&self, hostname: &str, ip_address: &str) -> Option<RegisteredNode> {
        let key = identity::node_key(hostname, ip_address);
        self.nodes.lock().await.get(&key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.nodes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.lock().await.is_empty()
    }

    /// Remove every node whose last heartbeat is older than `max_age`
    pub async fn evict_stale(&self, max_age: Duration) -> Vec<RegisteredNode> {
        let now = Utc::now();
        let mut nodes = self.nodes.lock().await;

        let stale: Vec<String> = nodes
            .iter()
            .filter(|(_, node)| node.is_stale(now, max_age))
            .map(|(key, _)| key.clone())
            .collect();

        stale.iter().filter_map(|key| nodes.remove(key)).collect()
    }
}
