//! Wire messages and membership records shared by registry and workers.

use serde::{Deserialize, Serialize};

use crate::constants::status;

/// `RegisterNode` request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNodeRequest {
    pub hostname: String,
    pub ip_address: String,
    /// Control-plane port of the registering node
    pub port_number: String,
}

/// `NodeHeartbeat` request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub hostname: String,
    pub ip_address: String,
    pub port_number: String,
}

/// `{status, message}` response carried by every mutating call.
///
/// The registry answers `"200"`/`"500"`; worker planes answer
/// `"Success"`/`"Failed"`. Callers must treat anything else as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn registry_ok(message: impl Into<String>) -> Self {
        Self {
            status: status::REGISTRY_OK.to_string(),
            message: message.into(),
        }
    }

    pub fn registry_failed(message: impl Into<String>) -> Self {
        Self {
            status: status::REGISTRY_FAILED.to_string(),
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: status::SUCCESS.to_string(),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: status::FAILED.to_string(),
            message: message.into(),
        }
    }

    /// True for either success code
    pub fn is_success(&self) -> bool {
        self.status == status::REGISTRY_OK || self.status == status::SUCCESS
    }
}

/// Public fields of a registered node (no timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSummary {
    pub node_hostname: String,
    pub node_ip: String,
    pub node_control_port: String,
}

/// `GetNodeList` response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeListResponse {
    pub node_list: Vec<NodeSummary>,
}

/// A member of a worker's local peer table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerNode {
    pub hostname: String,
    pub ip_address: String,
    pub control_port: String,
    /// Empty when learned from a directory snapshot
    #[serde(default)]
    pub data_port: String,
}

impl PeerNode {
    pub fn new(
        hostname: impl Into<String>,
        ip_address: impl Into<String>,
        control_port: impl Into<String>,
        data_port: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            ip_address: ip_address.into(),
            control_port: control_port.into(),
            data_port: data_port.into(),
        }
    }

    /// `ip:control_port`, the address announcements are sent to
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.ip_address, self.control_port)
    }

    /// Same hostname and IP, the self-exclusion test used on directory snapshots
    pub fn is_same_host(&self, hostname: &str, ip_address: &str) -> bool {
        self.hostname == hostname && self.ip_address == ip_address
    }
}

impl From<NodeSummary> for PeerNode {
    fn from(summary: NodeSummary) -> Self {
        Self {
            hostname: summary.node_hostname,
            ip_address: summary.node_ip,
            control_port: summary.node_control_port,
            data_port: String::new(),
        }
    }
}

/// `RegisterNewPeerServer` request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPeerRequest {
    pub hostname: String,
    pub ip_address: String,
    pub control_plane_port: String,
    pub data_plane_port: String,
}

impl From<&PeerNode> for NewPeerRequest {
    fn from(peer: &PeerNode) -> Self {
        Self {
            hostname: peer.hostname.clone(),
            ip_address: peer.ip_address.clone(),
            control_plane_port: peer.control_port.clone(),
            data_plane_port: peer.data_port.clone(),
        }
    }
}

impl From<NewPeerRequest> for PeerNode {
    fn from(req: NewPeerRequest) -> Self {
        Self {
            hostname: req.hostname,
            ip_address: req.ip_address,
            control_port: req.control_plane_port,
            data_port: req.data_plane_port,
        }
    }
}

/// `ReplicateSetRequest` body (declared, not implemented)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetReplicationRequest {
    pub key: String,
    pub value: String,
}

/// `ReplicateDeleteRequest` body (declared, not implemented)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReplicationRequest {
    pub key: String,
}

/// `SetKey` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetKeyRequest {
    pub value: String,
}

/// `GetKey` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_success_codes() {
        assert!(StatusResponse::registry_ok("ok").is_success());
        assert!(StatusResponse::success("ok").is_success());
        assert!(!StatusResponse::registry_failed("no").is_success());
        assert!(!StatusResponse::failed("no").is_success());

        let odd = StatusResponse {
            status: "201".to_string(),
            message: String::new(),
        };
        assert!(!odd.is_success());
    }

    #[test]
    fn test_summary_to_peer_has_empty_data_port() {
        let peer = PeerNode::from(NodeSummary {
            node_hostname: "host1".to_string(),
            node_ip: "10.0.0.1".to_string(),
            node_control_port: "7001".to_string(),
        });
        assert_eq!(peer.control_addr(), "10.0.0.1:7001");
        assert!(peer.data_port.is_empty());
        assert!(peer.is_same_host("host1", "10.0.0.1"));
    }

    #[test]
    fn test_peer_deserializes_without_data_port() {
        let json = r#"{"hostname":"h","ip_address":"1.2.3.4","control_port":"1"}"#;
        let peer: PeerNode = serde_json::from_str(json).unwrap();
        assert!(peer.data_port.is_empty());
    }
}
