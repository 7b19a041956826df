//! Shared constants for DistroKV components.

/// Default registry listen address
pub const DEFAULT_REGISTRY_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default registry address dialed by workers
pub const DEFAULT_REGISTRY_ADDR: &str = "127.0.0.1:8080";

/// Default worker control-plane port
pub const DEFAULT_CONTROL_PORT: &str = "8002";

/// Default worker data-plane port
pub const DEFAULT_DATA_PORT: &str = "9002";

/// Heartbeat interval (seconds)
pub const HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// Per-tick heartbeat timeout (seconds)
pub const HEARTBEAT_TIMEOUT_SECS: u64 = 5;

/// Registration call timeout (seconds)
pub const REGISTER_TIMEOUT_SECS: u64 = 10;

/// Directory listing timeout (seconds)
pub const LIST_NODES_TIMEOUT_SECS: u64 = 5;

/// Peer announcement timeout (seconds)
pub const ANNOUNCE_TIMEOUT_SECS: u64 = 5;

/// Connection dial timeout (seconds)
pub const DIAL_TIMEOUT_SECS: u64 = 5;

/// Response status codes carried in message bodies
pub mod status {
    /// Registry success
    pub const REGISTRY_OK: &str = "200";

    /// Registry failure
    pub const REGISTRY_FAILED: &str = "500";

    /// Worker plane success
    pub const SUCCESS: &str = "Success";

    /// Worker plane failure
    pub const FAILED: &str = "Failed";
}

/// HTTP route paths
pub mod routes {
    /// Registry: register a node
    pub const REGISTER: &str = "/register";

    /// Registry: node heartbeat
    pub const HEARTBEAT: &str = "/heartbeat";

    /// Registry: directory listing
    pub const NODES: &str = "/nodes";

    /// Control plane: peer announcement and peer listing
    pub const PEERS: &str = "/peers";

    /// Control plane: replicate a set (not implemented)
    pub const REPLICATE_SET: &str = "/replicate/set";

    /// Control plane: replicate a delete (not implemented)
    pub const REPLICATE_DELETE: &str = "/replicate/delete";

    /// Data plane: key prefix
    pub const KEYS: &str = "/keys";

    /// Liveness check on every server
    pub const HEALTH: &str = "/health";
}
