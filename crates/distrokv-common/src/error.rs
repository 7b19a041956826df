//! Common error types for DistroKV components.

use thiserror::Error;

/// Common errors across DistroKV components
#[derive(Debug, Error)]
pub enum KvError {
    /// A node with the same identity is already in the registry directory
    #[error("Node already registered: {hostname} ({ip_address})")]
    AlreadyRegistered { hostname: String, ip_address: String },

    /// Heartbeat or lookup for a node the registry has never seen
    #[error("Node not found: {hostname} ({ip_address})")]
    NodeNotFound { hostname: String, ip_address: String },

    /// A peer with the same identity is already in the local peer table
    #[error("Peer already exists: {hostname} ({ip_address}:{control_port})")]
    PeerAlreadyExists {
        hostname: String,
        ip_address: String,
        control_port: String,
    },

    /// Key-value lookup or delete for an absent key
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Could not establish a connection to the target
    #[error("Failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    /// Request failed on the wire
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote side answered with a non-success status code
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: String, message: String },

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Feature declared on the wire but not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KvError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AlreadyRegistered { .. } => 409,
            Self::NodeNotFound { .. } => 404,
            Self::PeerAlreadyExists { .. } => 409,
            Self::KeyNotFound(_) => 404,
            Self::Connect { .. } => 503,
            Self::Transport(_) => 502,
            Self::Rejected { .. } => 502,
            Self::Timeout(_) => 504,
            Self::NotImplemented(_) => 501,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Transport(_) | Self::Timeout(_)
        )
    }

    /// Returns true for domain rejections (as opposed to transport failures)
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered { .. }
                | Self::NodeNotFound { .. }
                | Self::PeerAlreadyExists { .. }
                | Self::KeyNotFound(_)
                | Self::Rejected { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_are_not_retryable() {
        let err = KvError::AlreadyRegistered {
            hostname: "host1".to_string(),
            ip_address: "10.0.0.1".to_string(),
        };
        assert_eq!(err.status_code(), 409);
        assert!(err.is_rejection());
        assert!(!err.is_retryable());

        let err = KvError::Timeout("heartbeat".to_string());
        assert_eq!(err.status_code(), 504);
        assert!(err.is_retryable());
        assert!(!err.is_rejection());
    }
}
