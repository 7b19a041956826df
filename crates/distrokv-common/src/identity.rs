//! Deterministic node identity keys.
//!
//! Identity keys are the lowercase hex SHA-256 digest of a node's address
//! fields concatenated without separators. Two announcements with the same
//! fields always map to the same key, which is what makes registration
//! idempotent.

use sha2::{Digest, Sha256};

/// Digest an arbitrary sequence of identity fields
pub fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Registry directory key: `sha256(hostname + ip_address)`
pub fn node_key(hostname: &str, ip_address: &str) -> String {
    digest(&[hostname, ip_address])
}

/// Peer table key: `sha256(hostname + ip_address + control_port)`
pub fn peer_key(hostname: &str, ip_address: &str, control_port: &str) -> String {
    digest(&[hostname, ip_address, control_port])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_key_is_deterministic() {
        let a = node_key("host1", "10.0.0.1");
        let b = node_key("host1", "10.0.0.1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_node_key_matches_plain_sha256() {
        // sha256("host110.0.0.1")
        assert_eq!(node_key("host1", "10.0.0.1"), digest(&["host110.0.0.1"]));
    }

    #[test]
    fn test_peer_key_includes_control_port() {
        assert_ne!(
            peer_key("host1", "10.0.0.1", "7001"),
            peer_key("host1", "10.0.0.1", "7002")
        );
        assert_ne!(node_key("host1", "10.0.0.1"), node_key("host2", "10.0.0.1"));
    }
}
