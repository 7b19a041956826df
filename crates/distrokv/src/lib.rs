//! # DistroKV
//!
//! Cluster membership for a distributed key-value store: a registry that
//! tracks nodes by heartbeat, and workers that bootstrap through it, gossip
//! their presence to each other, and serve a control and a data plane.
//!
//! ## Architecture
//! ```text
//!            register / heartbeat / list
//! Worker ───────────────────────────────► Registry
//!   │
//!   └── announce ──► Peer control plane (POST /peers)
//! ```

pub mod config;
pub mod registry;
pub mod storage;
pub mod tasks;
pub mod transport;
pub mod worker;
