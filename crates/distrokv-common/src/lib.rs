//! # DistroKV Common
//!
//! Shared types, identity keys, and errors used by the registry and worker nodes.
//!
//! ## Modules
//! - `types` - Wire messages and membership records
//! - `identity` - Deterministic node identity keys
//! - `error` - Common error taxonomy
//! - `constants` - Shared defaults, status codes, and route paths

pub mod constants;
pub mod error;
pub mod identity;
pub mod types;

pub use error::KvError;
pub use types::*;
