//! Outbound connection management.
//!
//! Every outbound RPC in a process (registration, heartbeats, peer
//! announcements) goes through one shared [`ConnectionCache`], so a target is
//! dialed at most once for the lifetime of the process.

mod cache;
mod channel;

pub use cache::{ConnectionCache, Dialer};
pub use channel::{DialOptions, HttpChannel, HttpDialer};

use distrokv_common::KvError;
use std::future::Future;
use std::time::Duration;

/// Run an outbound call under `limit`, reporting an overrun as [`KvError::Timeout`]
pub async fn with_deadline<T, F>(limit: Duration, what: &str, call: F) -> Result<T, KvError>
where
    F: Future<Output = Result<T, KvError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(KvError::Timeout(format!("{} after {:?}", what, limit))),
    }
}
