//! Get-or-create cache of outbound connections, keyed by target address.

use async_trait::async_trait;
use distrokv_common::KvError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

use super::{DialOptions, HttpDialer};

/// Creates transport-level connections for the cache
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// A live, cheaply cloneable connection handle
    type Connection: Clone + Send + Sync + 'static;

    /// Establish a new connection to `target` (`host:port`)
    async fn dial(&self, target: &str, options: &DialOptions)
    -> Result<Self::Connection, KvError>;
}

type Slot<C> = Arc<OnceCell<C>>;

/// Connection cache shared by every outbound caller in a process.
///
/// Lookups take the read lock; only a first-time target takes the write lock,
/// and only long enough to install an empty slot. The dial itself runs inside
/// the slot's `OnceCell`, so concurrent callers for the same target wait on a
/// single attempt while other targets stay unblocked. A failed dial leaves the
/// slot empty and the next caller dials again.
///
/// There is no TTL, health check or eviction. Callers that want to release a
/// connection use [`ConnectionCache::remove`].
pub struct ConnectionCache<D: Dialer = HttpDialer> {
    dialer: D,
    slots: RwLock<HashMap<String, Slot<D::Connection>>>,
}

impl Default for ConnectionCache<HttpDialer> {
    fn default() -> Self {
        Self::new(HttpDialer)
    }
}

impl<D: Dialer> ConnectionCache<D> {
    /// Create an empty cache backed by `dialer`
    pub fn new(dialer: D) -> Self {
        Self {
            dialer,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached connection for `target`, dialing it on first use
    pub async fn get_or_create(
        &self,
        target: &str,
        options: &DialOptions,
    ) -> Result<D::Connection, KvError> {
        let slot = self.slot(target).await;

        if let Some(conn) = slot.get() {
            tracing::trace!(target = %target, "Reusing cached connection");
            return Ok(conn.clone());
        }

        let conn = slot
            .get_or_try_init(|| async {
                tracing::debug!(target = %target, "No cached connection, dialing");
                match self.dialer.dial(target, options).await {
                    Ok(conn) => {
                        tracing::info!(target = %target, "Connection established");
                        Ok(conn)
                    }
                    Err(e) => {
                        tracing::warn!(target = %target, error = %e, "Dial failed");
                        Err(e)
                    }
                }
            })
            .await?;

        Ok(conn.clone())
    }

    /// Look up (or dial) `target` and wrap the connection in a typed client
    pub async fn get_client<T, F>(
        &self,
        target: &str,
        options: &DialOptions,
        new_client: F,
    ) -> Result<T, KvError>
    where
        F: FnOnce(D::Connection) -> T,
    {
        let conn = self.get_or_create(target, options).await?;
        Ok(new_client(conn))
    }

    /// Fetch the slot for `target`, installing an empty one if needed
    async fn slot(&self, target: &str) -> Slot<D::Connection> {
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(target) {
                return slot.clone();
            }
        }

        let mut slots = self.slots.write().await;
        slots
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Is there a live connection cached for `target`?
    pub async fn contains(&self, target: &str) -> bool {
        self.slots
            .read()
            .await
            .get(target)
            .is_some_and(|slot| slot.initialized())
    }

    /// Drop the cached connection for `target`, returning it if one existed.
    ///
    /// A slot whose dial is still in flight is left alone, so the pending
    /// dial's waiters and later callers keep sharing one connection.
    pub async fn remove(&self, target: &str) -> Option<D::Connection> {
        let mut slots = self.slots.write().await;
        let conn = slots.get(target)?.get().cloned()?;
        slots.remove(target);
        Some(conn)
    }

    /// Number of live cached connections
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
