//! Periodic liveness reports from a worker to the registry.

use distrokv_common::{HeartbeatRequest, KvError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::registry::RegistryClient;
use crate::transport::{ConnectionCache, DialOptions, with_deadline};

/// Heartbeat loop configuration plus the cache it dials through
#[derive(Clone)]
pub struct Heartbeat {
    connections: Arc<ConnectionCache>,
    registry_addr: String,
    request: HeartbeatRequest,
    dial_options: DialOptions,
    interval: Duration,
    timeout: Duration,
}

impl Heartbeat {
    pub fn new(
        connections: Arc<ConnectionCache>,
        registry_addr: impl Into<String>,
        request: HeartbeatRequest,
        dial_options: DialOptions,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            connections,
            registry_addr: registry_addr.into(),
            request,
            dial_options,
            interval,
            timeout,
        }
    }

    /// Send a single heartbeat, bounded by the per-tick timeout
    pub async fn tick(&self) -> Result<(), KvError> {
        let send = async {
            let client = self
                .connections
                .get_client(&self.registry_addr, &self.dial_options, RegistryClient::new)
                .await?;
            client.heartbeat(&self.request).await
        };

        with_deadline(self.timeout, "heartbeat", send).await?;
        Ok(())
    }

    /// Heartbeat every `interval` until shutdown. Failed ticks are logged and
    /// the loop carries on.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            registry = %self.registry_addr,
            interval = ?self.interval,
            "Heartbeat loop started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    match self.tick().await {
                        Ok(()) => tracing::debug!(registry = %self.registry_addr, "Heartbeat sent"),
                        Err(e) if e.is_rejection() => tracing::warn!(
                            registry = %self.registry_addr,
                            error = %e,
                            "Heartbeat rejected by registry"
                        ),
                        Err(e) => tracing::warn!(
                            registry = %self.registry_addr,
                            error = %e,
                            "Heartbeat failed"
                        ),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Heartbeat loop shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HeartbeatRequest {
        HeartbeatRequest {
            hostname: "host1".to_string(),
            ip_address: "127.0.0.1".to_string(),
            port_number: "7001".to_string(),
        }
    }

    async fn closed_port() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        addr
    }

    fn heartbeat(addr: String) -> Heartbeat {
        Heartbeat::new(
            Arc::new(ConnectionCache::default()),
            addr,
            request(),
            DialOptions {
                connect_timeout: Duration::from_millis(200),
                request_timeout: Duration::from_millis(500),
            },
            Duration::from_millis(20),
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn test_tick_against_unreachable_registry_fails() {
        let hb = heartbeat(closed_port().await);
        tokio_test::assert_err!(hb.tick().await);
    }

    #[tokio::test]
    async fn test_loop_survives_failures_and_stops_on_shutdown() {
        let hb = heartbeat(closed_port().await);
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(hb.run(rx));

        // Several failing ticks go by without ending the loop
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!handle.is_finished());

        tx.send(()).unwrap();
        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_rejected_ticks_keep_the_loop_alive() {
        use crate::registry::{NodeDirectory, RegistryState, create_router};
        use crate::tasks::serve_until_shutdown;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let directory = Arc::new(NodeDirectory::new());
        let (tx, _) = broadcast::channel(1);
        let server = tokio::spawn(serve_until_shutdown(
            "registry",
            listener,
            create_router(RegistryState {
                directory: directory.clone(),
            }),
            tx.subscribe(),
        ));

        // host1 never registered, so the registry answers NotFound
        let hb = heartbeat(addr);
        match hb.tick().await {
            Err(KvError::Rejected { status, .. }) => assert_eq!(status, "500"),
            other => panic!("expected a rejected heartbeat, got {:?}", other),
        }

        let handle = tokio::spawn(hb.run(tx.subscribe()));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!handle.is_finished());
        assert!(directory.is_empty().await);

        tx.send(()).unwrap();
        let joined = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
        tokio_test::assert_ok!(tokio::time::timeout(Duration::from_secs(5), server).await);
    }
}
