//! Node registry: the rendezvous service workers register with, heartbeat
//! against, and fetch the cluster directory from.

mod client;
mod directory;
mod routes;

pub use client::RegistryClient;
pub use directory::{NodeDirectory, RegisteredNode};
pub use routes::{RegistryState, create_router};

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::RegistryConfig;
use crate::tasks::{serve_until_shutdown, spawn_supervised};

/// Registry process: owns the directory and serves it
#[derive(Clone)]
pub struct RegistryServer {
    config: RegistryConfig,
    directory: Arc<NodeDirectory>,
}

impl RegistryServer {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            directory: Arc::new(NodeDirectory::new()),
        }
    }

    pub fn directory(&self) -> &Arc<NodeDirectory> {
        &self.directory
    }

    pub fn router(&self) -> axum::Router {
        create_router(RegistryState {
            directory: self.directory.clone(),
        })
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(self, shutdown: broadcast::Sender<()>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind registry on {}", self.config.listen_addr))?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serve on an already-bound listener until shutdown
    pub async fn serve(self, listener: TcpListener, shutdown: broadcast::Sender<()>) {
        let sweeper = self.config.stale_after().map(|stale_after| {
            spawn_supervised(
                "stale-sweep",
                run_stale_sweep(
                    self.directory.clone(),
                    stale_after,
                    self.config.sweep_interval(),
                    shutdown.subscribe(),
                ),
            )
        });

        serve_until_shutdown("registry", listener, self.router(), shutdown.subscribe()).await;

        if let Some(handle) = sweeper {
            let _ = handle.await;
        }
    }
}

/// Periodically evict nodes that stopped heartbeating
pub async fn run_stale_sweep(
    directory: Arc<NodeDirectory>,
    stale_after: Duration,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(stale_after = ?stale_after, interval = ?interval, "Stale-node sweep started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                for node in directory.evict_stale(stale_after).await {
                    tracing::warn!(
                        hostname = %node.hostname,
                        ip = %node.ip_address,
                        last_heartbeat = %node.last_heartbeat_at,
                        "Evicted stale node"
                    );
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Stale-node sweep shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_evicts_and_stops() {
        let directory = Arc::new(NodeDirectory::new());
        directory.register_node("host1", "10.0.0.1", "7001").await.unwrap();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_stale_sweep(
            directory.clone(),
            Duration::from_millis(10),
            Duration::from_millis(20),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(directory.is_empty().await);

        tx.send(()).unwrap();
        tokio_test::assert_ok!(tokio::time::timeout(Duration::from_secs(5), handle).await);
    }
}
