//! Joining the cluster: register, discover, announce.

use anyhow::{Context, Result, bail};
use distrokv_common::{KvError, NewPeerRequest, PeerNode, RegisterNodeRequest};
use futures::future::join_all;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::WorkerNode;
use super::control_plane::PeerClient;
use crate::registry::RegistryClient;
use crate::tasks::{serve_until_shutdown, spawn_supervised_abortable};
use crate::transport::with_deadline;

/// Outcome of announcing this node to every known peer
#[derive(Debug, Default)]
pub struct AnnounceReport {
    pub succeeded: Vec<PeerNode>,
    pub failed: Vec<(PeerNode, KvError)>,
}

impl AnnounceReport {
    /// Every peer accepted the announcement
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What a successful bootstrap learned and did
#[derive(Debug)]
pub struct BootstrapReport {
    /// Peers taken from the registry's directory
    pub peers_discovered: usize,
    pub announce: AnnounceReport,
}

impl WorkerNode {
    /// Register with the registry, start serving the control plane, merge the
    /// registry's directory into the peer table, then announce this node to
    /// every peer.
    ///
    /// The control plane goes up before discovery so that workers joining at
    /// the same time can accept each other's announcements. A failed
    /// registration returns before anything is served; a later failure stops
    /// the control plane again. Announcement failures are reported, and only
    /// abort when `cluster.require_full_mesh` is set.
    ///
    /// On success, returns the report and the control plane's task handle.
    pub async fn bootstrap(
        &self,
        control: TcpListener,
        shutdown: &broadcast::Sender<()>,
    ) -> Result<(BootstrapReport, JoinHandle<()>)> {
        self.register_with_registry()
            .await
            .with_context(|| format!("Failed to register with registry {}", self.registry_addr))?;

        let (control_plane, abort) = spawn_supervised_abortable(
            "control-plane",
            serve_until_shutdown(
                "control-plane",
                control,
                self.control_router(),
                shutdown.subscribe(),
            ),
        );

        match self.join_cluster().await {
            Ok(report) => Ok((report, control_plane)),
            Err(e) => {
                abort.abort();
                Err(e)
            }
        }
    }

    async fn join_cluster(&self) -> Result<BootstrapReport> {
        let peers_discovered = self
            .discover_peers()
            .await
            .with_context(|| format!("Failed to fetch node list from {}", self.registry_addr))?;

        let announce = self.announce_to_peers().await;
        if self.cluster.require_full_mesh && !announce.is_complete() {
            let (peer, err) = &announce.failed[0];
            bail!(
                "Announcement to {} ({}) failed: {} ({} of {} peers unreachable)",
                peer.hostname,
                peer.control_addr(),
                err,
                announce.failed.len(),
                announce.failed.len() + announce.succeeded.len()
            );
        }

        tracing::info!(
            hostname = %self.identity.hostname,
            discovered = peers_discovered,
            announced = announce.succeeded.len(),
            failed = announce.failed.len(),
            "Bootstrap complete"
        );

        Ok(BootstrapReport {
            peers_discovered,
            announce,
        })
    }

    async fn register_with_registry(&self) -> Result<(), KvError> {
        let req = RegisterNodeRequest {
            hostname: self.identity.hostname.clone(),
            ip_address: self.identity.ip_address.clone(),
            port_number: self.identity.control_port.clone(),
        };

        let register = async {
            let client = self.registry_client().await?;
            client.register_node(&req).await
        };
        with_deadline(self.cluster.register_timeout(), "registration", register).await?;

        tracing::info!(
            hostname = %req.hostname,
            registry = %self.registry_addr,
            "Registered with registry"
        );
        Ok(())
    }

    async fn discover_peers(&self) -> Result<usize, KvError> {
        let list = async {
            let client = self.registry_client().await?;
            client.list_nodes().await
        };
        let nodes = with_deadline(self.cluster.list_timeout(), "node list", list).await?;

        let merged = self
            .peers
            .merge_snapshot(nodes, &self.identity.hostname, &self.identity.ip_address)
            .await;
        tracing::info!(peers = merged, "Merged registry directory");
        Ok(merged)
    }

    /// Announce this node to every peer currently in the table, concurrently.
    ///
    /// The table is snapshotted first so no lock is held across the calls.
    pub async fn announce_to_peers(&self) -> AnnounceReport {
        let announcement = NewPeerRequest::from(&self.identity);
        let targets = self.peers.snapshot().await;

        let calls = targets.into_iter().map(|peer| {
            let announcement = &announcement;
            async move {
                let call = async {
                    let client = self
                        .connections
                        .get_client(&peer.control_addr(), &self.dial_options, PeerClient::new)
                        .await?;
                    client.register_peer(announcement).await
                };
                let outcome =
                    with_deadline(self.cluster.announce_timeout(), "peer announcement", call).await;
                (peer, outcome)
            }
        });

        let mut report = AnnounceReport::default();
        for (peer, outcome) in join_all(calls).await {
            match outcome {
                Ok(_) => {
                    tracing::debug!(peer = %peer.hostname, addr = %peer.control_addr(), "Announced to peer");
                    report.succeeded.push(peer);
                }
                // A rejection means the peer is up but already knows us
                Err(e) if e.is_rejection() => {
                    tracing::info!(
                        peer = %peer.hostname,
                        addr = %peer.control_addr(),
                        error = %e,
                        "Announcement rejected by peer"
                    );
                    report.failed.push((peer, e));
                }
                Err(e) => {
                    tracing::warn!(
                        peer = %peer.hostname,
                        addr = %peer.control_addr(),
                        error = %e,
                        "Announcement failed"
                    );
                    report.failed.push((peer, e));
                }
            }
        }
        report
    }

    async fn registry_client(&self) -> Result<RegistryClient, KvError> {
        self.connections
            .get_client(&self.registry_addr, &self.dial_options, RegistryClient::new)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_complete() {
        let report = AnnounceReport::default();
        assert!(report.is_complete());
    }

    #[test]
    fn test_report_with_failure_is_incomplete() {
        let report = AnnounceReport {
            succeeded: vec![],
            failed: vec![(
                PeerNode::new("ghost", "10.0.0.9", "7009", "9009"),
                KvError::Timeout("peer announcement".to_string()),
            )],
        };
        assert!(!report.is_complete());
    }
}
