//! Typed client for the registry service.

use distrokv_common::{
    HeartbeatRequest, KvError, NodeListResponse, NodeSummary, RegisterNodeRequest,
    StatusResponse, constants::routes,
};

use crate::transport::HttpChannel;

/// Registry client over a cached channel
#[derive(Clone, Debug)]
pub struct RegistryClient {
    channel: HttpChannel,
}

impl RegistryClient {
    pub fn new(channel: HttpChannel) -> Self {
        Self { channel }
    }

    /// `RegisterNode`; a duplicate registration comes back as `Rejected`
    pub async fn register_node(&self, req: &RegisterNodeRequest) -> Result<StatusResponse, KvError> {
        self.channel.call(routes::REGISTER, req).await
    }

    /// `NodeHeartbeat`
    pub async fn heartbeat(&self, req: &HeartbeatRequest) -> Result<StatusResponse, KvError> {
        self.channel.call(routes::HEARTBEAT, req).await
    }

    /// `GetNodeList`
    pub async fn list_nodes(&self) -> Result<Vec<NodeSummary>, KvError> {
        let resp: NodeListResponse = self.channel.get_json(routes::NODES).await?;
        Ok(resp.node_list)
    }
}
