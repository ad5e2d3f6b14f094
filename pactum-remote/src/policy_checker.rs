//! Policy checking for remote requests.
//!
//! Remote callers do not declare their connections up front. Each distinct
//! client gets a synthesized processor node that accumulates the remote
//! connection names it has used, and every request is forwarded to the
//! broker as an ordinary connection request from that node.

use crate::client::ClientDetails;
use crate::error::{RemoteError, RemoteErrorKind, RemoteResult};
use crate::server::RemoteServerHandle;
use crate::wire::RemoteRequestMetadata;
use pactum_broker::ConnectionBroker;
use pactum_types::{
    ConnectionName, ConnectionRequest, NodeId, Policy, ProcessorNode, SandboxProcessorNode,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub trait RemotePolicyChecker: Send + Sync {
    /// Checks a request against the broker and returns the policy it runs
    /// under, or `None` when it names none.
    fn check_and_get_policy(
        &self,
        metadata: &RemoteRequestMetadata,
        server: &RemoteServerHandle,
        client: &ClientDetails,
    ) -> RemoteResult<Option<Arc<Policy>>>;
}

/// Processor node standing in for one remote client.
#[derive(Debug)]
pub(crate) struct RemoteProcessorNode {
    id: NodeId,
    connections: Mutex<BTreeSet<ConnectionName>>,
}

impl RemoteProcessorNode {
    fn new() -> Self {
        Self {
            id: NodeId::new(),
            connections: Mutex::new(BTreeSet::new()),
        }
    }

    fn declare(&self, name: ConnectionName) {
        self.connections.lock().insert(name);
    }
}

impl ProcessorNode for RemoteProcessorNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn required_connections(&self) -> BTreeSet<ConnectionName> {
        self.connections.lock().clone()
    }

    fn declares(&self, name: &ConnectionName) -> bool {
        self.connections.lock().contains(name)
    }
}

pub struct DefaultRemotePolicyChecker {
    broker: Arc<ConnectionBroker>,
    nodes: Mutex<HashMap<ClientDetails, Arc<RemoteProcessorNode>>>,
}

impl DefaultRemotePolicyChecker {
    pub fn new(broker: Arc<ConnectionBroker>) -> Self {
        Self {
            broker,
            nodes: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct clients seen so far.
    pub fn client_count(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Node id synthesized for a client, if it has made a request.
    pub fn node_id_for(&self, client: &ClientDetails) -> Option<NodeId> {
        self.nodes.lock().get(client).map(|node| node.id)
    }

    fn node_for(
        &self,
        client: &ClientDetails,
        connection: ConnectionName,
    ) -> Arc<RemoteProcessorNode> {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .entry(client.clone())
            .or_insert_with(|| Arc::new(RemoteProcessorNode::new()));
        node.declare(connection);
        Arc::clone(node)
    }
}

impl RemotePolicyChecker for DefaultRemotePolicyChecker {
    fn check_and_get_policy(
        &self,
        metadata: &RemoteRequestMetadata,
        server: &RemoteServerHandle,
        client: &ClientDetails,
    ) -> RemoteResult<Option<Arc<Policy>>> {
        let policy = self
            .broker
            .snapshot()
            .policy_set()
            .find_by_name(&metadata.usage_type);
        if !metadata.usage_type.trim().is_empty() && policy.is_none() {
            return Err(RemoteError::new(
                RemoteErrorKind::PolicyNotFound,
                format!("No policy found with id/usage type [{}]", metadata.usage_type),
            ));
        }

        let connection_name = server.connection_name(metadata.is_read_request());
        let node = self.node_for(client, connection_name.clone());
        let requester: Arc<dyn ProcessorNode> = if client.is_isolated() {
            Arc::new(SandboxProcessorNode::new(node))
        } else {
            node
        };

        let request = ConnectionRequest::new(connection_name, requester, policy.clone());
        self.broker.get_connection(&request)?;

        Ok(policy)
    }
}
