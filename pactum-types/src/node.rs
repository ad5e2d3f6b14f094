//! Processor nodes: the requesters in the dependency graph.

use crate::connection::ConnectionName;
use crate::ids::NodeId;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A requester identity that declares the capabilities it will use.
pub trait ProcessorNode: Send + Sync + fmt::Debug {
    /// Stable identity of the node in the graph.
    fn id(&self) -> NodeId;

    /// Capabilities the node declares. May grow over time for nodes that
    /// accumulate declarations.
    fn required_connections(&self) -> BTreeSet<ConnectionName>;

    fn declares(&self, name: &ConnectionName) -> bool {
        self.required_connections().contains(name)
    }

    /// Whether the node runs inside an isolated sandbox.
    fn is_sandboxed(&self) -> bool {
        false
    }
}

/// A node whose declarations are fixed when it is created.
#[derive(Debug, Clone)]
pub struct StaticProcessorNode {
    id: NodeId,
    name: String,
    connections: BTreeSet<ConnectionName>,
}

impl StaticProcessorNode {
    pub fn new(
        name: impl Into<String>,
        connections: impl IntoIterator<Item = ConnectionName>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            connections: connections.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ProcessorNode for StaticProcessorNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn required_connections(&self) -> BTreeSet<ConnectionName> {
        self.connections.clone()
    }

    fn declares(&self, name: &ConnectionName) -> bool {
        self.connections.contains(name)
    }
}

/// Wraps a node that runs in an isolated process.
#[derive(Debug, Clone)]
pub struct SandboxProcessorNode {
    inner: Arc<dyn ProcessorNode>,
}

impl SandboxProcessorNode {
    pub fn new(inner: Arc<dyn ProcessorNode>) -> Self {
        Self { inner }
    }
}

impl ProcessorNode for SandboxProcessorNode {
    fn id(&self) -> NodeId {
        self.inner.id()
    }

    fn required_connections(&self) -> BTreeSet<ConnectionName> {
        self.inner.required_connections()
    }

    fn declares(&self, name: &ConnectionName) -> bool {
        self.inner.declares(name)
    }

    fn is_sandboxed(&self) -> bool {
        true
    }
}
