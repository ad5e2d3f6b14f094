//! The shared context: registries plus the requester graph.

use crate::provider::ConnectionProvider;
use pactum_types::{
    ConnectionContext, ConnectionName, DataTypeDescriptor, DataTypeDescriptorSet,
    ManagedDataType, NodeId, PactumError, PactumResult, PolicySet, ProcessorNode,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Immutable registries, shared by every snapshot derived from one context.
struct Registries {
    providers: Vec<Arc<dyn ConnectionProvider>>,
    by_connection: HashMap<ConnectionName, Arc<dyn ConnectionProvider>>,
    policy_set: PolicySet,
    descriptors: DataTypeDescriptorSet,
}

/// One immutable version of everything the broker decides against.
///
/// Updates produce a new value (`with_node`, `with_connection_context`);
/// the registries are shared between versions, only the graph and the
/// connection context are copied.
#[derive(Clone)]
pub struct SharedContext {
    registries: Arc<Registries>,
    nodes: BTreeMap<NodeId, Arc<dyn ProcessorNode>>,
    connection_context: ConnectionContext,
}

impl SharedContext {
    /// Builds the context and indexes providers by connection name.
    ///
    /// Fails with `ConnectionTypeAmbiguity` if two providers claim the same
    /// connection name.
    pub fn new(
        providers: Vec<Arc<dyn ConnectionProvider>>,
        policy_set: PolicySet,
        descriptors: DataTypeDescriptorSet,
    ) -> PactumResult<Self> {
        let mut claims: BTreeMap<&ConnectionName, Vec<&Arc<dyn ConnectionProvider>>> =
            BTreeMap::new();
        for provider in &providers {
            for name in &provider.data_type().connection_names {
                claims.entry(name).or_default().push(provider);
            }
        }

        let mut by_connection = HashMap::with_capacity(claims.len());
        for (name, claimants) in claims {
            if let [provider] = claimants.as_slice() {
                by_connection.insert(name.clone(), Arc::clone(provider));
            } else {
                return Err(PactumError::ConnectionTypeAmbiguity {
                    connection: name.to_string(),
                    providers: claimants.iter().map(|p| p.name()).collect(),
                });
            }
        }

        Ok(Self {
            registries: Arc::new(Registries {
                providers,
                by_connection,
                policy_set,
                descriptors,
            }),
            nodes: BTreeMap::new(),
            connection_context: ConnectionContext::new(),
        })
    }

    pub fn connection_providers(&self) -> &[Arc<dyn ConnectionProvider>] {
        &self.registries.providers
    }

    pub fn policy_set(&self) -> &PolicySet {
        &self.registries.policy_set
    }

    pub fn data_type_descriptor_set(&self) -> &DataTypeDescriptorSet {
        &self.registries.descriptors
    }

    pub fn connection_context(&self) -> &ConnectionContext {
        &self.connection_context
    }

    pub fn find_connection_provider(
        &self,
        name: &ConnectionName,
    ) -> Option<&Arc<dyn ConnectionProvider>> {
        self.registries.by_connection.get(name)
    }

    /// Descriptor of the data type served through `name`.
    pub fn find_data_type(&self, name: &ConnectionName) -> Option<&DataTypeDescriptor> {
        self.find_connection_provider(name)
            .map(|provider| &provider.data_type().descriptor)
    }

    /// Managed data type registered for a descriptor name.
    pub fn find_managed_data_type(&self, descriptor_name: &str) -> Option<&ManagedDataType> {
        self.registries
            .providers
            .iter()
            .map(|p| p.data_type())
            .find(|dt| dt.descriptor.name == descriptor_name)
    }

    pub fn processor_nodes(&self) -> impl Iterator<Item = &Arc<dyn ProcessorNode>> {
        self.nodes.values()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns a context whose graph also contains `node`. Adding a node
    /// whose id is already present changes nothing.
    pub fn with_node(&self, node: Arc<dyn ProcessorNode>) -> Self {
        let mut next = self.clone();
        next.nodes.entry(node.id()).or_insert(node);
        next
    }

    pub fn with_connection_context(&self, connection_context: ConnectionContext) -> Self {
        Self {
            registries: Arc::clone(&self.registries),
            nodes: self.nodes.clone(),
            connection_context,
        }
    }
}

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContext")
            .field("providers", &self.registries.providers.len())
            .field("policies", &self.registries.policy_set.len())
            .field("descriptors", &self.registries.descriptors.len())
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("connection_context", &self.connection_context)
            .finish()
    }
}
