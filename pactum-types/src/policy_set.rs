//! Registry of policies known to the process.

use crate::descriptor::DataTypeDescriptor;
use crate::managed::ManagementStrategy;
use crate::policy::Policy;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable set of registered policies.
///
/// Built once at startup. Also indexes, per data type, the management
/// strategies that some policy would accept.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    policies: Vec<Arc<Policy>>,
    strategies: BTreeMap<String, Vec<ManagementStrategy>>,
}

impl PolicySet {
    pub fn new<P: Into<Arc<Policy>>>(policies: impl IntoIterator<Item = P>) -> Self {
        let policies: Vec<Arc<Policy>> = policies.into_iter().map(Into::into).collect();
        let mut strategies: BTreeMap<String, Vec<ManagementStrategy>> = BTreeMap::new();
        for target in policies.iter().flat_map(|p| p.targets.iter()) {
            let entry = strategies.entry(target.schema_name.clone()).or_default();
            for strategy in target.retentions_as_strategies() {
                if !entry.contains(&strategy) {
                    entry.push(strategy);
                }
            }
        }
        Self {
            policies,
            strategies,
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Policy>> {
        self.policies.iter().find(|p| p.name == name).cloned()
    }

    /// Whether a policy equal to `policy` was registered.
    pub fn contains(&self, policy: &Policy) -> bool {
        self.policies.iter().any(|p| **p == *policy)
    }

    /// Strategies allowed for a data type by at least one policy target.
    pub fn management_strategies(&self, descriptor: &DataTypeDescriptor) -> &[ManagementStrategy] {
        self.strategies
            .get(&descriptor.name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether any policy targets the data type.
    pub fn targets(&self, descriptor: &DataTypeDescriptor) -> bool {
        self.strategies.contains_key(&descriptor.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Policy>> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
