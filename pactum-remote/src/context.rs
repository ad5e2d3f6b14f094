//! Resolution of remote requests to servers.

use crate::server::RemoteServerHandle;
use crate::wire::{RemoteRequestMetadata, RequestKind};
use pactum_broker::ConnectionProvider;
use pactum_types::DataTypeDescriptor;
use std::sync::Arc;

pub trait RemoteContext: Send + Sync {
    /// The server that answers a request, if any.
    fn find_server(&self, metadata: &RemoteRequestMetadata) -> Option<RemoteServerHandle>;

    /// Every server serving data of the given type.
    fn find_servers(&self, descriptor: &DataTypeDescriptor) -> Vec<RemoteServerHandle>;
}

/// Context over a fixed set of servers.
#[derive(Debug, Clone, Default)]
pub struct DefaultRemoteContext {
    servers: Vec<RemoteServerHandle>,
}

impl DefaultRemoteContext {
    pub fn new(servers: impl IntoIterator<Item = RemoteServerHandle>) -> Self {
        Self {
            servers: servers.into_iter().collect(),
        }
    }

    /// Providers to register with the broker so remote requests can be
    /// policy-checked.
    pub fn connection_providers(&self) -> Vec<Arc<dyn ConnectionProvider>> {
        self.servers
            .iter()
            .map(RemoteServerHandle::connection_provider)
            .collect()
    }

    pub fn servers(&self) -> &[RemoteServerHandle] {
        &self.servers
    }
}

impl RemoteContext for DefaultRemoteContext {
    fn find_server(&self, metadata: &RemoteRequestMetadata) -> Option<RemoteServerHandle> {
        let matches = |server: &&RemoteServerHandle| match (&metadata.kind, server) {
            (RequestKind::Store { data_type_name, .. }, RemoteServerHandle::Store(_))
            | (RequestKind::Stream { data_type_name, .. }, RemoteServerHandle::Stream(_))
            | (
                RequestKind::Compute {
                    result_data_type_name: data_type_name,
                    ..
                },
                RemoteServerHandle::Compute(_),
            ) => server.data_type_descriptor().name == *data_type_name,
            _ => false,
        };
        self.servers.iter().find(matches).cloned()
    }

    fn find_servers(&self, descriptor: &DataTypeDescriptor) -> Vec<RemoteServerHandle> {
        self.servers
            .iter()
            .filter(|server| server.data_type_descriptor() == descriptor)
            .cloned()
            .collect()
    }
}
