//! Remote server SPI.
//!
//! A remote server exposes one managed data type to remote callers as a
//! store, a stream, or a compute service. Every server is also visible to the
//! broker as a connection provider for the remote reader and writer names of
//! its type, so remote access is policy-checked exactly like local access.

use crate::error::RemoteResult;
use crate::wire::RemoteEntity;
use async_trait::async_trait;
use futures::stream::BoxStream;
use pactum_broker::ConnectionProvider;
use pactum_types::{
    Connection, ConnectionName, ConnectionRequest, DataTypeDescriptor, ManagedDataType,
    PactumError, PactumResult, Policy,
};
use std::fmt;
use std::sync::Arc;

/// One page of entities.
pub type Page = Vec<RemoteEntity>;

/// A possibly unbounded sequence of pages.
pub type PageStream<'a> = BoxStream<'a, RemoteResult<Page>>;

/// Common surface of every remote server.
pub trait RemoteServer: Send + Sync {
    /// The data type served, including its remote connection names.
    fn data_type(&self) -> &ManagedDataType;

    fn data_type_descriptor(&self) -> &DataTypeDescriptor {
        &self.data_type().descriptor
    }
}

#[async_trait]
pub trait RemoteStoreServer: RemoteServer {
    async fn count(&self, policy: Option<&Policy>) -> RemoteResult<u64>;

    fn fetch_all<'a>(&'a self, policy: Option<&'a Policy>) -> PageStream<'a>;

    fn fetch_by_id<'a>(&'a self, policy: Option<&'a Policy>, ids: Vec<String>) -> PageStream<'a>;

    async fn create(
        &self,
        policy: Option<&Policy>,
        entities: Vec<RemoteEntity>,
    ) -> RemoteResult<()>;

    async fn update(
        &self,
        policy: Option<&Policy>,
        entities: Vec<RemoteEntity>,
    ) -> RemoteResult<()>;

    async fn delete_all(&self, policy: Option<&Policy>) -> RemoteResult<()>;

    async fn delete_by_id(&self, policy: Option<&Policy>, ids: Vec<String>) -> RemoteResult<()>;
}

#[async_trait]
pub trait RemoteStreamServer: RemoteServer {
    async fn publish(
        &self,
        policy: Option<&Policy>,
        entities: Vec<RemoteEntity>,
    ) -> RemoteResult<()>;

    /// Emits one page per batch of new entities, for as long as the caller
    /// stays subscribed.
    fn subscribe<'a>(&'a self, policy: Option<&'a Policy>) -> PageStream<'a>;
}

pub trait RemoteComputeServer: RemoteServer {
    fn run<'a>(
        &'a self,
        policy: Option<&'a Policy>,
        method_id: &'a str,
        arguments: Vec<RemoteEntity>,
    ) -> PageStream<'a>;
}

/// A registered server of any kind.
#[derive(Clone)]
pub enum RemoteServerHandle {
    Store(Arc<dyn RemoteStoreServer>),
    Stream(Arc<dyn RemoteStreamServer>),
    Compute(Arc<dyn RemoteComputeServer>),
}

impl RemoteServerHandle {
    pub fn store(server: impl RemoteStoreServer + 'static) -> Self {
        Self::Store(Arc::new(server))
    }

    pub fn stream(server: impl RemoteStreamServer + 'static) -> Self {
        Self::Stream(Arc::new(server))
    }

    pub fn compute(server: impl RemoteComputeServer + 'static) -> Self {
        Self::Compute(Arc::new(server))
    }

    pub fn server(&self) -> &dyn RemoteServer {
        match self {
            Self::Store(server) => server.as_ref(),
            Self::Stream(server) => server.as_ref(),
            Self::Compute(server) => server.as_ref(),
        }
    }

    pub fn data_type_descriptor(&self) -> &DataTypeDescriptor {
        self.server().data_type_descriptor()
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Store(_) => "store",
            Self::Stream(_) => "stream",
            Self::Compute(_) => "compute",
        }
    }

    /// The connection name a request against this server uses.
    pub fn connection_name(&self, is_read: bool) -> ConnectionName {
        let name = &self.data_type_descriptor().name;
        if is_read {
            ConnectionName::remote_reader(name)
        } else {
            ConnectionName::remote_writer(name)
        }
    }

    /// The broker-facing provider for this server.
    pub fn connection_provider(&self) -> Arc<dyn ConnectionProvider> {
        Arc::new(ServerProvider {
            server: self.clone(),
        })
    }
}

impl fmt::Debug for RemoteServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteServer({}, {})", self.kind_name(), self.data_type_descriptor().name)
    }
}

/// The connection handed out for remote requests. It only marks that a
/// request was allowed; the data itself flows through the server handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConnection {
    pub name: ConnectionName,
}

impl Connection for RemoteConnection {
    fn connection_name(&self) -> ConnectionName {
        self.name.clone()
    }
}

struct ServerProvider {
    server: RemoteServerHandle,
}

impl ConnectionProvider for ServerProvider {
    fn data_type(&self) -> &ManagedDataType {
        self.server.server().data_type()
    }

    fn get_connection(&self, request: &ConnectionRequest) -> PactumResult<Arc<dyn Connection>> {
        let name = &request.connection_name;
        let descriptor = &self.data_type().descriptor.name;
        if *name == ConnectionName::remote_reader(descriptor)
            || *name == ConnectionName::remote_writer(descriptor)
        {
            Ok(Arc::new(RemoteConnection { name: name.clone() }))
        } else {
            Err(PactumError::ConnectionProviderNotFound(format!(
                "{name}: remote servers only serve remote connections"
            )))
        }
    }

    fn name(&self) -> String {
        format!("{:?}", self.server)
    }
}
