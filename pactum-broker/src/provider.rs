//! Connection provider SPI.

use pactum_types::{Connection, ConnectionRequest, ManagedDataType, PactumResult};
use std::sync::Arc;

/// Binds one managed data type to the connections that serve it.
///
/// Providers are registered once at startup. The broker only calls
/// [`get_connection`](ConnectionProvider::get_connection) after every check
/// for the request has passed, and only with a connection name listed in
/// [`data_type`](ConnectionProvider::data_type).
pub trait ConnectionProvider: Send + Sync {
    fn data_type(&self) -> &ManagedDataType;

    fn get_connection(&self, request: &ConnectionRequest) -> PactumResult<Arc<dyn Connection>>;

    /// Name used in logs and ambiguity reports.
    fn name(&self) -> String {
        format!("ConnectionProvider({})", self.data_type().descriptor.name)
    }
}
