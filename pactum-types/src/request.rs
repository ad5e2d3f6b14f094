//! Connection requests.

use crate::connection::ConnectionName;
use crate::node::ProcessorNode;
use crate::policy::Policy;
use std::fmt;
use std::sync::Arc;

/// One attempt by a requester to obtain a capability.
#[derive(Clone)]
pub struct ConnectionRequest {
    pub connection_name: ConnectionName,
    pub requester: Arc<dyn ProcessorNode>,
    pub policy: Option<Arc<Policy>>,
}

impl ConnectionRequest {
    pub fn new(
        connection_name: ConnectionName,
        requester: Arc<dyn ProcessorNode>,
        policy: Option<Arc<Policy>>,
    ) -> Self {
        Self {
            connection_name,
            requester,
            policy,
        }
    }

    pub fn is_read_request(&self) -> bool {
        self.connection_name.is_read()
    }
}

impl fmt::Debug for ConnectionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRequest")
            .field("connection_name", &self.connection_name)
            .field("requester", &self.requester.id())
            .field("policy", &self.policy.as_ref().map(|p| p.name.as_str()))
            .finish()
    }
}

impl fmt::Display for ConnectionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionRequest(connection_name={}, requester={}, policy={})",
            self.connection_name,
            self.requester.id(),
            self.policy.as_ref().map_or("none", |p| p.name.as_str())
        )
    }
}
