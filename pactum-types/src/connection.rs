//! Connection names and the capability trait.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The name of a capability class, tagged with its direction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "direction", content = "name", rename_all = "snake_case")]
pub enum ConnectionName {
    Reader(String),
    Writer(String),
}

impl ConnectionName {
    pub fn reader(name: impl Into<String>) -> Self {
        Self::Reader(name.into())
    }

    pub fn writer(name: impl Into<String>) -> Self {
        Self::Writer(name.into())
    }

    /// The reader capability remote clients use for a data type.
    pub fn remote_reader(data_type_name: &str) -> Self {
        Self::Reader(format!("remote:{data_type_name}:reader"))
    }

    /// The writer capability remote clients use for a data type.
    pub fn remote_writer(data_type_name: &str) -> Self {
        Self::Writer(format!("remote:{data_type_name}:writer"))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Reader(name) | Self::Writer(name) => name,
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Self::Reader(_))
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Writer(_))
    }
}

impl fmt::Display for ConnectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader(name) => write!(f, "Reader({name})"),
            Self::Writer(name) => write!(f, "Writer({name})"),
        }
    }
}

/// A capability object handed out by a connection provider.
pub trait Connection: Any + Send + Sync {
    /// The capability class this object implements.
    fn connection_name(&self) -> ConnectionName;
}

/// Recovers the concrete type of a connection.
pub fn downcast_connection<T: Connection>(connection: Arc<dyn Connection>) -> Option<Arc<T>> {
    let any: Arc<dyn Any + Send + Sync> = connection;
    any.downcast::<T>().ok()
}
