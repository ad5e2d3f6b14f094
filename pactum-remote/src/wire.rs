//! Request and response model exchanged with remote callers.
//!
//! The model is serde-serializable; framing and encoding belong to the
//! transport.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOp {
    Count,
    FetchAll,
    FetchById(Vec<String>),
    Create,
    Update,
    DeleteAll,
    DeleteById(Vec<String>),
    Unset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOp {
    Publish,
    Subscribe,
    Unspecified,
}

/// Which kind of server a request targets, and what it asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    Store {
        data_type_name: String,
        op: StoreOp,
    },
    Stream {
        data_type_name: String,
        op: StreamOp,
    },
    Compute {
        result_data_type_name: String,
        method_id: String,
    },
    Unset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRequestMetadata {
    /// Name of the policy the caller operates under. Blank means none.
    #[serde(default)]
    pub usage_type: String,
    pub kind: RequestKind,
}

impl RemoteRequestMetadata {
    pub fn new(usage_type: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            usage_type: usage_type.into(),
            kind,
        }
    }

    /// Name of the data type the request reads or writes.
    pub fn data_type_name(&self) -> Option<&str> {
        match &self.kind {
            RequestKind::Store { data_type_name, .. }
            | RequestKind::Stream { data_type_name, .. } => Some(data_type_name),
            RequestKind::Compute {
                result_data_type_name,
                ..
            } => Some(result_data_type_name),
            RequestKind::Unset => None,
        }
    }

    /// Whether answering the request hands data to the caller.
    pub fn is_read_request(&self) -> bool {
        match &self.kind {
            RequestKind::Store { op, .. } => {
                matches!(op, StoreOp::Count | StoreOp::FetchAll | StoreOp::FetchById(_))
            }
            RequestKind::Stream { op, .. } => *op == StreamOp::Subscribe,
            RequestKind::Compute { .. } => true,
            RequestKind::Unset => false,
        }
    }
}

impl fmt::Display for RemoteRequestMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{usage_type: {:?}, kind: {:?}}}", self.usage_type, self.kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub id: String,
    #[serde(default)]
    pub associated_packages: Vec<String>,
    pub created: Option<SystemTime>,
    pub updated: Option<SystemTime>,
}

/// An entity in transport form: metadata plus encoded payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntity {
    pub metadata: EntityMetadata,
    pub bytes: Vec<u8>,
}

impl RemoteEntity {
    pub fn new(id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            metadata: EntityMetadata {
                id: id.into(),
                ..EntityMetadata::default()
            },
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub metadata: RemoteRequestMetadata,
    #[serde(default)]
    pub entities: Vec<RemoteEntity>,
}

impl RemoteRequest {
    pub fn new(metadata: RemoteRequestMetadata) -> Self {
        Self {
            metadata,
            entities: Vec::new(),
        }
    }

    pub fn with_entities(mut self, entities: Vec<RemoteEntity>) -> Self {
        self.entities = entities;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Set by count requests.
    pub count: Option<u64>,
}

/// One page of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub metadata: ResponseMetadata,
    #[serde(default)]
    pub entities: Vec<RemoteEntity>,
}

impl RemoteResponse {
    pub fn page(entities: Vec<RemoteEntity>) -> Self {
        Self {
            metadata: ResponseMetadata::default(),
            entities,
        }
    }

    pub fn count(count: u64) -> Self {
        Self {
            metadata: ResponseMetadata { count: Some(count) },
            entities: Vec::new(),
        }
    }
}
