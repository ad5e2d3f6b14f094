//! Core type definitions for pactum.
//!
//! This crate defines the data model shared by the connection broker and the
//! remote request router:
//! - Data type descriptors and the registry that indexes them by name
//! - Policies, policy targets, context rules and the policy registry
//! - Connection names, managed data types and storage management strategies
//! - Processor nodes (requesters) and connection requests
//! - Runtime flags and the broker error taxonomy
//!
//! Everything here is immutable once built, apart from the flags cell, and is
//! safe to share across threads behind an `Arc`.

mod connection;
mod context_rule;
mod descriptor;
mod error;
mod flags;
mod ids;
mod managed;
mod node;
mod policy;
mod policy_set;
mod request;

pub use connection::{downcast_connection, Connection, ConnectionName};
pub use context_rule::{ConnectionContext, ContextRule};
pub use descriptor::{
    DataTypeDescriptor, DataTypeDescriptorBuilder, DataTypeDescriptorSet, FieldType,
};
pub use error::{PactumError, PactumResult};
pub use flags::{Flags, FlagsReader, StaticFlags, WatchFlags};
pub use ids::NodeId;
pub use managed::{DeletionTrigger, ManagedDataType, ManagementStrategy, StorageMedia, Trigger};
pub use node::{ProcessorNode, SandboxProcessorNode, StaticProcessorNode};
pub use policy::{
    Policy, PolicyBuilder, PolicyField, PolicyFieldBuilder, PolicyRetention, PolicyTarget,
    PolicyTargetBuilder, StorageMedium, UsageType,
};
pub use policy_set::PolicySet;
pub use request::ConnectionRequest;
