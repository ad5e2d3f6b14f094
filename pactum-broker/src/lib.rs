//! Policy-checked connection broker.
//!
//! The broker decides, for every attempt by a processor node to obtain a
//! connection, whether the attempt may proceed, and records which requesters
//! have asked for which capabilities.
//!
//! - [`SharedContext`] bundles the registries and the requester graph. It is
//!   held in an [`AtomicSnapshot`] and only ever replaced whole.
//! - [`PolicyEngine`] is the pure decision function. [`DefaultPolicyEngine`]
//!   checks retention, field egress and context rules.
//! - [`ConnectionBroker`] runs the per-request algorithm and dispatches to the
//!   matching [`ConnectionProvider`].

mod broker;
mod config;
mod conformance;
mod context;
mod engine;
mod provider;
mod snapshot;

pub use broker::{ConnectionBroker, ConnectionNames};
pub use config::{BrokerConfig, ConfigError, PolicyMode};
pub use conformance::{DefaultPolicyConformanceCheck, PolicyConformanceCheck};
pub use context::SharedContext;
pub use engine::{DefaultPolicyEngine, PolicyCheckResult, PolicyEngine};
pub use provider::ConnectionProvider;
pub use snapshot::AtomicSnapshot;
