//! Remote request routing for pactum.
//!
//! Remote callers reach governed data through [`RemoteRouter::serve`]. Each
//! request is resolved to a server by [`RemoteContext`], policy-checked by
//! [`RemotePolicyChecker`] through the same [`pactum_broker::ConnectionBroker`]
//! that in-process callers use, and then answered by a server handler over a
//! [`ResponseCallback`].
//!
//! Requests run as independent tokio tasks tracked in a task table. Callers
//! cancel through the [`CancellationSignal`] they receive before the task
//! starts; a caller whose transport goes away has its task cancelled through
//! the death recipient registered on its callback. No server-side timeout
//! is applied.

mod callback;
mod client;
mod context;
mod error;
mod handler;
mod policy_checker;
mod router;
mod server;
mod tasks;
mod wire;

pub use callback::{DeathRecipient, ResponseCallback};
pub use client::{ClientDetails, IsolationType};
pub use context::{DefaultRemoteContext, RemoteContext};
pub use error::{RemoteError, RemoteErrorKind, RemoteResult};
pub use handler::{
    ComputeServerHandler, DefaultHandlerFactory, RemoteServerHandler, RemoteServerHandlerFactory,
    StoreServerHandler, StreamServerHandler,
};
pub use policy_checker::{DefaultRemotePolicyChecker, RemotePolicyChecker};
pub use router::RemoteRouter;
pub use server::{
    Page, PageStream, RemoteComputeServer, RemoteConnection, RemoteServer, RemoteServerHandle,
    RemoteStoreServer, RemoteStreamServer,
};
pub use tasks::{CancellationSignal, RequestId};
pub use wire::{
    EntityMetadata, RemoteEntity, RemoteRequest, RemoteRequestMetadata, RemoteResponse,
    RequestKind, ResponseMetadata, StoreOp, StreamOp,
};
