//! Server handlers: run one request against one server and stream the
//! results to the callback.

use crate::callback::ResponseCallback;
use crate::error::{RemoteError, RemoteResult};
use crate::server::{
    PageStream, RemoteComputeServer, RemoteServerHandle, RemoteStoreServer, RemoteStreamServer,
};
use crate::wire::{
    RemoteEntity, RemoteRequestMetadata, RemoteResponse, RequestKind, StoreOp, StreamOp,
};
use async_trait::async_trait;
use futures::StreamExt;
use pactum_types::Policy;
use std::sync::Arc;

#[async_trait]
pub trait RemoteServerHandler: Send + Sync {
    /// Runs the request. May never return for live subscriptions; the router
    /// cancels it by dropping the future.
    async fn handle(
        &self,
        policy: Option<Arc<Policy>>,
        input: Vec<RemoteEntity>,
        callback: &dyn ResponseCallback,
    ) -> RemoteResult<()>;
}

pub trait RemoteServerHandlerFactory: Send + Sync {
    fn build_handler(
        &self,
        metadata: &RemoteRequestMetadata,
        server: &RemoteServerHandle,
    ) -> RemoteResult<Box<dyn RemoteServerHandler>>;
}

/// Builds the handler matching the request kind. The server must be of the
/// same kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandlerFactory;

impl RemoteServerHandlerFactory for DefaultHandlerFactory {
    fn build_handler(
        &self,
        metadata: &RemoteRequestMetadata,
        server: &RemoteServerHandle,
    ) -> RemoteResult<Box<dyn RemoteServerHandler>> {
        match (&metadata.kind, server) {
            (RequestKind::Store { op, .. }, RemoteServerHandle::Store(server)) => {
                Ok(Box::new(StoreServerHandler::new(op.clone(), Arc::clone(server))))
            }
            (RequestKind::Stream { op, .. }, RemoteServerHandle::Stream(server)) => {
                Ok(Box::new(StreamServerHandler::new(*op, Arc::clone(server))))
            }
            (RequestKind::Compute { method_id, .. }, RemoteServerHandle::Compute(server)) => Ok(
                Box::new(ComputeServerHandler::new(method_id.clone(), Arc::clone(server))),
            ),
            (RequestKind::Unset, _) => Err(RemoteError::unsupported(format!(
                "Request type not specified, or unrecognized: {metadata}"
            ))),
            (_, server) => Err(RemoteError::unsupported(format!(
                "Server does not handle request type [{metadata}]: {server:?}"
            ))),
        }
    }
}

/// Sends every page of `pages` as one data response.
async fn send_each_page(
    mut pages: PageStream<'_>,
    callback: &dyn ResponseCallback,
) -> RemoteResult<()> {
    while let Some(page) = pages.next().await {
        callback.on_data(RemoteResponse::page(page?));
    }
    Ok(())
}

// ── Store ───────────────────────────────────────────────────────

pub struct StoreServerHandler {
    op: StoreOp,
    server: Arc<dyn RemoteStoreServer>,
}

impl StoreServerHandler {
    pub fn new(op: StoreOp, server: Arc<dyn RemoteStoreServer>) -> Self {
        Self { op, server }
    }
}

#[async_trait]
impl RemoteServerHandler for StoreServerHandler {
    async fn handle(
        &self,
        policy: Option<Arc<Policy>>,
        input: Vec<RemoteEntity>,
        callback: &dyn ResponseCallback,
    ) -> RemoteResult<()> {
        let policy = policy.as_deref();
        match &self.op {
            StoreOp::Count => {
                let count = self.server.count(policy).await?;
                callback.on_data(RemoteResponse::count(count));
                Ok(())
            }
            StoreOp::FetchAll => send_each_page(self.server.fetch_all(policy), callback).await,
            StoreOp::FetchById(ids) => {
                send_each_page(self.server.fetch_by_id(policy, ids.clone()), callback).await
            }
            StoreOp::Create => self.server.create(policy, input).await,
            StoreOp::Update => self.server.update(policy, input).await,
            StoreOp::DeleteAll => self.server.delete_all(policy).await,
            StoreOp::DeleteById(ids) => self.server.delete_by_id(policy, ids.clone()).await,
            StoreOp::Unset => Err(RemoteError::unsupported(
                "Invalid request: store operation not set",
            )),
        }
    }
}

// ── Stream ──────────────────────────────────────────────────────

pub struct StreamServerHandler {
    op: StreamOp,
    server: Arc<dyn RemoteStreamServer>,
}

impl StreamServerHandler {
    pub fn new(op: StreamOp, server: Arc<dyn RemoteStreamServer>) -> Self {
        Self { op, server }
    }
}

#[async_trait]
impl RemoteServerHandler for StreamServerHandler {
    async fn handle(
        &self,
        policy: Option<Arc<Policy>>,
        input: Vec<RemoteEntity>,
        callback: &dyn ResponseCallback,
    ) -> RemoteResult<()> {
        let policy = policy.as_deref();
        match self.op {
            StreamOp::Publish => {
                // Publishers don't wait for delivery.
                callback.on_complete();
                if input.is_empty() {
                    return Ok(());
                }
                self.server.publish(policy, input).await
            }
            StreamOp::Subscribe => send_each_page(self.server.subscribe(policy), callback).await,
            StreamOp::Unspecified => Err(RemoteError::unsupported(
                "Invalid request: stream operation not set or unrecognized",
            )),
        }
    }
}

// ── Compute ─────────────────────────────────────────────────────

pub struct ComputeServerHandler {
    method_id: String,
    server: Arc<dyn RemoteComputeServer>,
}

impl ComputeServerHandler {
    pub fn new(method_id: String, server: Arc<dyn RemoteComputeServer>) -> Self {
        Self { method_id, server }
    }
}

#[async_trait]
impl RemoteServerHandler for ComputeServerHandler {
    async fn handle(
        &self,
        policy: Option<Arc<Policy>>,
        input: Vec<RemoteEntity>,
        callback: &dyn ResponseCallback,
    ) -> RemoteResult<()> {
        let pages = self.server.run(policy.as_deref(), &self.method_id, input);
        send_each_page(pages, callback).await
    }
}
