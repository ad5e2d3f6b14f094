//! The remote request router.

use crate::callback::{DeathRecipient, ResponseCallback, TerminalOnce};
use crate::client::ClientDetails;
use crate::context::RemoteContext;
use crate::error::{RemoteError, RemoteResult};
use crate::handler::RemoteServerHandlerFactory;
use crate::policy_checker::RemotePolicyChecker;
use crate::tasks::{CancellationSignal, RequestId, TaskTable, cancelled};
use crate::wire::RemoteRequest;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Routes remote requests to servers, one tokio task per request.
///
/// Every request ends in exactly one `on_complete` or `on_error` on its
/// callback, unless the caller went away first. The callback also receives
/// exactly one cancellation signal, before any data.
pub struct RemoteRouter {
    context: Arc<dyn RemoteContext>,
    policy_checker: Arc<dyn RemotePolicyChecker>,
    handler_factory: Arc<dyn RemoteServerHandlerFactory>,
    tasks: Arc<TaskTable>,
}

impl RemoteRouter {
    pub fn new(
        context: Arc<dyn RemoteContext>,
        policy_checker: Arc<dyn RemotePolicyChecker>,
        handler_factory: Arc<dyn RemoteServerHandlerFactory>,
    ) -> Self {
        Self {
            context,
            policy_checker,
            handler_factory,
            tasks: Arc::new(TaskTable::new()),
        }
    }

    /// Starts serving `request` and returns immediately. Must be called
    /// within a tokio runtime.
    pub fn serve(
        &self,
        request: RemoteRequest,
        client: ClientDetails,
        callback: Arc<dyn ResponseCallback>,
    ) -> JoinHandle<()> {
        let callback = Arc::new(TerminalOnce::new(callback));
        let (id, cancel_rx) = self.tasks.register(Arc::clone(&callback));

        debug!("RemoteRouter[{}] providing cancellation signal", id);
        let signal = CancellationSignal::new(id, Arc::downgrade(&self.tasks));
        callback.provide_cancellation_signal(signal);

        let tasks = Arc::downgrade(&self.tasks);
        let recipient = DeathRecipient::new(id, move || {
            debug!("RemoteRouter[{}] caller died, cancelling", id);
            if let Some(tasks) = tasks.upgrade() {
                tasks.abort(id);
            }
        });
        let linked = callback.link_to_death(recipient);
        if !linked {
            debug!("RemoteRouter[{}] caller already gone", id);
            self.tasks.abort(id);
        }

        let context = Arc::clone(&self.context);
        let policy_checker = Arc::clone(&self.policy_checker);
        let handler_factory = Arc::clone(&self.handler_factory);
        // Moved into the task so cleanup also runs if the task is aborted,
        // dropped unpolled, or panics while signalling.
        let guard = TaskGuard {
            tasks: Arc::clone(&self.tasks),
            id,
            callback: Arc::clone(&callback),
            linked,
        };

        tokio::spawn(async move {
            let _guard = guard;
            let work = dispatch(
                id,
                request,
                &client,
                context.as_ref(),
                policy_checker.as_ref(),
                handler_factory.as_ref(),
                callback.as_ref(),
            );
            tokio::select! {
                biased;
                _ = cancelled(cancel_rx) => {
                    debug!("RemoteRouter[{}] cancelled", id);
                }
                outcome = AssertUnwindSafe(work).catch_unwind() => {
                    let result = outcome.unwrap_or_else(|panic| Err(panic_error(panic)));
                    match result {
                        Ok(()) => {
                            debug!("RemoteRouter[{}] completed", id);
                            callback.on_complete();
                        }
                        Err(err) => {
                            debug!("RemoteRouter[{}] failed: {}", id, err);
                            if callback.is_alive() {
                                callback.on_error(err);
                            }
                        }
                    }
                }
            }
        })
    }

    /// Number of requests that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.in_flight()
    }
}

/// Releases a request's task table entry and death link however its task
/// ends.
struct TaskGuard {
    tasks: Arc<TaskTable>,
    id: RequestId,
    callback: Arc<TerminalOnce>,
    linked: bool,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.tasks.finish(self.id);
        if self.linked {
            debug!("RemoteRouter[{}] unlinking death recipient", self.id);
            self.callback.unlink_to_death(self.id);
        }
    }
}

async fn dispatch(
    id: RequestId,
    request: RemoteRequest,
    client: &ClientDetails,
    context: &dyn RemoteContext,
    policy_checker: &dyn RemotePolicyChecker,
    handler_factory: &dyn RemoteServerHandlerFactory,
    callback: &dyn ResponseCallback,
) -> RemoteResult<()> {
    let RemoteRequest { metadata, entities } = request;
    debug!("RemoteRouter[{}] serving {}", id, metadata);

    let server = context.find_server(&metadata).ok_or_else(|| {
        RemoteError::unsupported(format!("Server not found for request with metadata: {metadata}"))
    })?;
    let policy = policy_checker.check_and_get_policy(&metadata, &server, client)?;
    let handler = handler_factory.build_handler(&metadata, &server)?;

    debug!("RemoteRouter[{}] handling with {:?}", id, server);
    handler.handle(policy, entities, callback).await
}

fn panic_error(panic: Box<dyn Any + Send>) -> RemoteError {
    let message = if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    };
    RemoteError::unknown(message)
}
