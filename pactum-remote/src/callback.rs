//! Response callback contract.
//!
//! A callback receives zero or more data pages and then exactly one of
//! `on_complete` or `on_error`. It also receives exactly one cancellation
//! signal per request.

use crate::error::RemoteError;
use crate::tasks::{CancellationSignal, RequestId};
use crate::wire::RemoteResponse;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Invoked when the caller's transport handle goes away.
#[derive(Clone)]
pub struct DeathRecipient {
    request_id: RequestId,
    on_death: Arc<dyn Fn() + Send + Sync>,
}

impl DeathRecipient {
    pub fn new(request_id: RequestId, on_death: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            request_id,
            on_death: Arc::new(on_death),
        }
    }

    /// The request this recipient was registered for.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn notify(&self) {
        (self.on_death)()
    }
}

impl fmt::Debug for DeathRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeathRecipient")
            .field("request_id", &self.request_id)
            .finish()
    }
}

/// The caller's side of one request, as seen by the router.
pub trait ResponseCallback: Send + Sync {
    fn on_data(&self, response: RemoteResponse);

    fn on_complete(&self);

    fn on_error(&self, error: RemoteError);

    fn provide_cancellation_signal(&self, signal: CancellationSignal);

    /// Whether the caller's transport is still reachable.
    fn is_alive(&self) -> bool;

    /// Registers `recipient` to be notified when the caller goes away.
    /// Returns false if the caller is already gone.
    fn link_to_death(&self, recipient: DeathRecipient) -> bool;

    fn unlink_to_death(&self, request_id: RequestId);
}

/// Forwards to a caller's callback, letting at most one terminal signal
/// through and dropping data after it.
pub(crate) struct TerminalOnce {
    inner: Arc<dyn ResponseCallback>,
    terminated: AtomicBool,
}

impl TerminalOnce {
    pub(crate) fn new(inner: Arc<dyn ResponseCallback>) -> Self {
        Self {
            inner,
            terminated: AtomicBool::new(false),
        }
    }

    fn claim_terminal(&self) -> bool {
        !self.terminated.swap(true, Ordering::SeqCst)
    }
}

impl ResponseCallback for TerminalOnce {
    fn on_data(&self, response: RemoteResponse) {
        if !self.terminated.load(Ordering::SeqCst) {
            self.inner.on_data(response);
        }
    }

    fn on_complete(&self) {
        if self.claim_terminal() {
            self.inner.on_complete();
        }
    }

    fn on_error(&self, error: RemoteError) {
        if self.claim_terminal() {
            self.inner.on_error(error);
        }
    }

    fn provide_cancellation_signal(&self, signal: CancellationSignal) {
        self.inner.provide_cancellation_signal(signal);
    }

    fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    fn link_to_death(&self, recipient: DeathRecipient) -> bool {
        self.inner.link_to_death(recipient)
    }

    fn unlink_to_death(&self, request_id: RequestId) {
        self.inner.unlink_to_death(request_id);
    }
}
