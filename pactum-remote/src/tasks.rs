//! Task table for in-flight remote requests.
//!
//! Every request gets an entry keyed by its [`RequestId`] holding the
//! cancellation sender and the guarded callback. Cancellation signals and
//! death recipients carry only the id and a weak reference to the table, so
//! a caller that holds on to a signal never keeps a finished task or its
//! callback alive. The entry is removed when the task finishes; cancelling
//! after that is a no-op.

use crate::callback::{ResponseCallback, TerminalOnce};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::debug;

/// Identifies one request, for log correlation and task lookup. Ids
/// increase monotonically per router but imply no ordering between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct TaskEntry {
    cancel: watch::Sender<bool>,
    callback: Arc<TerminalOnce>,
}

pub(crate) struct TaskTable {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<RequestId, TaskEntry>>,
}

impl TaskTable {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates an id and an entry for a new request.
    pub(crate) fn register(
        &self,
        callback: Arc<TerminalOnce>,
    ) -> (RequestId, watch::Receiver<bool>) {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (cancel, cancelled) = watch::channel(false);
        self.tasks.lock().insert(id, TaskEntry { cancel, callback });
        (id, cancelled)
    }

    /// Stops the task without signalling the caller. Returns false if the
    /// task already finished.
    pub(crate) fn abort(&self, id: RequestId) -> bool {
        match self.tasks.lock().get(&id) {
            Some(entry) => {
                entry.cancel.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// Stops the task and, if the caller is still reachable, completes the
    /// request. Cancellation counts as a successful end.
    pub(crate) fn cancel(&self, id: RequestId) {
        let callback = {
            let tasks = self.tasks.lock();
            let Some(entry) = tasks.get(&id) else {
                debug!("RemoteRouter[{}] already finished, ignoring cancellation", id);
                return;
            };
            entry.cancel.send_replace(true);
            Arc::clone(&entry.callback)
        };
        if callback.is_alive() {
            callback.on_complete();
        }
    }

    /// Removes the entry of a finished task.
    pub(crate) fn finish(&self, id: RequestId) {
        self.tasks.lock().remove(&id);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.tasks.lock().len()
    }
}

/// Handed to the caller once per request; cancels the request when used.
#[derive(Clone)]
pub struct CancellationSignal {
    request_id: RequestId,
    tasks: Weak<TaskTable>,
}

impl CancellationSignal {
    pub(crate) fn new(request_id: RequestId, tasks: Weak<TaskTable>) -> Self {
        Self { request_id, tasks }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn cancel(&self) {
        debug!("RemoteRouter[{}] cancellation signal triggered", self.request_id);
        if let Some(tasks) = self.tasks.upgrade() {
            tasks.cancel(self.request_id);
        }
    }
}

impl fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("request_id", &self.request_id)
            .finish()
    }
}

/// Resolves once the task has been cancelled. Never resolves if the table
/// entry is dropped without cancelling.
pub(crate) async fn cancelled(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
