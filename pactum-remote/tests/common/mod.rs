//! Shared fixtures for router tests: three small servers (a `Person`
//! store, a `Visit` stream and a `Summary` compute service), a broker that
//! governs them, and a callback that records everything it receives.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use pactum_broker::{BrokerConfig, ConnectionBroker, DefaultPolicyEngine, SharedContext};
use pactum_remote::{
    CancellationSignal, DeathRecipient, DefaultHandlerFactory, DefaultRemoteContext,
    DefaultRemotePolicyChecker, PageStream, RemoteComputeServer, RemoteEntity, RemoteError,
    RemoteRequest, RemoteRequestMetadata, RemoteResponse, RemoteResult, RemoteRouter,
    RemoteServer, RemoteServerHandle, RemoteStoreServer, RemoteStreamServer, RequestId,
    RequestKind, ResponseCallback, StoreOp, StreamOp,
};
use pactum_types::{
    DataTypeDescriptor, DataTypeDescriptorSet, FieldType, Flags, ManagedDataType,
    ManagementStrategy, Policy, PolicySet, PolicyTarget, StaticFlags, StorageMedia, StorageMedium,
    UsageType,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const DAY: Duration = Duration::from_secs(86_400);
pub const WAIT: Duration = Duration::from_secs(5);

pub const PEOPLE_POLICY: &str = "PeopleProtoPolicy";
pub const SANDBOXED_POLICY: &str = "SandboxedPolicy";

fn descriptor(name: &str) -> DataTypeDescriptor {
    DataTypeDescriptor::builder_for(name, name)
        .field("name", FieldType::String)
        .field("age", FieldType::Integer)
        .build()
        .unwrap()
}

pub fn person() -> DataTypeDescriptor {
    descriptor("Person")
}

pub fn visit() -> DataTypeDescriptor {
    descriptor("Visit")
}

pub fn summary() -> DataTypeDescriptor {
    descriptor("Summary")
}

fn data_type(descriptor: DataTypeDescriptor) -> ManagedDataType {
    ManagedDataType::new(
        descriptor,
        ManagementStrategy::stored(false, StorageMedia::LocalDisk, Some(DAY)),
        [],
    )
    .with_remote_connections()
}

fn target(descriptor: &DataTypeDescriptor, usage: UsageType) -> PolicyTarget {
    PolicyTarget::builder(descriptor, DAY)
        .retention(StorageMedium::Disk, false)
        .field("name", |f| f.raw_usage(&[usage]))
        .field("age", |f| f.raw_usage(&[usage]))
        .build()
        .unwrap()
}

/// Allows every field of every type to leave the process.
pub fn people_policy() -> Policy {
    Policy::builder(PEOPLE_POLICY, "None")
        .description("Anything goes")
        .target(target(&person(), UsageType::Any))
        .target(target(&visit(), UsageType::Any))
        .target(target(&summary(), UsageType::Any))
        .build()
}

/// Only sandboxed callers may read people.
pub fn sandboxed_policy() -> Policy {
    Policy::builder(SANDBOXED_POLICY, "None")
        .description("People stay inside the sandbox")
        .target(target(&person(), UsageType::Sandbox))
        .build()
}

// ── Servers ──────────────────────────────────────────────────────

pub struct PersonStore {
    data_type: ManagedDataType,
    pub entities: Mutex<Vec<RemoteEntity>>,
}

impl PersonStore {
    pub fn with(entities: Vec<RemoteEntity>) -> Self {
        Self {
            data_type: data_type(person()),
            entities: Mutex::new(entities),
        }
    }

    fn snapshot(&self) -> Vec<RemoteEntity> {
        self.entities.lock().unwrap().clone()
    }
}

impl RemoteServer for PersonStore {
    fn data_type(&self) -> &ManagedDataType {
        &self.data_type
    }
}

#[async_trait]
impl RemoteStoreServer for PersonStore {
    async fn count(&self, _policy: Option<&Policy>) -> RemoteResult<u64> {
        Ok(self.entities.lock().unwrap().len() as u64)
    }

    fn fetch_all<'a>(&'a self, _policy: Option<&'a Policy>) -> PageStream<'a> {
        let pages: Vec<RemoteResult<Vec<RemoteEntity>>> =
            self.snapshot().chunks(2).map(|page| Ok(page.to_vec())).collect();
        stream::iter(pages).boxed()
    }

    fn fetch_by_id<'a>(&'a self, _policy: Option<&'a Policy>, ids: Vec<String>) -> PageStream<'a> {
        let page: Vec<RemoteEntity> = self
            .snapshot()
            .into_iter()
            .filter(|entity| ids.contains(&entity.metadata.id))
            .collect();
        stream::iter([Ok(page)]).boxed()
    }

    async fn create(
        &self,
        _policy: Option<&Policy>,
        entities: Vec<RemoteEntity>,
    ) -> RemoteResult<()> {
        self.entities.lock().unwrap().extend(entities);
        Ok(())
    }

    async fn update(
        &self,
        _policy: Option<&Policy>,
        entities: Vec<RemoteEntity>,
    ) -> RemoteResult<()> {
        let mut stored = self.entities.lock().unwrap();
        for entity in entities {
            let existing = stored.iter_mut().find(|e| e.metadata.id == entity.metadata.id);
            if let Some(existing) = existing {
                *existing = entity;
            }
        }
        Ok(())
    }

    async fn delete_all(&self, _policy: Option<&Policy>) -> RemoteResult<()> {
        self.entities.lock().unwrap().clear();
        Ok(())
    }

    async fn delete_by_id(&self, _policy: Option<&Policy>, ids: Vec<String>) -> RemoteResult<()> {
        self.entities
            .lock()
            .unwrap()
            .retain(|entity| !ids.contains(&entity.metadata.id));
        Ok(())
    }
}

/// Set when dropped, so tests can see a subscription being torn down.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Sends one page to each subscriber and then stays subscribed forever.
pub struct VisitStream {
    data_type: ManagedDataType,
    pub published: Mutex<Vec<RemoteEntity>>,
    pub subscription_dropped: Arc<AtomicBool>,
}

impl VisitStream {
    pub fn new() -> Self {
        Self {
            data_type: data_type(visit()),
            published: Mutex::new(Vec::new()),
            subscription_dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl RemoteServer for VisitStream {
    fn data_type(&self) -> &ManagedDataType {
        &self.data_type
    }
}

#[async_trait]
impl RemoteStreamServer for VisitStream {
    async fn publish(
        &self,
        _policy: Option<&Policy>,
        entities: Vec<RemoteEntity>,
    ) -> RemoteResult<()> {
        self.published.lock().unwrap().extend(entities);
        Ok(())
    }

    fn subscribe<'a>(&'a self, _policy: Option<&'a Policy>) -> PageStream<'a> {
        let guard = DropFlag(Arc::clone(&self.subscription_dropped));
        stream::unfold((guard, false), |(guard, sent)| async move {
            if sent {
                futures::future::pending::<()>().await;
            }
            Some((Ok(vec![RemoteEntity::new("visit-1", b"v".to_vec())]), (guard, true)))
        })
        .boxed()
    }
}

/// Compute service that summarizes, or panics for the "explode" method.
pub struct SummaryCompute {
    data_type: ManagedDataType,
}

impl SummaryCompute {
    pub fn new() -> Self {
        Self {
            data_type: data_type(summary()),
        }
    }
}

impl RemoteServer for SummaryCompute {
    fn data_type(&self) -> &ManagedDataType {
        &self.data_type
    }
}

impl RemoteComputeServer for SummaryCompute {
    fn run<'a>(
        &'a self,
        _policy: Option<&'a Policy>,
        method_id: &'a str,
        arguments: Vec<RemoteEntity>,
    ) -> PageStream<'a> {
        if method_id == "explode" {
            panic!("summary exploded");
        }
        let summary = RemoteEntity::new("summary", arguments.len().to_string().into_bytes());
        stream::iter([Ok(vec![summary])]).boxed()
    }
}

// ── Callback ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Data(RemoteResponse),
    Complete,
    Error(RemoteError),
}

/// Records every call the router makes on a caller's callback.
pub struct RecordingCallback {
    events: Mutex<Vec<Event>>,
    signals: Mutex<Vec<CancellationSignal>>,
    death: Mutex<Option<DeathRecipient>>,
    alive: AtomicBool,
    unlinks: AtomicUsize,
    data: Notify,
    panic_on_complete: bool,
}

impl RecordingCallback {
    pub fn new() -> Arc<Self> {
        Self::build(true, false)
    }

    /// A callback whose caller is gone before the request starts.
    pub fn dead() -> Arc<Self> {
        Self::build(false, false)
    }

    /// A callback whose transport fails while delivering completion.
    pub fn panicking_on_complete() -> Arc<Self> {
        Self::build(true, true)
    }

    fn build(alive: bool, panic_on_complete: bool) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            signals: Mutex::new(Vec::new()),
            death: Mutex::new(None),
            alive: AtomicBool::new(alive),
            unlinks: AtomicUsize::new(0),
            data: Notify::new(),
            panic_on_complete,
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn terminal_events(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| !matches!(event, Event::Data(_)))
            .collect()
    }

    pub fn data(&self) -> Vec<RemoteResponse> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Data(response) => Some(response),
                _ => None,
            })
            .collect()
    }

    pub fn error(&self) -> Option<RemoteError> {
        self.events().into_iter().find_map(|event| match event {
            Event::Error(err) => Some(err),
            _ => None,
        })
    }

    pub fn signal_count(&self) -> usize {
        self.signals.lock().unwrap().len()
    }

    pub fn signal(&self) -> CancellationSignal {
        self.signals.lock().unwrap()[0].clone()
    }

    pub fn unlink_count(&self) -> usize {
        self.unlinks.load(Ordering::SeqCst)
    }

    /// Simulates the caller's transport going away.
    pub fn die(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let recipient = self.death.lock().unwrap().clone();
        if let Some(recipient) = recipient {
            recipient.notify();
        }
    }

    pub async fn wait_for_data(&self) {
        tokio::time::timeout(WAIT, self.data.notified())
            .await
            .expect("no data within timeout");
    }
}

impl ResponseCallback for RecordingCallback {
    fn on_data(&self, response: RemoteResponse) {
        self.events.lock().unwrap().push(Event::Data(response));
        self.data.notify_one();
    }

    fn on_complete(&self) {
        if self.panic_on_complete {
            panic!("transport closed");
        }
        self.events.lock().unwrap().push(Event::Complete);
    }

    fn on_error(&self, error: RemoteError) {
        self.events.lock().unwrap().push(Event::Error(error));
    }

    fn provide_cancellation_signal(&self, signal: CancellationSignal) {
        self.signals.lock().unwrap().push(signal);
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn link_to_death(&self, recipient: DeathRecipient) -> bool {
        if !self.is_alive() {
            return false;
        }
        *self.death.lock().unwrap() = Some(recipient);
        true
    }

    fn unlink_to_death(&self, _request_id: RequestId) {
        self.unlinks.fetch_add(1, Ordering::SeqCst);
        self.death.lock().unwrap().take();
    }
}

// ── Assembly ─────────────────────────────────────────────────────

/// Routes log output through the test harness. Set `RUST_LOG=debug` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Fixture {
    pub router: RemoteRouter,
    pub broker: Arc<ConnectionBroker>,
    pub checker: Arc<DefaultRemotePolicyChecker>,
    pub store: Arc<PersonStore>,
    pub stream: Arc<VisitStream>,
}

pub fn fixture() -> Fixture {
    init_tracing();
    let store = Arc::new(PersonStore::with(vec![
        RemoteEntity::new("ada", b"Ada".to_vec()),
        RemoteEntity::new("grace", b"Grace".to_vec()),
        RemoteEntity::new("barbara", b"Barbara".to_vec()),
    ]));
    let stream = Arc::new(VisitStream::new());
    let compute = Arc::new(SummaryCompute::new());

    let context = DefaultRemoteContext::new([
        RemoteServerHandle::Store(store.clone()),
        RemoteServerHandle::Stream(stream.clone()),
        RemoteServerHandle::Compute(compute),
    ]);
    let shared = SharedContext::new(
        context.connection_providers(),
        PolicySet::new([people_policy(), sandboxed_policy()]),
        DataTypeDescriptorSet::new([person(), visit(), summary()]).unwrap(),
    )
    .unwrap();
    let broker = Arc::new(
        ConnectionBroker::new(
            shared,
            Arc::new(DefaultPolicyEngine),
            BrokerConfig::default(),
            Arc::new(StaticFlags(Flags::default())),
        )
        .unwrap(),
    );
    let checker = Arc::new(DefaultRemotePolicyChecker::new(Arc::clone(&broker)));
    let router = RemoteRouter::new(
        Arc::new(context),
        checker.clone(),
        Arc::new(DefaultHandlerFactory),
    );
    Fixture {
        router,
        broker,
        checker,
        store,
        stream,
    }
}

pub fn store_request(usage_type: &str, op: StoreOp) -> RemoteRequest {
    RemoteRequest::new(RemoteRequestMetadata::new(
        usage_type,
        RequestKind::Store {
            data_type_name: "Person".into(),
            op,
        },
    ))
}

pub fn stream_request(usage_type: &str, op: StreamOp) -> RemoteRequest {
    RemoteRequest::new(RemoteRequestMetadata::new(
        usage_type,
        RequestKind::Stream {
            data_type_name: "Visit".into(),
            op,
        },
    ))
}

pub fn compute_request(usage_type: &str, method_id: &str) -> RemoteRequest {
    RemoteRequest::new(RemoteRequestMetadata::new(
        usage_type,
        RequestKind::Compute {
            result_data_type_name: "Summary".into(),
            method_id: method_id.into(),
        },
    ))
}
