//! Shared test fixtures for broker tests: the `Person` data type, the
//! `PeopleProtoPolicy`, and spy providers/engines that count calls.

#![allow(dead_code)]

use pactum_broker::{
    BrokerConfig, ConnectionBroker, ConnectionProvider, DefaultPolicyEngine, PolicyCheckResult,
    PolicyEngine, SharedContext,
};
use pactum_types::{
    Connection, ConnectionName, ConnectionRequest, DataTypeDescriptor, DataTypeDescriptorSet,
    FieldType, Flags, FlagsReader, ManagedDataType, ManagementStrategy, PactumResult, Policy,
    PolicySet, PolicyTarget, ProcessorNode, StaticFlags, StaticProcessorNode, StorageMedia,
    StorageMedium, UsageType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DAY: Duration = Duration::from_secs(86_400);

pub struct Person;

pub fn person_descriptor() -> DataTypeDescriptor {
    DataTypeDescriptor::builder::<Person>("Person")
        .field("name", FieldType::String)
        .field("age", FieldType::Integer)
        .build()
        .unwrap()
}

pub fn people_reader() -> ConnectionName {
    ConnectionName::reader("PeopleReader")
}

pub fn people_writer() -> ConnectionName {
    ConnectionName::writer("PeopleWriter")
}

pub fn people_policy() -> Policy {
    Policy::builder("PeopleProtoPolicy", "None")
        .description("People may be kept on disk and used for anything")
        .target(
            PolicyTarget::builder(&person_descriptor(), DAY)
                .retention(StorageMedium::Disk, false)
                .field("name", |f| f.raw_usage(&[UsageType::Any]))
                .field("age", |f| f.raw_usage(&[UsageType::Any]))
                .build()
                .unwrap(),
        )
        .build()
}

// ── Connections ──────────────────────────────────────────────────

pub struct PeopleReader {
    pub people: Vec<String>,
}

impl PeopleReader {
    pub fn fetch_all(&self) -> Vec<String> {
        self.people.clone()
    }
}

impl Connection for PeopleReader {
    fn connection_name(&self) -> ConnectionName {
        people_reader()
    }
}

pub struct PeopleWriter;

impl Connection for PeopleWriter {
    fn connection_name(&self) -> ConnectionName {
        people_writer()
    }
}

// ── Providers ────────────────────────────────────────────────────

/// Provider for `Person` that counts how often it hands out connections.
pub struct PersonProvider {
    data_type: ManagedDataType,
    pub calls: AtomicUsize,
}

impl PersonProvider {
    pub fn new(strategy: ManagementStrategy) -> Self {
        Self {
            data_type: ManagedDataType::new(
                person_descriptor(),
                strategy,
                [people_reader(), people_writer()],
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for PersonProvider {
    fn default() -> Self {
        Self::new(ManagementStrategy::stored(false, StorageMedia::LocalDisk, Some(DAY)))
    }
}

impl ConnectionProvider for PersonProvider {
    fn data_type(&self) -> &ManagedDataType {
        &self.data_type
    }

    fn get_connection(&self, request: &ConnectionRequest) -> PactumResult<Arc<dyn Connection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.connection_name.is_read() {
            Ok(Arc::new(PeopleReader {
                people: vec!["Ada".into(), "Grace".into()],
            }))
        } else {
            Ok(Arc::new(PeopleWriter))
        }
    }
}

// ── Engines ──────────────────────────────────────────────────────

/// Delegates to the default engine and counts policy checks.
#[derive(Default)]
pub struct CountingEngine {
    inner: DefaultPolicyEngine,
    pub policy_checks: AtomicUsize,
}

impl CountingEngine {
    pub fn policy_checks(&self) -> usize {
        self.policy_checks.load(Ordering::SeqCst)
    }
}

impl PolicyEngine for CountingEngine {
    fn check_policy(
        &self,
        policy: &Policy,
        request: &ConnectionRequest,
        context: &SharedContext,
    ) -> PolicyCheckResult {
        self.policy_checks.fetch_add(1, Ordering::SeqCst);
        self.inner.check_policy(policy, request, context)
    }

    fn check_write_connections(&self, context: &SharedContext) -> PolicyCheckResult {
        self.inner.check_write_connections(context)
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

pub fn context_with(provider: Arc<PersonProvider>, policies: Vec<Policy>) -> SharedContext {
    SharedContext::new(
        vec![provider as Arc<dyn ConnectionProvider>],
        PolicySet::new(policies),
        DataTypeDescriptorSet::new([person_descriptor()]).unwrap(),
    )
    .unwrap()
}

pub struct Fixture {
    pub broker: ConnectionBroker,
    pub provider: Arc<PersonProvider>,
    pub engine: Arc<CountingEngine>,
}

pub fn fixture_with(config: BrokerConfig, flags: Arc<dyn FlagsReader>) -> Fixture {
    init_tracing();
    let provider = Arc::new(PersonProvider::default());
    let engine = Arc::new(CountingEngine::default());
    let broker = ConnectionBroker::new(
        context_with(Arc::clone(&provider), vec![people_policy()]),
        engine.clone(),
        config,
        flags,
    )
    .unwrap();
    Fixture {
        broker,
        provider,
        engine,
    }
}

pub fn fixture() -> Fixture {
    fixture_with(BrokerConfig::default(), Arc::new(StaticFlags(Flags::default())))
}

pub fn requester(connections: impl IntoIterator<Item = ConnectionName>) -> Arc<dyn ProcessorNode> {
    Arc::new(StaticProcessorNode::new("test-requester", connections))
}

pub fn read_request(node: Arc<dyn ProcessorNode>) -> ConnectionRequest {
    ConnectionRequest::new(people_reader(), node, Some(Arc::new(people_policy())))
}
