//! The connection broker.

use crate::config::{BrokerConfig, PolicyMode};
use crate::conformance::{DefaultPolicyConformanceCheck, PolicyConformanceCheck};
use crate::context::SharedContext;
use crate::engine::{PolicyCheckResult, PolicyEngine};
use crate::snapshot::AtomicSnapshot;
use pactum_types::{
    downcast_connection, Connection, ConnectionContext, ConnectionName, ConnectionRequest,
    FlagsReader, PactumError, PactumResult,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error};

/// Reader and writer connection names available for one data type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionNames {
    pub readers: BTreeSet<ConnectionName>,
    pub writers: BTreeSet<ConnectionName>,
}

/// Decides whether connection requests may be honored and hands out the
/// connections that pass.
pub struct ConnectionBroker {
    context: AtomicSnapshot<SharedContext>,
    engine: Arc<dyn PolicyEngine>,
    config: BrokerConfig,
    flags: Arc<dyn FlagsReader>,
}

impl ConnectionBroker {
    /// Creates a broker using the default conformance rules.
    pub fn new(
        context: SharedContext,
        engine: Arc<dyn PolicyEngine>,
        config: BrokerConfig,
        flags: Arc<dyn FlagsReader>,
    ) -> PactumResult<Self> {
        Self::with_conformance_check(context, engine, config, flags, &DefaultPolicyConformanceCheck)
    }

    /// Creates a broker, rejecting the policy set if it fails `conformance`.
    ///
    /// Write connections not covered by any policy are treated like any
    /// other policy failure: fatal in strict mode, logged in log mode.
    pub fn with_conformance_check(
        context: SharedContext,
        engine: Arc<dyn PolicyEngine>,
        config: BrokerConfig,
        flags: Arc<dyn FlagsReader>,
        conformance: &dyn PolicyConformanceCheck,
    ) -> PactumResult<Self> {
        conformance.check_policies_conform(context.policy_set())?;

        for provider in context.connection_providers() {
            debug!("ConnectionProvider: {}", provider.name());
        }

        let write_check = engine.check_write_connections(&context);
        let broker = Self {
            context: AtomicSnapshot::new(context),
            engine,
            config,
            flags,
        };
        if let PolicyCheckResult::Fail(reasons) = write_check {
            broker.handle_violation(PactumError::PolicyViolation(reasons))?;
        }
        Ok(broker)
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Current shared context.
    pub fn snapshot(&self) -> Arc<SharedContext> {
        self.context.load()
    }

    /// Decides a request and, if it passes, returns the connection.
    ///
    /// The only side effect of a successful call is that the requester joins
    /// the graph. No provider is called when an earlier check fails.
    pub fn get_connection(&self, request: &ConnectionRequest) -> PactumResult<Arc<dyn Connection>> {
        if self.flags.current().connections_disabled() {
            return Err(PactumError::Disabled("connections disabled via flags".into()));
        }

        if !request.requester.declares(&request.connection_name) {
            debug!(
                "Connection is not declared as required by the requester: {}",
                request
            );
            return Err(PactumError::ConnectionNotDeclared {
                connection: request.connection_name.to_string(),
                requester: request.requester.id().to_string(),
            });
        }

        let current = self.context.load();
        let provider = current
            .find_connection_provider(&request.connection_name)
            .cloned()
            .ok_or_else(|| PactumError::ConnectionProviderNotFound(request.to_string()))?;

        let policy = request.policy.as_deref();
        if let Some(policy) = policy
            && !current.policy_set().contains(policy)
        {
            self.handle_violation(PactumError::PolicyNotFound(policy.name.clone()))?;
        }
        if policy.is_none() && request.is_read_request() {
            self.handle_violation(PactumError::PolicyViolation(vec![
                "ConnectionRequest.policy must be set for read connection requests".into(),
            ]))?;
        }

        // The graph update and the policy check are one unit, so the engine
        // sees the requester as part of the graph.
        self.context.update(|existing| {
            let updated = existing.with_node(Arc::clone(&request.requester));
            if let Some(policy) = policy
                && request.is_read_request()
                && let PolicyCheckResult::Fail(reasons) =
                    self.engine.check_policy(policy, request, &updated)
            {
                self.handle_violation(PactumError::PolicyViolation(reasons))?;
            }
            Ok::<_, PactumError>(updated)
        })?;

        provider.get_connection(request)
    }

    /// Like [`get_connection`](Self::get_connection), discarding the reason
    /// for a failure.
    pub fn get_connection_or_none(
        &self,
        request: &ConnectionRequest,
    ) -> Option<Arc<dyn Connection>> {
        match self.get_connection(request) {
            Ok(connection) => Some(connection),
            Err(e) => {
                debug!("Connection request {} failed: {}", request, e);
                None
            }
        }
    }

    /// Like [`get_connection`](Self::get_connection), returning the concrete
    /// connection type.
    pub fn get_typed_connection<T: Connection>(
        &self,
        request: &ConnectionRequest,
    ) -> PactumResult<Arc<T>> {
        let connection = self.get_connection(request)?;
        downcast_connection::<T>(connection).ok_or_else(|| {
            PactumError::ConnectionProviderNotFound(format!(
                "{} (provider returned a different connection type)",
                request
            ))
        })
    }

    /// Connection names served for the named data type.
    pub fn available_connection_names(&self, data_type_name: &str) -> ConnectionNames {
        let context = self.context.load();
        context
            .connection_providers()
            .iter()
            .map(|p| p.data_type())
            .filter(|dt| dt.descriptor.name == data_type_name)
            .fold(ConnectionNames::default(), |mut acc, dt| {
                acc.readers.extend(dt.readers().cloned());
                acc.writers.extend(dt.writers().cloned());
                acc
            })
    }

    /// Replaces the connection context that policies' context rules are
    /// evaluated against.
    pub fn update_connection_context(&self, connection_context: ConnectionContext) {
        self.context
            .modify(|existing| existing.with_connection_context(connection_context.clone()));
    }

    fn handle_violation(&self, err: PactumError) -> PactumResult<()> {
        match self.config.policy_mode {
            PolicyMode::Strict => Err(err),
            PolicyMode::Log => {
                error!("Policy violation detected: {}", err);
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for ConnectionBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionBroker")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish()
    }
}
