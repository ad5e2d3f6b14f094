//! Policy engine SPI and the default engine.
//!
//! An engine is a pure decision function. The broker calls it from inside
//! its copy-on-write update, so it may run more than once per request and
//! from many threads at once.

use crate::context::SharedContext;
use pactum_types::{
    ConnectionRequest, DataTypeDescriptor, FieldType, PactumError, PactumResult, Policy,
    PolicyField, UsageType,
};
use std::cmp::Ordering;

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCheckResult {
    Pass,
    /// Human-readable reasons, never empty.
    Fail(Vec<String>),
}

impl PolicyCheckResult {
    /// `Pass` if there are no violations.
    pub fn from_violations(violations: Vec<String>) -> Self {
        if violations.is_empty() {
            Self::Pass
        } else {
            Self::Fail(violations)
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn into_result(self) -> PactumResult<()> {
        match self {
            Self::Pass => Ok(()),
            Self::Fail(reasons) => Err(PactumError::PolicyViolation(reasons)),
        }
    }
}

pub trait PolicyEngine: Send + Sync {
    /// Checks whether `request` may proceed under `policy` given `context`.
    fn check_policy(
        &self,
        policy: &Policy,
        request: &ConnectionRequest,
        context: &SharedContext,
    ) -> PolicyCheckResult;

    /// Checks that every declared write connection is covered by a policy.
    fn check_write_connections(&self, context: &SharedContext) -> PolicyCheckResult;
}

const MUST_HAVE_POLICY: &str = "\"must have a corresponding policy\"";
const NOT_STRICT_ENOUGH: &str =
    "\"management is at least as restrained as the most conservative policy\"";
const CONNECTION_NOT_FOUND: &str = "not a registered connection";
const DESCRIPTOR_NOT_IN_POLICY: &str = "not found in the given policy";
const FIELD_CANNOT_EGRESS: &str = "not allowed for egress";

/// Engine that checks management strategies, field egress and context rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicyEngine;

impl PolicyEngine for DefaultPolicyEngine {
    fn check_policy(
        &self,
        policy: &Policy,
        request: &ConnectionRequest,
        context: &SharedContext,
    ) -> PolicyCheckResult {
        let mut violations = verify_management_strategies(policy, context);
        violations.extend(check_fields_allowed_for_egress(policy, request, context));
        if !policy.allowed_context.evaluate(context.connection_context()) {
            violations.push(format!(
                "c:{} is not allowed in the current connection context",
                policy.name
            ));
        }
        PolicyCheckResult::from_violations(violations)
    }

    fn check_write_connections(&self, context: &SharedContext) -> PolicyCheckResult {
        let mut violations = Vec::new();
        for provider in context.connection_providers() {
            let data_type = provider.data_type();
            if data_type.writers().next().is_none() {
                continue;
            }
            let name = &data_type.descriptor.name;
            let strategies = context.policy_set().management_strategies(&data_type.descriptor);
            if strategies.is_empty() {
                violations.push(format!("h:{name} is {MUST_HAVE_POLICY}"));
            } else if strategies.iter().all(|s| {
                data_type.management_strategy.restraint_cmp(s) == Ordering::Greater
            }) {
                violations.push(format!("h:{name} is {NOT_STRICT_ENOUGH}"));
            }
        }
        PolicyCheckResult::from_violations(violations)
    }
}

// ── Management strategies ───────────────────────────────────────

fn verify_management_strategies(policy: &Policy, context: &SharedContext) -> Vec<String> {
    let mut violations = Vec::new();
    for target in &policy.targets {
        // Targets for types nobody serves are harmless.
        let Some(data_type) = context.find_managed_data_type(&target.schema_name) else {
            continue;
        };
        let strategy = &data_type.management_strategy;
        let name = &data_type.descriptor.name;

        let retention_ok = target
            .retentions_as_strategies()
            .iter()
            .any(|allowed| strategy.restraint_cmp(allowed) != Ordering::Greater);
        if !retention_ok {
            let max_age_ms = target.max_age.as_millis();
            violations.extend(
                target
                    .retentions
                    .iter()
                    .map(|r| format!("h:{name} is {r:?} with max_age_ms = {max_age_ms}")),
            );
        }

        violations.extend(
            target
                .deletion_triggers
                .iter()
                .filter(|trigger| !strategy.honors(trigger))
                .map(|trigger| format!("h:{name} is {trigger:?}")),
        );
    }
    violations
}

// ── Field egress ────────────────────────────────────────────────

fn check_fields_allowed_for_egress(
    policy: &Policy,
    request: &ConnectionRequest,
    context: &SharedContext,
) -> Vec<String> {
    let Some(descriptor) = context.find_data_type(&request.connection_name) else {
        return vec![format!("s:{} is {CONNECTION_NOT_FOUND}", request.connection_name)];
    };
    let Some(target) = policy.target(&descriptor.name) else {
        return vec![format!("s:{} is {DESCRIPTOR_NOT_IN_POLICY}", descriptor.name)];
    };

    let walker = EgressWalker {
        context,
        sandboxed: request.requester.is_sandboxed(),
    };
    let fields: Vec<&PolicyField> = target.fields.iter().collect();
    walker
        .descriptor_violations(&descriptor.name, descriptor, &fields)
        .into_iter()
        .map(|field| format!("s:{field} is {FIELD_CANNOT_EGRESS}"))
        .collect()
}

struct EgressWalker<'a> {
    context: &'a SharedContext,
    sandboxed: bool,
}

impl EgressWalker<'_> {
    fn violates(&self, field: &PolicyField) -> bool {
        let allowed = UsageType::can_egress(&field.raw_usages)
            || (self.sandboxed && field.raw_usages.contains(&UsageType::Sandbox));
        !allowed
    }

    /// Every field of `descriptor` needs a matching policy field that allows
    /// egress. Returns the dotted paths of the fields that do not.
    fn descriptor_violations(
        &self,
        prefix: &str,
        descriptor: &DataTypeDescriptor,
        policy_fields: &[&PolicyField],
    ) -> Vec<String> {
        let mut violations = Vec::new();
        for (field_name, field_type) in &descriptor.fields {
            let path = format!("{prefix}.{field_name}");
            match policy_fields.iter().find(|f| f.name() == field_name) {
                Some(policy_field) => {
                    violations.extend(self.field_violations(path, field_type, policy_field));
                }
                None => violations.push(path),
            }
        }
        violations
    }

    fn field_violations(
        &self,
        path: String,
        field_type: &FieldType,
        policy_field: &PolicyField,
    ) -> Vec<String> {
        match field_type {
            FieldType::Array(item) | FieldType::List(item) | FieldType::Nullable(item) => {
                self.field_violations(path, item, policy_field)
            }
            FieldType::Nested(name) => {
                match self.context.data_type_descriptor_set().get(name) {
                    Some(nested) => {
                        let subfields: Vec<&PolicyField> = policy_field.subfields.iter().collect();
                        self.descriptor_violations(&path, nested, &subfields)
                    }
                    None => vec![path],
                }
            }
            // References and tuples cannot be described by a policy yet.
            FieldType::Reference(_) | FieldType::Tuple(_) => vec![path],
            _ if self.violates(policy_field) => vec![path],
            _ => Vec::new(),
        }
    }
}
