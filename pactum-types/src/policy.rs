//! Policy model.
//!
//! A [`Policy`] names a set of [`PolicyTarget`]s, one per data type it
//! governs. Each target states how long data may be kept, on what medium,
//! and which usages each field permits. Policies are built with
//! [`PolicyBuilder`] and [`PolicyTargetBuilder`], which validate field paths
//! against the target's descriptor.

use crate::context_rule::ContextRule;
use crate::descriptor::{DataTypeDescriptor, FieldType};
use crate::error::{PactumError, PactumResult};
use crate::managed::{DeletionTrigger, ManagementStrategy, StorageMedia, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// How a field may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    Any,
    Egress,
    Join,
    Sandbox,
}

impl UsageType {
    /// Whether a usage set permits the field to leave the process.
    pub fn can_egress(usages: &BTreeSet<UsageType>) -> bool {
        usages.contains(&Self::Any) || usages.contains(&Self::Egress)
    }
}

/// Physical medium a retention rule allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMedium {
    Ram,
    Disk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRetention {
    pub medium: StorageMedium,
    pub encryption_required: bool,
}

/// Usage rules for one field (and, for nested types, its sub-fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyField {
    pub field_path: Vec<String>,
    pub raw_usages: BTreeSet<UsageType>,
    /// Usages allowed once a named transformation has been applied.
    #[serde(default)]
    pub conditional_usages: BTreeMap<String, BTreeSet<UsageType>>,
    #[serde(default)]
    pub subfields: Vec<PolicyField>,
}

impl PolicyField {
    /// Last element of the field path.
    pub fn name(&self) -> &str {
        self.field_path.last().map(String::as_str).unwrap_or_default()
    }
}

/// Rules for one governed data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTarget {
    pub schema_name: String,
    pub max_age: Duration,
    pub retentions: Vec<PolicyRetention>,
    pub fields: Vec<PolicyField>,
    #[serde(default)]
    pub deletion_triggers: Vec<DeletionTrigger>,
}

impl PolicyTarget {
    pub fn builder(descriptor: &DataTypeDescriptor, max_age: Duration) -> PolicyTargetBuilder {
        PolicyTargetBuilder::new(descriptor, max_age)
    }

    /// Expresses the retention rules as management strategies.
    ///
    /// A zero max age means nothing may be kept, so the only acceptable
    /// strategy is pass-through.
    pub fn retentions_as_strategies(&self) -> Vec<ManagementStrategy> {
        if self.max_age.is_zero() {
            return vec![ManagementStrategy::PassThru];
        }
        self.retentions
            .iter()
            .map(|retention| {
                let media = match retention.medium {
                    StorageMedium::Ram => StorageMedia::Memory,
                    StorageMedium::Disk => StorageMedia::LocalDisk,
                };
                ManagementStrategy::stored(retention.encryption_required, media, Some(self.max_age))
            })
            .collect()
    }
}

/// A named, registered usage policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub description: String,
    pub egress_type: String,
    pub targets: Vec<PolicyTarget>,
    #[serde(default)]
    pub configs: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub allowed_context: ContextRule,
}

impl Policy {
    pub fn builder(name: impl Into<String>, egress_type: impl Into<String>) -> PolicyBuilder {
        PolicyBuilder::new(name, egress_type)
    }

    pub fn target(&self, schema_name: &str) -> Option<&PolicyTarget> {
        self.targets.iter().find(|t| t.schema_name == schema_name)
    }
}

// ── Builders ────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PolicyBuilder {
    name: String,
    egress_type: String,
    description: String,
    targets: Vec<PolicyTarget>,
    configs: BTreeMap<String, BTreeMap<String, String>>,
    allowed_context: ContextRule,
}

impl PolicyBuilder {
    fn new(name: impl Into<String>, egress_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            egress_type: egress_type.into(),
            description: String::new(),
            targets: Vec::new(),
            configs: BTreeMap::new(),
            allowed_context: ContextRule::All,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn target(mut self, target: PolicyTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn config(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.configs
            .entry(name.into())
            .or_default()
            .extend(values);
        self
    }

    pub fn allowed_context(mut self, rule: ContextRule) -> Self {
        self.allowed_context = rule;
        self
    }

    /// Builds the policy. Conformance (non-blank description, retention
    /// presence) is checked when the broker is constructed, not here.
    pub fn build(self) -> Policy {
        Policy {
            name: self.name,
            description: self.description,
            egress_type: self.egress_type,
            targets: self.targets,
            configs: self.configs,
            allowed_context: self.allowed_context,
        }
    }
}

#[derive(Debug)]
pub struct PolicyTargetBuilder {
    descriptor: DataTypeDescriptor,
    max_age: Duration,
    retentions: Vec<PolicyRetention>,
    fields: Vec<PolicyField>,
    deletion_triggers: Vec<DeletionTrigger>,
    error: Option<PactumError>,
}

impl PolicyTargetBuilder {
    fn new(descriptor: &DataTypeDescriptor, max_age: Duration) -> Self {
        Self {
            descriptor: descriptor.clone(),
            max_age,
            retentions: Vec::new(),
            fields: Vec::new(),
            deletion_triggers: Vec::new(),
            error: None,
        }
    }

    pub fn retention(mut self, medium: StorageMedium, encryption_required: bool) -> Self {
        self.retentions.push(PolicyRetention {
            medium,
            encryption_required,
        });
        self
    }

    pub fn deletion_trigger(mut self, trigger: Trigger, target_field: impl Into<String>) -> Self {
        let target_field = target_field.into();
        if !self.descriptor.fields.contains_key(&target_field) {
            self.error.get_or_insert(PactumError::FieldNotFound {
                descriptor: self.descriptor.name.clone(),
                field: target_field.clone(),
            });
        }
        self.deletion_triggers
            .push(DeletionTrigger::new(trigger, target_field));
        self
    }

    /// Declares usage rules for a top-level field of the target type.
    pub fn field(
        mut self,
        name: &str,
        configure: impl FnOnce(PolicyFieldBuilder) -> PolicyFieldBuilder,
    ) -> Self {
        let builder = PolicyFieldBuilder::new(&self.descriptor, Vec::new(), name);
        match configure(builder).build() {
            Ok(field) => self.fields.push(field),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    pub fn build(self) -> PactumResult<PolicyTarget> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(PolicyTarget {
            schema_name: self.descriptor.name,
            max_age: self.max_age,
            retentions: self.retentions,
            fields: self.fields,
            deletion_triggers: self.deletion_triggers,
        })
    }
}

#[derive(Debug)]
pub struct PolicyFieldBuilder {
    /// Descriptor of the type this field's sub-fields live in, if nested.
    nested: Option<DataTypeDescriptor>,
    field_path: Vec<String>,
    raw_usages: BTreeSet<UsageType>,
    conditional_usages: BTreeMap<String, BTreeSet<UsageType>>,
    subfields: Vec<PolicyField>,
    error: Option<PactumError>,
}

impl PolicyFieldBuilder {
    fn new(owner: &DataTypeDescriptor, mut parent_path: Vec<String>, name: &str) -> Self {
        parent_path.push(name.to_string());
        let mut error = None;
        let nested = match owner.fields.get(name) {
            None => {
                error = Some(PactumError::FieldNotFound {
                    descriptor: owner.name.clone(),
                    field: name.to_string(),
                });
                None
            }
            Some(field_type) => nested_descriptor(owner, field_type),
        };
        Self {
            nested,
            field_path: parent_path,
            raw_usages: BTreeSet::new(),
            conditional_usages: BTreeMap::new(),
            subfields: Vec::new(),
            error,
        }
    }

    pub fn raw_usage(mut self, usages: &[UsageType]) -> Self {
        self.raw_usages.extend(usages.iter().copied());
        self
    }

    pub fn conditional_usage(mut self, transform: impl Into<String>, usages: &[UsageType]) -> Self {
        self.conditional_usages
            .entry(transform.into())
            .or_default()
            .extend(usages.iter().copied());
        self
    }

    /// Declares usage rules for a field of the nested type.
    pub fn field(
        mut self,
        name: &str,
        configure: impl FnOnce(PolicyFieldBuilder) -> PolicyFieldBuilder,
    ) -> Self {
        let Some(nested) = &self.nested else {
            self.error.get_or_insert(PactumError::FieldNotFound {
                descriptor: self.field_path.join("."),
                field: name.to_string(),
            });
            return self;
        };
        let builder = PolicyFieldBuilder::new(nested, self.field_path.clone(), name);
        match configure(builder).build() {
            Ok(field) => self.subfields.push(field),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    fn build(self) -> PactumResult<PolicyField> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(PolicyField {
            field_path: self.field_path,
            raw_usages: self.raw_usages,
            conditional_usages: self.conditional_usages,
            subfields: self.subfields,
        })
    }
}

fn nested_descriptor(
    owner: &DataTypeDescriptor,
    field_type: &FieldType,
) -> Option<DataTypeDescriptor> {
    let name = match field_type {
        FieldType::Reference(_) => return None,
        other => other.referenced_descriptor()?,
    };
    owner.inner_type(name).cloned()
}
