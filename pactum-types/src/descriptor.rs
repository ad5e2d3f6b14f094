//! Data type descriptors.
//!
//! A descriptor is the structural description of one governed data type: its
//! name, its fields, and the nested descriptors those fields refer to. The
//! name is a global key. Two descriptors registered under the same name must
//! be structurally equal.

use crate::error::{PactumError, PactumResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The type of a single field within a [`DataTypeDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "of", rename_all = "snake_case")]
pub enum FieldType {
    Boolean,
    Byte,
    ByteArray,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Char,
    Instant,
    Duration,
    Enum { name: String, values: Vec<String> },
    Array(Box<FieldType>),
    List(Box<FieldType>),
    /// A nested descriptor, by name.
    Nested(String),
    Nullable(Box<FieldType>),
    /// A reference to a descriptor stored elsewhere, by name.
    Reference(String),
    Opaque(String),
    Tuple(Vec<FieldType>),
}

impl FieldType {
    /// Returns the name of the descriptor this field ultimately points at,
    /// looking through collection and nullable wrappers.
    pub fn referenced_descriptor(&self) -> Option<&str> {
        match self {
            Self::Nested(name) | Self::Reference(name) => Some(name),
            Self::Array(item) | Self::List(item) | Self::Nullable(item) => {
                item.referenced_descriptor()
            }
            _ => None,
        }
    }
}

/// Structural description of a data type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataTypeDescriptor {
    /// Globally unique name.
    pub name: String,
    /// Field name to field type.
    pub fields: BTreeMap<String, FieldType>,
    /// Descriptors declared inside this one.
    pub inner_types: BTreeSet<DataTypeDescriptor>,
    /// Identity of the Rust type this descriptor was built for.
    pub type_name: String,
}

impl DataTypeDescriptor {
    /// Starts a descriptor for the Rust type `T`.
    pub fn builder<T: ?Sized + 'static>(name: impl Into<String>) -> DataTypeDescriptorBuilder {
        DataTypeDescriptorBuilder::new(name, std::any::type_name::<T>())
    }

    /// Starts a descriptor with an explicit type identity.
    pub fn builder_for(
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> DataTypeDescriptorBuilder {
        DataTypeDescriptorBuilder::new(name, type_name)
    }

    /// Finds a descriptor declared inside this one (at any depth).
    pub fn inner_type(&self, name: &str) -> Option<&DataTypeDescriptor> {
        self.inner_types.iter().find_map(|inner| {
            if inner.name == name {
                Some(inner)
            } else {
                inner.inner_type(name)
            }
        })
    }
}

/// Builder for [`DataTypeDescriptor`].
#[derive(Debug)]
pub struct DataTypeDescriptorBuilder {
    name: String,
    type_name: String,
    fields: BTreeMap<String, FieldType>,
    inner_types: BTreeMap<String, DataTypeDescriptor>,
    error: Option<PactumError>,
}

impl DataTypeDescriptorBuilder {
    fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            fields: BTreeMap::new(),
            inner_types: BTreeMap::new(),
            error: None,
        }
    }

    /// Adds a field.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), field_type);
        self
    }

    /// Declares a nested descriptor without adding a field for it.
    pub fn inner_type(mut self, descriptor: DataTypeDescriptor) -> Self {
        match self.inner_types.get(&descriptor.name) {
            Some(existing) if *existing != descriptor => {
                self.error
                    .get_or_insert(PactumError::DuplicateDescriptor(descriptor.name.clone()));
            }
            Some(_) => {}
            None => {
                self.inner_types.insert(descriptor.name.clone(), descriptor);
            }
        }
        self
    }

    /// Adds a field holding the given nested descriptor and declares it.
    pub fn nested(self, name: impl Into<String>, descriptor: DataTypeDescriptor) -> Self {
        let field_type = FieldType::Nested(descriptor.name.clone());
        self.inner_type(descriptor).field(name, field_type)
    }

    pub fn build(self) -> PactumResult<DataTypeDescriptor> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(DataTypeDescriptor {
            name: self.name,
            fields: self.fields,
            inner_types: self.inner_types.into_values().collect(),
            type_name: self.type_name,
        })
    }
}

// ── Descriptor set ──────────────────────────────────────────────

/// Registry of every descriptor known to the process, nested ones included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTypeDescriptorSet {
    roots: BTreeSet<DataTypeDescriptor>,
    by_name: BTreeMap<String, DataTypeDescriptor>,
    by_type: BTreeMap<String, String>,
}

impl DataTypeDescriptorSet {
    /// Builds the set, flattening nested descriptors into the name index.
    pub fn new(descriptors: impl IntoIterator<Item = DataTypeDescriptor>) -> PactumResult<Self> {
        let mut set = Self::default();
        for descriptor in descriptors {
            set.index(&descriptor)?;
            set.roots.insert(descriptor);
        }
        Ok(set)
    }

    fn index(&mut self, descriptor: &DataTypeDescriptor) -> PactumResult<()> {
        match self.by_name.get(&descriptor.name) {
            Some(existing) if existing != descriptor => {
                return Err(PactumError::DuplicateDescriptor(descriptor.name.clone()));
            }
            Some(_) => return Ok(()),
            None => {}
        }
        self.by_name
            .insert(descriptor.name.clone(), descriptor.clone());
        self.by_type
            .entry(descriptor.type_name.clone())
            .or_insert_with(|| descriptor.name.clone());
        for inner in &descriptor.inner_types {
            self.index(inner)?;
        }
        Ok(())
    }

    /// Looks up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&DataTypeDescriptor> {
        self.by_name.get(name)
    }

    /// Looks up a descriptor by name, failing with `DescriptorNotFound`.
    pub fn require(&self, name: &str) -> PactumResult<&DataTypeDescriptor> {
        self.get(name)
            .ok_or_else(|| PactumError::DescriptorNotFound(name.to_string()))
    }

    /// Looks up the descriptor built for the Rust type `T`.
    pub fn find_by_type<T: ?Sized + 'static>(&self) -> Option<&DataTypeDescriptor> {
        self.by_type
            .get(std::any::type_name::<T>())
            .and_then(|name| self.by_name.get(name))
    }

    /// Resolves the descriptor a field type points at, if any.
    pub fn find_for_field_type(&self, field_type: &FieldType) -> Option<&DataTypeDescriptor> {
        field_type
            .referenced_descriptor()
            .and_then(|name| self.get(name))
    }

    /// Resolves a dotted access path (already split) to the type of the
    /// field it names, descending through nested and referenced descriptors.
    pub fn find_field_type<'a>(
        &'a self,
        descriptor: &'a DataTypeDescriptor,
        access_path: &[&str],
    ) -> PactumResult<&'a FieldType> {
        let not_found = |field: &str| PactumError::FieldNotFound {
            descriptor: descriptor.name.clone(),
            field: field.to_string(),
        };

        let (last, parents) = access_path
            .split_last()
            .ok_or_else(|| not_found(""))?;
        let mut current = descriptor;
        for part in parents {
            let field_type = current.fields.get(*part).ok_or_else(|| not_found(part))?;
            current = self
                .find_for_field_type(field_type)
                .ok_or_else(|| not_found(part))?;
        }
        current.fields.get(*last).ok_or_else(|| not_found(last))
    }

    /// Iterates over the top-level descriptors the set was built from.
    pub fn iter(&self) -> impl Iterator<Item = &DataTypeDescriptor> {
        self.roots.iter()
    }

    /// Number of descriptors, nested ones included.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
