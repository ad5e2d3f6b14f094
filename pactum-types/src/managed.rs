//! Managed data types and their storage management strategies.

use crate::connection::ConnectionName;
use crate::descriptor::DataTypeDescriptor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Duration;

/// Where stored data physically lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMedia {
    Memory,
    LocalDisk,
    RemoteDisk,
}

impl StorageMedia {
    /// Higher is more dangerous.
    pub fn danger(&self) -> u8 {
        match self {
            Self::Memory => 0,
            Self::LocalDisk => 1,
            Self::RemoteDisk => 2,
        }
    }
}

/// Event that requires stored data to be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    PackageUninstalled,
    PackageDataCleared,
}

/// A deletion trigger bound to the field that identifies affected entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeletionTrigger {
    pub trigger: Trigger,
    pub target_field: String,
}

impl DeletionTrigger {
    pub fn new(trigger: Trigger, target_field: impl Into<String>) -> Self {
        Self {
            trigger,
            target_field: target_field.into(),
        }
    }
}

/// How a provider manages the data it serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ManagementStrategy {
    /// Data is never retained.
    PassThru,
    Stored {
        encrypted: bool,
        media: StorageMedia,
        ttl: Option<Duration>,
        #[serde(default)]
        deletion_triggers: BTreeSet<DeletionTrigger>,
    },
}

impl ManagementStrategy {
    pub fn stored(encrypted: bool, media: StorageMedia, ttl: Option<Duration>) -> Self {
        Self::Stored {
            encrypted,
            media,
            ttl,
            deletion_triggers: BTreeSet::new(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::PassThru => None,
            Self::Stored { ttl, .. } => *ttl,
        }
    }

    /// Whether data managed this way is removed when `trigger` fires.
    pub fn honors(&self, trigger: &DeletionTrigger) -> bool {
        match self {
            Self::PassThru => true,
            Self::Stored {
                deletion_triggers, ..
            } => deletion_triggers.contains(trigger),
        }
    }

    /// Orders strategies by restraint: `Less` means `self` is more
    /// restrained than `other`.
    ///
    /// `PassThru` is the most restrained. Stored strategies compare by media
    /// danger, then encrypted before unencrypted, then shorter TTL first
    /// (no TTL counts as zero).
    pub fn restraint_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::PassThru, Self::PassThru) => Ordering::Equal,
            (Self::PassThru, _) => Ordering::Less,
            (_, Self::PassThru) => Ordering::Greater,
            (
                Self::Stored {
                    encrypted: a_enc,
                    media: a_media,
                    ttl: a_ttl,
                    ..
                },
                Self::Stored {
                    encrypted: b_enc,
                    media: b_media,
                    ttl: b_ttl,
                    ..
                },
            ) => a_media
                .danger()
                .cmp(&b_media.danger())
                .then_with(|| b_enc.cmp(a_enc))
                .then_with(|| {
                    a_ttl
                        .unwrap_or_default()
                        .cmp(&b_ttl.unwrap_or_default())
                }),
        }
    }
}

/// A data type as served by one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedDataType {
    pub descriptor: DataTypeDescriptor,
    pub management_strategy: ManagementStrategy,
    pub connection_names: BTreeSet<ConnectionName>,
}

impl ManagedDataType {
    pub fn new(
        descriptor: DataTypeDescriptor,
        management_strategy: ManagementStrategy,
        connection_names: impl IntoIterator<Item = ConnectionName>,
    ) -> Self {
        Self {
            descriptor,
            management_strategy,
            connection_names: connection_names.into_iter().collect(),
        }
    }

    /// Adds the reader and writer names remote clients use for this type.
    pub fn with_remote_connections(mut self) -> Self {
        self.connection_names
            .insert(ConnectionName::remote_reader(&self.descriptor.name));
        self.connection_names
            .insert(ConnectionName::remote_writer(&self.descriptor.name));
        self
    }

    pub fn readers(&self) -> impl Iterator<Item = &ConnectionName> {
        self.connection_names.iter().filter(|name| name.is_read())
    }

    pub fn writers(&self) -> impl Iterator<Item = &ConnectionName> {
        self.connection_names.iter().filter(|name| name.is_write())
    }
}
