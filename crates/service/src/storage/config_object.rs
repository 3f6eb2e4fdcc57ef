use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Address of a config object: namespace plus object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Opaque version tag handed out by the backend on every read and write.
/// Only equality is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(tag: impl Into<String>) -> Self { Self(tag.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A config object as read from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigObject {
    pub key: ObjectKey,
    pub revision: Revision,
    pub data: BTreeMap<String, String>,
}

/// Trait abstraction for the external key-value config object store.
/// Implementations can be in-memory, file-backed, or a cluster API client.
///
/// Writes are conditional: `create` fails with [`ServiceError::Conflict`] when
/// the object already exists, `patch_entry` when the stored revision is no
/// longer `expected`.
#[async_trait]
pub trait ConfigObjectApi: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, ServiceError>;
    async fn create(
        &self,
        key: &ObjectKey,
        data: BTreeMap<String, String>,
    ) -> Result<Revision, ServiceError>;
    /// Replace a single data entry, leaving the others as they are.
    async fn patch_entry(
        &self,
        key: &ObjectKey,
        expected: &Revision,
        entry: &str,
        value: String,
    ) -> Result<Revision, ServiceError>;
}
