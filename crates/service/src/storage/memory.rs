use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::ServiceError;
use crate::storage::config_object::{ConfigObject, ConfigObjectApi, ObjectKey, Revision};

#[derive(Default)]
struct State {
    objects: HashMap<ObjectKey, (u64, BTreeMap<String, String>)>,
    generation: u64,
}

impl State {
    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// In-process config object store. Every write gets a fresh revision from a
/// store-wide counter, so a stale revision never matches again.
#[derive(Default)]
pub struct MemoryConfigObjects {
    state: Mutex<State>,
}

impl MemoryConfigObjects {
    pub fn new() -> Self { Self::default() }

    /// Unconditional write, as an operator editing the object by hand would do.
    pub async fn force_put(&self, key: &ObjectKey, data: BTreeMap<String, String>) -> Revision {
        let mut state = self.state.lock().await;
        let rev = state.bump();
        state.objects.insert(key.clone(), (rev, data));
        Revision::new(rev.to_string())
    }

    /// Drop an object; returns whether it existed.
    pub async fn remove(&self, key: &ObjectKey) -> bool {
        self.state.lock().await.objects.remove(key).is_some()
    }

    /// Number of writes accepted so far.
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }
}

#[async_trait]
impl ConfigObjectApi for MemoryConfigObjects {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, ServiceError> {
        let state = self.state.lock().await;
        Ok(state.objects.get(key).map(|(rev, data)| ConfigObject {
            key: key.clone(),
            revision: Revision::new(rev.to_string()),
            data: data.clone(),
        }))
    }

    async fn create(
        &self,
        key: &ObjectKey,
        data: BTreeMap<String, String>,
    ) -> Result<Revision, ServiceError> {
        let mut state = self.state.lock().await;
        if state.objects.contains_key(key) {
            return Err(ServiceError::Conflict(format!("config object {} already exists", key)));
        }
        let rev = state.bump();
        state.objects.insert(key.clone(), (rev, data));
        Ok(Revision::new(rev.to_string()))
    }

    async fn patch_entry(
        &self,
        key: &ObjectKey,
        expected: &Revision,
        entry: &str,
        value: String,
    ) -> Result<Revision, ServiceError> {
        let mut state = self.state.lock().await;
        let current = match state.objects.get(key) {
            Some((rev, _)) => *rev,
            None => {
                return Err(ServiceError::Conflict(format!("config object {} was deleted", key)))
            }
        };
        if current.to_string() != expected.as_str() {
            return Err(ServiceError::Conflict(format!(
                "config object {} modified: expected revision {}, found {}",
                key, expected, current
            )));
        }
        let rev = state.bump();
        if let Some((stored_rev, data)) = state.objects.get_mut(key) {
            *stored_rev = rev;
            data.insert(entry.to_string(), value);
        }
        Ok(Revision::new(rev.to_string()))
    }
}
