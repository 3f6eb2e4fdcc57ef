use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::ServiceError;
use crate::storage::config_object::{ConfigObject, ConfigObjectApi, ObjectKey, Revision};

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileState {
    generation: u64,
    objects: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    namespace: String,
    name: String,
    revision: u64,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

/// Config objects persisted together in one JSON file.
///
/// Nothing is cached: every call re-reads the file. Writers take an exclusive
/// OS lock on a sibling `<file>.lock` for the whole read, check and replace, so
/// any number of handles or processes sharing the path see a single
/// revision sequence. The new state goes to a uniquely named temp file in the
/// same directory and is renamed into place.
pub struct JsonFileConfigObjects {
    file_path: PathBuf,
}

fn storage_err(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn decode_state(path: &Path, bytes: &[u8]) -> Result<FileState, ServiceError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ServiceError::Storage(format!("{}: {}", path.display(), e)))
}

// A missing file after initialization is an error: starting over from an
// empty state would hand out revisions that were already issued.
fn read_state(path: &Path) -> Result<FileState, ServiceError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ServiceError::Storage(format!("{}: {}", path.display(), e)))?;
    decode_state(path, &bytes)
}

fn write_state(path: &Path, state: &FileState) -> Result<(), ServiceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(storage_err)?;
    serde_json::to_writer_pretty(&mut tmp, state).map_err(storage_err)?;
    tmp.as_file().sync_all().map_err(storage_err)?;
    tmp.persist(path).map_err(storage_err)?;
    debug!(path = %path.display(), generation = state.generation, "config objects persisted");
    Ok(())
}

impl JsonFileConfigObjects {
    /// Initialize the store from a path. Creates the file with no objects if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(storage_err)?;
        }
        let store = Self { file_path };
        store
            .locked(|path| {
                if !path.exists() {
                    write_state(path, &FileState::default())?;
                }
                Ok(())
            })
            .await?;
        Ok(store)
    }

    /// Run `f` against the data file while holding the exclusive lock.
    async fn locked<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, ServiceError> + Send + 'static,
    {
        let path = self.file_path.clone();
        tokio::task::spawn_blocking(move || {
            let lock_file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(lock_path(&path))
                .map_err(storage_err)?;
            let mut lock = RwLock::new(lock_file);
            let _guard = lock.write().map_err(storage_err)?;
            f(&path)
        })
        .await
        .map_err(storage_err)?
    }
}

#[async_trait]
impl ConfigObjectApi for JsonFileConfigObjects {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, ServiceError> {
        let bytes = tokio::fs::read(&self.file_path)
            .await
            .map_err(|e| ServiceError::Storage(format!("{}: {}", self.file_path.display(), e)))?;
        let state = decode_state(&self.file_path, &bytes)?;
        Ok(state.objects.get(&key.to_string()).map(|e| ConfigObject {
            key: key.clone(),
            revision: Revision::new(e.revision.to_string()),
            data: e.data.clone(),
        }))
    }

    async fn create(
        &self,
        key: &ObjectKey,
        data: BTreeMap<String, String>,
    ) -> Result<Revision, ServiceError> {
        let key = key.clone();
        self.locked(move |path| {
            let mut state = read_state(path)?;
            if state.objects.contains_key(&key.to_string()) {
                return Err(ServiceError::Conflict(format!(
                    "config object {} already exists",
                    key
                )));
            }
            state.generation += 1;
            let rev = state.generation;
            state.objects.insert(
                key.to_string(),
                FileEntry {
                    namespace: key.namespace.clone(),
                    name: key.name.clone(),
                    revision: rev,
                    data,
                },
            );
            write_state(path, &state)?;
            Ok(Revision::new(rev.to_string()))
        })
        .await
    }

    async fn patch_entry(
        &self,
        key: &ObjectKey,
        expected: &Revision,
        entry: &str,
        value: String,
    ) -> Result<Revision, ServiceError> {
        let key = key.clone();
        let expected = expected.clone();
        let entry = entry.to_string();
        self.locked(move |path| {
            let mut state = read_state(path)?;
            state.generation += 1;
            let rev = state.generation;
            let existing = state.objects.get_mut(&key.to_string()).ok_or_else(|| {
                ServiceError::Conflict(format!("config object {} was deleted", key))
            })?;
            if existing.revision.to_string() != expected.as_str() {
                return Err(ServiceError::Conflict(format!(
                    "config object {} modified: expected revision {}, found {}",
                    key, expected, existing.revision
                )));
            }
            existing.revision = rev;
            existing.data.insert(entry, value);
            write_state(path, &state)?;
            Ok(Revision::new(rev.to_string()))
        })
        .await
    }
}
