use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::{debug, warn};

use super::domain::{ApplicationId, JobApplication};

/// Slot holding the JSON encoded application list.
pub const APPLICATIONS_KEY: &str = "job_applications";

/// String slots addressed by key, standing in for browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Read one slot and write back what `apply` returns, with no other write
    /// to the same slot landing in between. `apply` receives the outcome of
    /// the read so callers decide how to treat an unreadable slot.
    fn update(&self, key: &str, apply: &mut SlotUpdate<'_>) -> Result<(), StoreError>;
}

pub type SlotUpdate<'a> =
    dyn FnMut(Result<Option<String>, StoreError>) -> Result<String, StoreError> + 'a;

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded writing '{key}': {required} bytes needed, limit {limit}")]
    QuotaExceeded {
        key: String,
        limit: usize,
        required: usize,
    },
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("storage io error on '{key}': {source}")]
    Io { key: String, source: io::Error },
    #[error("unable to encode applications: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("application {0} already exists")]
    Conflict(ApplicationId),
}

/// Process-local slots with an optional byte quota.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    slots: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would push the total stored bytes past `limit`.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota: Some(limit),
        }
    }

    fn slots(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.slots
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn check_quota(
        &self,
        slots: &HashMap<String, String>,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let Some(limit) = self.quota else {
            return Ok(());
        };
        let others: usize = slots
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, stored)| existing.len() + stored.len())
            .sum();
        let required = others + key.len() + value.len();
        if required > limit {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                limit,
                required,
            });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.slots()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut slots = self.slots()?;
        self.check_quota(&slots, key, &value)?;
        slots.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.slots()?.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, apply: &mut SlotUpdate<'_>) -> Result<(), StoreError> {
        let mut slots = self.slots()?;
        let value = apply(Ok(slots.get(key).cloned()))?;
        self.check_quota(&slots, key, &value)?;
        slots.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a data directory.
///
/// All I/O is blocking `std::fs`; [`ApplicationStore`] moves its writes onto
/// the blocking pool. Writers to one slot path are serialized process-wide,
/// so separately constructed stores over the same directory do not interleave.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

/// Lock per slot file, shared by every `FileKeyValueStore` in the process.
fn slot_lock(path: &Path) -> Result<Arc<Mutex<()>>, StoreError> {
    static SLOT_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut locks = SLOT_LOCKS
        .get_or_init(Default::default)
        .lock()
        .map_err(|_| StoreError::Unavailable("slot lock table poisoned".to_string()))?;
    Ok(Arc::clone(locks.entry(path.to_path_buf()).or_default()))
}

fn hold(lock: &Mutex<()>) -> Result<MutexGuard<'_, ()>, StoreError> {
    lock.lock()
        .map_err(|_| StoreError::Unavailable("slot lock poisoned".to_string()))
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn read_slot(&self, key: &str, path: &Path) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write_slot(&self, key: &str, path: &Path, value: String) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(io_error)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(io_error)?;
        fs::rename(&staging, path).map_err(io_error)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.slot_path(key)?;
        self.read_slot(key, &path)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.slot_path(key)?;
        let lock = slot_lock(&path)?;
        let _guard = hold(&lock)?;
        self.write_slot(key, &path, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.slot_path(key)?;
        let lock = slot_lock(&path)?;
        let _guard = hold(&lock)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn update(&self, key: &str, apply: &mut SlotUpdate<'_>) -> Result<(), StoreError> {
        let path = self.slot_path(key)?;
        let lock = slot_lock(&path)?;
        let _guard = hold(&lock)?;
        let value = apply(self.read_slot(key, &path))?;
        self.write_slot(key, &path, value)
    }
}

/// Persisted application collection kept as a single JSON blob.
///
/// `append` is one [`KeyValueStore::update`], so concurrent appends through
/// any number of stores sharing a backend never drop each other's writes.
pub struct ApplicationStore<S> {
    backend: Arc<S>,
    key: String,
}

impl<S> ApplicationStore<S>
where
    S: KeyValueStore + 'static,
{
    pub fn new(backend: Arc<S>) -> Self {
        Self::with_key(backend, APPLICATIONS_KEY)
    }

    pub fn with_key(backend: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Decode the stored collection. Missing, unreadable or malformed blobs
    /// read as an empty collection.
    pub fn load_all(&self) -> Vec<JobApplication> {
        decode(&self.key, self.backend.get(&self.key))
    }

    /// Replace the stored collection with `applications`.
    pub async fn save_all(&self, applications: &[JobApplication]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(applications)?;
        self.blocking(move |backend, key| backend.set(key, encoded)).await
    }

    /// Add one application to the stored collection.
    pub async fn append(&self, application: JobApplication) -> Result<JobApplication, StoreError> {
        let staged = application.clone();
        let total = self
            .blocking(move |backend, key| {
                let mut total = 0;
                backend.update(key, &mut |current| {
                    let mut applications = decode(key, current);
                    if applications.iter().any(|existing| existing.id == staged.id) {
                        return Err(StoreError::Conflict(staged.id.clone()));
                    }
                    applications.push(staged.clone());
                    total = applications.len();
                    Ok(serde_json::to_string(&applications)?)
                })?;
                Ok(total)
            })
            .await?;
        debug!(
            application_id = %application.id,
            total,
            "application persisted"
        );
        Ok(application)
    }

    /// Drop the stored blob entirely.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.blocking(|backend, key| backend.remove(key)).await
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&S, &str) -> Result<T, StoreError> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || work(backend.as_ref(), key.as_str()))
            .await
            .map_err(|err| StoreError::Unavailable(format!("storage task failed: {err}")))?
    }
}

fn decode(key: &str, read: Result<Option<String>, StoreError>) -> Vec<JobApplication> {
    let raw = match read {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(key, error = %err, "application storage unreadable");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(applications) => applications,
        Err(err) => {
            warn!(key, error = %err, "discarding malformed application blob");
            Vec::new()
        }
    }
}
