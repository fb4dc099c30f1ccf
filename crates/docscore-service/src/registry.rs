//! Model registry
//!
//! Durable artifacts are the source of truth; the in-memory cache is a
//! rebuildable view over them. A cache miss rehydrates from disk.

use crate::blocking::run_blocking;
use docscore_core::{Error, ModelId, Result};
use docscore_engine::{ClassifierEngine, EngineBackend};
use docscore_telemetry::metrics::MODEL_CACHE_TOTAL;
use docscore_telemetry::write_atomic;
use lru::LruCache;
use parking_lot::Mutex;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handle to a loaded, read-only model
pub type EngineHandle = Arc<dyn ClassifierEngine>;

/// Filesystem storage for model artifacts, one file per identity
pub struct ModelStore {
    dir: PathBuf,
    backend: Arc<dyn EngineBackend>,
}

impl ModelStore {
    /// Open a store rooted at `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>, backend: Arc<dyn EngineBackend>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, backend })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic artifact path for `id`
    pub fn artifact_path(&self, id: &ModelId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", id, self.backend.artifact_extension()))
    }

    pub fn contains(&self, id: &ModelId) -> bool {
        self.artifact_path(id).is_file()
    }

    /// Write the artifact for `id`; it is complete on disk when this returns
    pub fn save(&self, id: &ModelId, engine: &dyn ClassifierEngine) -> Result<PathBuf> {
        let path = self.artifact_path(id);
        write_atomic(&path, |out| engine.write_to(out)).map_err(|e| match e {
            Error::Io(io) => Error::storage(format!("failed to write {}: {}", path.display(), io)),
            other => other,
        })?;
        Ok(path)
    }

    /// Rehydrate the model stored under `id`
    pub fn load(&self, id: &ModelId) -> Result<Box<dyn ClassifierEngine>> {
        let path = self.artifact_path(id);
        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::model_not_found(id.to_string()));
            }
            Err(e) => {
                return Err(Error::storage(format!(
                    "failed to open {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let mut reader = BufReader::new(file);
        self.backend.load(&mut reader)
    }

    /// Identities of every stored artifact, sorted
    pub fn list(&self) -> Result<Vec<ModelId>> {
        let extension = self.backend.artifact_extension();
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == extension) {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| ModelId::from_str(s).ok())
                {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Identity-keyed model registry with an optional LRU bound
pub struct ModelRegistry {
    store: Arc<ModelStore>,
    cache: Mutex<LruCache<ModelId, EngineHandle>>,
}

impl ModelRegistry {
    /// Create a registry; `capacity` of `None` keeps every model in memory
    pub fn new(store: ModelStore, capacity: Option<usize>) -> Self {
        let cache = match capacity.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            store: Arc::new(store),
            cache: Mutex::new(cache),
        }
    }

    pub fn artifact_store(&self) -> &ModelStore {
        &self.store
    }

    /// Persist a freshly trained model under a new identity
    pub async fn store(&self, engine: Box<dyn ClassifierEngine>) -> Result<ModelId> {
        self.store_handle(Arc::from(engine)).await
    }

    /// Persist a shared handle under a new identity.
    ///
    /// The artifact is durable before the identity is returned or cached.
    pub async fn store_handle(&self, handle: EngineHandle) -> Result<ModelId> {
        let id = ModelId::new();
        let store = Arc::clone(&self.store);
        let to_save = Arc::clone(&handle);
        let path = run_blocking(move || store.save(&id, to_save.as_ref())).await?;

        self.cache.lock().put(id, handle);
        info!(model_id = %id, path = %path.display(), "Model stored");
        Ok(id)
    }

    /// Resolve `id` from memory, or from its artifact on a miss.
    ///
    /// Concurrent misses for the same identity may each deserialize; the
    /// last insert wins. Artifacts are immutable so every copy is equivalent.
    pub async fn resolve(&self, id: &ModelId) -> Result<EngineHandle> {
        let cached = self.cache.lock().get(id).cloned();
        if let Some(handle) = cached {
            metrics::counter!(MODEL_CACHE_TOTAL, "result" => "hit").increment(1);
            return Ok(handle);
        }
        metrics::counter!(MODEL_CACHE_TOTAL, "result" => "miss").increment(1);

        debug!(model_id = %id, "Cache miss, loading model artifact");
        let store = Arc::clone(&self.store);
        let key = *id;
        let engine = run_blocking(move || store.load(&key)).await?;
        let handle: EngineHandle = Arc::from(engine);

        self.cache.lock().put(*id, Arc::clone(&handle));
        info!(model_id = %id, "Model loaded from artifact");
        Ok(handle)
    }

    /// Drop `id` from memory; its artifact is untouched
    pub fn evict(&self, id: &ModelId) -> bool {
        self.cache.lock().pop(id).is_some()
    }

    /// Drop every cached model
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn is_cached(&self, id: &ModelId) -> bool {
        self.cache.lock().contains(id)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Identities with a durable artifact
    pub async fn list_stored(&self) -> Result<Vec<ModelId>> {
        let store = Arc::clone(&self.store);
        run_blocking(move || store.list()).await
    }
}
