//! Durable catalog backends.
//!
//! The persisted layout is storage-engine agnostic: the full catalog
//! (artwork records with their normalized vectors, plus the locked
//! dimensionality) serializes as one JSON document. Write rate is
//! curator-driven, so a whole-catalog commit per mutation is cheap; the
//! invariant that matters is that a commit is on disk before the in-memory
//! snapshot advances.

use crate::error::{Result, StoreError};
use crate::types::ArtworkRecord;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Catalog file name inside the data directory.
pub const CATALOG_FILE: &str = "catalog.json";
const CATALOG_TEMP_FILE: &str = "catalog.json.tmp";

/// The logical persisted layout: locked dimensionality + artwork records
/// (each record keyed by id with metadata and a last-update timestamp,
/// descriptors keyed by `(artwork_id, descriptor_id)` inside it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedCatalog {
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub artworks: Vec<ArtworkRecord>,
}

/// Durable storage for the catalog.
///
/// Implementations must make `commit` atomic: after a crash the previous
/// catalog or the new one is readable, never a torn mix. Transient failures
/// surface as [`StoreError::Persistence`] and are retryable; the caller
/// never updates the cache speculatively.
pub trait DurableCatalog: Send + Sync {
    /// Read the full catalog. An empty backend returns the default.
    fn load(&self) -> Result<PersistedCatalog>;

    /// Durably commit the full catalog.
    fn commit(&self, catalog: &PersistedCatalog) -> Result<()>;
}

impl<T: DurableCatalog + ?Sized> DurableCatalog for std::sync::Arc<T> {
    fn load(&self) -> Result<PersistedCatalog> {
        (**self).load()
    }
    fn commit(&self, catalog: &PersistedCatalog) -> Result<()> {
        (**self).commit(catalog)
    }
}

/// File-backed catalog: one JSON document, written to a temp file, fsynced,
/// then renamed over the previous version.
pub struct FsCatalog {
    dir: PathBuf,
}

impl FsCatalog {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn catalog_path(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE)
    }
}

impl DurableCatalog for FsCatalog {
    fn load(&self) -> Result<PersistedCatalog> {
        let path = self.catalog_path();
        if !path.exists() {
            return Ok(PersistedCatalog::default());
        }

        let data = std::fs::read(&path)
            .map_err(|e| StoreError::Persistence(format!("read {}: {}", path.display(), e)))?;

        serde_json::from_slice(&data)
            .map_err(|e| StoreError::Persistence(format!("parse {}: {}", path.display(), e)))
    }

    fn commit(&self, catalog: &PersistedCatalog) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Persistence(format!("create dir: {}", e)))?;

        let data = serde_json::to_vec(catalog)
            .map_err(|e| StoreError::Persistence(format!("serialize catalog: {}", e)))?;

        let tmp = self.dir.join(CATALOG_TEMP_FILE);
        let mut file = std::fs::File::create(&tmp)
            .map_err(|e| StoreError::Persistence(format!("create {}: {}", tmp.display(), e)))?;
        file.write_all(&data)
            .map_err(|e| StoreError::Persistence(format!("write {}: {}", tmp.display(), e)))?;
        file.sync_all()
            .map_err(|e| StoreError::Persistence(format!("fsync {}: {}", tmp.display(), e)))?;

        std::fs::rename(&tmp, self.catalog_path())
            .map_err(|e| StoreError::Persistence(format!("rename catalog: {}", e)))?;

        Ok(())
    }
}

/// In-memory backend for tests: retains the last committed catalog and can
/// be flipped into a failing state to exercise the commit-before-publish
/// ordering.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: parking_lot::Mutex<MemoryCatalogState>,
}

#[derive(Default)]
struct MemoryCatalogState {
    catalog: PersistedCatalog,
    fail_commits: bool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `commit` fail with a retryable error.
    pub fn fail_commits(&self, fail: bool) {
        self.inner.lock().fail_commits = fail;
    }

    /// The last successfully committed catalog.
    pub fn committed(&self) -> PersistedCatalog {
        self.inner.lock().catalog.clone()
    }
}

impl DurableCatalog for MemoryCatalog {
    fn load(&self) -> Result<PersistedCatalog> {
        Ok(self.inner.lock().catalog.clone())
    }

    fn commit(&self, catalog: &PersistedCatalog) -> Result<()> {
        let mut state = self.inner.lock();
        if state.fail_commits {
            return Err(StoreError::Persistence("backend unavailable".to_string()));
        }
        state.catalog = catalog.clone();
        Ok(())
    }
}
