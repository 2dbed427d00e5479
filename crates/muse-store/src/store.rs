//! The descriptor store and its snapshot cache.
//!
//! One writer at a time runs the read-validate-commit-publish sequence
//! under a mutex; readers never touch that lock. The published snapshot is
//! an `ArcSwapOption`: `None` until the first successful load from the
//! durable backend, then always the latest consistent view.

use crate::error::{Result, StoreError};
use crate::persist::{DurableCatalog, PersistedCatalog};
use crate::snapshot::Snapshot;
use crate::types::{ArtworkRecord, ArtworkSummary, Descriptor};
use arc_swap::ArcSwapOption;
use chrono::Utc;
use muse_observe::{
    IngestEvt, IngestKind, Meter, NoopMeter, ObsEvent, PersistEvt, PersistKind, SnapshotEvt,
};
use muse_vector::{ensure_finite, l2_normalize};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Writer-side state. Mutated only under the store's mutex; the locked
/// dimensionality lives here and nowhere else.
struct WriterState {
    dimension: Option<usize>,
    artworks: BTreeMap<String, ArtworkRecord>,
    version: u64,
    loaded: bool,
}

/// Result of a successful upsert, echoed back to the caller.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub artwork_id: String,
    pub descriptor_count: usize,
    pub dimension: Option<usize>,
    pub snapshot_version: u64,
}

/// Authoritative descriptor store with copy-on-write snapshot publication.
///
/// # Concurrency
///
/// Matching reads are pure functions over an `Arc<Snapshot>` and run
/// lock-free in parallel. Mutations serialize on an internal mutex, so two
/// concurrent upserts can never race the first-write-wins dimensionality
/// decision.
pub struct DescriptorStore {
    writer: Mutex<WriterState>,
    published: ArcSwapOption<Snapshot>,
    backend: Option<Box<dyn DurableCatalog>>,
    meter: Arc<dyn Meter>,
}

impl DescriptorStore {
    /// Create a store with no durable backend, ready immediately.
    pub fn in_memory() -> Self {
        Self::in_memory_with_meter(Arc::new(NoopMeter))
    }

    /// In-memory store with a custom observability meter.
    pub fn in_memory_with_meter(meter: Arc<dyn Meter>) -> Self {
        Self {
            writer: Mutex::new(WriterState {
                dimension: None,
                artworks: BTreeMap::new(),
                version: 0,
                loaded: true,
            }),
            published: ArcSwapOption::from(Some(Arc::new(Snapshot::new(
                0,
                None,
                BTreeMap::new(),
            )))),
            backend: None,
            meter,
        }
    }

    /// Create a store over a durable backend, not yet loaded.
    ///
    /// Reads and writes return [`StoreError::NotReady`] until [`load`]
    /// succeeds. Use [`open`] when construction and loading can happen in
    /// one step.
    ///
    /// [`load`]: DescriptorStore::load
    /// [`open`]: DescriptorStore::open
    pub fn new(backend: Box<dyn DurableCatalog>) -> Self {
        Self::new_with_meter(backend, Arc::new(NoopMeter))
    }

    /// Durable store with a custom observability meter.
    pub fn new_with_meter(backend: Box<dyn DurableCatalog>, meter: Arc<dyn Meter>) -> Self {
        Self {
            writer: Mutex::new(WriterState {
                dimension: None,
                artworks: BTreeMap::new(),
                version: 0,
                loaded: false,
            }),
            published: ArcSwapOption::from(None),
            backend: Some(backend),
            meter,
        }
    }

    /// Create a durable store and perform the initial load.
    pub fn open(backend: Box<dyn DurableCatalog>) -> Result<Self> {
        let store = Self::new(backend);
        store.load()?;
        Ok(store)
    }

    /// Populate the cache with one full load from the durable backend and
    /// publish the first snapshot.
    ///
    /// Safe to retry after a failure; also usable as a manual refresh (a
    /// durable write from elsewhere merely causes stale reads until then).
    pub fn load(&self) -> Result<()> {
        let Some(backend) = &self.backend else {
            return Ok(()); // in-memory stores are always loaded
        };

        let mut state = self.writer.lock();
        let catalog = backend.load()?;

        let artwork_count = catalog.artworks.len();
        state.dimension = catalog.dimension;
        state.artworks = catalog
            .artworks
            .into_iter()
            .map(|a| (a.artwork_id.clone(), a))
            .collect();
        state.loaded = true;

        self.publish(&state);
        self.meter.emit(ObsEvent::Persist(PersistEvt {
            kind: PersistKind::Loaded {
                artworks: artwork_count,
            },
        }));
        tracing::info!(
            artworks = artwork_count,
            dimension = ?state.dimension,
            "catalog loaded"
        );
        Ok(())
    }

    /// Whether the first load has completed and reads can be served.
    pub fn is_ready(&self) -> bool {
        self.published.load().is_some()
    }

    /// The current published snapshot.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.published.load_full().ok_or(StoreError::NotReady)
    }

    /// The locked dimensionality, or `None` while no descriptor has ever
    /// been inserted.
    pub fn current_dimension(&self) -> Option<usize> {
        self.published.load().as_ref().and_then(|s| s.dimension())
    }

    /// Insert or update an artwork with merge-by-descriptor-id semantics.
    ///
    /// Every raw vector is normalized, then validated against the locked
    /// dimensionality (or, on the first ever insert, against the other
    /// vectors in this call, whose dimension becomes the permanent lock).
    /// Any mismatch fails the entire call; partial writes do not happen.
    ///
    /// Descriptor ids that already exist are replaced in place, new ids are
    /// appended, and omission never deletes. The one exception is an empty
    /// descriptor list, which explicitly clears the artwork's descriptors
    /// while keeping the record itself (metadata-only artwork).
    pub fn upsert_artwork(
        &self,
        artwork_id: &str,
        metadata: serde_json::Value,
        descriptors: Vec<(String, Vec<f32>)>,
    ) -> Result<UpsertOutcome> {
        // Normalize outside the writer lock; it is pure and the lock only
        // needs to cover read-validate-commit-publish.
        let mut normalized = Vec::with_capacity(descriptors.len());
        for (descriptor_id, raw) in descriptors {
            if raw.is_empty() {
                return Err(StoreError::InvalidVector(format!(
                    "descriptor '{}' has an empty vector",
                    descriptor_id
                )));
            }
            ensure_finite(&raw)?;
            normalized.push(Descriptor {
                descriptor_id,
                vector: l2_normalize(&raw),
            });
        }

        let mut state = self.writer.lock();
        if !state.loaded {
            return Err(StoreError::NotReady);
        }

        // First-write-wins: the lock, or this call's first vector.
        let candidate = normalized.first().map(|d| d.vector.len());
        let expected = state.dimension.or(candidate);
        if let Some(expected) = expected {
            for d in &normalized {
                if d.vector.len() != expected {
                    self.meter.emit(ObsEvent::Ingest(IngestEvt {
                        kind: IngestKind::Rejected,
                    }));
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: d.vector.len(),
                    });
                }
            }
        }

        let now = Utc::now();
        let descriptor_total = normalized.len();
        let mut record = state
            .artworks
            .get(artwork_id)
            .cloned()
            .unwrap_or_else(|| ArtworkRecord {
                artwork_id: artwork_id.to_string(),
                metadata: serde_json::Value::Null,
                descriptors: Vec::new(),
                updated_at: now,
            });
        record.metadata = metadata;
        record.updated_at = now;

        if normalized.is_empty() {
            // Explicit clear: zero descriptors means "this artwork has no
            // reference images", not "leave them alone".
            record.descriptors.clear();
        } else {
            for d in normalized {
                match record
                    .descriptors
                    .iter_mut()
                    .find(|e| e.descriptor_id == d.descriptor_id)
                {
                    Some(existing) => *existing = d,
                    None => record.descriptors.push(d),
                }
            }
        }
        let descriptor_count = record.descriptors.len();

        let next_dimension = state.dimension.or(candidate);
        let mut next_artworks = state.artworks.clone();
        next_artworks.insert(artwork_id.to_string(), record);

        self.commit(next_dimension, &next_artworks)?;

        if state.dimension.is_none() {
            if let Some(dimension) = next_dimension {
                self.meter.emit(ObsEvent::Ingest(IngestEvt {
                    kind: IngestKind::DimensionLocked { dimension },
                }));
                tracing::info!(dimension, "descriptor dimensionality locked");
            }
        }

        state.dimension = next_dimension;
        state.artworks = next_artworks;
        state.version += 1;
        self.publish(&state);

        self.meter.emit(ObsEvent::Ingest(IngestEvt {
            kind: IngestKind::Upsert {
                descriptors: descriptor_total,
            },
        }));
        tracing::info!(
            artwork_id,
            descriptors = descriptor_count,
            version = state.version,
            "artwork upserted"
        );

        Ok(UpsertOutcome {
            artwork_id: artwork_id.to_string(),
            descriptor_count,
            dimension: state.dimension,
            snapshot_version: state.version,
        })
    }

    /// Remove an artwork and all of its descriptors (cascade).
    pub fn delete_artwork(&self, artwork_id: &str) -> Result<()> {
        let mut state = self.writer.lock();
        if !state.loaded {
            return Err(StoreError::NotReady);
        }

        if !state.artworks.contains_key(artwork_id) {
            return Err(StoreError::NotFound(format!("artwork '{}'", artwork_id)));
        }

        let mut next_artworks = state.artworks.clone();
        next_artworks.remove(artwork_id);

        self.commit(state.dimension, &next_artworks)?;

        state.artworks = next_artworks;
        state.version += 1;
        self.publish(&state);

        self.meter.emit(ObsEvent::Ingest(IngestEvt {
            kind: IngestKind::DeleteArtwork,
        }));
        tracing::info!(artwork_id, version = state.version, "artwork deleted");
        Ok(())
    }

    /// Remove exactly one descriptor.
    pub fn delete_descriptor(&self, artwork_id: &str, descriptor_id: &str) -> Result<()> {
        let mut state = self.writer.lock();
        if !state.loaded {
            return Err(StoreError::NotReady);
        }

        let mut next_artworks = state.artworks.clone();
        let record = next_artworks
            .get_mut(artwork_id)
            .ok_or_else(|| StoreError::NotFound(format!("artwork '{}'", artwork_id)))?;

        if record.descriptor(descriptor_id).is_none() {
            return Err(StoreError::NotFound(format!(
                "descriptor '{}' of artwork '{}'",
                descriptor_id, artwork_id
            )));
        }

        record
            .descriptors
            .retain(|d| d.descriptor_id != descriptor_id);
        record.updated_at = Utc::now();

        self.commit(state.dimension, &next_artworks)?;

        state.artworks = next_artworks;
        state.version += 1;
        self.publish(&state);

        self.meter.emit(ObsEvent::Ingest(IngestEvt {
            kind: IngestKind::DeleteDescriptor,
        }));
        tracing::info!(
            artwork_id,
            descriptor_id,
            version = state.version,
            "descriptor deleted"
        );
        Ok(())
    }

    /// Look up one artwork in the current snapshot.
    pub fn get_artwork(&self, artwork_id: &str) -> Result<ArtworkRecord> {
        self.snapshot()?
            .get(artwork_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("artwork '{}'", artwork_id)))
    }

    /// Catalog listing over the current snapshot.
    pub fn list_artworks(&self) -> Result<Vec<ArtworkSummary>> {
        Ok(self.snapshot()?.artworks().map(ArtworkSummary::from).collect())
    }

    /// Durably commit the staged catalog, if a backend is configured.
    ///
    /// Runs strictly before the snapshot swap: a failed commit aborts the
    /// mutation and the previous snapshot stays published.
    fn commit(
        &self,
        dimension: Option<usize>,
        artworks: &BTreeMap<String, ArtworkRecord>,
    ) -> Result<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let started = std::time::Instant::now();
        let catalog = PersistedCatalog {
            dimension,
            artworks: artworks.values().cloned().collect(),
        };
        if let Err(err) = backend.commit(&catalog) {
            self.meter.emit(ObsEvent::Persist(PersistEvt {
                kind: PersistKind::Failed,
            }));
            tracing::warn!(error = %err, "catalog commit failed, snapshot unchanged");
            return Err(err);
        }

        self.meter.emit(ObsEvent::Persist(PersistEvt {
            kind: PersistKind::Committed {
                ms: started.elapsed().as_millis() as u32,
            },
        }));
        Ok(())
    }

    /// Publish a fresh snapshot of the writer state.
    fn publish(&self, state: &WriterState) {
        let snapshot = Snapshot::new(state.version, state.dimension, state.artworks.clone());
        self.meter.emit(ObsEvent::Snapshot(SnapshotEvt {
            version: snapshot.version(),
            artworks: snapshot.artwork_count(),
            descriptors: snapshot.descriptor_count(),
        }));
        self.published.store(Some(Arc::new(snapshot)));
    }
}
