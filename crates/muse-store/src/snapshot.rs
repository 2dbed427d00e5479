//! Immutable point-in-time view of the catalog.
//!
//! A snapshot is built by the writer path, wrapped in an `Arc`, and
//! published through an atomic pointer swap. It is never mutated after
//! publication; readers that acquired it keep it alive until they drop it,
//! even if newer snapshots have been published since.

use crate::types::ArtworkRecord;
use std::collections::BTreeMap;

/// Immutable mapping from artwork id to its record, plus the locked
/// dimensionality and a monotonically increasing version.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    version: u64,
    dimension: Option<usize>,
    artworks: BTreeMap<String, ArtworkRecord>,
}

impl Snapshot {
    pub(crate) fn new(
        version: u64,
        dimension: Option<usize>,
        artworks: BTreeMap<String, ArtworkRecord>,
    ) -> Self {
        Self {
            version,
            dimension,
            artworks,
        }
    }

    /// Incremented on every published mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The locked vector dimensionality, or `None` while no descriptor has
    /// ever been inserted.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Look up one artwork.
    pub fn get(&self, artwork_id: &str) -> Option<&ArtworkRecord> {
        self.artworks.get(artwork_id)
    }

    /// Iterate all artworks in ascending id order.
    pub fn artworks(&self) -> impl Iterator<Item = &ArtworkRecord> {
        self.artworks.values()
    }

    pub fn artwork_count(&self) -> usize {
        self.artworks.len()
    }

    /// Total descriptors across all artworks (the matcher's candidate set
    /// size).
    pub fn descriptor_count(&self) -> usize {
        self.artworks.values().map(|a| a.descriptors.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.artworks.is_empty()
    }
}
