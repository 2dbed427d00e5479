//! Catalog record types.
//!
//! Metadata is opaque to this crate: the external catalog owns its shape,
//! the store only carries it alongside the descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored reference vector for an artwork.
///
/// The vector is always normalized before it reaches this type; raw vectors
/// exist only at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Unique within the owning artwork.
    pub descriptor_id: String,
    /// Unit-length feature vector.
    pub vector: Vec<f32>,
}

/// An artwork with its descriptor set.
///
/// Descriptors are exclusively owned: deleting the artwork cascades to all
/// of them. An artwork may legally hold zero descriptors (metadata-only);
/// it simply never appears among match candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkRecord {
    pub artwork_id: String,
    /// Opaque display metadata, owned by the external catalog.
    pub metadata: serde_json::Value,
    pub descriptors: Vec<Descriptor>,
    /// Refreshed on every successful mutation touching this artwork.
    pub updated_at: DateTime<Utc>,
}

impl ArtworkRecord {
    /// Look up a descriptor by id.
    pub fn descriptor(&self, descriptor_id: &str) -> Option<&Descriptor> {
        self.descriptors
            .iter()
            .find(|d| d.descriptor_id == descriptor_id)
    }
}

/// Catalog listing entry (vectors elided).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtworkSummary {
    pub artwork_id: String,
    pub descriptor_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&ArtworkRecord> for ArtworkSummary {
    fn from(record: &ArtworkRecord) -> Self {
        Self {
            artwork_id: record.artwork_id.clone(),
            descriptor_count: record.descriptors.len(),
            updated_at: record.updated_at,
        }
    }
}
