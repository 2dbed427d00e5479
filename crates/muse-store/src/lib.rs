//! Descriptor store for MUSE.
//!
//! The authoritative record of all artwork descriptors, with the three
//! guarantees the matching pipeline depends on:
//!
//! - **Dimensionality lock**: the first descriptor ever inserted fixes the
//!   vector length for the whole deployment; every later insert must match
//!   it exactly or the call is rejected with no partial write.
//! - **Immutable snapshots**: readers get an `Arc<Snapshot>` that is never
//!   mutated; writers build a fresh snapshot and publish it with one atomic
//!   pointer swap. Matching requires no locks.
//! - **Durability before visibility**: when a durable backend is
//!   configured, every mutation commits to it before the new snapshot is
//!   published. A crash can leave the cache stale, never ahead of disk.
//!
//! # Example
//!
//! ```
//! use muse_store::DescriptorStore;
//!
//! let store = DescriptorStore::in_memory();
//! store
//!     .upsert_artwork("starry-night", serde_json::json!({"artist": "van Gogh"}),
//!         vec![("front".into(), vec![0.1, 0.3, 0.8])])
//!     .unwrap();
//!
//! let snapshot = store.snapshot().unwrap();
//! assert_eq!(snapshot.dimension(), Some(3));
//! ```

mod error;
mod persist;
mod snapshot;
mod store;
mod types;

pub use error::{Result, StoreError};
pub use persist::{DurableCatalog, FsCatalog, MemoryCatalog, PersistedCatalog, CATALOG_FILE};
pub use snapshot::Snapshot;
pub use store::{DescriptorStore, UpsertOutcome};
pub use types::{ArtworkRecord, ArtworkSummary, Descriptor};
