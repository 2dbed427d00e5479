//! Artwork matching for MUSE.
//!
//! Ranks the artworks in a descriptor [`Snapshot`](muse_store::Snapshot)
//! against a normalized query vector:
//!
//! - an artwork's score is the **maximum** cosine similarity over its
//!   descriptors (best-matching reference image wins)
//! - artworks below the threshold are discarded; no match is a normal,
//!   empty result
//! - ordering is deterministic: score descending, ties broken by ascending
//!   artwork id
//!
//! The [`Matcher`] trait is the seam for swapping the linear scan for an
//! approximate-nearest-neighbor index later: same inputs and outputs, just
//! faster.
//!
//! # Example
//!
//! ```
//! use muse_match::{LinearMatcher, Matcher};
//! use muse_store::DescriptorStore;
//! use muse_vector::l2_normalize;
//!
//! let store = DescriptorStore::in_memory();
//! store
//!     .upsert_artwork("starry-night", serde_json::Value::Null,
//!         vec![("front".into(), vec![0.9, 0.1])])
//!     .unwrap();
//!
//! let snapshot = store.snapshot().unwrap();
//! let query = l2_normalize(&[0.8, 0.2]);
//! let matches = LinearMatcher.rank(&snapshot, &query, 0.5, 3).unwrap();
//! assert_eq!(matches[0].artwork_id, "starry-night");
//! ```

mod linear;
mod traits;

pub use linear::LinearMatcher;
pub use traits::{ArtworkMatch, Matcher};

/// Error type for matching.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for matching.
pub type Result<T> = std::result::Result<T, MatchError>;
