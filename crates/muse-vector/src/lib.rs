//! Feature vector primitives for MUSE.
//!
//! This crate provides the two numeric kernels everything else is built on:
//!
//! - **L2 normalization**: scales a raw embedding to unit length so all
//!   stored and query vectors share one metric space
//! - **Cosine similarity**: dot product of unit vectors, the sole ranking
//!   metric
//!
//! Both the ingestion path (descriptors being stored) and the query path
//! (camera captures being matched) call the same functions here. Keeping a
//! single implementation is a correctness requirement, not a convenience:
//! if the two sides normalized differently, matching accuracy would degrade
//! silently without any error surfacing.
//!
//! # Example
//!
//! ```
//! use muse_vector::{cosine_similarity, l2_normalize};
//!
//! let a = l2_normalize(&[3.0, 4.0]);
//! let b = l2_normalize(&[3.0, 4.0]);
//! let score = cosine_similarity(&a, &b).unwrap();
//! assert!((score - 1.0).abs() < 1e-4);
//! ```

mod norm;
mod similarity;

pub use norm::{is_unit, l2_norm, l2_normalize};
pub use similarity::{cosine_similarity, dot};

/// Tolerance used when checking whether a vector is unit length.
pub const UNIT_EPSILON: f32 = 1e-4;

/// Error type for vector operations.
#[derive(Debug, thiserror::Error)]
pub enum VectorError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },
}

/// Result type for vector operations.
pub type Result<T> = std::result::Result<T, VectorError>;

/// Reject vectors containing NaN or infinite values.
///
/// NaN poisons every downstream comparison without raising an error, so
/// both the ingestion and the query boundary run this check before
/// normalizing.
pub fn ensure_finite(v: &[f32]) -> Result<()> {
    for (index, x) in v.iter().enumerate() {
        if !x.is_finite() {
            return Err(VectorError::NonFinite { index });
        }
    }
    Ok(())
}
