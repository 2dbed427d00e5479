//! The matcher interface.
//!
//! `Matcher` is the contract a ranking backend implements. The shipped
//! implementation is a linear scan; an approximate-nearest-neighbor index
//! can slot in behind the same signature when catalog sizes outgrow it.

use crate::Result;
use muse_store::Snapshot;

/// A ranked artwork returned from matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkMatch {
    /// The artwork id.
    pub artwork_id: String,
    /// Cosine similarity of the best-matching descriptor, in [-1, 1].
    pub score: f32,
}

impl ArtworkMatch {
    pub fn new(artwork_id: impl Into<String>, score: f32) -> Self {
        Self {
            artwork_id: artwork_id.into(),
            score,
        }
    }
}

impl Eq for ArtworkMatch {}

impl PartialOrd for ArtworkMatch {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArtworkMatch {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Score descending, ties broken by ascending id; total_cmp keeps
        // the order defined even if a NaN ever slipped through.
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.artwork_id.cmp(&other.artwork_id))
    }
}

/// Common interface for ranking backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; ranking is a pure function over
/// an immutable snapshot, so arbitrarily many calls may run in parallel.
pub trait Matcher: Send + Sync {
    /// Rank the snapshot's artworks against a normalized query vector.
    ///
    /// Returns up to `k` artworks with best score `>= threshold`, ordered
    /// by score descending with ties broken by ascending artwork id. An
    /// empty result is a normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::DimensionMismatch`](crate::MatchError) when
    /// the query length does not equal the snapshot's locked
    /// dimensionality.
    fn rank(
        &self,
        snapshot: &Snapshot,
        query: &[f32],
        threshold: f32,
        k: usize,
    ) -> Result<Vec<ArtworkMatch>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_ordering() {
        let mut matches = vec![
            ArtworkMatch::new("b", 0.9),
            ArtworkMatch::new("c", 0.4),
            ArtworkMatch::new("a", 0.9),
        ];
        matches.sort();

        assert_eq!(matches[0].artwork_id, "a");
        assert_eq!(matches[1].artwork_id, "b");
        assert_eq!(matches[2].artwork_id, "c");
    }
}
