//! Linear scan matcher.
//!
//! O(n·d) over every descriptor in the snapshot. Museum-scale catalogs are
//! a few thousand descriptors, so a full scan is both simple and fast
//! enough; larger deployments swap in an ANN index behind the same trait.

use crate::traits::{ArtworkMatch, Matcher};
use crate::{MatchError, Result};
use muse_store::Snapshot;
use muse_vector::dot;

/// Brute-force matcher: scores every descriptor of every artwork.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearMatcher;

impl Matcher for LinearMatcher {
    fn rank(
        &self,
        snapshot: &Snapshot,
        query: &[f32],
        threshold: f32,
        k: usize,
    ) -> Result<Vec<ArtworkMatch>> {
        // A snapshot with no locked dimension holds no descriptors at all;
        // any query trivially has no match.
        let Some(dimension) = snapshot.dimension() else {
            return Ok(Vec::new());
        };

        if query.len() != dimension {
            return Err(MatchError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut matches: Vec<ArtworkMatch> = Vec::new();

        for record in snapshot.artworks() {
            // Max over descriptors: the best-matching reference image wins.
            // Stored vectors are unit length by store invariant, so the dot
            // product is the cosine similarity.
            let best = record
                .descriptors
                .iter()
                .map(|d| dot(query, &d.vector).clamp(-1.0, 1.0))
                .fold(None, |acc: Option<f32>, s| {
                    Some(acc.map_or(s, |a| a.max(s)))
                });

            if let Some(score) = best {
                if score >= threshold {
                    matches.push(ArtworkMatch::new(record.artwork_id.clone(), score));
                }
            }
        }

        matches.sort();
        matches.truncate(k);

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_store::DescriptorStore;
    use muse_vector::l2_normalize;

    fn store_with(artworks: &[(&str, &[(&str, &[f32])])]) -> DescriptorStore {
        let store = DescriptorStore::in_memory();
        for (artwork_id, descriptors) in artworks {
            store
                .upsert_artwork(
                    artwork_id,
                    serde_json::Value::Null,
                    descriptors
                        .iter()
                        .map(|(id, v)| (id.to_string(), v.to_vec()))
                        .collect(),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn test_ranking_determinism_with_tie_break() {
        // Artworks with best scores 0.9, 0.9, 0.4 and ids "b", "a", "c":
        // threshold 0.5, k=2 returns [("a", 0.9), ("b", 0.9)]
        let store = store_with(&[
            ("b", &[("d", &[0.9, (1.0f32 - 0.81).sqrt()])]),
            ("a", &[("d", &[0.9, (1.0f32 - 0.81).sqrt()])]),
            ("c", &[("d", &[0.4, (1.0f32 - 0.16).sqrt()])]),
        ]);
        let snapshot = store.snapshot().unwrap();

        let matches = LinearMatcher.rank(&snapshot, &[1.0, 0.0], 0.5, 2).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].artwork_id, "a");
        assert!((matches[0].score - 0.9).abs() < 1e-4);
        assert_eq!(matches[1].artwork_id, "b");
        assert!((matches[1].score - 0.9).abs() < 1e-4);
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let store = store_with(&[("a", &[("d", &[1.0, 0.0])])]);
        let snapshot = store.snapshot().unwrap();

        // Orthogonal query, threshold 0.55
        let matches = LinearMatcher.rank(&snapshot, &[0.0, 1.0], 0.55, 5).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_max_over_descriptors() {
        // One artwork whose second descriptor matches best
        let store = store_with(&[(
            "a",
            &[("far", &[0.0, 1.0]), ("near", &[1.0, 0.0])],
        )]);
        let snapshot = store.snapshot().unwrap();

        let matches = LinearMatcher.rank(&snapshot, &[1.0, 0.0], 0.5, 1).unwrap();
        assert_eq!(matches.len(), 1);
        assert!((matches[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let v = l2_normalize(&[1.0, 1.0]);
        let store = store_with(&[("a", &[("d", &[1.0, 1.0])])]);
        let snapshot = store.snapshot().unwrap();

        // Query equals the stored descriptor: score ~1.0
        let matches = LinearMatcher.rank(&snapshot, &v, 1.0 - 1e-5, 1).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_limit_truncates() {
        let store = store_with(&[
            ("a", &[("d", &[1.0, 0.0])]),
            ("b", &[("d", &[0.9, (1.0f32 - 0.81).sqrt()])]),
            ("c", &[("d", &[0.8, 0.6])]),
        ]);
        let snapshot = store.snapshot().unwrap();

        let matches = LinearMatcher.rank(&snapshot, &[1.0, 0.0], -1.0, 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].artwork_id, "a");
        assert_eq!(matches[1].artwork_id, "b");
    }

    #[test]
    fn test_metadata_only_artwork_is_not_a_candidate() {
        let store = store_with(&[("with", &[("d", &[1.0, 0.0])])]);
        store
            .upsert_artwork("without", serde_json::json!({"title": "t"}), vec![])
            .unwrap();
        let snapshot = store.snapshot().unwrap();

        let matches = LinearMatcher.rank(&snapshot, &[1.0, 0.0], -1.0, 10).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].artwork_id, "with");
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let store = store_with(&[("a", &[("d", &[1.0, 0.0])])]);
        let snapshot = store.snapshot().unwrap();

        let err = LinearMatcher
            .rank(&snapshot, &[1.0, 0.0, 0.0], 0.5, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            MatchError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_empty_snapshot_matches_nothing() {
        let store = DescriptorStore::in_memory();
        let snapshot = store.snapshot().unwrap();

        // No locked dimension yet: any query length, empty result
        let matches = LinearMatcher.rank(&snapshot, &[1.0, 0.0, 0.0], 0.5, 5).unwrap();
        assert!(matches.is_empty());
    }
}
