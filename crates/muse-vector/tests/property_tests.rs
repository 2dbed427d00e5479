//! Property tests for the vector kernels.

use muse_vector::{cosine_similarity, is_unit, l2_norm, l2_normalize, UNIT_EPSILON};
use proptest::prelude::*;

fn finite_vector(len: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1000.0f32..1000.0, len..=len)
}

proptest! {
    #[test]
    fn normalize_yields_unit_or_zero(v in finite_vector(64)) {
        let out = l2_normalize(&v);
        if l2_norm(&v) == 0.0 {
            prop_assert_eq!(out, v);
        } else if l2_norm(&v) > 1e-3 {
            // Away from the denormal range the result is unit length
            prop_assert!(is_unit(&out, UNIT_EPSILON));
        }
    }

    #[test]
    fn normalize_is_idempotent(v in finite_vector(64)) {
        prop_assume!(l2_norm(&v) > 1e-3);
        let once = l2_normalize(&v);
        let twice = l2_normalize(&once);
        for (a, b) in once.iter().zip(twice.iter()) {
            prop_assert!((a - b).abs() <= UNIT_EPSILON);
        }
    }

    #[test]
    fn similarity_is_symmetric_and_bounded(
        a in finite_vector(32),
        b in finite_vector(32),
    ) {
        let a = l2_normalize(&a);
        let b = l2_normalize(&b);

        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();

        prop_assert_eq!(ab, ba);
        prop_assert!((-1.0..=1.0).contains(&ab));
    }
}
