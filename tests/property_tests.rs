//! Property-based tests for the enrollment and scoring invariants
//!
//! Training runs three model families per enrollment, so the engine-level
//! properties use few cases and lighter family parameters.

mod utils;

use huella::augment::{augment, AugmentConfig};
use huella::classifier::ModelFamily;
use huella::dataset::Label;
use huella::scorer::{AuthDecision, AUTH_THRESHOLD};
use huella::selection::{first_best, select_best, SelectionConfig};
use huella::{Huella, HuellaError};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use utils::fast_config;

fn real_samples() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..30, 1usize..6).prop_flat_map(|(dim, n)| {
        prop::collection::vec(prop::collection::vec(-5.0f64..5.0, dim), n)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_augmented_set_has_both_classes(real in real_samples(), seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let set = augment(&real, &AugmentConfig::default(), &mut rng).unwrap();

        prop_assert!(set.count(Label::Genuine) >= real.len());
        prop_assert!(set.count(Label::Impostor) >= 1);
        prop_assert!(set.samples.iter().all(|s| s.len() == real[0].len()));
        prop_assert_eq!(set.count(Label::Genuine), real.len() + real.len().min(20));
    }

    #[test]
    fn prop_decision_is_monotone_in_confidence(confidence in 0.0f64..=1.0) {
        let decision = AuthDecision::from_confidence(confidence, ModelFamily::Mlp);
        prop_assert_eq!(decision.authenticated, confidence > AUTH_THRESHOLD);
        prop_assert_eq!(decision.confidence, confidence);
    }

    #[test]
    fn prop_first_best_is_earliest_maximum(
        scores in prop::collection::vec(
            prop::option::of(prop::sample::select(vec![0.0f64, 0.25, 0.5, 1.0])),
            0..6,
        )
    ) {
        let top = scores.iter().flatten().copied().fold(None, |acc: Option<f64>, s| {
            Some(acc.map_or(s, |a| a.max(s)))
        });
        let expected = top.and_then(|t| {
            scores.iter().position(|s| *s == Some(t)).map(|i| (i, t))
        });
        prop_assert_eq!(first_best(scores.clone()), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_selected_score_dominates_candidates(real in real_samples(), seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let set = augment(&real, &AugmentConfig::default(), &mut rng).unwrap();
        let config = SelectionConfig {
            params: fast_config().selection.params,
            ..SelectionConfig::default()
        };
        let selected = select_best(&set, &config).unwrap();

        for candidate in &selected.candidates {
            if let Some(score) = candidate.f1_score {
                prop_assert!(selected.f1_score >= score);
            }
        }
        let first_best = selected
            .candidates
            .iter()
            .find(|c| c.f1_score == Some(selected.f1_score))
            .map(|c| c.family);
        prop_assert_eq!(first_best, Some(selected.family));
    }

    #[test]
    fn prop_mismatched_lengths_always_rejected(
        dim in 2usize..20,
        delta in prop::sample::select(vec![-1i64, 1, 3]),
    ) {
        let engine = Huella::in_memory(fast_config());
        let sample: Vec<f64> = (0..dim).map(|i| 0.1 * i as f64).collect();
        engine.enroll("alice", &sample).unwrap();

        let other_len = (dim as i64 + delta) as usize;
        let other: Vec<f64> = vec![0.3; other_len];

        let enroll_err = engine.enroll("alice", &other).unwrap_err();
        let is_enroll_mismatch = matches!(
            enroll_err,
            HuellaError::FeatureLengthMismatch { expected, got } if expected == dim && got == other_len
        );
        prop_assert!(is_enroll_mismatch);

        let auth_err = engine.authenticate("alice", &other).unwrap_err();
        let is_auth_mismatch = matches!(
            auth_err,
            HuellaError::FeatureLengthMismatch { expected, got } if expected == dim && got == other_len
        );
        prop_assert!(is_auth_mismatch);

        prop_assert_eq!(engine.expected_feature_count(Some("alice")).unwrap(), dim);
        prop_assert_eq!(engine.list_users().unwrap()[0].enrollments, 1);
    }
}
