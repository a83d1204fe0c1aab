//! Tests for nearest-neighbor patch search

#[cfg(test)]
mod tests {
    use crate::{noise_motion, walk_motion};
    use ndarray::{Array2, array};
    use patchmotion::{ChannelLayout, Motion, RootChannels, SynthesisError};
    use patchmotion::algorithm::matcher::{
        MatchOptions, channel_weights, match_patches, patch_distance,
    };
    use patchmotion::constraints::search::CandidateFilter;

    fn options(patch_size: usize, weights: &[f64]) -> MatchOptions<'_> {
        MatchOptions {
            patch_size,
            alpha: None,
            channel_weights: weights,
            filter: None,
        }
    }

    // Tests a buffer matched against itself finds every patch in place
    // Verified by starting the candidate scan at offset 1
    #[test]
    fn test_self_match_is_identity() {
        let motion = noise_motion(30, 4, 3);
        let weights = vec![1.0; 4];
        let set = match_patches(motion.view(), motion.view(), &options(5, &weights))
            .expect("matches");

        assert_eq!(set.len(), 26);
        assert_eq!(set.patch_size(), 5);
        for m in set.matches() {
            assert_eq!(m.candidate, m.query);
            assert!(m.distance.abs() < 1e-15);
            assert!(!m.fallback);
        }
        assert!(set.patch_loss().abs() < 1e-15);
    }

    // Tests equal distances resolve to the lowest candidate offset
    // Verified by using a non-strict comparison
    #[test]
    fn test_ties_break_to_lowest_offset() {
        let reference = Array2::zeros((12, 2));
        let query = Array2::zeros((8, 2));
        let weights = [1.0, 1.0];
        let set = match_patches(query.view(), reference.view(), &options(3, &weights))
            .expect("matches");

        assert!(set.matches().iter().all(|m| m.candidate == 0));
    }

    // Tests the completeness regularizer ranks by normalized score but reports raw distance
    // Verified by reporting the normalized score as the distance
    #[test]
    fn test_alpha_reports_raw_distance() {
        let reference = noise_motion(25, 3, 11);
        let query = noise_motion(20, 3, 12);
        let weights = vec![1.0; 3];
        let mut opts = options(4, &weights);
        opts.alpha = Some(0.01);
        let set = match_patches(query.view(), reference.view(), &opts).expect("matches");

        for m in set.matches() {
            let raw = patch_distance(
                query.view(),
                m.query,
                reference.view(),
                m.candidate,
                4,
                &weights,
            );
            assert!((m.distance - raw).abs() < 1e-12);
        }
    }

    // Tests a zero alpha keeps exactly matched candidates on the normalized scale
    // Verified by scoring candidates with a zero normalizer by their raw distance
    #[test]
    fn test_zero_alpha_normalizes_exact_candidates() {
        let reference = array![[0.0], [10.0]];
        let query = array![[0.0], [10.5], [4.0]];
        let weights = [1.0];
        let mut opts = options(1, &weights);
        opts.alpha = Some(0.0);
        let set = match_patches(query.view(), reference.view(), &opts).expect("matches");

        let candidates: Vec<usize> = set.matches().iter().map(|m| m.candidate).collect();
        assert_eq!(candidates, vec![0, 1, 1]);
        let last = set.matches().last().expect("match");
        assert!((last.distance - 36.0).abs() < 1e-12);
    }

    // Tests an empty speed filter falls back to the full candidate set
    // Verified by returning no match for filtered-out queries
    #[test]
    fn test_empty_filter_falls_back() {
        let reference = walk_motion(40, 3, 0.5);
        let root = reference.layout().root().expect("root");
        let filter = CandidateFilter::new(reference.view(), root, &[100.0; 40], 7, 0.15);
        let weights = vec![1.0; 6];
        let mut opts = options(7, &weights);
        opts.filter = Some(&filter);

        let set = match_patches(reference.view(), reference.view(), &opts).expect("matches");
        assert_eq!(set.fallback_count(), set.len());
        assert!(set.matches().iter().all(|m| m.candidate <= 33));
    }

    // Tests a restrictive filter keeps candidates inside the allowed set
    // Verified by ignoring the filter outcome
    #[test]
    fn test_filter_restricts_candidates() {
        let mut data = walk_motion(40, 2, 1.0).into_data();
        for i in 20..40 {
            data[[i, 2]] = 3.0;
        }
        let layout = ChannelLayout::with_trailing_root(5).expect("layout");
        let reference = Motion::new(data, layout).expect("motion");
        let root = layout.root().expect("root");
        let filter = CandidateFilter::new(reference.view(), root, &[3.0; 30], 5, 0.15);
        let weights = vec![1.0; 5];
        let mut opts = options(5, &weights);
        opts.filter = Some(&filter);

        let query = walk_motion(30, 2, 1.0);
        let set = match_patches(query.view(), reference.view(), &opts).expect("matches");
        assert_eq!(set.fallback_count(), 0);
        assert!(set.matches().iter().all(|m| m.candidate >= 19));
    }

    // Tests mismatched channels and oversized patches are rejected
    // Verified by removing the channel count check
    #[test]
    fn test_invalid_inputs() {
        let a = noise_motion(20, 3, 1);
        let b = noise_motion(20, 4, 2);
        let weights = vec![1.0; 3];
        assert!(matches!(
            match_patches(a.view(), b.view(), &options(5, &weights)),
            Err(SynthesisError::LayoutMismatch { .. })
        ));
        assert!(match_patches(a.view(), a.view(), &options(21, &weights)).is_err());
        assert!(match_patches(a.view(), a.view(), &options(0, &weights)).is_err());
        assert!(match_patches(a.view(), a.view(), &options(5, &[1.0, 1.0])).is_err());
    }

    // Tests channel weights emphasize only the horizontal root channels
    // Verified by weighting the vertical channel too
    #[test]
    fn test_channel_weights() {
        let root = RootChannels::trailing(5);
        assert_eq!(channel_weights(5, root, 4.0), vec![1.0, 1.0, 4.0, 1.0, 4.0]);
        assert_eq!(channel_weights(3, None, 4.0), vec![1.0; 3]);
    }

    // Tests the weighted patch distance
    // Verified by dropping the channel weight
    #[test]
    fn test_patch_distance() {
        let a = array![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        let b = array![[1.0, 0.0], [1.0, 3.0]];
        let d = patch_distance(a.view(), 1, b.view(), 0, 2, &[1.0, 0.5]);
        assert!((d - (0.0 + 0.5 + 1.0 + 0.5)).abs() < 1e-12);
    }
}
