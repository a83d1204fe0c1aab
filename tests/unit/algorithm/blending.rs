//! Tests for overlapping patch aggregation

#[cfg(test)]
mod tests {
    use crate::noise_motion;
    use patchmotion::algorithm::blending::{blend_matches, coverage_counts};
    use patchmotion::algorithm::matcher::{MatchOptions, match_patches};

    // Tests interior frames see a full patch of estimates and edges fewer
    // Verified by using a constant coverage
    #[test]
    fn test_coverage_counts() {
        let coverage = coverage_counts(30, 11);

        assert_eq!(coverage.len(), 30);
        assert!(coverage[10..20].iter().all(|&c| c == 11));
        assert_eq!(coverage[0], 1);
        assert_eq!(coverage[5], 6);
        assert_eq!(coverage[29], 1);
        assert!(coverage.iter().all(|&c| c > 0));
        assert_eq!(coverage.iter().sum::<usize>(), 20 * 11);
    }

    // Tests coverage when a patch does not fit
    // Verified by underflowing the last query offset
    #[test]
    fn test_coverage_without_patches() {
        assert_eq!(coverage_counts(4, 5), vec![0; 4]);
        assert_eq!(coverage_counts(5, 5), vec![1; 5]);
    }

    // Tests blending in-place matches reproduces the reference
    // Verified by reading the query row instead of the candidate row
    #[test]
    fn test_identity_blend() {
        let reference = noise_motion(24, 3, 5);
        let weights = vec![1.0; 3];
        let options = MatchOptions {
            patch_size: 6,
            alpha: None,
            channel_weights: &weights,
            filter: None,
        };
        let matches =
            match_patches(reference.view(), reference.view(), &options).expect("matches");
        let blend = blend_matches(&matches, reference.view(), 24).expect("blend");

        assert_eq!(blend.coverage, coverage_counts(24, 6));
        for (a, b) in blend.blended.iter().zip(reference.view()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    // Tests blending a match set meant for another buffer length fails
    // Verified by removing the match count check
    #[test]
    fn test_blend_rejects_wrong_length() {
        let reference = noise_motion(24, 3, 5);
        let weights = vec![1.0; 3];
        let options = MatchOptions {
            patch_size: 6,
            alpha: None,
            channel_weights: &weights,
            filter: None,
        };
        let matches =
            match_patches(reference.view(), reference.view(), &options).expect("matches");

        assert!(blend_matches(&matches, reference.view(), 25).is_err());
        assert!(blend_matches(&matches, reference.view(), 3).is_err());
    }
}
