//! Tests for horizontal speed steering

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};
    use patchmotion::RootChannels;
    use patchmotion::constraints::velocity::{RescaleStats, VelocityGuide};

    fn guide(targets: Vec<f64>) -> VelocityGuide {
        VelocityGuide::new(targets, RootChannels::trailing(3).expect("root"), 0.1)
    }

    // Tests rescaling closes half the speed gap and keeps the direction
    // Verified by snapping straight to the target
    #[test]
    fn test_rescale_moves_halfway() {
        let mut buffer = array![[1.2, 0.9, 1.6], [0.6, 0.9, 0.8]];
        let stats = guide(vec![1.0, 1.0]).rescale(&mut buffer);

        assert_eq!(
            stats,
            RescaleStats {
                rescaled: 2,
                degenerate: 0
            }
        );
        assert!((buffer[[0, 0]] - 0.9).abs() < 1e-12);
        assert!((buffer[[0, 2]] - 1.2).abs() < 1e-12);
        assert!((buffer[[1, 0]] - 0.6).abs() < 1e-12);
    }

    // Tests the vertical channel is never touched by rescaling
    // Verified by scaling all three root channels
    #[test]
    fn test_rescale_leaves_height() {
        let mut buffer = Array2::from_shape_fn((12, 3), |(i, c)| match c {
            1 => 2.0 + i as f64,
            _ => 0.3,
        });
        let heights = buffer.column(1).to_owned();
        guide(vec![5.0; 12]).rescale(&mut buffer);
        assert_eq!(buffer.column(1), heights);
    }

    // Tests near-zero speeds are skipped instead of divided by
    // Verified by removing the epsilon check
    #[test]
    fn test_rescale_skips_degenerate_frames() {
        let mut buffer = array![[0.0, 1.0, 0.0], [3.0, 1.0, 4.0]];
        let stats = guide(vec![1.0, 5.0]).rescale(&mut buffer);

        assert_eq!(stats.degenerate, 1);
        assert_eq!(stats.rescaled, 1);
        assert!(buffer[[0, 0]].abs() < 1e-15);
        assert!(buffer.iter().all(|v| v.is_finite()));
    }

    // Tests the loss sums squared speed errors
    // Verified by summing absolute errors
    #[test]
    fn test_loss_value() {
        let buffer = array![[3.0, 0.0, 4.0], [0.0, 7.0, 1.0]];
        let loss = guide(vec![3.0, 3.0]).loss(&buffer);
        assert!((loss - 8.0).abs() < 1e-12);
    }

    // Tests the gradient against finite differences on the horizontal channels
    // Verified by dropping the factor of two
    #[test]
    fn test_gradient_matches_finite_differences() {
        let buffer = array![[0.4, 1.0, -0.3], [1.5, 1.1, 0.2], [-0.7, 0.9, 0.9]];
        let g = guide(vec![1.0, 0.5, 2.0]);
        let (gradient, degenerate) = g.gradient(&buffer);
        assert_eq!(degenerate, 0);

        let h = 1e-6;
        for i in 0..3 {
            for c in 0..3 {
                let mut plus = buffer.clone();
                let mut minus = buffer.clone();
                plus[[i, c]] += h;
                minus[[i, c]] -= h;
                let numeric = (g.loss(&plus) - g.loss(&minus)) / (2.0 * h);
                assert!((numeric - gradient[[i, c]]).abs() < 1e-5, "({i}, {c})");
            }
        }
    }
}
