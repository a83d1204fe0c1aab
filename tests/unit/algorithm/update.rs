//! Tests for the preconditioned gradient step

#[cfg(test)]
mod tests {
    use ndarray::Array2;
    use patchmotion::RootChannels;
    use patchmotion::algorithm::blending::BlendResult;
    use patchmotion::algorithm::update::{UpdateTerms, gradient_step};
    use patchmotion::constraints::temporal::TemporalCoherence;
    use patchmotion::constraints::velocity::VelocityGuide;

    fn noisy_blend(frames: usize) -> BlendResult {
        BlendResult {
            blended: Array2::from_shape_fn((frames, 2), |(i, c)| {
                ((i * 13 + c * 7) as f64).sin()
            }),
            coverage: vec![3; frames],
        }
    }

    fn total_loss(x: &Array2<f64>, blend: &BlendResult, weight: f64) -> f64 {
        let patch: f64 = x
            .rows()
            .into_iter()
            .zip(blend.blended.rows())
            .zip(&blend.coverage)
            .map(|((a, b), &w)| {
                w as f64
                    * a.iter()
                        .zip(b.iter())
                        .map(|(p, q)| (p - q).powi(2))
                        .sum::<f64>()
            })
            .sum();
        patch + weight * TemporalCoherence::penalty(x)
    }

    // Tests the step lands on the blend when no extra terms are active
    // Verified by halving the step
    #[test]
    fn test_plain_step_reaches_blend() {
        let blend = noisy_blend(10);
        let current = Array2::from_elem((10, 2), 5.0);
        let outcome = gradient_step(&current, &blend, &UpdateTerms::default()).expect("step");

        for (a, b) in outcome.buffer.iter().zip(blend.blended.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(outcome.degenerate, 0);
    }

    // Tests frames without coverage stay where they are
    // Verified by dividing by a zero curvature
    #[test]
    fn test_uncovered_frames_unchanged() {
        let mut blend = noisy_blend(4);
        blend.coverage = vec![0, 1, 1, 0];
        let current = Array2::from_elem((4, 2), 2.0);
        let outcome = gradient_step(&current, &blend, &UpdateTerms::default()).expect("step");

        assert_eq!(outcome.buffer.row(0), current.row(0));
        assert_eq!(outcome.buffer.row(3), current.row(3));
    }

    // Tests the smoothness term decreases the combined loss and smooths the result
    // Verified by adding the temporal gradient with the wrong sign
    #[test]
    fn test_temporal_step_descends() {
        let blend = noisy_blend(30);
        let weight = 2.0;
        let terms = UpdateTerms {
            temporal: TemporalCoherence::new(weight),
            velocity: None,
        };
        let outcome = gradient_step(&blend.blended, &blend, &terms).expect("step");

        assert!(
            total_loss(&outcome.buffer, &blend, weight) < total_loss(&blend.blended, &blend, weight)
        );
        assert!(
            TemporalCoherence::penalty(&outcome.buffer) < TemporalCoherence::penalty(&blend.blended)
        );
    }

    // Tests the velocity term pulls horizontal speed toward the target only
    // Verified by applying the velocity gradient to every channel
    #[test]
    fn test_velocity_step_moves_horizontal_channels() {
        let root = RootChannels::trailing(3).expect("root");
        let buffer = Array2::from_shape_fn((5, 3), |(_, c)| if c == 0 { 2.0 } else { 0.0 });
        let blend = BlendResult {
            blended: buffer.clone(),
            coverage: vec![1; 5],
        };
        let guide = VelocityGuide::new(vec![1.0; 5], root, 1.0);
        let terms = UpdateTerms {
            temporal: None,
            velocity: Some(&guide),
        };
        let outcome = gradient_step(&buffer, &blend, &terms).expect("step");

        for frame in outcome.buffer.rows() {
            assert!((frame[0] - 1.5).abs() < 1e-12);
            assert!(frame[1].abs() < 1e-15);
        }
    }

    // Tests mismatched shapes are rejected
    // Verified by removing the shape check
    #[test]
    fn test_shape_mismatch() {
        let blend = noisy_blend(6);
        let current = Array2::zeros((5, 2));
        assert!(gradient_step(&current, &blend, &UpdateTerms::default()).is_err());
    }
}
