//! Tests for temporal resampling of motions

#[cfg(test)]
mod tests {
    use crate::walk_motion;
    use patchmotion::math::interpolation::ResampleKernel;
    use patchmotion::motion::resample::{resample_frames, resample_motion};

    // Tests horizontal velocities scale with the frame rate while height does not
    // Verified by skipping the rate scaling
    #[test]
    fn test_velocity_channels_scale_as_rates() {
        let motion = walk_motion(100, 2, 1.0);
        let root = motion.layout().root();
        let half = resample_frames(motion.view(), 50, ResampleKernel::Linear, root)
            .expect("resample");

        for frame in half.rows() {
            assert!((frame[2] - 2.0).abs() < 1e-9, "x velocity should double");
            assert!(frame[4].abs() < 1e-12);
            assert!(frame[3] > 0.9 && frame[3] < 1.1, "height must not scale");
        }
    }

    // Tests position-form data is interpolated without rate scaling
    // Verified by always passing the root to the scaler
    #[test]
    fn test_position_channels_not_scaled() {
        let motion = walk_motion(100, 2, 1.0);
        let half =
            resample_frames(motion.view(), 50, ResampleKernel::Linear, None).expect("resample");
        assert!(half.column(2).iter().all(|v| (v - 1.0).abs() < 1e-9));
    }

    // Tests the first and last frames survive resampling
    // Verified by sampling at cell centers
    #[test]
    fn test_endpoints_preserved() {
        let motion = walk_motion(40, 3, 0.2);
        let root = motion.layout().root();
        for kernel in [ResampleKernel::Linear, ResampleKernel::Cubic] {
            let out = resample_frames(motion.view(), 73, kernel, root).expect("resample");
            for c in 0..3 {
                assert!((out[[0, c]] - motion.view()[[0, c]]).abs() < 1e-12);
                assert!((out[[72, c]] - motion.view()[[39, c]]).abs() < 1e-12);
            }
        }
    }

    // Tests a motion keeps its duration when resampled
    // Verified by keeping the original frame time
    #[test]
    fn test_resample_motion_keeps_duration() {
        let motion = walk_motion(60, 2, 0.5);
        let root = motion.layout().root();
        let out = resample_motion(&motion, 30, ResampleKernel::Linear, root).expect("resample");

        assert_eq!(out.frames(), 30);
        assert_eq!(out.layout(), motion.layout());
        let before = motion.frame_time() * 60.0;
        let after = out.frame_time() * 30.0;
        assert!((before - after).abs() < 1e-12);
    }

    // Tests zero target frames is rejected and equal lengths copy
    // Verified by returning an empty matrix for zero frames
    #[test]
    fn test_resample_edge_lengths() {
        let motion = walk_motion(10, 1, 0.1);
        assert!(resample_frames(motion.view(), 0, ResampleKernel::Linear, None).is_err());
        let same = resample_frames(motion.view(), 10, ResampleKernel::Cubic, None).expect("copy");
        assert_eq!(same, motion.view());
    }
}
