mod resample;
mod trajectory;

#[cfg(test)]
mod tests {
    use crate::walk_motion;
    use ndarray::Array2;
    use patchmotion::io::configuration::DEFAULT_FRAME_TIME;
    use patchmotion::{ChannelLayout, Motion, SynthesisError};

    // Tests a motion keeps its data, layout and default frame time
    // Verified by transposing the stored matrix
    #[test]
    fn test_motion_accessors() {
        let motion = walk_motion(12, 4, 0.5);

        assert_eq!(motion.frames(), 12);
        assert_eq!(motion.channels(), 7);
        assert!(motion.layout().root().is_some());
        assert!((motion.frame_time() - DEFAULT_FRAME_TIME).abs() < 1e-15);
        assert!(motion.frame(11).is_some());
        assert!(motion.frame(12).is_none());
    }

    // Tests empty, mismatched and non-finite data are rejected
    // Verified by removing the finiteness scan
    #[test]
    fn test_motion_rejects_invalid_data() {
        let layout = ChannelLayout::pose_only(3);
        assert!(Motion::new(Array2::zeros((0, 3)), layout).is_err());

        let mismatch = Motion::new(Array2::zeros((4, 2)), layout);
        assert!(matches!(
            mismatch,
            Err(SynthesisError::LayoutMismatch { .. })
        ));

        let mut data = Array2::zeros((4, 3));
        data[[2, 1]] = f64::NAN;
        assert!(Motion::new(data, layout).is_err());
    }

    // Tests frame time must be positive and survives with_data
    // Verified by resetting the frame time in with_data
    #[test]
    fn test_frame_time_handling() {
        let motion = walk_motion(8, 2, 1.0)
            .with_frame_time(0.01)
            .expect("frame time");
        assert!((motion.frame_time() - 0.01).abs() < 1e-15);

        let copy = motion
            .with_data(Array2::zeros((3, 5)))
            .expect("same layout");
        assert!((copy.frame_time() - 0.01).abs() < 1e-15);
        assert_eq!(copy.frames(), 3);

        assert!(motion.clone().with_frame_time(0.0).is_err());
        assert!(motion.with_frame_time(f64::INFINITY).is_err());
    }
}
