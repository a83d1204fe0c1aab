//! Tests for root velocity and position conversion

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};
    use patchmotion::RootChannels;
    use patchmotion::motion::trajectory::{
        final_position, horizontal_positions, horizontal_speeds, write_horizontal_positions,
    };

    fn root() -> RootChannels {
        RootChannels::trailing(3).expect("root")
    }

    // Tests positions integrate velocities from frame 1 onward
    // Verified by including frame 0's velocity in the sum
    #[test]
    fn test_positions_skip_first_velocity() {
        let data = array![[5.0, 1.0, 5.0], [1.0, 1.0, 0.0], [0.0, 1.0, 2.0]];
        let positions = horizontal_positions(data.view(), root());

        assert_eq!(positions, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 2.0]]);
        assert_eq!(final_position(data.view(), root()), [1.0, 2.0]);
    }

    // Tests speeds are horizontal magnitudes that ignore height
    // Verified by adding the vertical channel to the magnitude
    #[test]
    fn test_speeds_ignore_vertical() {
        let data = array![[3.0, 10.0, 4.0], [0.0, -2.0, 1.0]];
        let speeds = horizontal_speeds(data.view(), root());
        assert!((speeds[0] - 5.0).abs() < 1e-12);
        assert!((speeds[1] - 1.0).abs() < 1e-12);
    }

    // Tests writing positions back restores the velocities they came from
    // Verified by writing absolute positions instead of differences
    #[test]
    fn test_position_write_back() {
        let data = Array2::from_shape_fn((6, 3), |(i, c)| (i * 3 + c) as f64 * 0.1);
        let positions = horizontal_positions(data.view(), root());

        let mut rebuilt = data.clone();
        rebuilt.column_mut(0).fill(0.0);
        rebuilt.column_mut(2).fill(0.0);
        rebuilt[[0, 0]] = data[[0, 0]];
        rebuilt[[0, 2]] = data[[0, 2]];
        write_horizontal_positions(&mut rebuilt, root(), &positions);

        for (a, b) in rebuilt.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
