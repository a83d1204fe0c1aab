//! Root trajectory conversion between per-frame velocity and absolute position
//!
//! Velocity form stores, at frame `i ≥ 1`, the horizontal displacement from
//! frame `i − 1`. The root starts at the origin, so the position of frame `i`
//! is the sum of the velocities of frames `1..=i`. Frame 0's velocity is the
//! displacement leading into the clip and does not move the trajectory.

use crate::motion::RootChannels;
use ndarray::{Array2, ArrayView2};

/// Horizontal root position `[x, z]` of every frame
pub fn horizontal_positions(data: ArrayView2<'_, f64>, root: RootChannels) -> Vec<[f64; 2]> {
    let mut positions = Vec::with_capacity(data.nrows());
    let mut current = [0.0, 0.0];
    for (i, frame) in data.rows().into_iter().enumerate() {
        if i > 0 {
            current[0] += frame.get(root.horizontal_x).copied().unwrap_or(0.0);
            current[1] += frame.get(root.horizontal_z).copied().unwrap_or(0.0);
        }
        positions.push(current);
    }
    positions
}

/// Write horizontal velocities derived from absolute positions
///
/// Frame 0 keeps its stored velocity; every later frame receives the
/// displacement from its predecessor.
pub fn write_horizontal_positions(
    data: &mut Array2<f64>,
    root: RootChannels,
    positions: &[[f64; 2]],
) {
    for i in 1..data.nrows().min(positions.len()) {
        let (Some(prev), Some(here)) = (positions.get(i - 1), positions.get(i)) else {
            continue;
        };
        if let Some(v) = data.get_mut([i, root.horizontal_x]) {
            *v = here[0] - prev[0];
        }
        if let Some(v) = data.get_mut([i, root.horizontal_z]) {
            *v = here[1] - prev[1];
        }
    }
}

/// Horizontal speed (displacement magnitude) of every frame
pub fn horizontal_speeds(data: ArrayView2<'_, f64>, root: RootChannels) -> Vec<f64> {
    data.rows()
        .into_iter()
        .map(|frame| {
            let x = frame.get(root.horizontal_x).copied().unwrap_or(0.0);
            let z = frame.get(root.horizontal_z).copied().unwrap_or(0.0);
            x.hypot(z)
        })
        .collect()
}

/// Final horizontal root position of the trajectory
pub fn final_position(data: ArrayView2<'_, f64>, root: RootChannels) -> [f64; 2] {
    horizontal_positions(data, root)
        .last()
        .copied()
        .unwrap_or([0.0, 0.0])
}
