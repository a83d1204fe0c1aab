//! Temporal resampling preserving channel semantics
//!
//! Every channel is interpolated over a time axis whose first and last frames
//! stay fixed. Horizontal root velocities are per-frame rates: when the same
//! time span is covered by fewer frames each frame travels further, so they
//! are rescaled by `source_frames / target_frames` after interpolation.

use crate::io::error::{Result, invalid_parameter};
use crate::math::interpolation::{ResampleKernel, resample};
use crate::motion::{Motion, RootChannels};
use ndarray::{Array2, ArrayView2};

/// Resample a frames × channels matrix to `target_frames` frames
///
/// # Errors
///
/// Returns an error if `target_frames` is zero or the source has no frames
pub fn resample_frames(
    data: ArrayView2<'_, f64>,
    target_frames: usize,
    kernel: ResampleKernel,
    velocity_root: Option<RootChannels>,
) -> Result<Array2<f64>> {
    if target_frames == 0 {
        return Err(invalid_parameter(
            "target_frames",
            &target_frames,
            &"cannot resample to zero frames",
        ));
    }
    let source_frames = data.nrows();
    if source_frames == target_frames {
        return Ok(data.to_owned());
    }

    let rate_scale = source_frames as f64 / target_frames as f64;
    let mut output = Array2::zeros((target_frames, data.ncols()));
    for (c, column) in data.columns().into_iter().enumerate() {
        let values: Vec<f64> = column.iter().copied().collect();
        let mut resampled = resample(&values, target_frames, kernel)?;
        if velocity_root.is_some_and(|r| r.is_horizontal(c)) {
            for v in &mut resampled {
                *v *= rate_scale;
            }
        }
        for (dst, src) in output.column_mut(c).iter_mut().zip(resampled) {
            *dst = src;
        }
    }
    Ok(output)
}

/// Resample a motion, keeping its layout and total duration
///
/// # Errors
///
/// Returns an error if `target_frames` is zero
pub fn resample_motion(
    motion: &Motion,
    target_frames: usize,
    kernel: ResampleKernel,
    velocity_root: Option<RootChannels>,
) -> Result<Motion> {
    let data = resample_frames(motion.view(), target_frames, kernel, velocity_root)?;
    let duration = motion.frame_time() * motion.frames() as f64;
    motion
        .with_data(data)?
        .with_frame_time(duration / target_frames as f64)
}
