//! Coarse-to-fine level construction
//!
//! Level lengths are derived from the finest lengths by repeated scaling with
//! `pyr_factor`: level `k` counted from the finest has `round(n · pyr_factor^k)`
//! frames for both the synthesized output and the reference. Levels are added
//! while both lengths stay at or above the minimum level size, so the number of
//! levels follows from the stopping condition.

use crate::io::error::{Result, invalid_parameter};
use crate::math::interpolation::ResampleKernel;
use crate::motion::resample::resample_motion;
use crate::motion::{Motion, RootChannels};
use tracing::debug;

/// Parameters controlling pyramid construction
#[derive(Debug, Clone, Copy)]
pub struct PyramidSettings {
    /// Frames per patch; every level must hold at least one patch
    pub patch_size: usize,
    /// Resolution ratio between adjacent levels, in `(0, 1)`
    pub pyr_factor: f64,
    /// Smallest admissible level length (at least `patch_size`)
    pub min_level_frames: usize,
    /// Optional cap on the number of levels
    pub num_stages_limit: Option<usize>,
    /// Interpolation kernel used for every resampling
    pub kernel: ResampleKernel,
    /// Root channels stored as per-frame velocity, if any
    pub velocity_root: Option<RootChannels>,
}

/// One resolution stage
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Position in the pyramid, 0 is the coarsest
    pub index: usize,
    /// `pyr_factor^k` relative to the finest level
    pub resolution_factor: f64,
    /// Length of the synthesized buffer at this level
    pub synthesis_frames: usize,
    /// Reference motion resampled to this level
    pub reference: Motion,
}

/// Ordered levels from coarsest to finest
#[derive(Debug, Clone)]
pub struct Pyramid {
    levels: Vec<PyramidLevel>,
}

impl Pyramid {
    /// Build the level sequence for a reference and requested output length
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `pyr_factor` is outside `(0, 1)`
    /// - `patch_size` is zero or larger than the finest reference or output
    /// - `min_level_frames` is smaller than `patch_size`
    pub fn build(
        reference: &Motion,
        output_frames: usize,
        settings: &PyramidSettings,
    ) -> Result<Self> {
        validate_settings(settings)?;

        let finest = reference.frames().min(output_frames);
        if settings.patch_size > finest {
            return Err(invalid_parameter(
                "patch_size",
                &settings.patch_size,
                &format!(
                    "exceeds the finest level ({} reference frames, {output_frames} output frames)",
                    reference.frames()
                ),
            ));
        }

        let stage_limit = settings.num_stages_limit.unwrap_or(usize::MAX).max(1);
        let mut lengths = vec![(1.0, output_frames, reference.frames())];
        let mut factor = 1.0;
        while lengths.len() < stage_limit {
            factor *= settings.pyr_factor;
            let out_k = scaled_length(output_frames, factor);
            let ref_k = scaled_length(reference.frames(), factor);
            if out_k < settings.min_level_frames || ref_k < settings.min_level_frames {
                break;
            }
            lengths.push((factor, out_k, ref_k));
        }
        lengths.reverse();

        let mut levels = Vec::with_capacity(lengths.len());
        for (index, (resolution_factor, synthesis_frames, reference_frames)) in
            lengths.into_iter().enumerate()
        {
            let level_reference = resample_motion(
                reference,
                reference_frames,
                settings.kernel,
                settings.velocity_root,
            )?;
            debug!(
                level = index,
                synthesis_frames, reference_frames, "pyramid level built"
            );
            levels.push(PyramidLevel {
                index,
                resolution_factor,
                synthesis_frames,
                reference: level_reference,
            });
        }

        Ok(Self { levels })
    }

    /// All levels, coarsest first
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the pyramid holds no levels
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level at `index`, if present
    pub fn level(&self, index: usize) -> Option<&PyramidLevel> {
        self.levels.get(index)
    }

    /// Whether `index` names the finest level
    pub fn is_finest(&self, index: usize) -> bool {
        index + 1 == self.levels.len()
    }
}

fn scaled_length(frames: usize, factor: f64) -> usize {
    (frames as f64 * factor).round() as usize
}

fn validate_settings(settings: &PyramidSettings) -> Result<()> {
    if !(settings.pyr_factor > 0.0 && settings.pyr_factor < 1.0) {
        return Err(invalid_parameter(
            "pyr_factor",
            &settings.pyr_factor,
            &"must lie strictly between 0 and 1",
        ));
    }
    if settings.patch_size == 0 {
        return Err(invalid_parameter(
            "patch_size",
            &settings.patch_size,
            &"must be at least 1",
        ));
    }
    if settings.min_level_frames < settings.patch_size {
        return Err(invalid_parameter(
            "min_level_frames",
            &settings.min_level_frames,
            &format!("must be at least patch_size ({})", settings.patch_size),
        ));
    }
    Ok(())
}
