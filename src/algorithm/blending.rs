//! Overlapping patch aggregation
//!
//! Frame `i` of a buffer with `L` frames and patch length `p` is covered by
//! the query patches starting at `max(0, i − p + 1) ..= min(i, L − p)`. Each
//! contributes the frame of its matched reference patch at the same position
//! with weight 1, so interior frames average `p` estimates and the weight
//! falls off linearly toward both ends of the buffer.

use crate::algorithm::matcher::MatchSet;
use crate::io::error::{Result, computation_error};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Blended buffer and the weight behind every frame
#[derive(Debug, Clone, PartialEq)]
pub struct BlendResult {
    /// Average of all contributions per frame
    pub blended: Array2<f64>,
    /// Number of contributions per frame
    pub coverage: Vec<usize>,
}

/// Number of patches covering each frame
pub fn coverage_counts(frames: usize, patch_size: usize) -> Vec<usize> {
    if patch_size == 0 || patch_size > frames {
        return vec![0; frames];
    }
    let last_query = frames - patch_size;
    (0..frames)
        .map(|i| {
            let first = (i + 1).saturating_sub(patch_size);
            i.min(last_query) + 1 - first
        })
        .collect()
}

/// Average the matched reference frames over every covering patch
///
/// # Errors
///
/// Returns an error if the match set does not cover a buffer of `frames`
/// frames or a matched candidate lies outside the reference
pub fn blend_matches(
    matches: &MatchSet,
    reference: ArrayView2<'_, f64>,
    frames: usize,
) -> Result<BlendResult> {
    let patch_size = matches.patch_size();
    if patch_size == 0 || frames < patch_size || matches.len() != frames - patch_size + 1 {
        return Err(computation_error(
            "blend",
            &format!(
                "{} matches cannot cover {frames} frames with patches of {patch_size}",
                matches.len()
            ),
        ));
    }
    if let Some(m) = matches
        .matches()
        .iter()
        .find(|m| m.candidate + patch_size > reference.nrows())
    {
        return Err(computation_error(
            "blend",
            &format!(
                "candidate {} exceeds the reference ({} frames)",
                m.candidate,
                reference.nrows()
            ),
        ));
    }

    let channels = reference.ncols();
    let coverage = coverage_counts(frames, patch_size);
    let last_query = frames - patch_size;

    let rows: Vec<Vec<f64>> = (0..frames)
        .into_par_iter()
        .map(|i| {
            let mut sum = vec![0.0; channels];
            let first = (i + 1).saturating_sub(patch_size);
            let covering = matches
                .matches()
                .get(first..=i.min(last_query))
                .unwrap_or_default();
            for m in covering {
                let source = reference.row(m.candidate + i - m.query);
                for (acc, v) in sum.iter_mut().zip(source.iter()) {
                    *acc += v;
                }
            }
            let weight = covering.len().max(1) as f64;
            sum.into_iter().map(|v| v / weight).collect()
        })
        .collect();

    let blended = Array2::from_shape_vec((frames, channels), rows.concat())
        .map_err(|e| computation_error("blend", &e))?;
    Ok(BlendResult { blended, coverage })
}
