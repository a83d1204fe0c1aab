//! One preconditioned gradient step on the total loss
//!
//! For fixed matches the patch loss of frame `i` is `w_i ‖x_i − b_i‖²` plus a
//! constant, where `b_i` is the blended frame and `w_i` its coverage. The step
//! divides the gradient of
//!
//! `patch + λ_t · temporal + λ_v · velocity`
//!
//! by a per-element curvature bound, so with both weights at zero it lands
//! exactly on the blend.

use crate::algorithm::blending::BlendResult;
use crate::constraints::temporal::{TEMPORAL_CURVATURE_BOUND, TemporalCoherence};
use crate::constraints::velocity::VelocityGuide;
use crate::io::error::{Result, computation_error};
use ndarray::{Array2, Zip};

/// Loss terms folded into the step besides the patch loss
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateTerms<'a> {
    /// Smoothness penalty and its weight
    pub temporal: Option<TemporalCoherence>,
    /// Velocity loss and its weight
    pub velocity: Option<&'a VelocityGuide>,
}

/// Updated buffer plus bookkeeping from the step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Buffer after the step
    pub buffer: Array2<f64>,
    /// Frames whose velocity gradient was skipped for near-zero speed
    pub degenerate: usize,
}

/// Take one step from `current` toward the minimizer of the total loss
///
/// # Errors
///
/// Returns an error if the blend and the current buffer differ in shape or the
/// step produces non-finite values
pub fn gradient_step(
    current: &Array2<f64>,
    blend: &BlendResult,
    terms: &UpdateTerms<'_>,
) -> Result<StepOutcome> {
    if current.dim() != blend.blended.dim() || blend.coverage.len() != current.nrows() {
        return Err(computation_error(
            "gradient_step",
            &format!(
                "buffer {:?} and blend {:?} differ in shape",
                current.dim(),
                blend.blended.dim()
            ),
        ));
    }

    let (lambda_t, temporal_grad) = match terms.temporal {
        Some(term) => (term.weight(), Some(TemporalCoherence::gradient(current))),
        None => (0.0, None),
    };
    let (lambda_v, velocity_root, velocity_grad, degenerate) = match terms.velocity {
        Some(guide) => {
            let (grad, degenerate) = guide.gradient(current);
            (guide.loss_weight(), Some(guide.root()), Some(grad), degenerate)
        }
        None => (0.0, None, None, 0),
    };

    let mut buffer = current.clone();
    Zip::indexed(&mut buffer)
        .and(&blend.blended)
        .par_for_each(|(i, c), x, &b| {
            let w = blend.coverage.get(i).copied().unwrap_or(0) as f64;
            let mut gradient = 2.0 * w * (*x - b);
            let mut curvature = 2.0 * w;
            if let Some(grad) = &temporal_grad {
                gradient += lambda_t * grad.get([i, c]).copied().unwrap_or(0.0);
                curvature += lambda_t * TEMPORAL_CURVATURE_BOUND;
            }
            if let (Some(grad), Some(root)) = (&velocity_grad, velocity_root)
                && root.is_horizontal(c)
            {
                gradient += lambda_v * grad.get([i, c]).copied().unwrap_or(0.0);
                curvature += 2.0 * lambda_v;
            }
            if curvature > 0.0 {
                *x -= gradient / curvature;
            }
        });

    if buffer.iter().any(|v| !v.is_finite()) {
        return Err(computation_error(
            "gradient_step",
            &"update produced non-finite values",
        ));
    }

    Ok(StepOutcome { buffer, degenerate })
}
