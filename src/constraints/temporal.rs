//! Frame-to-frame smoothness penalty
//!
//! The penalty sums squared first differences (velocity) and squared second
//! differences (acceleration) over every channel of the buffer:
//!
//! `T(x) = Σ‖x[i+1] − x[i]‖² + Σ‖x[i+1] − 2x[i] + x[i−1]‖²`

use ndarray::{Array2, Axis};

/// Upper bound on the largest eigenvalue of the penalty's Hessian
///
/// The first-difference term contributes at most 8 and the second-difference
/// term at most 32; the update step uses this to stay stable for any weight.
pub const TEMPORAL_CURVATURE_BOUND: f64 = 40.0;

/// Weighted temporal coherence term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalCoherence {
    weight: f64,
}

impl TemporalCoherence {
    /// Create the term; a non-positive weight disables it
    pub fn new(weight: f64) -> Option<Self> {
        (weight.is_finite() && weight > 0.0).then_some(Self { weight })
    }

    /// Weight applied to the penalty in the total loss
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Unweighted penalty value
    pub fn penalty(buffer: &Array2<f64>) -> f64 {
        let frames = buffer.nrows();
        let mut total = 0.0;
        for i in 0..frames.saturating_sub(1) {
            let here = buffer.row(i);
            let next = buffer.row(i + 1);
            total += next
                .iter()
                .zip(here.iter())
                .map(|(b, a)| (b - a).powi(2))
                .sum::<f64>();
        }
        for i in 1..frames.saturating_sub(1) {
            let prev = buffer.row(i - 1);
            let here = buffer.row(i);
            let next = buffer.row(i + 1);
            total += next
                .iter()
                .zip(here.iter())
                .zip(prev.iter())
                .map(|((n, h), p)| (n - 2.0 * h + p).powi(2))
                .sum::<f64>();
        }
        total
    }

    /// Gradient of the unweighted penalty with respect to every element
    pub fn gradient(buffer: &Array2<f64>) -> Array2<f64> {
        let frames = buffer.nrows();
        let mut grad = Array2::zeros(buffer.raw_dim());

        for i in 0..frames.saturating_sub(1) {
            let diff = &buffer.row(i + 1) - &buffer.row(i);
            {
                let mut g = grad.index_axis_mut(Axis(0), i);
                g.scaled_add(-2.0, &diff);
            }
            let mut g = grad.index_axis_mut(Axis(0), i + 1);
            g.scaled_add(2.0, &diff);
        }

        for i in 1..frames.saturating_sub(1) {
            let accel = &buffer.row(i + 1) - &(&buffer.row(i) * 2.0) + buffer.row(i - 1);
            {
                let mut g = grad.index_axis_mut(Axis(0), i - 1);
                g.scaled_add(2.0, &accel);
            }
            {
                let mut g = grad.index_axis_mut(Axis(0), i);
                g.scaled_add(-4.0, &accel);
            }
            let mut g = grad.index_axis_mut(Axis(0), i + 1);
            g.scaled_add(2.0, &accel);
        }

        grad
    }
}
