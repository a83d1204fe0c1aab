//! Steering horizontal root speed toward a target profile
//!
//! Only the two horizontal root channels are read or written here. The
//! vertical channel carries absolute height and is never scaled, so jumps and
//! stairs survive any speed change.

use crate::io::configuration::{NUMERIC_EPSILON, VELOCITY_RESCALE_STEP};
use crate::motion::RootChannels;
use ndarray::Array2;
use tracing::trace;

/// Counters reported by a rescaling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescaleStats {
    /// Frames whose horizontal speed was moved toward the target
    pub rescaled: usize,
    /// Frames skipped because their speed was too small to define a direction
    pub degenerate: usize,
}

/// Target speeds for one level plus the loss weight
#[derive(Debug, Clone)]
pub struct VelocityGuide {
    targets: Vec<f64>,
    root: RootChannels,
    loss_weight: f64,
}

impl VelocityGuide {
    /// Create a guide from per-frame targets at the level's resolution
    pub const fn new(targets: Vec<f64>, root: RootChannels, loss_weight: f64) -> Self {
        Self {
            targets,
            root,
            loss_weight,
        }
    }

    /// Per-frame target speeds
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Root channels the guide acts on
    pub const fn root(&self) -> RootChannels {
        self.root
    }

    /// Weight of the velocity loss in the total loss
    pub const fn loss_weight(&self) -> f64 {
        self.loss_weight
    }

    fn components(&self, buffer: &Array2<f64>, frame: usize) -> (f64, f64) {
        let x = buffer
            .get([frame, self.root.horizontal_x])
            .copied()
            .unwrap_or(0.0);
        let z = buffer
            .get([frame, self.root.horizontal_z])
            .copied()
            .unwrap_or(0.0);
        (x, z)
    }

    /// Move each frame's horizontal speed a fixed fraction toward its target
    ///
    /// Direction is preserved; frames with near-zero speed are skipped.
    pub fn rescale(&self, buffer: &mut Array2<f64>) -> RescaleStats {
        let mut stats = RescaleStats::default();
        for frame in 0..buffer.nrows() {
            let Some(&target) = self.targets.get(frame) else {
                break;
            };
            let (x, z) = self.components(buffer, frame);
            let speed = x.hypot(z);
            if speed < NUMERIC_EPSILON {
                stats.degenerate += 1;
                continue;
            }
            let new_speed = VELOCITY_RESCALE_STEP.mul_add(target - speed, speed);
            let scale = new_speed / speed;
            if let Some(v) = buffer.get_mut([frame, self.root.horizontal_x]) {
                *v = x * scale;
            }
            if let Some(v) = buffer.get_mut([frame, self.root.horizontal_z]) {
                *v = z * scale;
            }
            stats.rescaled += 1;
        }
        if stats.degenerate > 0 {
            trace!(
                degenerate = stats.degenerate,
                "skipped near-zero speeds during rescaling"
            );
        }
        stats
    }

    /// Unweighted loss `Σ (speed − target)²`
    pub fn loss(&self, buffer: &Array2<f64>) -> f64 {
        (0..buffer.nrows())
            .zip(&self.targets)
            .map(|(frame, &target)| {
                let (x, z) = self.components(buffer, frame);
                (x.hypot(z) - target).powi(2)
            })
            .sum()
    }

    /// Gradient of the unweighted loss and the number of degenerate frames
    ///
    /// The gradient is undefined at zero speed; such frames contribute zero.
    pub fn gradient(&self, buffer: &Array2<f64>) -> (Array2<f64>, usize) {
        let mut grad = Array2::zeros(buffer.raw_dim());
        let mut degenerate = 0;
        for (frame, &target) in (0..buffer.nrows()).zip(&self.targets) {
            let (x, z) = self.components(buffer, frame);
            let speed = x.hypot(z);
            if speed < NUMERIC_EPSILON {
                degenerate += 1;
                continue;
            }
            let factor = 2.0 * (speed - target) / speed;
            if let Some(g) = grad.get_mut([frame, self.root.horizontal_x]) {
                *g = factor * x;
            }
            if let Some(g) = grad.get_mut([frame, self.root.horizontal_z]) {
                *g = factor * z;
            }
        }
        (grad, degenerate)
    }
}
