//! Target horizontal speed curves
//!
//! A profile is generated once per run for the output length. The finest level
//! consumes it directly; coarser levels see it resampled as a rate.

use crate::io::error::{Result, SynthesisError};
use crate::math::interpolation::{
    ResampleKernel, cosine_ease, lerp, normalized_index, resample, smoothstep,
};
use std::fmt;
use std::str::FromStr;

/// Shape of the speed transition between the start and end speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    /// Fixed speed; start and end must agree
    Constant,
    /// Linear ramp, typically from slow to fast
    LinearAccel,
    /// Linear ramp, typically from fast to slow
    LinearDecel,
    /// Cubic smoothstep between the boundary speeds
    EaseInOut,
    /// Cosine ease, typically from slow to fast
    SmoothAccel,
    /// Cosine ease, typically from fast to slow
    SmoothDecel,
}

impl ProfileType {
    /// Every supported profile, in documentation order
    pub const ALL: [Self; 6] = [
        Self::Constant,
        Self::LinearAccel,
        Self::LinearDecel,
        Self::EaseInOut,
        Self::SmoothAccel,
        Self::SmoothDecel,
    ];

    /// Canonical snake_case name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::LinearAccel => "linear_accel",
            Self::LinearDecel => "linear_decel",
            Self::EaseInOut => "ease_in_out",
            Self::SmoothAccel => "smooth_accel",
            Self::SmoothDecel => "smooth_decel",
        }
    }

    /// Fraction of the transition completed at normalized time `t`
    fn progress(self, t: f64) -> f64 {
        match self {
            Self::Constant => 0.0,
            Self::LinearAccel | Self::LinearDecel => t,
            Self::EaseInOut => smoothstep(t),
            Self::SmoothAccel | Self::SmoothDecel => cosine_ease(t),
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfileType {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| SynthesisError::InvalidProfile {
                profile: s.to_string(),
                reason: format!(
                    "supported types: {}",
                    Self::ALL.map(Self::name).join(", ")
                ),
            })
    }
}

/// Immutable per-frame target horizontal speeds
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityProfile {
    profile_type: ProfileType,
    start_speed: f64,
    end_speed: f64,
    targets: Vec<f64>,
}

impl VelocityProfile {
    /// Generate `frame_count` target speeds
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Either speed is negative or non-finite
    /// - `frame_count` is zero
    /// - A constant profile has different start and end speeds
    pub fn generate(
        profile_type: ProfileType,
        start_speed: f64,
        end_speed: f64,
        frame_count: usize,
    ) -> Result<Self> {
        let invalid = |reason: String| SynthesisError::InvalidProfile {
            profile: profile_type.to_string(),
            reason,
        };

        for (name, speed) in [("start_speed", start_speed), ("end_speed", end_speed)] {
            if !(speed.is_finite() && speed >= 0.0) {
                return Err(invalid(format!(
                    "{name} must be a non-negative number, got {speed}"
                )));
            }
        }
        if frame_count == 0 {
            return Err(invalid("frame_count must be positive".to_string()));
        }
        if profile_type == ProfileType::Constant && (start_speed - end_speed).abs() > 0.0 {
            return Err(invalid(format!(
                "constant profile needs start_speed == end_speed ({start_speed} vs {end_speed})"
            )));
        }

        let targets = (0..frame_count)
            .map(|i| {
                let t = normalized_index(i, frame_count);
                lerp(start_speed, end_speed, profile_type.progress(t)).max(0.0)
            })
            .collect();

        Ok(Self {
            profile_type,
            start_speed,
            end_speed,
            targets,
        })
    }

    /// Profile shape
    pub const fn profile_type(&self) -> ProfileType {
        self.profile_type
    }

    /// Speed at the first frame
    pub const fn start_speed(&self) -> f64 {
        self.start_speed
    }

    /// Speed at the last frame
    pub const fn end_speed(&self) -> f64 {
        self.end_speed
    }

    /// Target speed of every frame
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Target speed at `frame`, if in range
    pub fn target(&self, frame: usize) -> Option<f64> {
        self.targets.get(frame).copied()
    }

    /// Number of frames covered
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the profile covers no frames
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Acceptable speed interval around the target of `frame`
    ///
    /// Frames past the end use the last target.
    pub fn speed_range(&self, frame: usize, tolerance: f64) -> (f64, f64) {
        let index = frame.min(self.targets.len().saturating_sub(1));
        let target = self.target(index).unwrap_or(0.0);
        (
            (target * (1.0 - tolerance)).max(0.0),
            target * (1.0 + tolerance),
        )
    }

    /// Targets at another temporal resolution, expressed as per-frame rates
    ///
    /// # Errors
    ///
    /// Returns an error if `frames` is zero
    pub fn resampled(&self, frames: usize) -> Result<Vec<f64>> {
        let scale = self.targets.len() as f64 / frames.max(1) as f64;
        let values = resample(&self.targets, frames, ResampleKernel::Linear)?;
        Ok(values.into_iter().map(|v| v * scale).collect())
    }
}
