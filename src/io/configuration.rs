//! Algorithm constants and runtime configuration

use crate::algorithm::executor::SynthesisPlan;
use crate::constraints::ConstraintSet;
use crate::constraints::keyframes::KeyframeRange;
use crate::constraints::profile::{ProfileType, VelocityProfile};
use crate::io::error::{Result, SynthesisError, WithContext, invalid_parameter};
use crate::math::interpolation::ResampleKernel;
use crate::motion::Motion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Seconds per frame when a motion does not say otherwise
pub const DEFAULT_FRAME_TIME: f64 = 1.0 / 30.0;

// Fraction of the speed gap closed per pass, never a hard snap
/// Step of the velocity rescaling projection
pub const VELOCITY_RESCALE_STEP: f64 = 0.5;

/// Magnitudes below this are treated as zero
pub const NUMERIC_EPSILON: f64 = 1e-6;

// Default values for configurable parameters
/// Frames per patch
pub const DEFAULT_PATCH_SIZE: usize = 11;
/// Resolution ratio between adjacent pyramid levels
pub const DEFAULT_PYR_FACTOR: f64 = 0.75;
/// Iterations per pyramid level
pub const DEFAULT_NUM_STEPS: usize = 3;
/// Standard deviation of the initialization noise
pub const DEFAULT_NOISE_SIGMA: f64 = 1.0;
/// Fixed seed for reproducible synthesis
pub const DEFAULT_SEED: u64 = 42;
/// Matching weight of the root velocity channels
pub const DEFAULT_VELOCITY_CHANNEL_WEIGHT: f64 = 1.0;
/// Speed at the first frame of a velocity profile
pub const DEFAULT_START_SPEED: f64 = 1.0;
/// Speed at the last frame of a velocity profile
pub const DEFAULT_END_SPEED: f64 = 0.0;
/// Weight of the velocity loss
pub const DEFAULT_VELOCITY_LOSS_WEIGHT: f64 = 0.1;
/// Relative tolerance of the velocity-aware search
pub const DEFAULT_VELOCITY_TOLERANCE: f64 = 0.15;

// Quality report thresholds
/// Frames per analysis interval
pub const ANALYSIS_INTERVAL_FRAMES: usize = 20;
/// Mean pose change below which a pose counts as frozen
pub const STATIC_POSE_THRESHOLD: f64 = 0.001;
/// Mean root speed above which the root counts as travelling
pub const MOVING_SPEED_THRESHOLD: f64 = 0.02;
/// Mean root speed below which the root counts as standing
pub const NO_TRAVEL_SPEED_THRESHOLD: f64 = 0.01;
/// Heading deviation in degrees that earns a warning
pub const HEADING_WARNING_DEGREES: f64 = 15.0;
/// Heading deviation in degrees that earns an alert
pub const HEADING_ALERT_DEGREES: f64 = 30.0;
/// Shortest run of sliding frames worth reporting
pub const MIN_SLIDING_SEGMENT: usize = 3;

// Progress bar display settings
/// Threshold for switching to batch progress mode
pub const MAX_INDIVIDUAL_PROGRESS_BARS: usize = 5;

// Output settings
/// Suffix added to output filenames
pub const OUTPUT_SUFFIX: &str = "_syn";
/// Extension of motion files
pub const MOTION_EXTENSION: &str = "json";

/// Requested output length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OutputLengthRepr", into = "String")]
pub enum OutputLength {
    /// Exact number of frames
    Frames(usize),
    /// Multiple of the reference length, written `"2x"`
    Multiple(f64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OutputLengthRepr {
    Number(usize),
    Text(String),
}

impl TryFrom<OutputLengthRepr> for OutputLength {
    type Error = SynthesisError;

    fn try_from(repr: OutputLengthRepr) -> Result<Self> {
        match repr {
            OutputLengthRepr::Number(n) => Ok(Self::Frames(n)),
            OutputLengthRepr::Text(s) => s.parse(),
        }
    }
}

impl From<OutputLength> for String {
    fn from(length: OutputLength) -> Self {
        length.to_string()
    }
}

impl fmt::Display for OutputLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frames(n) => write!(f, "{n}"),
            Self::Multiple(m) => write!(f, "{m}x"),
        }
    }
}

impl FromStr for OutputLength {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(factor) = trimmed.strip_suffix(['x', 'X']) {
            let factor: f64 = factor
                .parse()
                .map_err(|e| invalid_parameter("num_frames", &s, &e))?;
            if !(factor.is_finite() && factor > 0.0) {
                return Err(invalid_parameter(
                    "num_frames",
                    &s,
                    &"multiplier must be positive",
                ));
            }
            return Ok(Self::Multiple(factor));
        }
        trimmed
            .parse()
            .map(Self::Frames)
            .map_err(|e| invalid_parameter("num_frames", &s, &e))
    }
}

impl OutputLength {
    /// Frame count for a reference of `reference_frames` frames
    pub fn resolve(self, reference_frames: usize) -> usize {
        match self {
            Self::Frames(n) => n,
            Self::Multiple(m) => (reference_frames as f64 * m).round() as usize,
        }
    }
}

/// Velocity profile request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VelocityProfileConfig {
    /// Profile name such as `linear_decel`
    #[serde(rename = "type")]
    pub profile_type: String,
    /// Speed at the first frame
    pub start_speed: f64,
    /// Speed at the last frame
    pub end_speed: f64,
    /// Weight of the velocity loss
    pub loss_weight: f64,
}

impl Default for VelocityProfileConfig {
    fn default() -> Self {
        Self {
            profile_type: ProfileType::LinearDecel.name().to_string(),
            start_speed: DEFAULT_START_SPEED,
            end_speed: DEFAULT_END_SPEED,
            loss_weight: DEFAULT_VELOCITY_LOSS_WEIGHT,
        }
    }
}

/// Keyframe request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyframeConfig {
    /// Pin the first `n` frames
    pub first_n: Option<usize>,
    /// Pin the last `n` frames
    pub last_n: Option<usize>,
    /// Start of a custom range, negative counts from the end
    pub start: Option<isize>,
    /// End of a custom range; `-1` leaves it open
    pub end: Option<isize>,
    /// Also move the final root position onto the reference's
    pub fix_final_position: bool,
}

impl KeyframeConfig {
    /// Requested ranges; zero-length requests are dropped
    pub fn ranges(&self) -> Vec<KeyframeRange> {
        let mut ranges = Vec::new();
        if let Some(n) = self.first_n.filter(|&n| n > 0) {
            ranges.push(KeyframeRange::first(n));
        }
        if let Some(n) = self.last_n.filter(|&n| n > 0) {
            ranges.push(KeyframeRange::last(n));
        }
        if let Some(start) = self.start {
            let end = self.end.filter(|&e| e != -1);
            ranges.push(KeyframeRange::custom(start, end));
        }
        ranges
    }
}

/// Run configuration as read from TOML and the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesisConfig {
    /// Frames per patch
    pub patch_size: usize,
    /// Resolution ratio between adjacent levels
    pub pyr_factor: f64,
    /// Iterations per level
    pub num_steps: usize,
    /// Standard deviation of the initialization noise
    pub noise_sigma: f64,
    /// Completeness/diversity trade-off
    pub alpha: Option<f64>,
    /// Seed of the initialization noise
    pub seed: u64,
    /// Treat root horizontal channels as per-frame velocity
    pub use_velo: bool,
    /// Output length, defaults to the reference length
    pub num_frames: Option<OutputLength>,
    /// Output length in seconds; overrides `num_frames`
    pub duration: Option<f64>,
    /// Smallest admissible level length
    pub min_level_frames: Option<usize>,
    /// Cap on the number of levels
    pub num_stages_limit: Option<usize>,
    /// Matching weight of root velocity channels
    pub velocity_channel_weight: f64,
    /// Interpolation used between levels
    pub resample_kernel: ResampleKernel,
    /// Target speed curve
    pub velocity_profile: Option<VelocityProfileConfig>,
    /// Pinned frames
    pub keyframes: Option<KeyframeConfig>,
    /// Weight of the temporal coherence penalty, 0 disables it
    pub temporal_coherence_weight: f64,
    /// Restrict candidates by speed before matching
    pub use_velocity_aware_search: bool,
    /// Relative tolerance of the speed filter
    pub velocity_tolerance: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            pyr_factor: DEFAULT_PYR_FACTOR,
            num_steps: DEFAULT_NUM_STEPS,
            noise_sigma: DEFAULT_NOISE_SIGMA,
            alpha: None,
            seed: DEFAULT_SEED,
            use_velo: true,
            num_frames: None,
            duration: None,
            min_level_frames: None,
            num_stages_limit: None,
            velocity_channel_weight: DEFAULT_VELOCITY_CHANNEL_WEIGHT,
            resample_kernel: ResampleKernel::Linear,
            velocity_profile: None,
            keyframes: None,
            temporal_coherence_weight: 0.0,
            use_velocity_aware_search: false,
            velocity_tolerance: DEFAULT_VELOCITY_TOLERANCE,
        }
    }
}

impl SynthesisConfig {
    /// Output frame count for a reference motion
    ///
    /// # Errors
    ///
    /// Returns an error if the duration is not positive or the length
    /// resolves to zero frames
    pub fn output_frames(&self, reference: &Motion) -> Result<usize> {
        let frames = match (self.duration, self.num_frames) {
            (Some(seconds), _) => {
                if !(seconds.is_finite() && seconds > 0.0) {
                    return Err(invalid_parameter(
                        "duration",
                        &seconds,
                        &"must be a positive number of seconds",
                    ));
                }
                (seconds / reference.frame_time()).round() as usize
            }
            (None, Some(length)) => length.resolve(reference.frames()),
            (None, None) => reference.frames(),
        };
        if frames == 0 {
            return Err(invalid_parameter(
                "num_frames",
                &frames,
                &"output must have at least one frame",
            ));
        }
        Ok(frames)
    }

    /// Validated constraints for an output of `output_frames` frames
    ///
    /// # Errors
    ///
    /// Returns an error if the profile is invalid or conflicts with keyframes
    pub fn constraints(&self, output_frames: usize) -> Result<ConstraintSet> {
        let profile = match &self.velocity_profile {
            Some(cfg) => {
                let profile_type: ProfileType = cfg.profile_type.parse()?;
                let profile = VelocityProfile::generate(
                    profile_type,
                    cfg.start_speed,
                    cfg.end_speed,
                    output_frames,
                )?;
                Some((profile, cfg.loss_weight))
            }
            None => None,
        };
        let keyframes = self.keyframes.clone().unwrap_or_default();
        ConstraintSet::from_parts(
            output_frames,
            keyframes.ranges(),
            keyframes.fix_final_position,
            profile,
            self.temporal_coherence_weight,
            self.use_velocity_aware_search
                .then_some(self.velocity_tolerance),
        )
    }

    /// Turn the configuration into a plan for `reference`
    ///
    /// # Errors
    ///
    /// Returns an error if the output length or the constraints are invalid
    pub fn plan(&self, reference: &Motion) -> Result<SynthesisPlan> {
        let output_frames = self.output_frames(reference)?;
        let plan = SynthesisPlan {
            output_frames,
            patch_size: self.patch_size,
            pyr_factor: self.pyr_factor,
            num_steps: self.num_steps,
            noise_sigma: self.noise_sigma,
            alpha: self.alpha,
            seed: self.seed,
            use_velo: self.use_velo,
            min_level_frames: self.min_level_frames,
            num_stages_limit: self.num_stages_limit,
            velocity_channel_weight: self.velocity_channel_weight,
            kernel: self.resample_kernel,
            constraints: self.constraints(output_frames)?,
        };
        plan.validate()?;
        Ok(plan)
    }
}

/// Read a TOML configuration file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn load_config(path: &Path) -> Result<SynthesisConfig> {
    let text = std::fs::read_to_string(path).with_path(path)?;
    Ok(toml::from_str(&text)?)
}
