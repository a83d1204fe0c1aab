//! Example-based motion synthesis by multiscale patch matching and blending
//!
//! A single reference motion is downsampled into a pyramid. Starting from a
//! noisy coarse estimate, every level alternates nearest-neighbor patch
//! matching against the reference with overlap blending, then seeds the next
//! finer level. Optional constraints pin key poses, steer horizontal speed
//! toward a target curve, penalize jitter and restrict matching to
//! speed-compatible patches.

#![forbid(unsafe_code)]

/// Patch matching, blending and the pyramid optimizer
pub mod algorithm;
/// Quality diagnostics of synthesized motion
pub mod analysis;
/// Keyframes, velocity profiles, smoothness and speed-aware search
pub mod constraints;
/// Input/output operations and error handling
pub mod io;
/// Interpolation and noise utilities
pub mod math;
/// Motion data model, resampling and pyramids
pub mod motion;

pub use algorithm::executor::{IterationReport, PyramidOptimizer, SynthesisPlan};
pub use io::error::{Result, SynthesisError};
pub use motion::{ChannelLayout, Motion, RootChannels};
