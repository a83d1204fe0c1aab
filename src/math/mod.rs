//! Mathematical utilities for the synthesis pipeline

/// Resampling kernels and ease curves
pub mod interpolation;
/// Seeded noise generation
pub mod noise;
