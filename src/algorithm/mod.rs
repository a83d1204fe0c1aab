/// Overlapping patch aggregation into one estimate per frame
pub mod blending;
/// Coarse-to-fine optimizer driving match, blend and update
pub mod executor;
/// Nearest-neighbor patch search with speed filtering and fallback
pub mod matcher;
/// Preconditioned gradient step on the total loss
pub mod update;
