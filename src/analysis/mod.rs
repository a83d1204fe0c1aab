//! Post-synthesis diagnostics

/// Pose activity and root trajectory report
pub mod quality;
