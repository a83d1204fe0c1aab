//! Constraint layer applied around each match/blend iteration
//!
//! A [`ConstraintSet`] is validated once per run. For every pyramid level it is
//! turned into a [`LevelPolicy`] (which constraints are active at this level)
//! and a [`LevelConstraints`] bundle holding the level-resolution data the
//! optimizer needs: pinned frame pairs, velocity targets and the candidate
//! filter.

/// Pinned frame ranges and their projection
pub mod keyframes;
/// Target horizontal speed curves
pub mod profile;
/// Speed-compatible candidate restriction
pub mod search;
/// Frame-to-frame smoothness penalty
pub mod temporal;
/// Horizontal root speed steering
pub mod velocity;

use crate::io::error::{Result, SynthesisError, invalid_parameter};
use crate::motion::RootChannels;
use keyframes::{KeyframeRange, clamp_frames, pin_final_position, resolve_pairs};
use ndarray::{Array2, ArrayView2};
use profile::VelocityProfile;
use search::CandidateFilter;
use temporal::TemporalCoherence;
use tracing::{debug, warn};
use velocity::VelocityGuide;

/// What governs the end of the synthesized motion
///
/// A velocity profile and pinned final frames both dictate how the motion
/// ends, so only one of them can be active.
#[derive(Debug, Clone, PartialEq)]
pub enum EndConstraint {
    /// Nothing constrains the end
    Free,
    /// Final frames are pinned to the reference
    KeyframePinned {
        /// Ranges reaching the last frame
        ranges: Vec<KeyframeRange>,
        /// Also move the final root position onto the reference's
        fix_final_position: bool,
    },
    /// Horizontal speed follows a target curve
    VelocityGoverned {
        /// Target speeds at the output resolution
        profile: VelocityProfile,
        /// Weight of the velocity loss in the total loss
        loss_weight: f64,
    },
}

/// Validated set of constraints for one run
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    start_ranges: Vec<KeyframeRange>,
    end: EndConstraint,
    temporal: Option<TemporalCoherence>,
    search_tolerance: Option<f64>,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self::unconstrained()
    }
}

impl ConstraintSet {
    /// No keyframes, no velocity profile, no smoothing, exhaustive search
    pub const fn unconstrained() -> Self {
        Self {
            start_ranges: Vec::new(),
            end: EndConstraint::Free,
            temporal: None,
            search_tolerance: None,
        }
    }

    /// Validate and combine the individual constraints
    ///
    /// `profile` pairs the velocity profile with its loss weight. Ranges are
    /// split into start and end ranges by whether they pin the last of the
    /// `output_frames` synthesized frames. `fix_final_position` only takes
    /// effect together with an end range.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A range reaching the last frame is combined with a velocity profile
    /// - A weight or the search tolerance is negative or non-finite
    pub fn from_parts(
        output_frames: usize,
        ranges: Vec<KeyframeRange>,
        fix_final_position: bool,
        profile: Option<(VelocityProfile, f64)>,
        temporal_weight: f64,
        search_tolerance: Option<f64>,
    ) -> Result<Self> {
        if !(temporal_weight.is_finite() && temporal_weight >= 0.0) {
            return Err(invalid_parameter(
                "temporal_coherence_weight",
                &temporal_weight,
                &"must be a non-negative number",
            ));
        }
        if let Some(tol) = search_tolerance
            && !(tol.is_finite() && tol >= 0.0)
        {
            return Err(invalid_parameter(
                "velocity_tolerance",
                &tol,
                &"must be a non-negative number",
            ));
        }

        let (end_ranges, start_ranges): (Vec<_>, Vec<_>) = ranges
            .into_iter()
            .partition(|range| range.reaches_end(output_frames));

        let end = match profile {
            Some((profile, _)) if !end_ranges.is_empty() => {
                return Err(SynthesisError::ConflictingConstraints {
                    reason: format!(
                        "a '{}' velocity profile cannot be combined with keyframes pinning the last frame",
                        profile.profile_type()
                    ),
                });
            }
            Some((profile, loss_weight)) => {
                if !(loss_weight.is_finite() && loss_weight >= 0.0) {
                    return Err(invalid_parameter(
                        "velocity_profile.loss_weight",
                        &loss_weight,
                        &"must be a non-negative number",
                    ));
                }
                if fix_final_position {
                    warn!("fix_final_position ignored: the velocity profile governs the end");
                }
                EndConstraint::VelocityGoverned {
                    profile,
                    loss_weight,
                }
            }
            None if !end_ranges.is_empty() => EndConstraint::KeyframePinned {
                ranges: end_ranges,
                fix_final_position,
            },
            None => {
                if fix_final_position {
                    warn!("fix_final_position ignored: no keyframes pin the last frame");
                }
                EndConstraint::Free
            }
        };

        if search_tolerance.is_some() && !matches!(end, EndConstraint::VelocityGoverned { .. }) {
            warn!("velocity-aware search needs a velocity profile; searching all candidates");
        }

        Ok(Self {
            start_ranges,
            end,
            temporal: TemporalCoherence::new(temporal_weight),
            search_tolerance,
        })
    }

    /// Ranges anchored away from the last frame
    pub fn start_ranges(&self) -> &[KeyframeRange] {
        &self.start_ranges
    }

    /// Constraint governing the end of the motion
    pub const fn end(&self) -> &EndConstraint {
        &self.end
    }

    /// Every pinned range, start ranges first
    pub fn keyframe_ranges(&self) -> Vec<KeyframeRange> {
        let mut ranges = self.start_ranges.clone();
        if let EndConstraint::KeyframePinned { ranges: end, .. } = &self.end {
            ranges.extend(end.iter().copied());
        }
        ranges
    }

    /// Velocity profile and loss weight, if the end is velocity governed
    pub const fn velocity_profile(&self) -> Option<(&VelocityProfile, f64)> {
        match &self.end {
            EndConstraint::VelocityGoverned {
                profile,
                loss_weight,
            } => Some((profile, *loss_weight)),
            _ => None,
        }
    }

    /// Temporal coherence term, if enabled
    pub const fn temporal(&self) -> Option<TemporalCoherence> {
        self.temporal
    }

    /// Relative tolerance of the velocity-aware search, if requested
    pub const fn search_tolerance(&self) -> Option<f64> {
        self.search_tolerance
    }

    /// Check that velocity features have root velocity channels to act on
    ///
    /// # Errors
    ///
    /// Returns an error if a velocity profile or pinned final position is
    /// requested while the motion has no root velocity channels
    pub fn check_layout(&self, velocity_root: Option<RootChannels>) -> Result<()> {
        if velocity_root.is_some() {
            return Ok(());
        }
        if let Some((profile, _)) = self.velocity_profile() {
            return Err(invalid_parameter(
                "velocity_profile",
                &profile.profile_type(),
                &"needs root velocity channels (use_velo)",
            ));
        }
        if matches!(
            self.end,
            EndConstraint::KeyframePinned {
                fix_final_position: true,
                ..
            }
        ) {
            return Err(invalid_parameter(
                "fix_final_position",
                &true,
                &"needs root velocity channels (use_velo)",
            ));
        }
        Ok(())
    }
}

/// Which constraints act at one pyramid level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelPolicy {
    /// Move horizontal speeds toward the profile after each update
    pub rescale_velocity: bool,
    /// Fold the velocity loss into the gradient step
    pub velocity_loss: bool,
    /// Overwrite pinned frames with the reference
    pub clamp_keyframes: bool,
    /// Restrict candidates by speed before matching
    pub velocity_aware_search: bool,
    /// Move the final root position onto the reference's at level exit
    pub pin_final_position: bool,
    /// Fold the temporal penalty into the gradient step
    pub temporal: bool,
}

impl LevelPolicy {
    /// Derive the policy for a level
    ///
    /// Velocity steering acts only at the finest level; keyframes are clamped
    /// at every level.
    pub fn for_level(constraints: &ConstraintSet, finest: bool) -> Self {
        let profile = constraints.velocity_profile();
        let has_keyframes = !constraints.keyframe_ranges().is_empty();
        Self {
            rescale_velocity: finest && profile.is_some(),
            velocity_loss: finest && profile.is_some_and(|(_, w)| w > 0.0),
            clamp_keyframes: has_keyframes,
            velocity_aware_search: profile.is_some() && constraints.search_tolerance().is_some(),
            pin_final_position: finest
                && matches!(
                    constraints.end(),
                    EndConstraint::KeyframePinned {
                        fix_final_position: true,
                        ..
                    }
                ),
            temporal: constraints.temporal().is_some(),
        }
    }
}

/// Counters from one projection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionStats {
    /// Frames whose speed was rescaled
    pub rescaled: usize,
    /// Frames skipped for near-zero speed
    pub degenerate: usize,
    /// Frames overwritten by keyframes
    pub clamped: usize,
}

/// Constraint data resolved at one level's resolution
#[derive(Debug, Clone)]
pub struct LevelConstraints {
    policy: LevelPolicy,
    pairs: Vec<(usize, usize)>,
    guide: Option<VelocityGuide>,
    filter: Option<CandidateFilter>,
    temporal: Option<TemporalCoherence>,
    free_region: std::ops::Range<usize>,
    root: Option<RootChannels>,
}

impl LevelConstraints {
    /// Resolve the constraint set for a level
    ///
    /// # Errors
    ///
    /// Returns an error if the velocity profile cannot be resampled to the
    /// level length
    pub fn prepare(
        constraints: &ConstraintSet,
        policy: LevelPolicy,
        reference: ArrayView2<'_, f64>,
        synthesis_frames: usize,
        patch_size: usize,
        velocity_root: Option<RootChannels>,
    ) -> Result<Self> {
        let ranges = constraints.keyframe_ranges();
        let pairs = if policy.clamp_keyframes {
            resolve_pairs(&ranges, synthesis_frames, reference.nrows())
        } else {
            Vec::new()
        };

        let needs_targets =
            policy.rescale_velocity || policy.velocity_loss || policy.velocity_aware_search;
        let (guide, filter) = match (constraints.velocity_profile(), velocity_root) {
            (Some((profile, loss_weight)), Some(root)) if needs_targets => {
                let targets = profile.resampled(synthesis_frames)?;
                let filter = match constraints.search_tolerance() {
                    Some(tol) if policy.velocity_aware_search => Some(CandidateFilter::new(
                        reference, root, &targets, patch_size, tol,
                    )),
                    _ => None,
                };
                (
                    Some(VelocityGuide::new(targets, root, loss_weight)),
                    filter,
                )
            }
            _ => (None, None),
        };

        let start_block = constraints
            .start_ranges()
            .iter()
            .map(|r| r.resolve(synthesis_frames).end)
            .max()
            .unwrap_or(0);
        let end_block = match constraints.end() {
            EndConstraint::KeyframePinned { ranges, .. } => ranges
                .iter()
                .map(|r| r.resolve(synthesis_frames).start)
                .min()
                .unwrap_or(synthesis_frames),
            _ => synthesis_frames,
        };

        debug!(
            pinned = pairs.len(),
            velocity = guide.is_some(),
            filtered = filter.is_some(),
            "level constraints prepared"
        );

        Ok(Self {
            policy,
            pairs,
            guide,
            filter,
            temporal: constraints.temporal(),
            free_region: start_block.saturating_sub(1)..end_block,
            root: velocity_root,
        })
    }

    /// Policy this level was prepared with
    pub const fn policy(&self) -> LevelPolicy {
        self.policy
    }

    /// `(synthesized, reference)` frame pairs pinned at this level
    pub fn pinned_pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Candidate filter, when velocity-aware search is active
    pub const fn filter(&self) -> Option<&CandidateFilter> {
        self.filter.as_ref()
    }

    /// Velocity guide for the loss term, when active at this level
    pub fn velocity_loss(&self) -> Option<&VelocityGuide> {
        self.guide
            .as_ref()
            .filter(|g| self.policy.velocity_loss && g.loss_weight() > 0.0)
    }

    /// Temporal term, when active at this level
    pub const fn temporal(&self) -> Option<TemporalCoherence> {
        if self.policy.temporal {
            self.temporal
        } else {
            None
        }
    }

    /// Apply velocity rescaling, then keyframe clamping
    pub fn project(&self, buffer: &mut Array2<f64>, reference: ArrayView2<'_, f64>) -> ProjectionStats {
        let mut stats = ProjectionStats::default();
        if self.policy.rescale_velocity
            && let Some(guide) = &self.guide
        {
            let rescale = guide.rescale(buffer);
            stats.rescaled = rescale.rescaled;
            stats.degenerate = rescale.degenerate;
        }
        if self.policy.clamp_keyframes {
            stats.clamped = clamp_frames(buffer, reference, &self.pairs);
        }
        stats
    }

    /// Hard post-condition at level exit: clamp keyframes, then pin the final
    /// root position when requested
    pub fn finalize(&self, buffer: &mut Array2<f64>, reference: ArrayView2<'_, f64>) {
        if self.policy.clamp_keyframes {
            clamp_frames(buffer, reference, &self.pairs);
        }
        if self.policy.pin_final_position
            && let Some(root) = self.root
        {
            match pin_final_position(buffer, reference, root, self.free_region.clone()) {
                Some(offset) => debug!(dx = offset[0], dz = offset[1], "final position pinned"),
                None => warn!("no free frames left to absorb the final position offset"),
            }
        }
    }
}
