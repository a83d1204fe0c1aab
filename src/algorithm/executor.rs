use crate::algorithm::blending::blend_matches;
use crate::algorithm::matcher::{MatchOptions, channel_weights, match_patches};
use crate::algorithm::update::{UpdateTerms, gradient_step};
use crate::constraints::temporal::TemporalCoherence;
use crate::constraints::{ConstraintSet, LevelConstraints, LevelPolicy};
use crate::io::configuration::{
    DEFAULT_NOISE_SIGMA, DEFAULT_NUM_STEPS, DEFAULT_PATCH_SIZE, DEFAULT_PYR_FACTOR, DEFAULT_SEED,
    DEFAULT_VELOCITY_CHANNEL_WEIGHT,
};
use crate::io::error::{Result, computation_error, invalid_parameter};
use crate::math::interpolation::ResampleKernel;
use crate::math::noise::NoiseSource;
use crate::motion::pyramid::{Pyramid, PyramidSettings};
use crate::motion::resample::resample_frames;
use crate::motion::{Motion, RootChannels};
use ndarray::Array2;
use tracing::{debug, info};

/// Everything the optimizer needs besides the reference motion
#[derive(Debug, Clone)]
pub struct SynthesisPlan {
    /// Frames of the synthesized motion at the finest level
    pub output_frames: usize,
    /// Frames per patch
    pub patch_size: usize,
    /// Resolution ratio between adjacent levels
    pub pyr_factor: f64,
    /// Iterations per level
    pub num_steps: usize,
    /// Standard deviation of the initialization noise
    pub noise_sigma: f64,
    /// Completeness/diversity trade-off; `None` disables the regularizer
    pub alpha: Option<f64>,
    /// Seed of the initialization noise
    pub seed: u64,
    /// Treat the root's horizontal channels as per-frame velocity
    pub use_velo: bool,
    /// Smallest admissible level length, defaults to `patch_size`
    pub min_level_frames: Option<usize>,
    /// Optional cap on the number of levels
    pub num_stages_limit: Option<usize>,
    /// Matching weight of the horizontal root velocity channels
    pub velocity_channel_weight: f64,
    /// Interpolation used between levels
    pub kernel: ResampleKernel,
    /// Validated constraints
    pub constraints: ConstraintSet,
}

impl SynthesisPlan {
    /// Default plan producing `output_frames` frames without constraints
    pub const fn new(output_frames: usize) -> Self {
        Self {
            output_frames,
            patch_size: DEFAULT_PATCH_SIZE,
            pyr_factor: DEFAULT_PYR_FACTOR,
            num_steps: DEFAULT_NUM_STEPS,
            noise_sigma: DEFAULT_NOISE_SIGMA,
            alpha: None,
            seed: DEFAULT_SEED,
            use_velo: true,
            min_level_frames: None,
            num_stages_limit: None,
            velocity_channel_weight: DEFAULT_VELOCITY_CHANNEL_WEIGHT,
            kernel: ResampleKernel::Linear,
            constraints: ConstraintSet::unconstrained(),
        }
    }

    /// Check the scalar parameters
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is out of its documented range
    pub fn validate(&self) -> Result<()> {
        if self.output_frames == 0 {
            return Err(invalid_parameter(
                "num_frames",
                &self.output_frames,
                &"must be at least 1",
            ));
        }
        if self.num_steps == 0 {
            return Err(invalid_parameter(
                "num_steps",
                &self.num_steps,
                &"must be at least 1",
            ));
        }
        if !(self.noise_sigma.is_finite() && self.noise_sigma >= 0.0) {
            return Err(invalid_parameter(
                "noise_sigma",
                &self.noise_sigma,
                &"must be a non-negative number",
            ));
        }
        if let Some(alpha) = self.alpha
            && !(alpha.is_finite() && alpha >= 0.0)
        {
            return Err(invalid_parameter(
                "alpha",
                &alpha,
                &"must be a non-negative number",
            ));
        }
        if !(self.velocity_channel_weight.is_finite() && self.velocity_channel_weight >= 0.0) {
            return Err(invalid_parameter(
                "velocity_channel_weight",
                &self.velocity_channel_weight,
                &"must be a non-negative number",
            ));
        }
        Ok(())
    }

    fn pyramid_settings(&self, velocity_root: Option<RootChannels>) -> PyramidSettings {
        PyramidSettings {
            patch_size: self.patch_size,
            pyr_factor: self.pyr_factor,
            min_level_frames: self.min_level_frames.unwrap_or(self.patch_size),
            num_stages_limit: self.num_stages_limit,
            kernel: self.kernel,
            velocity_root,
        }
    }
}

/// Losses and counters of one iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// Level index, 0 is the coarsest
    pub level: usize,
    /// Number of levels in the pyramid
    pub level_count: usize,
    /// Iteration index within the level
    pub iteration: usize,
    /// Length of the synthesized buffer at this level
    pub frames: usize,
    /// Sum of match distances of the buffer entering the iteration
    ///
    /// The loss of the buffer a level leaves with is
    /// [`PyramidOptimizer::exit_patch_losses`].
    pub patch_loss: f64,
    /// Unweighted temporal penalty after the iteration
    pub temporal_loss: f64,
    /// Unweighted velocity loss after the iteration
    pub velocity_loss: f64,
    /// Weighted sum of the three losses
    pub total_loss: f64,
    /// Matches produced by the fallback search
    pub fallback_matches: usize,
    /// Frames skipped for near-zero speed
    pub degenerate_frames: usize,
}

/// Coarse-to-fine patch matching optimizer
///
/// Levels run strictly in order and iterations within a level strictly in
/// sequence; [`PyramidOptimizer::step`] advances by one iteration so callers can
/// report progress between iterations.
pub struct PyramidOptimizer {
    plan: SynthesisPlan,
    pyramid: Pyramid,
    velocity_root: Option<RootChannels>,
    channel_weights: Vec<f64>,
    frame_time: f64,
    noise: NoiseSource,
    level_index: usize,
    iteration: usize,
    buffer: Option<Array2<f64>>,
    level_constraints: Option<LevelConstraints>,
    history: Vec<IterationReport>,
    level_results: Vec<Motion>,
    exit_patch_losses: Vec<f64>,
    finished: bool,
}

impl PyramidOptimizer {
    /// Validate the plan and build the pyramid
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A plan parameter is out of range
    /// - Velocity constraints are requested without root velocity channels
    /// - The pyramid cannot hold a single patch
    pub fn new(reference: &Motion, plan: SynthesisPlan) -> Result<Self> {
        plan.validate()?;
        let velocity_root = if plan.use_velo {
            reference.layout().root()
        } else {
            None
        };
        plan.constraints.check_layout(velocity_root)?;

        let pyramid = Pyramid::build(
            reference,
            plan.output_frames,
            &plan.pyramid_settings(velocity_root),
        )?;
        let channel_weights = channel_weights(
            reference.channels(),
            velocity_root,
            plan.velocity_channel_weight,
        );

        info!(
            levels = pyramid.len(),
            reference_frames = reference.frames(),
            output_frames = plan.output_frames,
            patch_size = plan.patch_size,
            "synthesis planned"
        );

        Ok(Self {
            noise: NoiseSource::new(plan.seed),
            frame_time: reference.frame_time(),
            plan,
            pyramid,
            velocity_root,
            channel_weights,
            level_index: 0,
            iteration: 0,
            buffer: None,
            level_constraints: None,
            history: Vec::new(),
            level_results: Vec::new(),
            exit_patch_losses: Vec::new(),
            finished: false,
        })
    }

    /// Pyramid the optimizer walks through
    pub const fn pyramid(&self) -> &Pyramid {
        &self.pyramid
    }

    /// Plan the optimizer was built with
    pub const fn plan(&self) -> &SynthesisPlan {
        &self.plan
    }

    /// Root channels treated as velocity, if any
    pub const fn velocity_root(&self) -> Option<RootChannels> {
        self.velocity_root
    }

    /// Number of pyramid levels
    pub fn level_count(&self) -> usize {
        self.pyramid.len()
    }

    /// Iterations the whole run will take
    pub fn total_iterations(&self) -> usize {
        self.pyramid.len() * self.plan.num_steps
    }

    /// Whether every level has completed
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reports of every completed iteration
    pub fn history(&self) -> &[IterationReport] {
        &self.history
    }

    /// Synthesized motion at the exit of every completed level
    pub fn level_results(&self) -> &[Motion] {
        &self.level_results
    }

    /// Patch loss of every completed level's final buffer
    ///
    /// The buffer is matched once more after the last iteration and the
    /// keyframe post-condition, so entry `k` is the loss of `level_results()[k]`.
    pub fn exit_patch_losses(&self) -> &[f64] {
        &self.exit_patch_losses
    }

    /// Finest-level motion, once every level has completed
    pub fn result(&self) -> Option<&Motion> {
        if self.finished {
            self.level_results.last()
        } else {
            None
        }
    }

    /// Run one iteration, entering or leaving levels as needed
    ///
    /// Returns `None` once the finest level has completed.
    ///
    /// # Errors
    ///
    /// Returns an error if matching, blending or the update fails; the run
    /// cannot continue afterwards
    pub fn step(&mut self) -> Result<Option<IterationReport>> {
        if self.finished {
            return Ok(None);
        }
        if self.buffer.is_none() {
            self.enter_level()?;
        }

        let report = self.iterate()?;
        self.history.push(report);
        self.iteration += 1;
        if self.iteration >= self.plan.num_steps {
            self.exit_level()?;
        }
        Ok(Some(report))
    }

    /// Run every remaining iteration and return the finest result
    ///
    /// # Errors
    ///
    /// Returns an error if any iteration fails
    pub fn run(mut self) -> Result<Motion> {
        while self.step()?.is_some() {}
        self.level_results
            .pop()
            .ok_or_else(|| computation_error("synthesis", &"no level completed"))
    }

    fn enter_level(&mut self) -> Result<()> {
        let index = self.level_index;
        let level = self
            .pyramid
            .level(index)
            .ok_or_else(|| computation_error("enter_level", &format!("no level {index}")))?;
        let reference = level.reference.view();

        let mut buffer = match self.level_results.last() {
            Some(previous) => resample_frames(
                previous.view(),
                level.synthesis_frames,
                self.plan.kernel,
                self.velocity_root,
            )?,
            None => {
                let mut initial = resample_frames(
                    reference,
                    level.synthesis_frames,
                    self.plan.kernel,
                    self.velocity_root,
                )?;
                self.noise.perturb(&mut initial, self.plan.noise_sigma);
                initial
            }
        };

        let policy = LevelPolicy::for_level(&self.plan.constraints, self.pyramid.is_finest(index));
        let constraints = LevelConstraints::prepare(
            &self.plan.constraints,
            policy,
            reference,
            level.synthesis_frames,
            self.plan.patch_size,
            self.velocity_root,
        )?;
        constraints.project(&mut buffer, reference);

        info!(
            level = index,
            frames = level.synthesis_frames,
            reference_frames = level.reference.frames(),
            ?policy,
            "entering level"
        );

        self.buffer = Some(buffer);
        self.level_constraints = Some(constraints);
        self.iteration = 0;
        Ok(())
    }

    fn iterate(&mut self) -> Result<IterationReport> {
        let level = self.pyramid.level(self.level_index).ok_or_else(|| {
            computation_error("iterate", &format!("no level {}", self.level_index))
        })?;
        let (Some(buffer), Some(constraints)) = (&self.buffer, &self.level_constraints) else {
            return Err(computation_error("iterate", &"level was not entered"));
        };
        let reference = level.reference.view();

        let options = MatchOptions {
            patch_size: self.plan.patch_size,
            alpha: self.plan.alpha,
            channel_weights: &self.channel_weights,
            filter: constraints.filter(),
        };
        let matches = match_patches(buffer.view(), reference, &options)?;
        let blend = blend_matches(&matches, reference, buffer.nrows())?;

        let terms = UpdateTerms {
            temporal: constraints.temporal(),
            velocity: constraints.velocity_loss(),
        };
        let outcome = gradient_step(buffer, &blend, &terms)?;
        let mut next = outcome.buffer;
        let projection = constraints.project(&mut next, reference);

        let temporal_loss = terms
            .temporal
            .map_or(0.0, |_| TemporalCoherence::penalty(&next));
        let velocity_loss = terms.velocity.map_or(0.0, |g| g.loss(&next));
        let patch_loss = matches.patch_loss();
        let total_loss = patch_loss
            + terms.temporal.map_or(0.0, |t| t.weight()) * temporal_loss
            + terms.velocity.map_or(0.0, |g| g.loss_weight()) * velocity_loss;

        let report = IterationReport {
            level: self.level_index,
            level_count: self.pyramid.len(),
            iteration: self.iteration,
            frames: next.nrows(),
            patch_loss,
            temporal_loss,
            velocity_loss,
            total_loss,
            fallback_matches: matches.fallback_count(),
            degenerate_frames: outcome.degenerate + projection.degenerate,
        };
        debug!(
            level = report.level,
            iteration = report.iteration,
            patch_loss,
            temporal_loss,
            velocity_loss,
            total_loss,
            "iteration complete"
        );

        self.buffer = Some(next);
        Ok(report)
    }

    fn exit_level(&mut self) -> Result<()> {
        let index = self.level_index;
        let level = self
            .pyramid
            .level(index)
            .ok_or_else(|| computation_error("exit_level", &format!("no level {index}")))?;
        let mut buffer = self
            .buffer
            .take()
            .ok_or_else(|| computation_error("exit_level", &"level was not entered"))?;
        let reference = level.reference.view();
        let constraints = self.level_constraints.take();
        if let Some(constraints) = &constraints {
            constraints.finalize(&mut buffer, reference);
        }

        let options = MatchOptions {
            patch_size: self.plan.patch_size,
            alpha: self.plan.alpha,
            channel_weights: &self.channel_weights,
            filter: constraints.as_ref().and_then(LevelConstraints::filter),
        };
        let exit_loss = match_patches(buffer.view(), reference, &options)?.patch_loss();
        debug!(level = index, patch_loss = exit_loss, "level complete");
        self.exit_patch_losses.push(exit_loss);

        let frame_time =
            self.frame_time * self.plan.output_frames as f64 / level.synthesis_frames as f64;
        let result = level.reference.with_data(buffer)?.with_frame_time(frame_time)?;
        self.level_results.push(result);

        self.level_index += 1;
        self.iteration = 0;
        if self.level_index >= self.pyramid.len() {
            self.finished = true;
            info!(levels = self.pyramid.len(), "synthesis finished");
        }
        Ok(())
    }
}
