//! Command-line interface for batch motion synthesis

use crate::algorithm::executor::PyramidOptimizer;
use crate::analysis::quality::{IntervalStatus, QualityReport, analyze};
use crate::io::configuration::{
    KeyframeConfig, MOTION_EXTENSION, OUTPUT_SUFFIX, OutputLength, SynthesisConfig,
    VelocityProfileConfig, load_config,
};
use crate::io::error::{Result, computation_error, invalid_parameter};
use crate::io::motion_file::{load_motion, save_motion};
use crate::io::progress::ProgressManager;
use crate::math::interpolation::ResampleKernel;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "patchmotion")]
#[command(
    author,
    version,
    about = "Synthesize new motion from a single example by multiscale patch matching"
)]
/// Command-line arguments for the motion synthesis tool
// CLI tools commonly need multiple boolean flags for various features and user preferences
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input motion file (JSON) or directory of motion files
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// TOML configuration file; command-line values override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for synthesized motions (defaults to the input's directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Random seed for reproducible synthesis
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Output length as a frame count or a multiple such as "2x"
    #[arg(short = 'f', long)]
    pub num_frames: Option<OutputLength>,

    /// Output length in seconds (overrides --num-frames)
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Frames per patch
    #[arg(short, long)]
    pub patch_size: Option<usize>,

    /// Resolution ratio between adjacent pyramid levels
    #[arg(long)]
    pub pyr_factor: Option<f64>,

    /// Optimization steps per pyramid level
    #[arg(long)]
    pub num_steps: Option<usize>,

    /// Standard deviation of the initialization noise
    #[arg(long)]
    pub noise_sigma: Option<f64>,

    /// Completeness/diversity trade-off
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Cap on the number of pyramid levels
    #[arg(long)]
    pub num_stages_limit: Option<usize>,

    /// Interpolation between pyramid levels
    #[arg(long, value_parser = parse_kernel)]
    pub resample_kernel: Option<ResampleKernel>,

    /// Treat root channels as absolute positions instead of velocities
    #[arg(long)]
    pub no_velo: bool,

    /// Pin the first N frames to the input
    #[arg(long)]
    pub keyframe_first_n: Option<usize>,

    /// Pin the last N frames to the input
    #[arg(long)]
    pub keyframe_last_n: Option<usize>,

    /// Start of a custom pinned range (negative counts from the end)
    #[arg(long, allow_hyphen_values = true)]
    pub keyframe_start: Option<isize>,

    /// End of a custom pinned range, -1 for an open end
    #[arg(long, allow_hyphen_values = true)]
    pub keyframe_end: Option<isize>,

    /// Move the final root position onto the input's (may cause foot sliding)
    #[arg(long)]
    pub fix_final_position: bool,

    /// Velocity profile type
    #[arg(long)]
    pub velocity_profile: Option<String>,

    /// Profile speed at the first frame
    #[arg(long)]
    pub start_speed: Option<f64>,

    /// Profile speed at the last frame
    #[arg(long)]
    pub end_speed: Option<f64>,

    /// Weight of the velocity loss
    #[arg(long)]
    pub velocity_loss_weight: Option<f64>,

    /// Weight of the temporal coherence penalty
    #[arg(long)]
    pub temporal_coherence_weight: Option<f64>,

    /// Restrict matching candidates by speed
    #[arg(long)]
    pub velocity_aware_search: bool,

    /// Relative tolerance of the speed filter
    #[arg(long)]
    pub velocity_tolerance: Option<f64>,

    /// Log a pose and trajectory quality report for every output
    #[arg(short, long)]
    pub report: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Process files even if output exists
    #[arg(short, long)]
    pub no_skip: bool,
}

fn parse_kernel(s: &str) -> std::result::Result<ResampleKernel, String> {
    match s {
        "linear" => Ok(ResampleKernel::Linear),
        "cubic" => Ok(ResampleKernel::Cubic),
        other => Err(format!("unknown kernel '{other}', expected linear or cubic")),
    }
}

impl Cli {
    /// Check if existing output files should be skipped
    pub const fn skip_existing(&self) -> bool {
        !self.no_skip
    }

    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Configuration file values with command-line overrides applied
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn config(&self) -> Result<SynthesisConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SynthesisConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Overwrite configuration values given on the command line
    pub fn apply_overrides(&self, config: &mut SynthesisConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.num_frames.is_some() {
            config.num_frames = self.num_frames;
        }
        if self.duration.is_some() {
            config.duration = self.duration;
        }
        if let Some(patch_size) = self.patch_size {
            config.patch_size = patch_size;
        }
        if let Some(pyr_factor) = self.pyr_factor {
            config.pyr_factor = pyr_factor;
        }
        if let Some(num_steps) = self.num_steps {
            config.num_steps = num_steps;
        }
        if let Some(noise_sigma) = self.noise_sigma {
            config.noise_sigma = noise_sigma;
        }
        if self.alpha.is_some() {
            config.alpha = self.alpha;
        }
        if self.num_stages_limit.is_some() {
            config.num_stages_limit = self.num_stages_limit;
        }
        if let Some(kernel) = self.resample_kernel {
            config.resample_kernel = kernel;
        }
        if self.no_velo {
            config.use_velo = false;
        }

        let keyframe_requested = self.keyframe_first_n.is_some()
            || self.keyframe_last_n.is_some()
            || self.keyframe_start.is_some()
            || self.fix_final_position;
        if keyframe_requested {
            let keyframes = config.keyframes.get_or_insert_with(KeyframeConfig::default);
            if self.keyframe_first_n.is_some() {
                keyframes.first_n = self.keyframe_first_n;
            }
            if self.keyframe_last_n.is_some() {
                keyframes.last_n = self.keyframe_last_n;
            }
            if self.keyframe_start.is_some() {
                keyframes.start = self.keyframe_start;
                keyframes.end = self.keyframe_end;
            }
            keyframes.fix_final_position |= self.fix_final_position;
        }

        if let Some(profile_type) = &self.velocity_profile {
            let profile = config
                .velocity_profile
                .get_or_insert_with(VelocityProfileConfig::default);
            profile.profile_type.clone_from(profile_type);
        }
        if let Some(profile) = config.velocity_profile.as_mut() {
            if let Some(v) = self.start_speed {
                profile.start_speed = v;
            }
            if let Some(v) = self.end_speed {
                profile.end_speed = v;
            }
            if let Some(v) = self.velocity_loss_weight {
                profile.loss_weight = v;
            }
        }

        if let Some(weight) = self.temporal_coherence_weight {
            config.temporal_coherence_weight = weight;
        }
        if self.velocity_aware_search {
            config.use_velocity_aware_search = true;
        }
        if let Some(tol) = self.velocity_tolerance {
            config.velocity_tolerance = tol;
        }
    }
}

/// Orchestrates batch synthesis of motion files with progress tracking
pub struct FileProcessor {
    cli: Cli,
    config: SynthesisConfig,
    progress_manager: Option<ProgressManager>,
}

impl FileProcessor {
    /// Create a new file processor with the given CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded
    pub fn new(cli: Cli) -> Result<Self> {
        let config = cli.config()?;
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Ok(Self {
            cli,
            config,
            progress_manager,
        })
    }

    /// Configuration applied to every file
    pub const fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Process files according to CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if target validation or any synthesis fails
    pub fn process(&mut self) -> Result<()> {
        let files = self.collect_files()?;

        if files.is_empty() {
            return Ok(());
        }

        if let Some(ref mut pm) = self.progress_manager {
            pm.initialize(files.len());
        }

        for (index, file) in files.iter().enumerate() {
            self.process_file(file, index)?;
        }

        if let Some(ref pm) = self.progress_manager {
            pm.finish();
        }

        Ok(())
    }

    /// Motion files the target names, minus skipped ones
    ///
    /// # Errors
    ///
    /// Returns an error if the target is neither a motion file nor a directory
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let target = &self.cli.target;
        if target.is_file() {
            if !is_motion_file(target) {
                return Err(invalid_parameter(
                    "target",
                    &target.display(),
                    &format!("input must be a .{MOTION_EXTENSION} motion file"),
                ));
            }
            Ok(if self.should_process_file(target) {
                vec![target.clone()]
            } else {
                Vec::new()
            })
        } else if target.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(target)? {
                let path = entry?.path();
                if is_motion_file(&path) && !is_output_file(&path) && self.should_process_file(&path)
                {
                    files.push(path);
                }
            }
            files.sort();
            Ok(files)
        } else {
            Err(invalid_parameter(
                "target",
                &target.display(),
                &"must be a motion file or a directory",
            ))
        }
    }

    fn should_process_file(&self, input_path: &Path) -> bool {
        if !self.cli.skip_existing() {
            return true;
        }
        let output_path = self.output_path(input_path);
        if output_path.exists() {
            info!(input = %input_path.display(), "skipping, output exists");
            false
        } else {
            true
        }
    }

    fn process_file(&mut self, input_path: &Path, index: usize) -> Result<()> {
        let start_time = Instant::now();
        let output_path = self.output_path(input_path);

        let reference = load_motion(input_path)?;
        let plan = self.config.plan(&reference)?;
        let mut optimizer = PyramidOptimizer::new(&reference, plan)?;

        if let Some(ref mut pm) = self.progress_manager {
            pm.start_file(index, input_path, optimizer.total_iterations());
        }

        while let Some(report) = optimizer.step()? {
            if let Some(ref mut pm) = self.progress_manager {
                pm.record_iteration(index, &report);
            }
        }

        let motion = optimizer
            .result()
            .ok_or_else(|| computation_error("synthesis", &"optimizer did not finish"))?;
        save_motion(&output_path, motion)?;

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            frames = motion.frames(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "motion synthesized"
        );

        if self.cli.report {
            match analyze(motion) {
                Ok(report) => log_quality_report(&output_path, &report),
                Err(e) => warn!(error = %e, "quality report skipped"),
            }
        }

        if let Some(ref mut pm) = self.progress_manager {
            pm.complete_file(index);
        }

        Ok(())
    }

    /// Where the synthesized motion for `input_path` is written
    pub fn output_path(&self, input_path: &Path) -> PathBuf {
        let stem = input_path.file_stem().unwrap_or_default();
        let output_name = format!(
            "{}{}_seed{:06}.{MOTION_EXTENSION}",
            stem.to_string_lossy(),
            OUTPUT_SUFFIX,
            self.config.seed
        );
        match (&self.cli.output_dir, input_path.parent()) {
            (Some(dir), _) => dir.join(output_name),
            (None, Some(parent)) => parent.join(output_name),
            (None, None) => PathBuf::from(output_name),
        }
    }
}

fn is_motion_file(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some(MOTION_EXTENSION)
}

fn is_output_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.contains(&format!("{OUTPUT_SUFFIX}_seed")))
}

fn log_quality_report(path: &Path, report: &QualityReport) {
    info!(
        output = %path.display(),
        frames = report.frames,
        total_distance = report.total_distance,
        heading = report.main_heading_degrees,
        "quality report"
    );
    for interval in &report.intervals {
        let flagged = matches!(
            interval.status,
            IntervalStatus::StaticPoseMoving | IntervalStatus::NoTravel
        );
        if flagged {
            warn!(
                frames = ?interval.frames,
                speed = interval.mean_root_speed,
                pose_change = interval.mean_pose_change,
                status = %interval.status,
                "interval flagged"
            );
        } else {
            info!(
                frames = ?interval.frames,
                speed = interval.mean_root_speed,
                pose_change = interval.mean_pose_change,
                heading_deviation = interval.heading_deviation,
                status = %interval.status,
                "interval"
            );
        }
    }
    for segment in &report.sliding_segments {
        warn!(frames = ?segment, "frozen pose sliding");
    }
}
