//! Pose and trajectory quality report
//!
//! Flags the artifacts patch synthesis tends to produce when pacing is
//! steered: a frozen pose that keeps travelling (sliding), a moving pose that
//! goes nowhere, and heading drift away from the overall direction of travel.
//! Pose change is the mean absolute per-channel difference of the non-root
//! channels between consecutive frames.

use crate::io::configuration::{
    ANALYSIS_INTERVAL_FRAMES, HEADING_ALERT_DEGREES, HEADING_WARNING_DEGREES,
    MIN_SLIDING_SEGMENT, MOVING_SPEED_THRESHOLD, NO_TRAVEL_SPEED_THRESHOLD, STATIC_POSE_THRESHOLD,
};
use crate::io::error::{Result, invalid_parameter};
use crate::motion::trajectory::{horizontal_positions, horizontal_speeds};
use crate::motion::{Motion, RootChannels};
use ndarray::ArrayView2;
use std::fmt;
use std::ops::Range;

/// Movement classification of an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalStatus {
    /// The pose is frozen while the root travels
    StaticPoseMoving,
    /// Neither pose nor root moves
    Still,
    /// The pose moves but the root stays put
    NoTravel,
    /// Pose and root both move
    Normal,
}

impl IntervalStatus {
    /// Classify mean pose change and root speed
    pub fn classify(mean_pose_change: f64, mean_root_speed: f64) -> Self {
        if mean_pose_change < STATIC_POSE_THRESHOLD && mean_root_speed > MOVING_SPEED_THRESHOLD {
            Self::StaticPoseMoving
        } else if mean_pose_change < STATIC_POSE_THRESHOLD {
            Self::Still
        } else if mean_root_speed < NO_TRAVEL_SPEED_THRESHOLD {
            Self::NoTravel
        } else {
            Self::Normal
        }
    }
}

impl fmt::Display for IntervalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StaticPoseMoving => "static pose moving",
            Self::Still => "still",
            Self::NoTravel => "no travel",
            Self::Normal => "normal",
        })
    }
}

/// Heading agreement of an interval with the whole clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingStatus {
    /// Within the warning threshold
    Aligned,
    /// Beyond the warning threshold
    Deviating,
    /// Beyond the alert threshold
    StronglyDeviating,
}

impl HeadingStatus {
    /// Classify an absolute heading deviation in degrees
    pub fn classify(deviation_degrees: f64) -> Self {
        if deviation_degrees > HEADING_ALERT_DEGREES {
            Self::StronglyDeviating
        } else if deviation_degrees > HEADING_WARNING_DEGREES {
            Self::Deviating
        } else {
            Self::Aligned
        }
    }
}

/// Statistics of one interval of frames
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalReport {
    /// Frames covered
    pub frames: Range<usize>,
    /// Mean horizontal root speed per frame
    pub mean_root_speed: f64,
    /// Mean pose change per frame
    pub mean_pose_change: f64,
    /// Movement classification
    pub status: IntervalStatus,
    /// Horizontal root displacement `[x, z]` across the interval
    pub displacement: [f64; 2],
    /// Heading of the displacement in degrees
    pub heading_degrees: f64,
    /// Absolute difference to the clip's main heading, in `[0, 180]`
    pub heading_deviation: f64,
    /// Heading classification
    pub heading_status: HeadingStatus,
}

/// Quality report of a whole motion
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    /// Number of frames analyzed
    pub frames: usize,
    /// Per-interval statistics
    pub intervals: Vec<IntervalReport>,
    /// Horizontal root displacement `[x, z]` from first to last frame
    pub total_displacement: [f64; 2],
    /// Straight-line horizontal distance travelled
    pub total_distance: f64,
    /// Heading of the total displacement in degrees
    pub main_heading_degrees: f64,
    /// Runs of at least three frames where a frozen pose slides
    pub sliding_segments: Vec<Range<usize>>,
}

impl QualityReport {
    /// Whether any interval or frame run shows an artifact
    pub fn has_issues(&self) -> bool {
        !self.sliding_segments.is_empty()
            || self.intervals.iter().any(|i| {
                matches!(
                    i.status,
                    IntervalStatus::StaticPoseMoving | IntervalStatus::NoTravel
                ) || i.heading_status != HeadingStatus::Aligned
            })
    }
}

/// Mean absolute change of the non-root channels between consecutive frames
///
/// Entry `t` compares frames `t` and `t + 1`.
pub fn pose_changes(data: ArrayView2<'_, f64>, root: Option<RootChannels>) -> Vec<f64> {
    let pose_channels: Vec<usize> = (0..data.ncols())
        .filter(|&c| !root.is_some_and(|r| r.contains(c)))
        .collect();
    if pose_channels.is_empty() {
        return vec![0.0; data.nrows().saturating_sub(1)];
    }
    let rows: Vec<_> = data.rows().into_iter().collect();
    rows.windows(2)
        .map(|pair| {
            let [a, b] = pair else {
                return 0.0;
            };
            pose_channels
                .iter()
                .map(|&c| {
                    (b.get(c).copied().unwrap_or(0.0) - a.get(c).copied().unwrap_or(0.0)).abs()
                })
                .sum::<f64>()
                / pose_channels.len() as f64
        })
        .collect()
}

fn heading_degrees(displacement: [f64; 2]) -> f64 {
    displacement[1].atan2(displacement[0]).to_degrees()
}

fn heading_deviation(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    if diff > 180.0 { 360.0 - diff } else { diff }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Analyze pose activity and root trajectory
///
/// # Errors
///
/// Returns an error if the motion has no root channels or fewer than two
/// frames
pub fn analyze(motion: &Motion) -> Result<QualityReport> {
    let root = motion.layout().root().ok_or_else(|| {
        invalid_parameter(
            "root_channels",
            &motion.layout(),
            &"quality analysis needs root velocity channels",
        )
    })?;
    let frames = motion.frames();
    if frames < 2 {
        return Err(invalid_parameter(
            "frames",
            &frames,
            &"quality analysis needs at least two frames",
        ));
    }

    let data = motion.view();
    let positions = horizontal_positions(data, root);
    let mut root_speed = horizontal_speeds(data, root);
    if let Some(first) = root_speed.first_mut() {
        *first = 0.0;
    }
    let pose_change = pose_changes(data, Some(root));

    let first = positions.first().copied().unwrap_or([0.0, 0.0]);
    let last = positions.last().copied().unwrap_or([0.0, 0.0]);
    let total_displacement = [last[0] - first[0], last[1] - first[1]];
    let main_heading = heading_degrees(total_displacement);

    let span = frames - 1;
    let intervals = (0..span)
        .step_by(ANALYSIS_INTERVAL_FRAMES)
        .map(|start| {
            let end = (start + ANALYSIS_INTERVAL_FRAMES).min(span);
            let mean_root_speed = mean(root_speed.get(start..end).unwrap_or_default());
            let mean_pose_change = mean(pose_change.get(start..end).unwrap_or_default());
            let from = positions.get(start).copied().unwrap_or(first);
            let to = positions.get(end - 1).copied().unwrap_or(last);
            let displacement = [to[0] - from[0], to[1] - from[1]];
            let heading = heading_degrees(displacement);
            let deviation = heading_deviation(heading, main_heading);
            IntervalReport {
                frames: start..end,
                mean_root_speed,
                mean_pose_change,
                status: IntervalStatus::classify(mean_pose_change, mean_root_speed),
                displacement,
                heading_degrees: heading,
                heading_deviation: deviation,
                heading_status: HeadingStatus::classify(deviation),
            }
        })
        .collect();

    let sliding: Vec<usize> = pose_change
        .iter()
        .zip(&root_speed)
        .enumerate()
        .filter(|&(_, (&pose, &speed))| {
            pose < STATIC_POSE_THRESHOLD && speed > MOVING_SPEED_THRESHOLD
        })
        .map(|(t, _)| t)
        .collect();

    Ok(QualityReport {
        frames,
        intervals,
        total_displacement,
        total_distance: total_displacement[0].hypot(total_displacement[1]),
        main_heading_degrees: main_heading,
        sliding_segments: contiguous_runs(&sliding, MIN_SLIDING_SEGMENT),
    })
}

/// Group sorted indices into consecutive runs of at least `min_len`
pub fn contiguous_runs(indices: &[usize], min_len: usize) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut iter = indices.iter().copied();
    let Some(mut start) = iter.next() else {
        return runs;
    };
    let mut end = start + 1;
    for index in iter {
        if index == end {
            end += 1;
        } else {
            if end - start >= min_len {
                runs.push(start..end);
            }
            start = index;
            end = index + 1;
        }
    }
    if end - start >= min_len {
        runs.push(start..end);
    }
    runs
}
