//! Speed-compatible candidate restriction for patch matching

use crate::motion::RootChannels;
use crate::motion::trajectory::horizontal_speeds;
use ndarray::ArrayView2;

/// Result of filtering the candidates for one query patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Candidate offsets whose speed matches the query's target, ascending
    Restricted(Vec<usize>),
    /// No candidate matched; the caller searches the full set
    Empty,
}

/// Candidate filter built once per level
///
/// Each reference patch is summarized by its mean horizontal speed; each query
/// window by the mean target speed of the frames it covers.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    candidate_speeds: Vec<f64>,
    query_targets: Vec<f64>,
    tolerance: f64,
}

impl CandidateFilter {
    /// Summarize reference patches and target windows
    ///
    /// `targets` holds one target speed per synthesized frame at this level.
    pub fn new(
        reference: ArrayView2<'_, f64>,
        root: RootChannels,
        targets: &[f64],
        patch_size: usize,
        tolerance: f64,
    ) -> Self {
        let speeds = horizontal_speeds(reference, root);
        Self {
            candidate_speeds: window_means(&speeds, patch_size),
            query_targets: window_means(targets, patch_size),
            tolerance,
        }
    }

    /// Relative tolerance around the target speed
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Mean horizontal speed of every reference patch
    pub fn candidate_speeds(&self) -> &[f64] {
        &self.candidate_speeds
    }

    /// Mean target speed of the query window starting at `query`
    pub fn query_target(&self, query: usize) -> Option<f64> {
        self.query_targets.get(query).copied()
    }

    /// Candidates compatible with the query window starting at `query`
    pub fn candidates(&self, query: usize) -> FilterOutcome {
        let Some(target) = self.query_target(query) else {
            return FilterOutcome::Empty;
        };
        let low = target * (1.0 - self.tolerance);
        let high = target * (1.0 + self.tolerance);
        let kept: Vec<usize> = self
            .candidate_speeds
            .iter()
            .enumerate()
            .filter(|&(_, &speed)| speed >= low && speed <= high)
            .map(|(k, _)| k)
            .collect();
        if kept.is_empty() {
            FilterOutcome::Empty
        } else {
            FilterOutcome::Restricted(kept)
        }
    }
}

/// Mean of every window of `size` consecutive values
fn window_means(values: &[f64], size: usize) -> Vec<f64> {
    if size == 0 {
        return Vec::new();
    }
    values
        .windows(size)
        .map(|w| w.iter().sum::<f64>() / size as f64)
        .collect()
}
