//! Nearest-neighbor patch search
//!
//! Every query patch of the synthesized buffer is compared against candidate
//! patches of the reference at the same level. Distances are weighted sums of
//! squared channel differences over the whole patch. Query rows are evaluated
//! in parallel; inside a row candidates are scanned in ascending offset order
//! with a strict comparison, so ties always resolve to the lowest offset.

use crate::constraints::search::{CandidateFilter, FilterOutcome};
use crate::io::configuration::NUMERIC_EPSILON;
use crate::io::error::{Result, SynthesisError, invalid_parameter};
use crate::motion::RootChannels;
use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::debug;

/// Best candidate for one query patch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Start offset of the query patch in the synthesized buffer
    pub query: usize,
    /// Start offset of the matched patch in the reference
    pub candidate: usize,
    /// Raw weighted squared distance between the two patches
    pub distance: f64,
    /// Whether the speed filter was empty and the full set was searched
    pub fallback: bool,
}

/// All matches of one iteration, ordered by query offset
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSet {
    matches: Vec<Match>,
    patch_size: usize,
}

impl MatchSet {
    /// Matches in query order
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Patch length the matches were computed with
    pub const fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Number of query patches
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether no query patch exists
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Sum of match distances
    pub fn patch_loss(&self) -> f64 {
        self.matches.iter().map(|m| m.distance).sum()
    }

    /// Number of matches produced by the fallback search
    pub fn fallback_count(&self) -> usize {
        self.matches.iter().filter(|m| m.fallback).count()
    }
}

/// Parameters of one matching pass
#[derive(Debug, Clone)]
pub struct MatchOptions<'a> {
    /// Frames per patch
    pub patch_size: usize,
    /// Completeness regularizer; `None` matches on raw distance
    ///
    /// Candidates are ranked by `d / max(alpha + min_q d, NUMERIC_EPSILON)`.
    pub alpha: Option<f64>,
    /// Per-channel weights of the squared differences
    pub channel_weights: &'a [f64],
    /// Speed filter restricting the candidates of each query
    pub filter: Option<&'a CandidateFilter>,
}

/// Channel weights emphasizing the horizontal root velocity channels
pub fn channel_weights(
    channels: usize,
    velocity_root: Option<RootChannels>,
    velocity_weight: f64,
) -> Vec<f64> {
    (0..channels)
        .map(|c| {
            if velocity_root.is_some_and(|r| r.is_horizontal(c)) {
                velocity_weight
            } else {
                1.0
            }
        })
        .collect()
}

/// Weighted squared distance between two patches
pub fn patch_distance(
    query: ArrayView2<'_, f64>,
    query_offset: usize,
    reference: ArrayView2<'_, f64>,
    candidate_offset: usize,
    patch_size: usize,
    weights: &[f64],
) -> f64 {
    let mut total = 0.0;
    for t in 0..patch_size {
        let a = query.row(query_offset + t);
        let b = reference.row(candidate_offset + t);
        total += a
            .iter()
            .zip(b.iter())
            .zip(weights)
            .map(|((x, y), w)| w * (x - y).powi(2))
            .sum::<f64>();
    }
    total
}

struct QueryRow {
    candidates: Vec<usize>,
    distances: Vec<f64>,
    fallback: bool,
}

/// Find the best reference patch for every query patch
///
/// # Errors
///
/// Returns an error if:
/// - The buffers have different channel counts
/// - The channel weights do not cover every channel
/// - `patch_size` is zero or longer than either buffer
pub fn match_patches(
    query: ArrayView2<'_, f64>,
    reference: ArrayView2<'_, f64>,
    options: &MatchOptions<'_>,
) -> Result<MatchSet> {
    let patch_size = options.patch_size;
    if query.ncols() != reference.ncols() {
        return Err(SynthesisError::LayoutMismatch {
            expected: format!("{} channels", reference.ncols()),
            found: format!("{} channels", query.ncols()),
        });
    }
    if options.channel_weights.len() != query.ncols() {
        return Err(invalid_parameter(
            "channel_weights",
            &options.channel_weights.len(),
            &format!("expected one weight per channel ({})", query.ncols()),
        ));
    }
    if patch_size == 0 || patch_size > query.nrows() || patch_size > reference.nrows() {
        return Err(invalid_parameter(
            "patch_size",
            &patch_size,
            &format!(
                "must fit in both the synthesized ({}) and reference ({}) buffers",
                query.nrows(),
                reference.nrows()
            ),
        ));
    }

    let query_count = query.nrows() - patch_size + 1;
    let candidate_count = reference.nrows() - patch_size + 1;
    let weights = options.channel_weights;

    let rows: Vec<QueryRow> = (0..query_count)
        .into_par_iter()
        .map(|q| {
            let (candidates, fallback) = match options.filter.map(|f| f.candidates(q)) {
                Some(FilterOutcome::Restricted(kept)) => (
                    kept.into_iter()
                        .filter(|&k| k < candidate_count)
                        .collect::<Vec<_>>(),
                    false,
                ),
                Some(FilterOutcome::Empty) => {
                    debug!(query = q, "speed filter empty, searching all candidates");
                    ((0..candidate_count).collect(), true)
                }
                None => ((0..candidate_count).collect(), false),
            };
            let (candidates, fallback) = if candidates.is_empty() {
                ((0..candidate_count).collect(), true)
            } else {
                (candidates, fallback)
            };
            let distances = candidates
                .iter()
                .map(|&k| patch_distance(query, q, reference, k, patch_size, weights))
                .collect();
            QueryRow {
                candidates,
                distances,
                fallback,
            }
        })
        .collect();

    let normalizers = options.alpha.map(|alpha| {
        let mut column_min = vec![f64::INFINITY; candidate_count];
        for row in &rows {
            for (&k, &d) in row.candidates.iter().zip(&row.distances) {
                if let Some(slot) = column_min.get_mut(k) {
                    *slot = slot.min(d);
                }
            }
        }
        column_min
            .into_iter()
            .map(|m| (alpha + if m.is_finite() { m } else { 0.0 }).max(NUMERIC_EPSILON))
            .collect::<Vec<_>>()
    });

    let matches = rows
        .into_iter()
        .enumerate()
        .map(|(q, row)| {
            let mut best: Option<(usize, f64, f64)> = None;
            for (&k, &d) in row.candidates.iter().zip(&row.distances) {
                let score = match &normalizers {
                    Some(norm) => d / norm.get(k).copied().unwrap_or(1.0),
                    None => d,
                };
                if best.is_none_or(|(_, _, s)| score < s) {
                    best = Some((k, d, score));
                }
            }
            let (candidate, distance, _) = best.unwrap_or((0, 0.0, 0.0));
            Match {
                query: q,
                candidate,
                distance,
                fallback: row.fallback,
            }
        })
        .collect::<Vec<_>>();

    let fallbacks = matches.iter().filter(|m| m.fallback).count();
    if fallbacks > 0 {
        debug!(fallbacks, queries = query_count, "fallback matches this pass");
    }

    Ok(MatchSet {
        matches,
        patch_size,
    })
}
