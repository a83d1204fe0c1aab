//! Pinned frame ranges and their projection onto the synthesized buffer
//!
//! Ranges follow slice semantics: negative bounds count from the end and an
//! open end runs to the last frame. A range with a non-negative start is
//! aligned with the start of the reference; a range with a negative start is
//! aligned with its end, so `last(n)` always pins the reference's final `n`
//! frames even when the output and reference lengths differ.

use crate::motion::RootChannels;
use crate::motion::trajectory::{final_position, horizontal_positions, write_horizontal_positions};
use ndarray::{Array2, ArrayView2};
use std::ops::Range;

/// Which end of the motion a range is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Indices count from the first frame
    Start,
    /// Indices count from the last frame
    End,
}

/// Slice of frames pinned to the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyframeRange {
    start: isize,
    end: Option<isize>,
}

impl KeyframeRange {
    /// The first `n` frames
    pub const fn first(n: usize) -> Self {
        Self {
            start: 0,
            end: Some(n as isize),
        }
    }

    /// The last `n` frames
    pub const fn last(n: usize) -> Self {
        if n == 0 {
            return Self::first(0);
        }
        Self {
            start: -(n as isize),
            end: None,
        }
    }

    /// Arbitrary slice `start..end` with slice semantics
    pub const fn custom(start: isize, end: Option<isize>) -> Self {
        Self { start, end }
    }

    /// End the range is aligned with
    pub const fn anchor(&self) -> Anchor {
        if self.start < 0 {
            Anchor::End
        } else {
            Anchor::Start
        }
    }

    /// Whether the range pins the final frame of a buffer of `len` frames
    pub fn reaches_end(&self, len: usize) -> bool {
        let range = self.resolve(len);
        !range.is_empty() && range.end == len
    }

    /// Concrete frame indices for a buffer of `len` frames
    pub fn resolve(&self, len: usize) -> Range<usize> {
        let len_i = len as isize;
        let clamp = |v: isize| -> usize {
            let v = if v < 0 { v + len_i } else { v };
            v.clamp(0, len_i) as usize
        };
        let start = clamp(self.start);
        let end = self.end.map_or(len, clamp);
        start..end.max(start)
    }

    /// `(synthesized, reference)` index pairs pinned by this range
    pub fn pairs(&self, synthesized_len: usize, reference_len: usize) -> Vec<(usize, usize)> {
        let range = self.resolve(synthesized_len);
        match self.anchor() {
            Anchor::Start => range
                .filter(|&i| i < reference_len)
                .map(|i| (i, i))
                .collect(),
            Anchor::End => range
                .filter_map(|i| {
                    let from_end = synthesized_len - i;
                    reference_len.checked_sub(from_end).map(|r| (i, r))
                })
                .collect(),
        }
    }
}

/// Pinned pairs for a set of ranges, later ranges overriding earlier ones
pub fn resolve_pairs(
    ranges: &[KeyframeRange],
    synthesized_len: usize,
    reference_len: usize,
) -> Vec<(usize, usize)> {
    let mut pinned: Vec<Option<usize>> = vec![None; synthesized_len];
    for range in ranges {
        for (s, r) in range.pairs(synthesized_len, reference_len) {
            if let Some(slot) = pinned.get_mut(s) {
                *slot = Some(r);
            }
        }
    }
    pinned
        .into_iter()
        .enumerate()
        .filter_map(|(s, r)| r.map(|r| (s, r)))
        .collect()
}

/// Overwrite pinned frames with their reference frames
///
/// Returns the number of frames written.
pub fn clamp_frames(
    buffer: &mut Array2<f64>,
    reference: ArrayView2<'_, f64>,
    pairs: &[(usize, usize)],
) -> usize {
    let mut written = 0;
    for &(s, r) in pairs {
        if s >= buffer.nrows() || r >= reference.nrows() {
            continue;
        }
        buffer.row_mut(s).assign(&reference.row(r));
        written += 1;
    }
    written
}

/// Move the final root position onto the reference's final position
///
/// The horizontal offset is spread linearly across the unpinned frames between
/// `free.start` and `free.end`: velocities of frames `free.start + 1 ..
/// free.end` absorb it, so pinned frames keep their reference velocities.
/// Returns the applied offset, or `None` when fewer than two free frames exist.
pub fn pin_final_position(
    buffer: &mut Array2<f64>,
    reference: ArrayView2<'_, f64>,
    root: RootChannels,
    free: Range<usize>,
) -> Option<[f64; 2]> {
    let frames = buffer.nrows();
    let free = free.start..free.end.min(frames);
    if free.end < free.start + 2 {
        return None;
    }

    let target = final_position(reference, root);
    let mut positions = horizontal_positions(buffer.view(), root);
    let current = positions.last().copied().unwrap_or([0.0, 0.0]);
    let offset = [target[0] - current[0], target[1] - current[1]];

    let span = (free.end - 1 - free.start) as f64;
    for (i, position) in positions.iter_mut().enumerate().skip(free.start) {
        let weight = if i < free.end {
            (i - free.start) as f64 / span
        } else {
            1.0
        };
        position[0] += offset[0] * weight;
        position[1] += offset[1] * weight;
    }
    write_horizontal_positions(buffer, root, &positions);
    Some(offset)
}
