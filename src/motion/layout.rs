//! Channel layout shared by every frame of a motion

use crate::io::error::{Result, invalid_parameter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Indices of the root translation channels inside a frame
///
/// In velocity form the two horizontal channels hold per-frame displacement
/// while the vertical channel keeps the absolute height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootChannels {
    /// Horizontal X displacement (or position)
    pub horizontal_x: usize,
    /// Vertical position, never treated as a rate
    pub vertical: usize,
    /// Horizontal Z displacement (or position)
    pub horizontal_z: usize,
}

impl RootChannels {
    /// Root channels occupying the last three slots of a frame (ΔX, Y, ΔZ)
    pub const fn trailing(channels: usize) -> Option<Self> {
        if channels < 3 {
            return None;
        }
        Some(Self {
            horizontal_x: channels - 3,
            vertical: channels - 2,
            horizontal_z: channels - 1,
        })
    }

    /// Whether channel `c` is one of the two horizontal channels
    pub const fn is_horizontal(&self, c: usize) -> bool {
        c == self.horizontal_x || c == self.horizontal_z
    }

    /// Whether channel `c` belongs to the root at all
    pub const fn contains(&self, c: usize) -> bool {
        self.is_horizontal(c) || c == self.vertical
    }
}

/// Fixed channel layout of a motion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    channels: usize,
    root: Option<RootChannels>,
}

impl ChannelLayout {
    /// Create a layout and validate the root channel indices
    ///
    /// # Errors
    ///
    /// Returns an error if there are no channels, or root indices are out of
    /// range or not distinct
    pub fn new(channels: usize, root: Option<RootChannels>) -> Result<Self> {
        if channels == 0 {
            return Err(invalid_parameter(
                "channels",
                &channels,
                &"a frame needs at least one channel",
            ));
        }
        if let Some(r) = root {
            let indices = [r.horizontal_x, r.vertical, r.horizontal_z];
            if indices.iter().any(|&i| i >= channels) {
                return Err(invalid_parameter(
                    "root_channels",
                    &format!("{indices:?}"),
                    &format!("indices must be below the channel count {channels}"),
                ));
            }
            if r.horizontal_x == r.vertical
                || r.horizontal_x == r.horizontal_z
                || r.vertical == r.horizontal_z
            {
                return Err(invalid_parameter(
                    "root_channels",
                    &format!("{indices:?}"),
                    &"root channel indices must be distinct",
                ));
            }
        }
        Ok(Self { channels, root })
    }

    /// Layout without root translation channels
    pub const fn pose_only(channels: usize) -> Self {
        Self {
            channels,
            root: None,
        }
    }

    /// Layout whose last three channels are the root (ΔX, Y, ΔZ)
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than three channels are available
    pub fn with_trailing_root(channels: usize) -> Result<Self> {
        let root = RootChannels::trailing(channels).ok_or_else(|| {
            invalid_parameter(
                "channels",
                &channels,
                &"root translation needs at least three channels",
            )
        })?;
        Self::new(channels, Some(root))
    }

    /// Number of channels per frame
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Root translation channels, if the layout has them
    pub const fn root(&self) -> Option<RootChannels> {
        self.root
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(r) => write!(
                f,
                "{} channels (root x={}, y={}, z={})",
                self.channels, r.horizontal_x, r.vertical, r.horizontal_z
            ),
            None => write!(f, "{} channels (no root)", self.channels),
        }
    }
}
