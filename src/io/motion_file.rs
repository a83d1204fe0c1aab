//! JSON container for motions
//!
//! ```json
//! {
//!   "frame_time": 0.0333,
//!   "root": { "horizontal_x": 6, "vertical": 7, "horizontal_z": 8 },
//!   "frames": [[0.0, 0.1, ...], ...]
//! }
//! ```
//!
//! `root` may be omitted for pose-only data and `frame_time` defaults to 1/30 s.

use crate::io::configuration::DEFAULT_FRAME_TIME;
use crate::io::error::{ErrorContext, Result, SynthesisError, WithContext};
use crate::motion::{ChannelLayout, Motion, RootChannels};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MotionDocument {
    #[serde(default = "default_frame_time")]
    frame_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<RootChannels>,
    frames: Vec<Vec<f64>>,
}

const fn default_frame_time() -> f64 {
    DEFAULT_FRAME_TIME
}

fn format_error(path: &Path, reason: impl Into<String>) -> SynthesisError {
    SynthesisError::MotionFormat {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Parse a motion from JSON text
///
/// `origin` only labels errors.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, frames are ragged, or the layout
/// or values are invalid
pub fn parse_motion(text: &str, origin: &Path) -> Result<Motion> {
    let document: MotionDocument = serde_json::from_str(text).with_path(origin)?;
    let channels = document.frames.first().map_or(0, Vec::len);
    if let Some((index, frame)) = document
        .frames
        .iter()
        .enumerate()
        .find(|(_, f)| f.len() != channels)
    {
        return Err(format_error(
            origin,
            format!(
                "frame {index} has {} channels, expected {channels}",
                frame.len()
            ),
        ));
    }

    let frame_count = document.frames.len();
    let flat: Vec<f64> = document.frames.into_iter().flatten().collect();
    let data = Array2::from_shape_vec((frame_count, channels), flat)
        .map_err(|e| format_error(origin, e.to_string()))?;
    let layout = ChannelLayout::new(channels.max(1), document.root)?;
    Motion::new(data, layout)?.with_frame_time(document.frame_time)
}

/// Serialize a motion to pretty-printed JSON
///
/// # Errors
///
/// Returns an error if serialization fails
pub fn motion_to_json(motion: &Motion) -> Result<String> {
    let document = MotionDocument {
        frame_time: motion.frame_time(),
        root: motion.layout().root(),
        frames: motion
            .view()
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Read a motion file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn load_motion(path: &Path) -> Result<Motion> {
    let text = std::fs::read_to_string(path).with_context(ErrorContext {
        path: Some(path.to_path_buf()),
        operation: Some("read motion"),
    })?;
    parse_motion(&text, path)
}

/// Write a motion file
///
/// # Errors
///
/// Returns an error if serialization or writing fails
pub fn save_motion(path: &Path, motion: &Motion) -> Result<()> {
    let text = motion_to_json(motion)?;
    std::fs::write(path, text).with_context(ErrorContext {
        path: Some(path.to_path_buf()),
        operation: Some("write motion"),
    })
}
