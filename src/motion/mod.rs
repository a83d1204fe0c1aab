//! Motion data model and multiscale representations
//!
//! A motion is a frames × channels matrix. Rows are frames in temporal order;
//! the channel layout is opaque to the synthesis core apart from the optional
//! root translation channels.

/// Channel layout and root channel indices
pub mod layout;
/// Coarse-to-fine level construction
pub mod pyramid;
/// Temporal resampling preserving channel semantics
pub mod resample;
/// Conversion between root velocity and absolute root position
pub mod trajectory;

pub use layout::{ChannelLayout, RootChannels};

use crate::io::configuration::DEFAULT_FRAME_TIME;
use crate::io::error::{Result, SynthesisError, invalid_parameter};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Ordered sequence of frames sharing one channel layout
#[derive(Debug, Clone, PartialEq)]
pub struct Motion {
    data: Array2<f64>,
    layout: ChannelLayout,
    frame_time: f64,
}

impl Motion {
    /// Wrap a frames × channels matrix
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix has no frames, its column count differs
    /// from the layout, or it contains non-finite values
    pub fn new(data: Array2<f64>, layout: ChannelLayout) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(invalid_parameter(
                "frames",
                &0,
                &"a motion needs at least one frame",
            ));
        }
        if data.ncols() != layout.channels() {
            return Err(SynthesisError::LayoutMismatch {
                expected: layout.to_string(),
                found: format!("{} channels", data.ncols()),
            });
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            let frame = pos / data.ncols();
            return Err(invalid_parameter(
                "frames",
                &frame,
                &"motion contains non-finite values",
            ));
        }
        Ok(Self {
            data,
            layout,
            frame_time: DEFAULT_FRAME_TIME,
        })
    }

    /// Set the duration of one frame in seconds
    ///
    /// # Errors
    ///
    /// Returns an error if `frame_time` is not a positive finite number
    pub fn with_frame_time(mut self, frame_time: f64) -> Result<Self> {
        if !(frame_time.is_finite() && frame_time > 0.0) {
            return Err(invalid_parameter(
                "frame_time",
                &frame_time,
                &"must be a positive number of seconds",
            ));
        }
        self.frame_time = frame_time;
        Ok(self)
    }

    /// Build a motion with the same layout and frame time from new data
    ///
    /// # Errors
    ///
    /// Returns an error if `data` does not satisfy [`Motion::new`]
    pub fn with_data(&self, data: Array2<f64>) -> Result<Self> {
        Self::new(data, self.layout)?.with_frame_time(self.frame_time)
    }

    /// Number of frames
    pub fn frames(&self) -> usize {
        self.data.nrows()
    }

    /// Number of channels per frame
    pub const fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Channel layout of every frame
    pub const fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Duration of one frame in seconds
    pub const fn frame_time(&self) -> f64 {
        self.frame_time
    }

    /// Frames × channels view of the data
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Borrow the underlying matrix
    pub const fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Single frame, if `index` is in range
    pub fn frame(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.frames()).then(|| self.data.row(index))
    }

    /// Release the underlying matrix
    pub fn into_data(self) -> Array2<f64> {
        self.data
    }
}
