//! Temporal interpolation kernels and ease curves
//!
//! Resampling maps a channel sampled at `n` evenly spaced frames onto `m`
//! evenly spaced frames covering the same time span, so the first and last
//! samples always land exactly on the first and last source frames.

use num_traits::Float;
use std::error::Error;
use std::fmt;

/// Error type for interpolation operations
#[derive(Debug, Clone)]
pub struct InterpolationError {
    message: String,
}

impl fmt::Display for InterpolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interpolation error: {}", self.message)
    }
}

impl Error for InterpolationError {}

impl InterpolationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<InterpolationError> for crate::io::error::SynthesisError {
    fn from(err: InterpolationError) -> Self {
        crate::io::error::computation_error("interpolation", &err)
    }
}

/// Linear interpolation between `a` and `b`
pub fn lerp<T: Float>(a: T, b: T, t: T) -> T {
    a + (b - a) * t
}

/// Cubic smoothstep `3t² − 2t³`, zero slope at both ends of `[0, 1]`
pub fn smoothstep<T: Float>(t: T) -> T {
    let two = T::one() + T::one();
    let three = two + T::one();
    let t = t.max(T::zero()).min(T::one());
    t * t * (three - two * t)
}

/// Cosine ease `(1 − cos πt) / 2`, zero slope at both ends of `[0, 1]`
pub fn cosine_ease<T: Float>(t: T) -> T {
    let two = T::one() + T::one();
    let pi = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let t = t.max(T::zero()).min(T::one());
    (T::one() - (pi * t).cos()) / two
}

/// Normalized position of sample `index` in a sequence of `count` samples
///
/// Maps the first sample to 0 and the last to 1; a single sample maps to 0.
pub fn normalized_index(index: usize, count: usize) -> f64 {
    if count <= 1 {
        0.0
    } else {
        index as f64 / (count - 1) as f64
    }
}

/// Kernel used when changing the temporal resolution of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleKernel {
    /// Piecewise linear interpolation
    #[default]
    Linear,
    /// Natural cubic spline through every source sample
    Cubic,
}

/// Resample evenly spaced values to a new sample count
///
/// # Errors
///
/// Returns an error if `values` is empty or `target_len` is zero
pub fn resample(
    values: &[f64],
    target_len: usize,
    kernel: ResampleKernel,
) -> Result<Vec<f64>, InterpolationError> {
    if values.is_empty() {
        return Err(InterpolationError::new("Cannot resample an empty sequence"));
    }
    if target_len == 0 {
        return Err(InterpolationError::new("Target length must be positive"));
    }
    if values.len() == target_len {
        return Ok(values.to_vec());
    }
    if values.len() == 1 {
        return Ok(vec![values.first().copied().unwrap_or(0.0); target_len]);
    }

    let span = (values.len() - 1) as f64;
    let positions = (0..target_len).map(|i| normalized_index(i, target_len) * span);

    match kernel {
        ResampleKernel::Linear => Ok(positions.map(|x| sample_linear(values, x)).collect()),
        ResampleKernel::Cubic => {
            let spline = NaturalSpline::uniform(values)?;
            positions.map(|x| spline.evaluate(x)).collect()
        }
    }
}

/// Linear sample at fractional index `x`, clamped to the sequence bounds
fn sample_linear(values: &[f64], x: f64) -> f64 {
    let last = values.len().saturating_sub(1);
    let x = x.clamp(0.0, last as f64);
    let lo = (x.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let a = values.get(lo).copied().unwrap_or(0.0);
    let b = values.get(hi).copied().unwrap_or(a);
    lerp(a, b, x - lo as f64)
}

/// Natural cubic spline over samples at integer positions `0..n`
///
/// Second derivatives are zero at both endpoints, giving C2 continuous
/// interpolation without end oscillation.
#[derive(Debug, Clone)]
pub struct NaturalSpline {
    values: Vec<f64>,
    second_derivatives: Vec<f64>,
}

impl NaturalSpline {
    /// Fit a spline through evenly spaced samples
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 2 samples are provided
    pub fn uniform(values: &[f64]) -> Result<Self, InterpolationError> {
        let n = values.len();
        if n < 2 {
            return Err(InterpolationError::new(
                "Need at least 2 points for interpolation",
            ));
        }

        // Tridiagonal system with unit spacing: m[i-1] + 4 m[i] + m[i+1] = 6 Δ²y[i]
        let mut second_derivatives = vec![0.0; n];
        let mut diag = vec![4.0; n];
        let mut rhs = vec![0.0; n];
        for i in 1..n - 1 {
            let prev = values.get(i - 1).copied().unwrap_or(0.0);
            let here = values.get(i).copied().unwrap_or(0.0);
            let next = values.get(i + 1).copied().unwrap_or(0.0);
            if let Some(r) = rhs.get_mut(i) {
                *r = 6.0 * (next - 2.0 * here + prev);
            }
        }

        for i in 2..n - 1 {
            let factor = 1.0 / diag.get(i - 1).copied().unwrap_or(4.0);
            let carried = rhs.get(i - 1).copied().unwrap_or(0.0);
            if let Some(d) = diag.get_mut(i) {
                *d -= factor;
            }
            if let Some(r) = rhs.get_mut(i) {
                *r -= factor * carried;
            }
        }

        for i in (1..n - 1).rev() {
            let next = second_derivatives.get(i + 1).copied().unwrap_or(0.0);
            let r = rhs.get(i).copied().unwrap_or(0.0);
            let d = diag.get(i).copied().unwrap_or(4.0);
            if let Some(m) = second_derivatives.get_mut(i) {
                *m = (r - next) / d;
            }
        }

        Ok(Self {
            values: values.to_vec(),
            second_derivatives,
        })
    }

    /// Evaluate the spline at fractional position `x`
    ///
    /// Points outside the sample range return the nearest boundary value.
    ///
    /// # Errors
    ///
    /// Returns an error if the spline holds no samples
    pub fn evaluate(&self, x: f64) -> Result<f64, InterpolationError> {
        let n = self.values.len();
        let first = self
            .values
            .first()
            .copied()
            .ok_or_else(|| InterpolationError::new("No data points available"))?;
        if x <= 0.0 {
            return Ok(first);
        }
        let last = self.values.last().copied().unwrap_or(first);
        if x >= (n - 1) as f64 {
            return Ok(last);
        }

        let klo = x.floor() as usize;
        let khi = klo + 1;
        let y_lo = self
            .values
            .get(klo)
            .copied()
            .ok_or_else(|| InterpolationError::new("Invalid index"))?;
        let y_hi = self
            .values
            .get(khi)
            .copied()
            .ok_or_else(|| InterpolationError::new("Invalid index"))?;
        let m_lo = self.second_derivatives.get(klo).copied().unwrap_or(0.0);
        let m_hi = self.second_derivatives.get(khi).copied().unwrap_or(0.0);

        let b = x - klo as f64;
        let a = 1.0 - b;
        Ok(a * y_lo + b * y_hi + ((a.powi(3) - a) * m_lo + (b.powi(3) - b) * m_hi) / 6.0)
    }
}
