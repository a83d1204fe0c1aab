//! Seeded Gaussian noise for optimizer initialization

use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

/// Deterministic zero-mean Gaussian noise source
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    /// Create a noise source from a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Add `N(0, sigma²)` noise to every element of `buffer`
    ///
    /// A non-positive or non-finite sigma leaves the buffer untouched.
    pub fn perturb(&mut self, buffer: &mut Array2<f64>, sigma: f64) {
        if !(sigma.is_finite() && sigma > 0.0) {
            return;
        }
        let Ok(normal) = Normal::new(0.0, sigma) else {
            return;
        };
        for value in buffer.iter_mut() {
            *value += normal.sample(&mut self.rng);
        }
    }
}
