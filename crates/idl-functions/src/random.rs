//! Random deviates.
//!
//! Parameter translation from the legacy random-number interface onto
//! `rand`/`rand_distr`. The generator state lives in a caller-owned
//! [`RandomU`]; reusing it continues the sequence, and seeding it with the
//! same value reproduces it.
//!
//! Dimensions are given in legacy order (fastest varying first, at most 8)
//! and reversed into an ndarray row-major shape.
//!
//! # Example
//!
//! ```
//! use idl_functions::random::{Deviate, RandomU};
//!
//! let mut rng = RandomU::seed_from_u64(7);
//! let grid = rng.generate(&[4, 3], Deviate::Normal).unwrap();
//! assert_eq!(grid.shape(), &[3, 4]);
//! ```

use ndarray::{ArrayD, IxDyn};
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution, Gamma, Poisson, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Maximum number of dimensions of a generated array.
pub const MAX_DIMS: usize = 8;

/// Random deviate errors.
#[derive(Debug, thiserror::Error)]
pub enum RandomError {
    #[error("at most {MAX_DIMS} dimensions are supported, got {0}")]
    TooManyDimensions(usize),

    #[error("requested element count overflows usize")]
    TooManyElements,

    #[error("invalid distribution parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// Distribution to draw from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Deviate {
    /// Uniform on `[0, 1)`.
    #[default]
    Uniform,
    /// Standard normal.
    Normal,
    /// Number of successes in `trials` draws with success `probability`.
    Binomial { trials: u64, probability: f64 },
    /// Gamma distribution of integer `order` with unit scale.
    Gamma { order: u32 },
    /// Poisson distribution with the given `mean`.
    Poisson { mean: f64 },
}

/// Validated distribution, ready to sample.
enum Sampler {
    Uniform,
    Normal,
    Binomial(Binomial),
    Gamma(Gamma<f64>),
    Poisson(Poisson<f64>),
}

impl Sampler {
    fn new(deviate: Deviate) -> Result<Self, RandomError> {
        let invalid = |e: &dyn std::fmt::Display| RandomError::InvalidParameters(e.to_string());
        Ok(match deviate {
            Deviate::Uniform => Sampler::Uniform,
            Deviate::Normal => Sampler::Normal,
            Deviate::Binomial {
                trials,
                probability,
            } => Sampler::Binomial(Binomial::new(trials, probability).map_err(|e| invalid(&e))?),
            Deviate::Gamma { order } => {
                if order == 0 {
                    return Err(RandomError::InvalidParameters(
                        "gamma order must be positive".into(),
                    ));
                }
                Sampler::Gamma(Gamma::new(f64::from(order), 1.0).map_err(|e| invalid(&e))?)
            }
            Deviate::Poisson { mean } => {
                Sampler::Poisson(Poisson::new(mean).map_err(|e| invalid(&e))?)
            }
        })
    }

    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Uniform => rng.r#gen::<f64>(),
            Sampler::Normal => StandardNormal.sample(rng),
            Sampler::Binomial(d) => d.sample(rng) as f64,
            Sampler::Gamma(d) => d.sample(rng),
            Sampler::Poisson(d) => d.sample(rng),
        }
    }
}

/// Caller-owned random deviate generator.
#[derive(Debug, Clone)]
pub struct RandomU {
    rng: Xoshiro256PlusPlus,
}

impl RandomU {
    /// Deterministic generator.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Underlying generator, for drawing from other distributions.
    pub fn rng_mut(&mut self) -> &mut Xoshiro256PlusPlus {
        &mut self.rng
    }

    /// A single deviate.
    pub fn sample(&mut self, deviate: Deviate) -> Result<f64, RandomError> {
        let sampler = Sampler::new(deviate)?;
        Ok(sampler.sample(&mut self.rng))
    }

    /// An array of deviates with legacy dimensions `dims`.
    ///
    /// Empty `dims` produce a 0-dimensional array holding one value.
    pub fn generate(&mut self, dims: &[usize], deviate: Deviate) -> Result<ArrayD<f64>, RandomError> {
        let sampler = Sampler::new(deviate)?;
        self.fill(dims, |rng| sampler.sample(rng))
    }

    /// Single precision variant of [`generate`](Self::generate).
    pub fn generate_f32(
        &mut self,
        dims: &[usize],
        deviate: Deviate,
    ) -> Result<ArrayD<f32>, RandomError> {
        Ok(self.generate(dims, deviate)?.mapv(|v| v as f32))
    }

    /// Uniform integers on `[0, 2^31 - 1]`.
    pub fn generate_long(&mut self, dims: &[usize]) -> Result<ArrayD<i32>, RandomError> {
        self.fill(dims, |rng| rng.gen_range(0..=i32::MAX))
    }

    /// Uniform integers on `[0, 2^32 - 1]`.
    pub fn generate_ulong(&mut self, dims: &[usize]) -> Result<ArrayD<u32>, RandomError> {
        self.fill(dims, |rng| rng.r#gen::<u32>())
    }

    fn fill<A, F>(&mut self, dims: &[usize], mut draw: F) -> Result<ArrayD<A>, RandomError>
    where
        F: FnMut(&mut Xoshiro256PlusPlus) -> A,
    {
        let shape = row_major_shape(dims)?;
        let len = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(RandomError::TooManyElements)?;
        let values: Vec<A> = (0..len).map(|_| draw(&mut self.rng)).collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
    }
}

/// Legacy `(x, y, z, ...)` dimensions as an ndarray shape.
pub fn row_major_shape(dims: &[usize]) -> Result<Vec<usize>, RandomError> {
    if dims.len() > MAX_DIMS {
        return Err(RandomError::TooManyDimensions(dims.len()));
    }
    Ok(dims.iter().rev().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn mean(values: impl Iterator<Item = f64>) -> f64 {
        let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        sum / n as f64
    }

    #[test]
    fn test_dims_are_reversed() {
        let mut rng = RandomU::seed_from_u64(1);
        let out = rng.generate(&[5, 3, 2], Deviate::Uniform).unwrap();
        assert_eq!(out.shape(), &[2, 3, 5]);
    }

    #[test]
    fn test_scalar_from_empty_dims() {
        let mut rng = RandomU::seed_from_u64(1);
        let out = rng.generate(&[], Deviate::Uniform).unwrap();
        assert_eq!(out.ndim(), 0);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_too_many_dimensions() {
        let mut rng = RandomU::seed_from_u64(1);
        let err = rng.generate(&[1; 9], Deviate::Uniform).unwrap_err();
        assert!(matches!(err, RandomError::TooManyDimensions(9)));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = RandomU::seed_from_u64(99).generate(&[16], Deviate::Normal).unwrap();
        let b = RandomU::seed_from_u64(99).generate(&[16], Deviate::Normal).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_state_advances() {
        let mut rng = RandomU::seed_from_u64(3);
        let first = rng.sample(Deviate::Uniform).unwrap();
        let second = rng.sample(Deviate::Uniform).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_uniform_range() {
        let mut rng = RandomU::seed_from_u64(11);
        let out = rng.generate(&[1000], Deviate::Uniform).unwrap();
        assert!(out.iter().all(|&v| (0.0..1.0).contains(&v)));
        assert_abs_diff_eq!(mean(out.iter().copied()), 0.5, epsilon = 0.05);
    }

    #[rstest]
    #[case::normal(Deviate::Normal, 0.0)]
    #[case::binomial(Deviate::Binomial { trials: 10, probability: 0.3 }, 3.0)]
    #[case::gamma(Deviate::Gamma { order: 2 }, 2.0)]
    #[case::poisson(Deviate::Poisson { mean: 4.0 }, 4.0)]
    fn test_distribution_means(#[case] deviate: Deviate, #[case] expected: f64) {
        let mut rng = RandomU::seed_from_u64(2024);
        let out = rng.generate(&[20_000], deviate).unwrap();
        assert_abs_diff_eq!(mean(out.iter().copied()), expected, epsilon = 0.1);
    }

    #[rstest]
    #[case::probability(Deviate::Binomial { trials: 5, probability: 1.5 })]
    #[case::gamma_order(Deviate::Gamma { order: 0 })]
    #[case::poisson_mean(Deviate::Poisson { mean: -1.0 })]
    fn test_invalid_parameters(#[case] deviate: Deviate) {
        let mut rng = RandomU::seed_from_u64(0);
        assert!(matches!(
            rng.sample(deviate),
            Err(RandomError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_integer_deviates() {
        let mut rng = RandomU::seed_from_u64(5);
        let long = rng.generate_long(&[100]).unwrap();
        assert!(long.iter().all(|&v| v >= 0));
        let ulong = rng.generate_ulong(&[10, 10]).unwrap();
        assert_eq!(ulong.shape(), &[10, 10]);
    }

    #[test]
    fn test_f32_output() {
        let mut rng = RandomU::seed_from_u64(8);
        let out = rng.generate_f32(&[3, 3], Deviate::Uniform).unwrap();
        assert_eq!(out.shape(), &[3, 3]);
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
