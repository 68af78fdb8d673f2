//! Test data generators and histogram assertions.
//!
//! Shared by the unit tests, the integration tests and the benchmarks.

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::histogram::{BinCount, BinSpec, ReverseIndices, Sample};

/// Uniform `f64` samples in `[min, max)`.
pub fn random_samples_f64(n: usize, seed: u64, min: f64, max: f64) -> Vec<f64> {
    assert!(max >= min);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let width = max - min;
    (0..n).map(|_| min + rng.r#gen::<f64>() * width).collect()
}

/// Uniform `i32` samples in `[min, max]`.
pub fn random_samples_i32(n: usize, seed: u64, min: i32, max: i32) -> Vec<i32> {
    assert!(max >= min);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(min..=max)).collect()
}

/// Uniform `u8` samples over the full byte range.
pub fn random_samples_u8(n: usize, seed: u64) -> Vec<u8> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..n).map(|_| rng.r#gen::<u8>()).collect()
}

/// Assert that `ri` is the reverse index of `samples` under `spec`.
///
/// Checks that bin sizes match `counts`, that every listed position holds a
/// sample inside its bin, and that positions ascend within each bin.
pub fn assert_reverse_indices_consistent<T: Sample>(
    samples: &[T],
    counts: &[BinCount],
    spec: &BinSpec<T>,
    ri: &ReverseIndices,
) {
    assert_eq!(ri.n_bins(), counts.len(), "bin count mismatch");
    assert_eq!(ri.offsets()[0], 0, "first offset must be zero");
    for (bin, positions) in ri.iter() {
        assert_eq!(
            positions.len() as BinCount,
            counts[bin],
            "bin {bin}: {} positions but count {}",
            positions.len(),
            counts[bin]
        );
        for &p in positions {
            assert_eq!(
                spec.bin_index(samples[p]),
                Some(bin),
                "position {p} (value {}) listed in bin {bin}",
                samples[p]
            );
        }
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "bin {bin}: positions not ascending"
        );
    }
}

/// Assert that `ri` lists every in-range position exactly once and no
/// out-of-range position at all.
pub fn assert_partition_complete<T: Sample>(samples: &[T], spec: &BinSpec<T>, ri: &ReverseIndices) {
    let mut seen = vec![false; samples.len()];
    for &p in ri.positions() {
        assert!(!seen[p], "position {p} listed twice");
        seen[p] = true;
    }
    for (p, &v) in samples.iter().enumerate() {
        assert_eq!(
            seen[p],
            spec.bin_index(v).is_some(),
            "position {p} (value {v}) partition membership"
        );
    }
}
