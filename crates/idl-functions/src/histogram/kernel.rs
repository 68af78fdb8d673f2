//! Histogram counting kernel.
//!
//! One pass over the samples: every value in `[min, max_bin)` increments the
//! counter of bin `floor((v - min) / binsize)`. The arithmetic happens in the
//! sample kind's wide type, counters are `u64`.
//!
//! # Parallel Strategy
//!
//! Large inputs may be split into fixed-size tiles, counted independently on
//! the rayon pool and folded together with [`accumulate_into`]. Because the
//! merge is an elementwise sum the result is identical to a sequential pass.
//! Small inputs always run sequentially.

use rayon::prelude::*;

use super::accumulate::accumulate_into;
use super::resolve::BinSpec;
use super::sample::Sample;
use crate::utils::Parallelism;

/// Count type of a histogram bin.
pub type BinCount = u64;

/// Samples per tile in the parallel kernel.
pub const TILE_LEN: usize = 1 << 16;

/// Minimum sample count before the parallel kernel is used.
const MIN_SAMPLES_PARALLEL: usize = 4 * TILE_LEN;

/// Select the counting strategy for `n_samples` samples.
#[inline]
pub fn effective_parallelism(n_samples: usize, parallelism: Parallelism) -> Parallelism {
    if parallelism.is_parallel()
        && n_samples >= MIN_SAMPLES_PARALLEL
        && rayon::current_num_threads() > 1
    {
        Parallelism::Parallel
    } else {
        Parallelism::Sequential
    }
}

/// Count `samples` into `spec.nbins()` bins.
///
/// Samples outside `[min, max_bin)` (NaN and infinities included) are not
/// counted, so `sum(counts) <= samples.len()`.
pub fn count<T: Sample>(samples: &[T], spec: &BinSpec<T>, parallelism: Parallelism) -> Vec<BinCount> {
    match effective_parallelism(samples.len(), parallelism) {
        Parallelism::Sequential => {
            let mut counts = vec![0; spec.nbins()];
            count_into(&mut counts, samples, spec);
            counts
        }
        Parallelism::Parallel => {
            log::trace!(
                "histogram: counting {} samples in tiles of {TILE_LEN} on {} threads",
                samples.len(),
                rayon::current_num_threads()
            );
            samples
                .par_chunks(TILE_LEN)
                .fold(
                    || vec![0; spec.nbins()],
                    |mut counts, tile| {
                        count_into(&mut counts, tile, spec);
                        counts
                    },
                )
                .reduce(
                    || vec![0; spec.nbins()],
                    |mut acc, part| {
                        accumulate_into(&mut acc, &part);
                        acc
                    },
                )
        }
    }
}

/// Add the counts of `samples` to `counts` (length `spec.nbins()`).
#[inline]
pub(crate) fn count_into<T: Sample>(counts: &mut [BinCount], samples: &[T], spec: &BinSpec<T>) {
    debug_assert_eq!(counts.len(), spec.nbins());
    for &v in samples {
        if let Some(bin) = spec.bin_index(v) {
            counts[bin] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{BinningRequest, resolve};

    fn spec_for<T: Sample>(samples: &[T], req: BinningRequest<T>) -> BinSpec<T> {
        resolve(samples, &req).unwrap()
    }

    #[test]
    fn test_count_unit_bins() {
        let data: Vec<i32> = (0..10).collect();
        let spec = spec_for(
            &data,
            BinningRequest {
                min: Some(0),
                max: Some(9),
                binsize: Some(1),
                ..Default::default()
            },
        );
        let counts = count(&data, &spec, Parallelism::Sequential);
        assert_eq!(counts, vec![1; 10]);
    }

    #[test]
    fn test_count_excludes_out_of_range() {
        let data = [-3i8, 0, 1, 2, 3, 4, 100];
        let spec = spec_for(
            &data,
            BinningRequest {
                min: Some(0),
                max: Some(3),
                ..Default::default()
            },
        );
        let counts = count(&data, &spec, Parallelism::Sequential);
        assert_eq!(counts, vec![1, 1, 1, 1]);
        assert_eq!(counts.iter().sum::<u64>(), 4);
    }

    #[test]
    fn test_count_excludes_non_finite() {
        let data = [0.5f32, f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 1.5];
        let spec = spec_for(
            &data,
            BinningRequest {
                min: Some(0.0),
                max: Some(2.0),
                binsize: Some(1.0),
                ..Default::default()
            },
        );
        assert_eq!(spec.nbins(), 3);
        let counts = count(&data, &spec, Parallelism::Sequential);
        assert_eq!(counts, vec![1, 1, 0]);
    }

    #[test]
    fn test_count_extreme_i8_range() {
        let data = [i8::MIN, -1, 0, i8::MAX];
        let spec = spec_for(&data, BinningRequest::default());
        assert_eq!(spec.nbins(), 256);
        let counts = count(&data, &spec, Parallelism::Sequential);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[127], 1);
        assert_eq!(counts[128], 1);
        assert_eq!(counts[255], 1);
    }

    #[test]
    fn test_count_u64_extremes() {
        let data = [0u64, u64::MAX];
        let spec = spec_for(
            &data,
            BinningRequest {
                nbins: Some(2),
                ..Default::default()
            },
        );
        let counts = count(&data, &spec, Parallelism::Sequential);
        assert_eq!(counts, vec![1, 1]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data: Vec<u16> = (0..(MIN_SAMPLES_PARALLEL + 1234))
            .map(|i| ((i * 7919) % 1000) as u16)
            .collect();
        let spec = spec_for(
            &data,
            BinningRequest {
                binsize: Some(10),
                ..Default::default()
            },
        );
        let seq = count(&data, &spec, Parallelism::Sequential);
        let par = count(&data, &spec, Parallelism::Parallel);
        assert_eq!(seq, par);
        assert_eq!(seq.iter().sum::<u64>(), data.len() as u64);
    }

    #[test]
    fn test_small_inputs_stay_sequential() {
        assert_eq!(
            effective_parallelism(10, Parallelism::Parallel),
            Parallelism::Sequential
        );
        assert_eq!(
            effective_parallelism(usize::MAX, Parallelism::Sequential),
            Parallelism::Sequential
        );
    }
}
