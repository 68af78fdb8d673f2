//! Histogram accumulation and tiled composition.
//!
//! Merging is an elementwise sum, so histograms of disjoint tiles computed
//! under one [`BinSpec`] can be folded in any order, on any thread, to obtain
//! the histogram of the whole dataset. The spec has to be resolved once up
//! front: range auto-detection per tile would give every tile its own bins.

use super::error::HistogramError;
use super::kernel::{BinCount, count, count_into};
use super::resolve::BinSpec;
use super::sample::Sample;
use crate::utils::Parallelism;

/// Merge histograms: `dst[i] += src[i]` for `i < min(dst.len(), src.len())`.
///
/// Elements of `dst` past `src.len()` are left unchanged. Sums saturate at
/// `BinCount::MAX`.
#[inline]
pub fn accumulate_into(dst: &mut [BinCount], src: &[BinCount]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = d.saturating_add(s);
    }
}

/// Sum `histogram` into a copy of `buffer`.
///
/// The result has `buffer.len()` elements; entries past the histogram's
/// length keep the buffer's values.
///
/// # Errors
///
/// [`HistogramError::AccumulatorTooShort`] if `buffer` is shorter than
/// `histogram`.
pub fn accumulate(
    histogram: &[BinCount],
    buffer: &[BinCount],
) -> Result<Vec<BinCount>, HistogramError> {
    if buffer.len() < histogram.len() {
        return Err(HistogramError::AccumulatorTooShort {
            len: buffer.len(),
            nbins: histogram.len(),
        });
    }
    let mut merged = buffer.to_vec();
    accumulate_into(&mut merged, histogram);
    Ok(merged)
}

// =============================================================================
// TiledHistogram
// =============================================================================

/// A running histogram over a fixed binning specification.
///
/// # Example
///
/// ```
/// use idl_functions::histogram::{BinningRequest, TiledHistogram, resolve};
///
/// let spec = resolve::<i32>(&[], &BinningRequest {
///     min: Some(1),
///     max: Some(8),
///     ..Default::default()
/// })
/// .unwrap();
///
/// let mut tiled = TiledHistogram::new(spec);
/// tiled.add_tile(&[1, 2, 3, 4]);
/// tiled.add_tile(&[5, 6, 7, 8]);
/// assert_eq!(tiled.counts(), &[1; 8]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TiledHistogram<T: Sample> {
    spec: BinSpec<T>,
    counts: Vec<BinCount>,
}

impl<T: Sample> TiledHistogram<T> {
    pub fn new(spec: BinSpec<T>) -> Self {
        Self {
            counts: vec![0; spec.nbins()],
            spec,
        }
    }

    #[inline]
    pub fn spec(&self) -> &BinSpec<T> {
        &self.spec
    }

    /// Count another tile into the running totals.
    pub fn add_tile(&mut self, tile: &[T]) {
        count_into(&mut self.counts, tile, &self.spec);
    }

    /// Fold in a histogram built from other tiles.
    ///
    /// # Errors
    ///
    /// [`HistogramError::SpecMismatch`] if `other` uses different bins.
    pub fn merge(&mut self, other: &Self) -> Result<(), HistogramError> {
        if self.spec != other.spec {
            return Err(HistogramError::SpecMismatch);
        }
        accumulate_into(&mut self.counts, &other.counts);
        Ok(())
    }

    #[inline]
    pub fn counts(&self) -> &[BinCount] {
        &self.counts
    }

    pub fn into_counts(self) -> Vec<BinCount> {
        self.counts
    }
}

/// Histogram of the concatenation of `tiles` under `spec`.
///
/// Each tile is counted on its own (in parallel when allowed) and the partial
/// histograms are summed.
pub fn histogram_tiles<T: Sample>(
    tiles: &[&[T]],
    spec: &BinSpec<T>,
    parallelism: Parallelism,
) -> Vec<BinCount> {
    log::trace!(
        "histogram: folding {} tiles into {} bins ({:?})",
        tiles.len(),
        spec.nbins(),
        parallelism
    );
    let partials = parallelism.maybe_par_map(tiles.iter().copied().collect::<Vec<_>>(), |tile| {
        count(tile, spec, Parallelism::Sequential)
    });
    let mut total = vec![0; spec.nbins()];
    for partial in &partials {
        accumulate_into(&mut total, partial);
    }
    total
}
