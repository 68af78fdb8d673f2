//! Histogram with reverse indices.
//!
//! Computes per-bin counts of a 1-D sample sequence and optionally the
//! reverse indices that recover, for any bin, the positions of the samples in
//! it, in O(n) time and O(n + nbins) space.
//!
//! # Pipeline
//!
//! 1. [`resolve`]: complete the binning parameters ([`BinSpec`])
//! 2. [`count`]: one counting pass over the samples
//! 3. either [`build_reverse_index`] or [`accumulate`], never both
//!
//! # Example
//!
//! ```
//! use idl_functions::histogram::{HistogramConfig, histogram};
//!
//! let data = [0u8, 0, 1, 1, 1, 5];
//! let config = HistogramConfig::builder()
//!     .min(0)
//!     .max(5)
//!     .nbins(2)
//!     .reverse_indices(true)
//!     .build()
//!     .unwrap();
//!
//! let h = histogram(&data, &config).unwrap();
//! assert_eq!(h.counts(), &[5, 1]);
//! assert_eq!(h.binsize(), 5);
//! assert_eq!(h.max(), 10);
//!
//! let ri = h.reverse_indices().unwrap();
//! assert_eq!(ri.bin(1), &[5]);
//! ```

mod accumulate;
mod error;
mod kernel;
mod resolve;
mod reverse;
mod sample;

use std::borrow::Cow;

use bon::Builder;
use ndarray::{ArrayBase, Data, Dimension};

pub use accumulate::{TiledHistogram, accumulate, accumulate_into, histogram_tiles};
pub use error::{ErrorKind, HistogramError};
pub use kernel::{BinCount, TILE_LEN, count, effective_parallelism};
pub use resolve::{BinSpec, BinningRequest, resolve};
pub use reverse::{ReverseIndices, build_reverse_index};
pub use sample::{BinArith, Sample, SampleKind};

use crate::utils::Parallelism;

// =============================================================================
// HistogramConfig
// =============================================================================

/// What to bin and which optional outputs to produce.
///
/// `max`, `binsize` and `nbins` may not all be set at once, and reverse
/// indices cannot be combined with an accumulator; [`build`] rejects both.
///
/// [`build`]: HistogramConfigBuilder::build
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct HistogramConfig<T: Sample> {
    /// Lower bound. Defaults to the sample minimum.
    pub min: Option<T>,

    /// Upper bound. Defaults to the sample maximum.
    pub max: Option<T>,

    /// Bin width. Mutually exclusive with `max` when `nbins` is set.
    pub binsize: Option<T>,

    /// Number of bins.
    pub nbins: Option<usize>,

    /// Ignore NaN and infinities when detecting the sample range.
    #[builder(default)]
    pub skip_invalid: bool,

    /// Build reverse indices.
    #[builder(default)]
    pub reverse_indices: bool,

    /// Partial histogram (e.g. of previous tiles) to add the counts to.
    /// Must hold at least `nbins` elements.
    pub accumulate: Option<Vec<BinCount>>,

    /// Return the left edge of every bin.
    #[builder(default)]
    pub locations: bool,

    /// Allow the counting pass to run on the rayon pool.
    #[builder(default)]
    pub parallelism: Parallelism,
}

impl<T: Sample, S: histogram_config_builder::IsComplete> HistogramConfigBuilder<T, S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`HistogramError::OverDeterminedBinning`] if max, binsize and nbins are all set
    /// - [`HistogramError::ReverseIndicesWithAccumulator`] if both outputs are requested
    /// - [`HistogramError::ZeroBinSize`] / [`HistogramError::InvalidBinSize`] for a
    ///   zero, negative or non-finite binsize
    /// - [`HistogramError::InvalidBinCount`] for `nbins == 0`
    pub fn build(self) -> Result<HistogramConfig<T>, HistogramError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl<T: Sample> HistogramConfig<T> {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), HistogramError> {
        if self.reverse_indices && self.accumulate.is_some() {
            return Err(HistogramError::ReverseIndicesWithAccumulator);
        }
        self.binning().validate()
    }

    /// The binning part of this configuration.
    pub fn binning(&self) -> BinningRequest<T> {
        BinningRequest {
            min: self.min,
            max: self.max,
            binsize: self.binsize,
            nbins: self.nbins,
            skip_invalid: self.skip_invalid,
        }
    }
}

impl<T: Sample> Default for HistogramConfig<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            binsize: None,
            nbins: None,
            skip_invalid: false,
            reverse_indices: false,
            accumulate: None,
            locations: false,
            parallelism: Parallelism::default(),
        }
    }
}

// =============================================================================
// Histogram
// =============================================================================

/// Result of [`histogram`].
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram<T: Sample> {
    counts: Vec<BinCount>,
    spec: BinSpec<T>,
    reverse_indices: Option<ReverseIndices>,
    locations: Option<Vec<T>>,
}

impl<T: Sample> Histogram<T> {
    /// Per-bin counts. When an accumulator was supplied this has the
    /// accumulator's length.
    #[inline]
    pub fn counts(&self) -> &[BinCount] {
        &self.counts
    }

    #[inline]
    pub fn spec(&self) -> &BinSpec<T> {
        &self.spec
    }

    /// Resolved minimum.
    #[inline]
    pub fn min(&self) -> T {
        self.spec.min()
    }

    /// Resolved maximum, possibly recomputed from `nbins`.
    #[inline]
    pub fn max(&self) -> T {
        self.spec.max()
    }

    #[inline]
    pub fn binsize(&self) -> T {
        self.spec.binsize()
    }

    #[inline]
    pub fn nbins(&self) -> usize {
        self.spec.nbins()
    }

    /// Present when requested through [`HistogramConfig::reverse_indices`].
    #[inline]
    pub fn reverse_indices(&self) -> Option<&ReverseIndices> {
        self.reverse_indices.as_ref()
    }

    /// Present when requested through [`HistogramConfig::locations`].
    #[inline]
    pub fn locations(&self) -> Option<&[T]> {
        self.locations.as_deref()
    }

    /// Sum of all counts, accumulated ones included.
    pub fn total(&self) -> BinCount {
        self.counts.iter().sum()
    }

    pub fn into_counts(self) -> Vec<BinCount> {
        self.counts
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Histogram of a 1-D sample sequence.
///
/// The input is never modified. All parameter errors are reported before
/// the counting pass.
///
/// # Errors
///
/// Any [`HistogramError`] raised by configuration validation or by
/// [`resolve`], plus [`HistogramError::AccumulatorTooShort`] when the
/// accumulator holds fewer than `nbins` elements.
pub fn histogram<T: Sample>(
    samples: &[T],
    config: &HistogramConfig<T>,
) -> Result<Histogram<T>, HistogramError> {
    config.validate()?;
    let spec = resolve(samples, &config.binning())?;

    if let Some(buffer) = &config.accumulate {
        if buffer.len() < spec.nbins() {
            return Err(HistogramError::AccumulatorTooShort {
                len: buffer.len(),
                nbins: spec.nbins(),
            });
        }
    }

    log::debug!(
        "histogram: {} {} samples, min={} max={} binsize={} nbins={} max_bin={}",
        samples.len(),
        T::KIND,
        spec.min(),
        spec.max(),
        spec.binsize(),
        spec.nbins(),
        spec.max_bin()
    );

    let counts = count(samples, &spec, config.parallelism);

    let (counts, reverse_indices) = if config.reverse_indices {
        let ri = build_reverse_index(samples, &counts, &spec)?;
        (counts, Some(ri))
    } else if let Some(buffer) = &config.accumulate {
        (accumulate(&counts, buffer)?, None)
    } else {
        (counts, None)
    };

    let locations = config.locations.then(|| spec.locations());

    Ok(Histogram {
        counts,
        spec,
        reverse_indices,
        locations,
    })
}

/// Histogram of an ndarray sample sequence.
///
/// # Errors
///
/// [`HistogramError::NotOneDimensional`] unless the array has exactly one
/// axis; flatten multi-dimensional data first. Otherwise as [`histogram`].
pub fn histogram_array<T, S, D>(
    samples: &ArrayBase<S, D>,
    config: &HistogramConfig<T>,
) -> Result<Histogram<T>, HistogramError>
where
    T: Sample,
    S: Data<Elem = T>,
    D: Dimension,
{
    if samples.ndim() != 1 {
        return Err(HistogramError::NotOneDimensional {
            ndim: samples.ndim(),
        });
    }
    let values: Cow<'_, [T]> = match samples.as_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(samples.iter().copied().collect()),
    };
    histogram(&values, config)
}
