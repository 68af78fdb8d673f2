//! Histogram equalization.
//!
//! Builds the cumulative histogram of the data (with the first bin zeroed)
//! and either
//!
//! - uses its byte-scaled form as a lookup table from bin to output value, or
//! - with a percentage set, derives lower and upper data bounds from it and
//!   byte-scales the data linearly between those bounds.
//!
//! Byte data defaults to the full `0..=255` range with unit bins. Any other
//! kind defaults to its data range split into roughly 5000 bins.

use std::borrow::Cow;

use bon::Builder;
use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::bytscl::{ByteScaleConfig, ByteScaler, ScaleError, bytscl};
use crate::histogram::{
    BinArith, BinCount, HistogramConfig, HistogramError, Sample, SampleKind, histogram,
};
use crate::utils::{RangeError, value_range};

/// Target number of bins when the bin size is derived from the data range.
const DEFAULT_BIN_TARGET: f64 = 5000.0;

/// Histogram equalization errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EqualizeError {
    #[error("percent must lie strictly between 0 and 100, got {0}")]
    InvalidPercent(f64),

    #[error("cumulative histogram is empty")]
    EmptyHistogram,

    #[error("{value} is not representable as {kind}")]
    Unrepresentable { value: f64, kind: SampleKind },

    #[error(transparent)]
    Histogram(#[from] HistogramError),

    #[error(transparent)]
    Scale(#[from] ScaleError),

    #[error(transparent)]
    Range(#[from] RangeError),
}

// =============================================================================
// Configuration
// =============================================================================

/// Histogram equalization parameters.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct HistEqualConfig<T: Sample> {
    /// Smallest value considered. Default: 0 for `u8`, else the data minimum.
    pub min: Option<T>,

    /// Largest value considered. Default: 255 for `u8`, else the data maximum.
    pub max: Option<T>,

    /// Histogram bin width. Default: 1 for `u8`, else `(max - min) / 5000`
    /// (truncated and at least 1 for integer kinds).
    pub binsize: Option<T>,

    /// Linear percent stretch, strictly between 0 and 100.
    pub percent: Option<f64>,

    /// Largest output value. Default: 255.
    #[builder(default = 255)]
    pub top: u8,

    /// Ignore NaN and infinities when detecting the data range.
    #[builder(default)]
    pub skip_invalid: bool,
}

impl<T: Sample, S: hist_equal_config_builder::IsComplete> HistEqualConfigBuilder<T, S> {
    /// Build and validate the configuration.
    pub fn build(self) -> Result<HistEqualConfig<T>, EqualizeError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl<T: Sample> HistEqualConfig<T> {
    fn validate(&self) -> Result<(), EqualizeError> {
        if let Some(percent) = self.percent {
            validate_percent(percent)?;
        }
        Ok(())
    }

    /// Fill in min, max and binsize.
    fn resolve(&self, samples: &[T]) -> Result<(T, T, T), EqualizeError> {
        let byte_data = T::KIND == SampleKind::U8;

        let (min, max) = match (self.min, self.max) {
            (Some(min), Some(max)) => (min, max),
            (min, max) if byte_data => (
                min.map_or_else(|| cast(0.0), Ok)?,
                max.map_or_else(|| cast(255.0), Ok)?,
            ),
            (min, max) => {
                let (lo, hi) = value_range(samples.iter().copied(), self.skip_invalid)?;
                (min.unwrap_or(lo), max.unwrap_or(hi))
            }
        };

        let binsize = match self.binsize {
            Some(binsize) => binsize,
            None if byte_data => cast(1.0)?,
            None => {
                let mut binsize = (max.as_f64() - min.as_f64()) / DEFAULT_BIN_TARGET;
                if !T::KIND.is_float() {
                    binsize = binsize.trunc();
                    if binsize < 1.0 {
                        log::warn!(
                            "hist_equal: derived {} bin size {binsize} raised to 1",
                            T::KIND
                        );
                        binsize = 1.0;
                    }
                }
                cast(binsize)?
            }
        };

        Ok((min, max, binsize))
    }
}

impl<T: Sample> Default for HistEqualConfig<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            binsize: None,
            percent: None,
            top: 255,
            skip_invalid: false,
        }
    }
}

fn validate_percent(percent: f64) -> Result<(), EqualizeError> {
    if percent > 0.0 && percent < 100.0 {
        Ok(())
    } else {
        Err(EqualizeError::InvalidPercent(percent))
    }
}

fn cast<T: Sample>(value: f64) -> Result<T, EqualizeError> {
    <T as num_traits::NumCast>::from(value).ok_or(EqualizeError::Unrepresentable {
        value,
        kind: T::KIND,
    })
}

// =============================================================================
// Cumulative histogram
// =============================================================================

/// Cumulative histogram with the binning it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeHistogram<T: Sample> {
    pub counts: Vec<BinCount>,
    pub min: T,
    pub max: T,
    pub binsize: T,
}

/// Cumulative sum of the histogram of `samples` with its first bin zeroed.
pub fn cumulative_histogram<T: Sample>(
    samples: &[T],
    config: &HistEqualConfig<T>,
) -> Result<CumulativeHistogram<T>, EqualizeError> {
    config.validate()?;
    let (min, max, binsize) = config.resolve(samples)?;

    let hist_config = HistogramConfig::builder()
        .min(min)
        .max(max)
        .binsize(binsize)
        .skip_invalid(config.skip_invalid)
        .build()?;
    let mut counts = histogram(samples, &hist_config)?.into_counts();

    if let Some(first) = counts.first_mut() {
        *first = 0;
    }
    let mut running = 0;
    for c in &mut counts {
        running += *c;
        *c = running;
    }

    Ok(CumulativeHistogram {
        counts,
        min,
        max,
        binsize,
    })
}

// =============================================================================
// Linear percent stretch
// =============================================================================

/// Data bounds of a linear percent stretch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchBounds {
    pub min: f64,
    pub max: f64,
}

/// Lower and upper data values that cut `percent` percent of the samples off
/// each end of `cumulative`.
///
/// The lower bound is the first bin whose cumulative count reaches
/// `n * percent / 100`, moved up past any run of equal counts; the upper
/// bound the first bin reaching `n * (1 - percent / 100)`, moved down past
/// any run of equal counts.
pub fn linear_percent(
    cumulative: &[BinCount],
    percent: f64,
    min: f64,
    binsize: f64,
) -> Result<StretchBounds, EqualizeError> {
    validate_percent(percent)?;
    let Some(&n) = cumulative.last() else {
        return Err(EqualizeError::EmptyHistogram);
    };
    let n = n as f64;
    let last = cumulative.len() - 1;
    let low = percent / 100.0;

    let mut lower = search_left(cumulative, n * low).min(last);
    while lower < last && cumulative[lower] == cumulative[lower + 1] {
        lower += 1;
    }

    let mut upper = search_left(cumulative, n * (1.0 - low)).min(last);
    while upper > 0 && cumulative[upper] == cumulative[upper - 1] {
        upper -= 1;
    }

    Ok(StretchBounds {
        min: lower as f64 * binsize + min,
        max: upper as f64 * binsize + min,
    })
}

/// First index whose count is at least `target`.
#[inline]
fn search_left(cumulative: &[BinCount], target: f64) -> usize {
    cumulative.partition_point(|&c| (c as f64) < target)
}

// =============================================================================
// Equalization
// =============================================================================

/// Per-value mapping derived from a cumulative histogram.
enum Equalizer<T: Sample> {
    Stretch(ByteScaler),
    Lookup { table: Vec<u8>, min: T, binsize: T },
}

impl<T: Sample> Equalizer<T> {
    fn new(
        cumulative: &CumulativeHistogram<T>,
        config: &HistEqualConfig<T>,
    ) -> Result<Self, EqualizeError> {
        if let Some(percent) = config.percent {
            let bounds = linear_percent(
                &cumulative.counts,
                percent,
                cumulative.min.as_f64(),
                cumulative.binsize.as_f64(),
            )?;
            log::debug!(
                "hist_equal: {percent}% stretch between {} and {}",
                bounds.min,
                bounds.max
            );
            let scaler = ByteScaler::new(bounds.min, bounds.max, config.top, T::KIND.is_float())?;
            return Ok(Equalizer::Stretch(scaler));
        }

        let levels: Vec<f64> = cumulative.counts.iter().map(|&c| c as f64).collect();
        let table = bytscl(
            &levels,
            &ByteScaleConfig {
                top: config.top,
                ..ByteScaleConfig::default()
            },
        )?;
        Ok(Equalizer::Lookup {
            table,
            min: cumulative.min,
            binsize: cumulative.binsize,
        })
    }

    #[inline]
    fn apply(&self, value: T) -> u8 {
        match self {
            Equalizer::Stretch(scaler) => scaler.scale(value),
            Equalizer::Lookup {
                table,
                min,
                binsize,
            } => {
                if value.as_f64().is_nan() {
                    return 0;
                }
                let last = table.len() - 1;
                let v = if value < *min { *min } else { value };
                // Same arithmetic as the counting kernel, so edge values
                // land in the bin they were counted in.
                let bin = ((v.widen() - min.widen()) / binsize.widen())
                    .floor_index()
                    .map_or(last, |bin| bin.min(last));
                table[bin]
            }
        }
    }
}

/// Histogram-equalize a sample sequence into bytes.
///
/// # Errors
///
/// - [`EqualizeError::InvalidPercent`] for a percent outside (0, 100)
/// - [`EqualizeError::Histogram`] when the histogram cannot be built, e.g. a
///   zero derived bin size for constant float data
/// - [`EqualizeError::Scale`] when the cumulative histogram or the stretch
///   bounds span an empty range
pub fn hist_equal<T: Sample>(
    samples: &[T],
    config: &HistEqualConfig<T>,
) -> Result<Vec<u8>, EqualizeError> {
    let cumulative = cumulative_histogram(samples, config)?;
    let equalizer = Equalizer::new(&cumulative, config)?;
    Ok(samples.iter().map(|&v| equalizer.apply(v)).collect())
}

/// Histogram-equalize an array of any dimensionality, keeping its shape.
pub fn hist_equal_array<T, S, D>(
    samples: &ArrayBase<S, D>,
    config: &HistEqualConfig<T>,
) -> Result<Array<u8, D>, EqualizeError>
where
    T: Sample,
    S: Data<Elem = T>,
    D: Dimension,
{
    // Bin counts do not depend on element order.
    let flat: Cow<'_, [T]> = match samples.as_slice_memory_order() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(samples.iter().copied().collect()),
    };
    let cumulative = cumulative_histogram(&flat, config)?;
    let equalizer = Equalizer::new(&cumulative, config)?;
    Ok(samples.map(|&v| equalizer.apply(v)))
}
