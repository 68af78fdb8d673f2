//! Binning parameter resolution.
//!
//! Given any consistent subset of `{min, max, binsize, nbins}` this derives
//! the complete set plus the exclusive upper bound `max_bin` of the last bin:
//!
//! - neither binsize nor nbins: `binsize = 1`, `nbins = floor(max - min) + 1`
//! - nbins only: `binsize = (max - min) / (nbins - 1)`, and `max` becomes
//!   `nbins * binsize + min`
//! - binsize only: `nbins = floor((max - min) / binsize) + 1`, where float
//!   quotients within rounding of the next integer count as that integer
//! - both: `max` becomes `nbins * binsize + min`
//!
//! In every case `max_bin = nbins * binsize + min` and a sample `v` is binned
//! iff `min <= v < max_bin`. Derived values are computed in the sample's
//! arithmetic type (see [`Sample::Wide`]) and the binsize is coerced back to
//! the sample kind before `max_bin` is computed. A derived `max` that does not
//! fit the sample kind saturates (for `u8`, 256 becomes 255).

use num_traits::{One, Zero};

use super::error::HistogramError;
use super::sample::{BinArith, Sample};
use crate::utils::{RangeError, value_range};

// =============================================================================
// BinningRequest
// =============================================================================

/// Caller-supplied, possibly partial binning parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinningRequest<T> {
    /// Lower bound. Defaults to the sample minimum.
    pub min: Option<T>,
    /// Upper bound. Defaults to the sample maximum.
    pub max: Option<T>,
    /// Bin width in sample units.
    pub binsize: Option<T>,
    /// Number of bins.
    pub nbins: Option<usize>,
    /// Ignore NaN and infinities when detecting the sample range.
    pub skip_invalid: bool,
}

impl<T> Default for BinningRequest<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            binsize: None,
            nbins: None,
            skip_invalid: false,
        }
    }
}

impl<T: Sample> BinningRequest<T> {
    /// Check the request for contradictions that need no sample data.
    pub fn validate(&self) -> Result<(), HistogramError> {
        if self.max.is_some() && self.binsize.is_some() && self.nbins.is_some() {
            return Err(HistogramError::OverDeterminedBinning);
        }

        if let Some(binsize) = self.binsize {
            let wide = binsize.widen();
            if wide == T::Wide::zero() {
                return Err(HistogramError::ZeroBinSize);
            }
            if !binsize.is_finite() || !(wide > T::Wide::zero()) {
                return Err(HistogramError::InvalidBinSize {
                    binsize: binsize.as_f64(),
                });
            }
        }

        if self.nbins == Some(0) {
            return Err(HistogramError::InvalidBinCount {
                nbins: 0,
                required: 1,
            });
        }

        for (name, bound) in [("min", self.min), ("max", self.max)] {
            if let Some(value) = bound {
                if !value.is_finite() {
                    return Err(HistogramError::NonFiniteBound {
                        name,
                        value: value.as_f64(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Whether `max` is needed to finish the derivation.
    fn needs_max(&self) -> bool {
        !(self.binsize.is_some() && self.nbins.is_some())
    }
}

// =============================================================================
// BinSpec
// =============================================================================

/// A complete, consistent binning specification.
///
/// Only obtainable through [`resolve`], so every instance satisfies
/// `nbins >= 1`, `binsize > 0` and `max_bin = nbins * binsize + min`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinSpec<T: Sample> {
    min: T,
    max: T,
    binsize: T,
    nbins: usize,
    max_bin: T::Wide,
}

impl<T: Sample> BinSpec<T> {
    /// Left edge of the first bin.
    #[inline]
    pub fn min(&self) -> T {
        self.min
    }

    /// Resolved maximum. May differ from the requested one when it was
    /// recomputed from `nbins`.
    #[inline]
    pub fn max(&self) -> T {
        self.max
    }

    #[inline]
    pub fn binsize(&self) -> T {
        self.binsize
    }

    #[inline]
    pub fn nbins(&self) -> usize {
        self.nbins
    }

    /// Exclusive upper bound of the last bin, in the arithmetic type.
    #[inline]
    pub fn max_bin(&self) -> T::Wide {
        self.max_bin
    }

    /// Bin of `value`, or `None` when it lies outside `[min, max_bin)`.
    ///
    /// NaN fails both comparisons and is never binned.
    #[inline]
    pub fn bin_index(&self, value: T) -> Option<usize> {
        let v = value.widen();
        let min = self.min.widen();
        if !(v >= min && v < self.max_bin) {
            return None;
        }
        let bin = ((v - min) / self.binsize.widen()).floor_index()?;
        // Float rounding can land a value just below max_bin on nbins.
        Some(bin.min(self.nbins - 1))
    }

    /// Left edge of `bin`: `min + bin * binsize`.
    pub fn location(&self, bin: usize) -> Option<T> {
        if bin >= self.nbins {
            return None;
        }
        let i = <T::Wide as num_traits::NumCast>::from(bin)?;
        let edge = i.checked_mul_add(self.binsize.widen(), self.min.widen())?;
        Some(T::saturate(edge))
    }

    /// Left edges of all bins.
    pub fn locations(&self) -> Vec<T> {
        (0..self.nbins).filter_map(|bin| self.location(bin)).collect()
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Derive a complete [`BinSpec`] from a partial request.
///
/// The samples are only scanned when `min` or a needed `max` is missing.
///
/// # Errors
///
/// - [`HistogramError::OverDeterminedBinning`] when max, binsize and nbins are
///   all given
/// - [`HistogramError::ZeroBinSize`] when the supplied or derived binsize is zero
/// - [`HistogramError::InvalidBinCount`] for `nbins == 0`, or `nbins < 2` when
///   the binsize has to be derived from it
/// - [`HistogramError::InvalidRange`] when `max < min`
/// - [`HistogramError::Range`] when the range has to be scanned from an empty
///   or non-finite sample sequence
pub fn resolve<T: Sample>(
    samples: &[T],
    request: &BinningRequest<T>,
) -> Result<BinSpec<T>, HistogramError> {
    request.validate()?;

    let needs_scan = request.min.is_none() || (request.max.is_none() && request.needs_max());
    let scanned = if needs_scan {
        Some(value_range(samples.iter().copied(), request.skip_invalid)?)
    } else {
        None
    };

    let (data_min, data_max) = match scanned {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };
    let min = request.min.or(data_min).ok_or(RangeError::Empty)?;
    let min_w = min.widen();

    let (binsize_w, nbins, max_w) = match (request.binsize, request.nbins) {
        (Some(binsize), Some(nbins)) => {
            let binsize_w = binsize.widen();
            (binsize_w, nbins, span_end(nbins, binsize_w, min_w)?)
        }
        (binsize, nbins) => {
            let max = request.max.or(data_max).ok_or(RangeError::Empty)?;
            let max_w = max.widen();
            if max_w < min_w {
                return Err(HistogramError::InvalidRange {
                    min: min.as_f64(),
                    max: max.as_f64(),
                });
            }
            let span = max_w - min_w;

            match (binsize, nbins) {
                (Some(binsize), _) => {
                    let binsize_w = binsize.widen();
                    (binsize_w, bins_in_span(span, binsize_w)?, max_w)
                }
                (None, Some(nbins)) => {
                    if nbins < 2 {
                        return Err(HistogramError::InvalidBinCount { nbins, required: 2 });
                    }
                    let divisor = wide_count::<T>(nbins - 1)?;
                    // Coerce to the sample kind: integer kinds truncate here.
                    let binsize_w = T::saturate(span / divisor).widen();
                    if binsize_w == T::Wide::zero() {
                        return Err(HistogramError::ZeroBinSize);
                    }
                    (binsize_w, nbins, span_end(nbins, binsize_w, min_w)?)
                }
                (None, None) => {
                    let one = T::Wide::one();
                    (one, bins_in_span(span, one)?, max_w)
                }
            }
        }
    };

    let binsize = T::saturate(binsize_w);
    let max_bin = span_end(nbins, binsize.widen(), min_w)?;
    let max = T::saturate(max_w);
    if max.widen() != max_w {
        log::warn!(
            "histogram: derived max {max_w} is not representable as {}; clamped to {max}",
            T::KIND
        );
    }

    Ok(BinSpec {
        min,
        max,
        binsize,
        nbins,
        max_bin,
    })
}

#[inline]
fn wide_count<T: Sample>(n: usize) -> Result<T::Wide, HistogramError> {
    <T::Wide as num_traits::NumCast>::from(n).ok_or(HistogramError::BinOverflow)
}

/// `nbins * binsize + min`.
#[inline]
fn span_end<W: BinArith>(nbins: usize, binsize: W, min: W) -> Result<W, HistogramError> {
    <W as num_traits::NumCast>::from(nbins)
        .and_then(|n| n.checked_mul_add(binsize, min))
        .ok_or(HistogramError::BinOverflow)
}

/// `floor(span / binsize) + 1`.
#[inline]
fn bins_in_span<W: BinArith>(span: W, binsize: W) -> Result<usize, HistogramError> {
    span.whole_steps(binsize)
        .and_then(|n| n.checked_add(1))
        .ok_or(HistogramError::BinOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::ErrorKind;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn request<T>() -> BinningRequest<T> {
        BinningRequest::default()
    }

    #[test]
    fn test_defaults_to_unit_bins() {
        let data = [3i32, 7, 5];
        let spec = resolve(&data, &request()).unwrap();
        assert_eq!(spec.min(), 3);
        assert_eq!(spec.max(), 7);
        assert_eq!(spec.binsize(), 1);
        assert_eq!(spec.nbins(), 5);
        assert_eq!(spec.max_bin(), 8);
    }

    #[test]
    fn test_nbins_recomputes_max() {
        let data = [0u16, 0, 1, 1, 1, 5];
        let req = BinningRequest {
            min: Some(0),
            max: Some(5),
            nbins: Some(2),
            ..request()
        };
        let spec = resolve(&data, &req).unwrap();
        assert_eq!(spec.binsize(), 5);
        assert_eq!(spec.max(), 10);
        assert_eq!(spec.max_bin(), 10);
    }

    #[test]
    fn test_binsize_derives_nbins() {
        let data = [0.0f64, 1.0];
        let req = BinningRequest {
            min: Some(0.0),
            max: Some(1.0),
            binsize: Some(0.3),
            ..request()
        };
        let spec = resolve(&data, &req).unwrap();
        assert_eq!(spec.nbins(), 4);
        assert_relative_eq!(spec.max_bin(), 1.2, epsilon = 1e-12);
        // max is not recomputed on the binsize path
        assert_eq!(spec.max(), 1.0);
    }

    #[test]
    fn test_binsize_and_nbins_recompute_max() {
        let req = BinningRequest {
            min: Some(10i64),
            binsize: Some(4),
            nbins: Some(3),
            ..request()
        };
        // No samples needed: nothing has to be scanned.
        let spec = resolve(&[], &req).unwrap();
        assert_eq!(spec.max(), 22);
        assert_eq!(spec.max_bin(), 22);
    }

    #[rstest]
    #[case::nbins_path(BinningRequest { min: Some(0), max: Some(255), nbins: Some(256), ..BinningRequest::default() })]
    #[case::both_path(BinningRequest { min: Some(0), binsize: Some(1), nbins: Some(256), ..BinningRequest::default() })]
    fn test_u8_max_clamps_to_255(#[case] req: BinningRequest<u8>) {
        let spec = resolve(&[0u8, 255], &req).unwrap();
        assert_eq!(spec.max(), 255);
        assert_eq!(spec.nbins(), 256);
        assert_eq!(spec.max_bin(), 256);
        assert_eq!(spec.bin_index(255), Some(255));
    }

    #[test]
    fn test_over_determined() {
        let req = BinningRequest {
            max: Some(9),
            binsize: Some(1),
            nbins: Some(10),
            ..request::<i32>()
        };
        let err = resolve(&[1], &req).unwrap_err();
        assert_eq!(err, HistogramError::OverDeterminedBinning);
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[rstest]
    #[case::explicit(BinningRequest { binsize: Some(0), ..BinningRequest::default() })]
    #[case::derived(BinningRequest { min: Some(0), max: Some(5), nbins: Some(10), ..BinningRequest::default() })]
    fn test_zero_binsize(#[case] req: BinningRequest<i32>) {
        let err = resolve(&[0, 5], &req).unwrap_err();
        assert_eq!(err, HistogramError::ZeroBinSize);
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[test]
    fn test_negative_binsize() {
        let req = BinningRequest {
            binsize: Some(-1.5f32),
            ..request()
        };
        assert!(matches!(
            resolve(&[1.0], &req),
            Err(HistogramError::InvalidBinSize { .. })
        ));
    }

    #[test]
    fn test_single_bin_needs_binsize() {
        let req = BinningRequest {
            nbins: Some(1),
            ..request::<i32>()
        };
        assert_eq!(
            resolve(&[0, 4], &req),
            Err(HistogramError::InvalidBinCount { nbins: 1, required: 2 })
        );
    }

    #[test]
    fn test_max_below_min() {
        let req = BinningRequest {
            min: Some(5i8),
            max: Some(-5),
            ..request()
        };
        assert_eq!(
            resolve(&[], &req),
            Err(HistogramError::InvalidRange { min: 5.0, max: -5.0 })
        );
    }

    #[test]
    fn test_scan_requires_samples() {
        let err = resolve::<f32>(&[], &request()).unwrap_err();
        assert_eq!(err, HistogramError::Range(crate::utils::RangeError::Empty));
    }

    #[test]
    fn test_non_finite_scan_policy() {
        let data = [1.0f64, f64::NAN, 4.0];
        assert!(matches!(
            resolve(&data, &request()),
            Err(HistogramError::Range(_))
        ));

        let req = BinningRequest {
            skip_invalid: true,
            ..request()
        };
        let spec = resolve(&data, &req).unwrap();
        assert_eq!(spec.min(), 1.0);
        assert_eq!(spec.max(), 4.0);
        assert_eq!(spec.nbins(), 4);
    }

    #[test]
    fn test_non_finite_bound_rejected() {
        let req = BinningRequest {
            max: Some(f32::INFINITY),
            ..request()
        };
        assert!(matches!(
            resolve(&[1.0], &req),
            Err(HistogramError::NonFiniteBound { name: "max", .. })
        ));
    }

    #[test]
    fn test_nbins_and_derived_binsize_agree() {
        let data: Vec<f64> = (0..=10).map(f64::from).collect();
        let by_nbins = resolve(
            &data,
            &BinningRequest {
                nbins: Some(11),
                ..request()
            },
        )
        .unwrap();
        let by_binsize = resolve(
            &data,
            &BinningRequest {
                binsize: Some(by_nbins.binsize()),
                ..request()
            },
        )
        .unwrap();
        assert_eq!(by_nbins.nbins(), by_binsize.nbins());
        assert_eq!(by_nbins.max_bin(), by_binsize.max_bin());
    }

    #[rstest]
    #[case(0.9, 8)]
    #[case(0.3, 4)]
    #[case(7.7, 12)]
    fn test_float_derived_binsize_keeps_last_bin(#[case] top: f64, #[case] nbins: usize) {
        let data = [0.0f64, top];
        let by_nbins = resolve(
            &data,
            &BinningRequest {
                nbins: Some(nbins),
                ..request()
            },
        )
        .unwrap();
        let by_binsize = resolve(
            &data,
            &BinningRequest {
                binsize: Some(by_nbins.binsize()),
                ..request()
            },
        )
        .unwrap();
        assert_eq!(by_binsize.nbins(), nbins);
        assert_eq!(by_nbins.max_bin(), by_binsize.max_bin());
    }

    #[test]
    fn test_bin_index_half_open() {
        let spec = resolve(
            &[],
            &BinningRequest {
                min: Some(0i32),
                max: Some(5),
                nbins: Some(2),
                ..request()
            },
        )
        .unwrap();
        assert_eq!(spec.bin_index(-1), None);
        assert_eq!(spec.bin_index(0), Some(0));
        assert_eq!(spec.bin_index(4), Some(0));
        assert_eq!(spec.bin_index(5), Some(1));
        assert_eq!(spec.bin_index(9), Some(1));
        assert_eq!(spec.bin_index(10), None);
    }

    #[test]
    fn test_locations() {
        let spec = resolve(
            &[],
            &BinningRequest {
                min: Some(-1.0f32),
                binsize: Some(0.5),
                nbins: Some(4),
                ..request()
            },
        )
        .unwrap();
        assert_eq!(spec.locations(), vec![-1.0, -0.5, 0.0, 0.5]);
        assert_eq!(spec.location(4), None);
    }
}
