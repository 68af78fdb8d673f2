//! Errors raised by the histogram engine.

use crate::utils::RangeError;

/// Broad category of a [`HistogramError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Conflicting or over-determined parameters.
    Configuration,
    /// A parameter or derived value outside its valid domain.
    Domain,
    /// A caller buffer that does not fit the binning.
    Bounds,
    /// Input with the wrong dimensionality.
    Shape,
}

/// Histogram configuration and computation errors.
///
/// Everything but [`HistogramError::CountsMismatch`] is detected before the
/// counting pass starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistogramError {
    #[error("conflicting binning: max cannot be set when both binsize and nbins are set")]
    OverDeterminedBinning,

    #[error("conflicting outputs: reverse indices and an accumulator cannot be combined")]
    ReverseIndicesWithAccumulator,

    #[error("binning specifications differ; tiles must share one resolved specification")]
    SpecMismatch,

    #[error("binsize is zero; histogram cannot be computed")]
    ZeroBinSize,

    #[error("binsize must be positive and finite, got {binsize}")]
    InvalidBinSize { binsize: f64 },

    #[error("nbins must be at least {required} here, got {nbins}")]
    InvalidBinCount { nbins: usize, required: usize },

    #[error("max ({max}) is below min ({min})")]
    InvalidRange { min: f64, max: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFiniteBound { name: &'static str, value: f64 },

    #[error("bin layout overflows the arithmetic range of the sample kind")]
    BinOverflow,

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("accumulator holds {len} elements but {nbins} bins are required")]
    AccumulatorTooShort { len: usize, nbins: usize },

    #[error("histogram counts do not match the samples under this binning")]
    CountsMismatch,

    #[error("expected a 1-dimensional sample sequence, got {ndim} dimensions")]
    NotOneDimensional { ndim: usize },
}

impl HistogramError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OverDeterminedBinning | Self::ReverseIndicesWithAccumulator | Self::SpecMismatch => {
                ErrorKind::Configuration
            }
            Self::ZeroBinSize
            | Self::InvalidBinSize { .. }
            | Self::InvalidBinCount { .. }
            | Self::InvalidRange { .. }
            | Self::NonFiniteBound { .. }
            | Self::BinOverflow
            | Self::Range(_) => ErrorKind::Domain,
            Self::AccumulatorTooShort { .. } | Self::CountsMismatch => ErrorKind::Bounds,
            Self::NotOneDimensional { .. } => ErrorKind::Shape,
        }
    }
}
