//! idl-functions: array-processing primitives modelled on IDL builtins.
//!
//! The core is a histogram engine with reverse indices: per-bin counts of a
//! 1-D sample sequence plus, per bin, the positions of the samples it holds.
//! Byte scaling, histogram equalization and random deviates are built around
//! it.
//!
//! # Key Types
//!
//! - [`HistogramConfig`] / [`Histogram`] - Histogram parameters and result
//! - [`BinSpec`] - Resolved binning (min, max, binsize, nbins)
//! - [`ReverseIndices`] - Bin to sample-position mapping
//! - [`TiledHistogram`] - Running histogram over independently counted tiles
//! - [`ByteScaleConfig`] / [`HistEqualConfig`] - Scaling and equalization
//! - [`RandomU`] - Seedable random deviate generator
//!
//! # Histogram
//!
//! Use `HistogramConfig::builder()` to configure, then [`histogram()`].
//! See the [`histogram`](mod@histogram) module for the binning rules.
//!
//! # Logging
//!
//! Diagnostics go through the [`log`] facade; no logger is installed.

pub mod bytscl;
pub mod hist_equal;
pub mod histogram;
pub mod random;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Histogram engine
pub use histogram::{
    BinCount, BinSpec, BinningRequest, ErrorKind, Histogram, HistogramConfig, HistogramError,
    ReverseIndices, Sample, SampleKind, TiledHistogram, histogram, histogram_array, resolve,
};

// Collaborators
pub use bytscl::{ByteScaleConfig, ScaleError, bytscl, bytscl_array};
pub use hist_equal::{EqualizeError, HistEqualConfig, hist_equal, hist_equal_array};
pub use random::{Deviate, RandomError, RandomU};

// Shared utilities
pub use utils::{Parallelism, RangeError};
