//! Common utilities used across the crate.
//!
//! This module provides the parallelism flag threaded through the counting
//! kernels and the range scan shared by the histogram resolver and the
//! scaling routines.

use rayon::prelude::*;

use crate::histogram::Sample;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, large inputs are split into tiles that are counted on the
/// current rayon pool and merged afterwards. When `Sequential`, everything
/// runs on the calling thread. Components don't manage thread pools; wrap a
/// call in [`rayon::ThreadPool::install`] to control the thread count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Range Detection
// =============================================================================

/// Failures while scanning samples for their value range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("cannot derive a value range: no usable samples")]
    Empty,

    #[error("non-finite sample at position {position}; enable skip_invalid to ignore it")]
    NonFinite { position: usize },
}

/// Minimum and maximum of `values`.
///
/// Non-finite values are an error unless `skip_invalid` is set, in which case
/// they are ignored. Integer kinds are always finite.
pub fn value_range<T, I>(values: I, skip_invalid: bool) -> Result<(T, T), RangeError>
where
    T: Sample,
    I: IntoIterator<Item = T>,
{
    let mut range: Option<(T, T)> = None;
    for (position, v) in values.into_iter().enumerate() {
        if !v.is_finite() {
            if skip_invalid {
                continue;
            }
            return Err(RangeError::NonFinite { position });
        }
        range = Some(match range {
            None => (v, v),
            Some((lo, hi)) => (
                if v < lo { v } else { lo },
                if v > hi { v } else { hi },
            ),
        });
    }
    range.ok_or(RangeError::Empty)
}
