//! Reverse indices: for every bin, the positions of the samples it holds.
//!
//! Built as a counting sort over the histogram: a prefix sum over the counts
//! gives each bin's start offset, then a second pass scatters every in-range
//! sample position into its bin's slot range. Positions within a bin are in
//! ascending order because the scatter walks the samples front to back.

use super::error::HistogramError;
use super::kernel::BinCount;
use super::resolve::BinSpec;
use super::sample::Sample;

/// CSR-style mapping from bins to original sample positions.
///
/// `positions[offsets[i]..offsets[i + 1]]` are the positions of the samples in
/// bin `i`; empty bins have `offsets[i] == offsets[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReverseIndices {
    offsets: Vec<usize>,
    positions: Vec<usize>,
}

impl ReverseIndices {
    /// Bin start offsets, `nbins + 1` long. The last entry is the number of
    /// in-range samples.
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Sample positions grouped by bin.
    #[inline]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    #[inline]
    pub fn n_bins(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of binned samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions of the samples in `bin`.
    ///
    /// # Panics
    ///
    /// Panics if `bin >= n_bins()`.
    #[inline]
    pub fn bin(&self, bin: usize) -> &[usize] {
        &self.positions[self.offsets[bin]..self.offsets[bin + 1]]
    }

    /// Iterate over `(bin, positions)` pairs, empty bins included.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        self.offsets
            .windows(2)
            .enumerate()
            .map(|(bin, w)| (bin, &self.positions[w[0]..w[1]]))
    }

    /// Legacy single-array layout.
    ///
    /// The first `nbins + 1` entries are offsets into the array itself, the
    /// rest are the positions, so `flat[flat[i]..flat[i + 1]]` are the
    /// positions of bin `i`.
    pub fn to_flat(&self) -> Vec<usize> {
        let header = self.offsets.len();
        let mut flat = Vec::with_capacity(header + self.positions.len());
        flat.extend(self.offsets.iter().map(|&o| o + header));
        flat.extend_from_slice(&self.positions);
        flat
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>) {
        (self.offsets, self.positions)
    }
}

/// Build the reverse indices of `samples` given their histogram `counts`.
///
/// The positions buffer is sized from the sum of `counts` before the scatter
/// pass.
///
/// # Errors
///
/// [`HistogramError::CountsMismatch`] if `counts` is not the histogram of
/// `samples` under `spec`.
pub fn build_reverse_index<T: Sample>(
    samples: &[T],
    counts: &[BinCount],
    spec: &BinSpec<T>,
) -> Result<ReverseIndices, HistogramError> {
    if counts.len() != spec.nbins() {
        return Err(HistogramError::CountsMismatch);
    }

    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut total = 0usize;
    offsets.push(0);
    for &c in counts {
        total = usize::try_from(c)
            .ok()
            .and_then(|c| total.checked_add(c))
            .filter(|&t| t <= samples.len())
            .ok_or(HistogramError::CountsMismatch)?;
        offsets.push(total);
    }

    let mut cursor = offsets[..counts.len()].to_vec();
    let mut positions = vec![0usize; total];
    for (position, &v) in samples.iter().enumerate() {
        if let Some(bin) = spec.bin_index(v) {
            if cursor[bin] == offsets[bin + 1] {
                return Err(HistogramError::CountsMismatch);
            }
            positions[cursor[bin]] = position;
            cursor[bin] += 1;
        }
    }

    if cursor.iter().zip(&offsets[1..]).any(|(c, end)| c != end) {
        return Err(HistogramError::CountsMismatch);
    }

    Ok(ReverseIndices { offsets, positions })
}
