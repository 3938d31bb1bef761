//! Transform coefficient frames and frame geometry.
//!
//! A lapped transform with block size `N` maps every `2N`-sample frame to `N`
//! coefficients, with frames advancing by `N` samples. How the first and last
//! frames treat samples outside the signal is governed by [`BoundaryMode`],
//! which also fixes how many frames a signal of a given length produces.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Policy for frames that extend past the signal edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Extend the signal with `N` zeros on both sides.
    ///
    /// Every sample is covered by exactly two frames, so the edges
    /// reconstruct exactly at the cost of one extra frame.
    #[default]
    ZeroPad,

    /// Treat the (zero-padded) signal as one period of a circular signal.
    ///
    /// The last frame wraps onto the first block. Produces one frame per
    /// block and no extra frame.
    Periodic,
}

impl BoundaryMode {
    /// Number of `N`-sample blocks needed to cover `signal_len` samples.
    ///
    /// Always at least one, so an empty signal still has a defined geometry.
    #[inline]
    pub fn blocks(signal_len: usize, block_size: usize) -> usize {
        let partial = usize::from(signal_len % block_size != 0);
        (signal_len / block_size + partial).max(1)
    }

    /// Number of `2N` frames produced for a signal of `signal_len` samples.
    #[inline]
    pub fn num_frames(&self, signal_len: usize, block_size: usize) -> usize {
        let blocks = Self::blocks(signal_len, block_size);
        match self {
            Self::ZeroPad => blocks + 1,
            Self::Periodic => blocks,
        }
    }

    /// Length of the padded buffer the frames are drawn from.
    #[inline]
    pub fn padded_len(&self, signal_len: usize, block_size: usize) -> usize {
        (self.num_frames(signal_len, block_size) + 1) * block_size
    }

    /// Offset of the first signal sample inside the padded buffer.
    #[inline]
    pub fn lead(&self, block_size: usize) -> usize {
        match self {
            Self::ZeroPad => block_size,
            Self::Periodic => 0,
        }
    }
}

/// Materialized output of a lapped analysis.
///
/// Row `i` holds the `N` coefficients of frame `i`. The original signal
/// length and boundary policy travel with the coefficients so synthesis
/// can trim its output without extra bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoefficientFrames {
    /// Coefficients, shape `(num_frames, block_size)`.
    pub frames: Array2<f64>,

    /// Number of samples in the analyzed signal.
    pub signal_len: usize,

    /// Boundary policy used during analysis.
    #[serde(default)]
    pub boundary: BoundaryMode,
}

impl CoefficientFrames {
    /// Wrap an existing coefficient array.
    pub fn new(frames: Array2<f64>, signal_len: usize, boundary: BoundaryMode) -> Self {
        Self {
            frames,
            signal_len,
            boundary,
        }
    }

    /// Build from per-frame coefficient vectors.
    ///
    /// Every row must have `block_size` entries.
    pub fn from_rows(
        rows: Vec<Vec<f64>>,
        block_size: usize,
        signal_len: usize,
        boundary: BoundaryMode,
    ) -> Result<Self, &'static str> {
        if block_size == 0 {
            return Err("block_size must be > 0");
        }
        if rows.iter().any(|row| row.len() != block_size) {
            return Err("every coefficient frame must have block_size entries");
        }

        let num_frames = rows.len();
        let data: Vec<f64> = rows.into_iter().flatten().collect();
        let frames = Array2::from_shape_vec((num_frames, block_size), data)
            .map_err(|_| "coefficient data does not match frame shape")?;

        Ok(Self::new(frames, signal_len, boundary))
    }

    /// Transform block size `N` (coefficients per frame).
    #[inline]
    pub fn block_size(&self) -> usize {
        self.frames.ncols()
    }

    /// Number of frames.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.nrows()
    }

    /// Coefficients of a single frame.
    pub fn frame(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        if index < self.num_frames() {
            Some(self.frames.row(index))
        } else {
            None
        }
    }

    /// Iterate over frames in order.
    pub fn iter(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> + '_ {
        self.frames.rows().into_iter()
    }

    /// Frame count expected from `signal_len` under the recorded boundary mode.
    pub fn expected_frames(&self) -> usize {
        self.boundary.num_frames(self.signal_len, self.block_size())
    }

    /// Total coefficient energy (sum of squares).
    pub fn energy(&self) -> f64 {
        self.frames.iter().map(|c| c * c).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pad_geometry() {
        let mode = BoundaryMode::ZeroPad;
        // 8 samples, N = 4: two blocks plus one extra frame
        assert_eq!(mode.num_frames(8, 4), 3);
        assert_eq!(mode.padded_len(8, 4), 16);
        assert_eq!(mode.lead(4), 4);

        // Partial last block rounds up
        assert_eq!(mode.num_frames(9, 4), 4);

        // Shorter than one block
        assert_eq!(mode.num_frames(3, 4), 2);
        assert_eq!(mode.num_frames(0, 4), 2);
    }

    #[test]
    fn test_block_count_at_usize_max() {
        assert_eq!(BoundaryMode::blocks(usize::MAX, 2), usize::MAX / 2 + 1);
        assert_eq!(BoundaryMode::blocks(usize::MAX - 1, 2), usize::MAX / 2);
        assert_eq!(BoundaryMode::Periodic.num_frames(usize::MAX, 4), usize::MAX / 4 + 1);
    }

    #[test]
    fn test_periodic_geometry() {
        let mode = BoundaryMode::Periodic;
        assert_eq!(mode.num_frames(8, 4), 2);
        assert_eq!(mode.padded_len(8, 4), 12);
        assert_eq!(mode.lead(4), 0);
        assert_eq!(mode.num_frames(3, 4), 1);
    }

    #[test]
    fn test_from_rows() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let frames = CoefficientFrames::from_rows(rows, 2, 4, BoundaryMode::ZeroPad).unwrap();

        assert_eq!(frames.num_frames(), 3);
        assert_eq!(frames.block_size(), 2);
        assert_eq!(frames.expected_frames(), 3);
        assert_eq!(frames.frame(1).unwrap().to_vec(), vec![3.0, 4.0]);
        assert!(frames.frame(3).is_none());
        assert!((frames.energy() - 91.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(CoefficientFrames::from_rows(rows, 2, 4, BoundaryMode::ZeroPad).is_err());
    }

    #[test]
    fn test_boundary_serde() {
        let json = serde_json::to_string(&BoundaryMode::Periodic).unwrap();
        assert_eq!(json, "\"periodic\"");
        let mode: BoundaryMode = serde_json::from_str("\"zero_pad\"").unwrap();
        assert_eq!(mode, BoundaryMode::ZeroPad);
    }
}
