//! Transform kernels and the folding (polyphase) stage of the MDCT.
//!
//! The MDCT of block size `N` is factored as
//!
//! ```text
//! C = D4 · F
//! ```
//!
//! where `F` is an `N x 2N` folding matrix with exactly two non-zero taps
//! per row and `D4` is the orthonormal `N x N` DCT-IV. With `h = N / 2`:
//!
//! ```text
//! j <  h:  f[j] = x[h + j] + x[h - 1 - j]
//! j >= h:  f[j] = x[h + j] - x[5h - 1 - j]
//! ```
//!
//! Windowing multiplies each tap by the window sample it reads, which gives
//! the `(N, 2)` polyphase tap array used by the fast engine.

use crate::error::{check_block_size, DspError, DspResult};
use ndarray::{Array2, ArrayView2};
use std::f64::consts::PI;

/// Input sample indices read by folded sample `j` for block size `n`.
///
/// The first index is always in `h..3h`; the second mirrors it around the
/// frame quarter boundary. Across all `j` every frame index appears once.
#[inline]
pub fn fold_indices(j: usize, n: usize) -> (usize, usize) {
    let h = n / 2;
    if j < h {
        (h + j, h - 1 - j)
    } else {
        (h + j, 5 * h - 1 - j)
    }
}

/// Sign applied to the mirrored tap of folded sample `j`.
#[inline]
pub fn fold_sign(j: usize, n: usize) -> f64 {
    if j < n / 2 {
        1.0
    } else {
        -1.0
    }
}

/// Signed polyphase taps of a `2N` window, shape `(N, 2)`.
///
/// Row `j` holds the weights applied to the two samples named by
/// [`fold_indices`].
pub fn fold_taps(window: &[f64]) -> DspResult<Array2<f64>> {
    let n = window.len() / 2;
    check_block_size(n)?;
    if window.len() != 2 * n {
        return Err(DspError::InvalidWindowLength {
            expected: 2 * n,
            actual: window.len(),
        });
    }

    Ok(Array2::from_shape_fn((n, 2), |(j, slot)| {
        let (direct, mirrored) = fold_indices(j, n);
        if slot == 0 {
            window[direct]
        } else {
            fold_sign(j, n) * window[mirrored]
        }
    }))
}

/// Fold a `2N` frame into `N` samples using polyphase taps.
pub fn fold(frame: &[f64], taps: &ArrayView2<'_, f64>, out: &mut [f64]) {
    let n = taps.nrows();
    for (j, o) in out.iter_mut().enumerate().take(n) {
        let (direct, mirrored) = fold_indices(j, n);
        *o = taps[[j, 0]] * frame[direct] + taps[[j, 1]] * frame[mirrored];
    }
}

/// Unfold `N` samples back into a `2N` frame (transpose of [`fold`]).
///
/// Every output sample receives exactly one contribution, so `out` is
/// overwritten rather than accumulated.
pub fn unfold(folded: &[f64], taps: &ArrayView2<'_, f64>, out: &mut [f64]) {
    let n = taps.nrows();
    for (j, &v) in folded.iter().enumerate().take(n) {
        let (direct, mirrored) = fold_indices(j, n);
        out[direct] = taps[[j, 0]] * v;
        out[mirrored] = taps[[j, 1]] * v;
    }
}

/// Dense `N x 2N` folding matrix for a window.
pub fn folding_matrix(window: &[f64]) -> DspResult<Array2<f64>> {
    let taps = fold_taps(window)?;
    let n = taps.nrows();

    let mut matrix = Array2::zeros((n, 2 * n));
    for j in 0..n {
        let (direct, mirrored) = fold_indices(j, n);
        matrix[[j, direct]] = taps[[j, 0]];
        matrix[[j, mirrored]] = taps[[j, 1]];
    }
    Ok(matrix)
}

/// Orthonormal DCT-IV matrix, `sqrt(2/N) cos(pi/N (m + 1/2)(k + 1/2))`.
///
/// Symmetric and self-inverse.
pub fn dct4_matrix(n: usize) -> Array2<f64> {
    let scale = (2.0 / n as f64).sqrt();
    Array2::from_shape_fn((n, n), |(k, m)| {
        scale * (PI / n as f64 * (m as f64 + 0.5) * (k as f64 + 0.5)).cos()
    })
}

/// Unwindowed MDCT kernel, `N x 2N`.
///
/// `sqrt(2/N) cos(pi/N (n - N/2 + 1/2)(k + 1/2))`.
pub fn mdct_matrix(n: usize) -> Array2<f64> {
    let scale = (2.0 / n as f64).sqrt();
    let shift = -(n as f64) / 2.0;
    Array2::from_shape_fn((n, 2 * n), |(k, i)| {
        scale * (PI / n as f64 * (i as f64 + shift + 0.5) * (k as f64 + 0.5)).cos()
    })
}

/// Two-frame (block boundary) form of a folding matrix.
///
/// Takes an `M x 2M` folding matrix and places the fold that ends frame
/// `i` and the fold that starts frame `i + 1` side by side over the `M`
/// samples the two frames share, inside a `2M` identity. With `trim` only
/// the `M x M` butterfly over the shared block is returned; it is
/// orthogonal exactly when the window is power complementary.
pub fn two_frame_matrix(folding: &ArrayView2<'_, f64>, trim: bool) -> DspResult<Array2<f64>> {
    let m = folding.nrows();
    check_block_size(m)?;
    if folding.ncols() != 2 * m {
        return Err(DspError::ShapeMismatch {
            expected: 2 * m,
            actual: folding.ncols(),
        });
    }
    let h = m / 2;

    let mut out = Array2::eye(2 * m);
    for r in 0..h {
        for c in 0..m {
            // Tail folds of frame i read the second half of that frame
            out[[h + r, h + c]] = folding[[h + r, m + c]];
            // Head folds of frame i + 1 read the first half of that frame
            out[[2 * h + r, h + c]] = folding[[r, c]];
        }
    }

    if trim {
        Ok(out.slice(ndarray::s![h..3 * h, h..3 * h]).to_owned())
    } else {
        Ok(out)
    }
}
