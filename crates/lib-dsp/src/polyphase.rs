//! Polyphase matrix construction.
//!
//! A window of length `2N` is split into its two polyphase components (the
//! first and second half of the frame). Folding pairs one sample from each
//! quarter of the frame, so every folded output has exactly two signed
//! window taps: the `(N, 2)` tap array. Composing the fold with the DCT-IV
//! gives the dense analysis matrix `D4 · F · diag(w)` of shape `(N, 2N)`;
//! the synthesis matrix is the transpose built from the synthesis window,
//! shape `(2N, N)`.
//!
//! Perfect reconstruction is checked on the product `S · A` split into
//! `N x N` blocks `[[P, Q], [R, U]]`: the tail of one frame plus the head of
//! the next must give `P + U = I` with no cross terms (`Q = R = 0`).

use crate::error::{check_block_size, DspError, DspResult};
use crate::kernel::{dct4_matrix, fold_taps, folding_matrix, two_frame_matrix};
use ndarray::{s, Array2, ArrayView2};

/// Default tolerance for the perfect-reconstruction diagnostic.
pub const DEFAULT_PR_TOLERANCE: f64 = 1e-9;

/// Immutable analysis/synthesis pair for one transform configuration.
///
/// Built once and shared read-only (typically behind an `Arc`) across all
/// frames and worker threads.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyphaseMatrix {
    /// Block size `N`.
    block_size: usize,

    /// Signed analysis window taps, shape `(N, 2)`.
    analysis_taps: Array2<f64>,

    /// Signed synthesis window taps, shape `(N, 2)`.
    synthesis_taps: Array2<f64>,

    /// Dense analysis matrix, shape `(N, 2N)`.
    analysis: Array2<f64>,

    /// Dense synthesis matrix, shape `(2N, N)`.
    synthesis: Array2<f64>,
}

impl PolyphaseMatrix {
    /// Block size `N`.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Frame length `2N`.
    #[inline]
    pub fn frame_len(&self) -> usize {
        2 * self.block_size
    }

    /// Analysis polyphase taps, shape `(N, 2)`.
    #[inline]
    pub fn analysis_taps(&self) -> ArrayView2<'_, f64> {
        self.analysis_taps.view()
    }

    /// Synthesis polyphase taps, shape `(N, 2)`.
    #[inline]
    pub fn synthesis_taps(&self) -> ArrayView2<'_, f64> {
        self.synthesis_taps.view()
    }

    /// Dense analysis matrix, shape `(N, 2N)`.
    #[inline]
    pub fn analysis(&self) -> ArrayView2<'_, f64> {
        self.analysis.view()
    }

    /// Dense synthesis matrix, shape `(2N, N)`.
    #[inline]
    pub fn synthesis(&self) -> ArrayView2<'_, f64> {
        self.synthesis.view()
    }

    /// Consume into the `(analysis, synthesis)` pair.
    pub fn into_pair(self) -> (Array2<f64>, Array2<f64>) {
        (self.analysis, self.synthesis)
    }

    /// Maximum deviation of the lapped composition from the identity.
    pub fn perfect_reconstruction_error(&self) -> f64 {
        let n = self.block_size;
        let product = self.synthesis.dot(&self.analysis);

        let head = product.slice(s![..n, ..n]);
        let cross_head = product.slice(s![..n, n..]);
        let cross_tail = product.slice(s![n.., ..n]);
        let tail = product.slice(s![n.., n..]);

        let mut deviation: f64 = 0.0;
        for i in 0..n {
            for j in 0..n {
                let identity = if i == j { 1.0 } else { 0.0 };
                deviation = deviation
                    .max((head[[i, j]] + tail[[i, j]] - identity).abs())
                    .max(cross_head[[i, j]].abs())
                    .max(cross_tail[[i, j]].abs());
            }
        }
        deviation
    }

    /// Block-boundary butterfly of the analysis fold, shape `(N, N)`.
    pub fn boundary_butterfly(&self) -> DspResult<Array2<f64>> {
        let n = self.block_size;
        let mut folding = Array2::zeros((n, 2 * n));
        for j in 0..n {
            let (direct, mirrored) = crate::kernel::fold_indices(j, n);
            folding[[j, direct]] = self.analysis_taps[[j, 0]];
            folding[[j, mirrored]] = self.analysis_taps[[j, 1]];
        }
        two_frame_matrix(&folding.view(), true)
    }
}

/// Builds [`PolyphaseMatrix`] values from windows.
#[derive(Clone, Debug, Default)]
pub struct PolyphaseMatrixBuilder {
    /// Tolerance for the perfect-reconstruction check; `None` skips it.
    validation: Option<f64>,
}

impl PolyphaseMatrixBuilder {
    /// Builder without perfect-reconstruction validation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject windows whose lapped composition deviates from the identity
    /// by more than `tolerance`.
    pub fn with_validation(mut self, tolerance: f64) -> Self {
        self.validation = Some(tolerance);
        self
    }

    /// Build the matrix pair using the same window for analysis and synthesis.
    pub fn build(&self, window: &[f64], block_size: usize) -> DspResult<PolyphaseMatrix> {
        self.build_biorthogonal(window, window, block_size)
    }

    /// Build the matrix pair from distinct analysis and synthesis windows.
    pub fn build_biorthogonal(
        &self,
        analysis_window: &[f64],
        synthesis_window: &[f64],
        block_size: usize,
    ) -> DspResult<PolyphaseMatrix> {
        check_block_size(block_size)?;
        for window in [analysis_window, synthesis_window] {
            if window.len() != 2 * block_size {
                return Err(DspError::InvalidWindowLength {
                    expected: 2 * block_size,
                    actual: window.len(),
                });
            }
        }

        let dct = dct4_matrix(block_size);
        let analysis = dct.dot(&folding_matrix(analysis_window)?);
        let synthesis = folding_matrix(synthesis_window)?.t().dot(&dct);

        let matrix = PolyphaseMatrix {
            block_size,
            analysis_taps: fold_taps(analysis_window)?,
            synthesis_taps: fold_taps(synthesis_window)?,
            analysis,
            synthesis,
        };

        tracing::debug!(
            "PolyphaseMatrixBuilder: N={}, analysis={:?}, synthesis={:?}",
            block_size,
            matrix.analysis.dim(),
            matrix.synthesis.dim()
        );

        if let Some(tolerance) = self.validation {
            let deviation = matrix.perfect_reconstruction_error();
            if deviation > tolerance {
                tracing::warn!(
                    "Window rejected: perfect-reconstruction deviation {:.3e} > {:.3e}",
                    deviation,
                    tolerance
                );
                return Err(DspError::InvalidWindow {
                    deviation,
                    tolerance,
                });
            }
        }

        Ok(matrix)
    }
}

/// Build the `(analysis, synthesis)` matrix pair for a window.
///
/// Shapes are `(N, 2N)` and `(2N, N)`. No perfect-reconstruction check is
/// applied; use [`PolyphaseMatrixBuilder::with_validation`] for that.
pub fn build(window: &[f64], block_size: usize) -> DspResult<(Array2<f64>, Array2<f64>)> {
    Ok(PolyphaseMatrixBuilder::new()
        .build(window, block_size)?
        .into_pair())
}
