//! Per-frame lapped transform.
//!
//! `forward` maps one `2N` frame to `N` coefficients and `inverse` maps `N`
//! coefficients back to a `2N` frame that still carries time-domain
//! aliasing; the aliasing cancels once neighbouring frames are overlap-added.
//!
//! Two evaluation strategies are available:
//! - **Dense**: matrix-vector product with the `(N, 2N)` / `(2N, N)` matrices, O(N^2)
//! - **Fast**: fold with the `(N, 2)` polyphase taps, then an FFT-based DCT-IV, O(N log N)
//!
//! Both produce the same coefficients to within rounding.

use crate::dct::DctIv;
use crate::error::{check_len, DspResult};
use crate::kernel::{fold, unfold};
use crate::polyphase::PolyphaseMatrix;
use ndarray::{ArrayView1, ArrayView2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Apply an analysis matrix to one frame.
///
/// `frame.len()` must equal the matrix column count (`2N`).
pub fn forward(frame: &[f64], analysis: &ArrayView2<'_, f64>) -> DspResult<Vec<f64>> {
    check_len(analysis.ncols(), frame.len())?;
    Ok(analysis.dot(&ArrayView1::from(frame)).to_vec())
}

/// Apply a synthesis matrix to one coefficient frame.
///
/// `coefficients.len()` must equal the matrix column count (`N`).
pub fn inverse(coefficients: &[f64], synthesis: &ArrayView2<'_, f64>) -> DspResult<Vec<f64>> {
    check_len(synthesis.ncols(), coefficients.len())?;
    Ok(synthesis.dot(&ArrayView1::from(coefficients)).to_vec())
}

/// Evaluation strategy for the per-frame transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Dense matrix-vector products.
    Dense,

    /// Polyphase fold plus FFT-based DCT-IV.
    #[default]
    Fast,
}

/// Reusable per-thread working memory for the fast path.
#[derive(Clone, Debug, Default)]
pub struct FrameScratch {
    folded: Vec<f64>,
    fft: Vec<Complex64>,
}

impl FrameScratch {
    /// Scratch sized for block size `n`.
    pub fn new(n: usize) -> Self {
        Self {
            folded: vec![0.0; n],
            fft: Vec::with_capacity(n / 2),
        }
    }
}

/// Lapped transform engine bound to one polyphase matrix.
#[derive(Clone)]
pub struct LappedTransformEngine {
    /// Shared, immutable matrix pair.
    matrix: Arc<PolyphaseMatrix>,

    /// Cached DCT-IV plan for the fast path.
    dct: DctIv,

    /// Evaluation strategy.
    mode: EngineMode,
}

impl LappedTransformEngine {
    /// Create an engine for a matrix.
    pub fn new(matrix: Arc<PolyphaseMatrix>, mode: EngineMode) -> DspResult<Self> {
        let dct = DctIv::new(matrix.block_size())?;

        tracing::debug!(
            "LappedTransformEngine: N={}, mode={:?}",
            matrix.block_size(),
            mode
        );

        Ok(Self { matrix, dct, mode })
    }

    /// The matrix this engine applies.
    #[inline]
    pub fn matrix(&self) -> &Arc<PolyphaseMatrix> {
        &self.matrix
    }

    /// Evaluation strategy.
    #[inline]
    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Block size `N`.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.matrix.block_size()
    }

    /// Scratch buffers sized for this engine.
    pub fn scratch(&self) -> FrameScratch {
        FrameScratch::new(self.block_size())
    }

    /// Transform one `2N` frame into `N` coefficients.
    pub fn forward(&self, frame: &[f64]) -> DspResult<Vec<f64>> {
        let mut out = vec![0.0; self.block_size()];
        self.forward_into(frame, &mut out, &mut self.scratch())?;
        Ok(out)
    }

    /// Transform one frame into a caller-provided buffer.
    pub fn forward_into(
        &self,
        frame: &[f64],
        out: &mut [f64],
        scratch: &mut FrameScratch,
    ) -> DspResult<()> {
        let n = self.block_size();
        check_len(2 * n, frame.len())?;
        check_len(n, out.len())?;

        match self.mode {
            EngineMode::Dense => {
                let coefficients = self.matrix.analysis().dot(&ArrayView1::from(frame));
                for (o, c) in out.iter_mut().zip(coefficients.iter()) {
                    *o = *c;
                }
            }
            EngineMode::Fast => {
                scratch.folded.resize(n, 0.0);
                fold(frame, &self.matrix.analysis_taps(), &mut scratch.folded);
                self.dct.process_into(&scratch.folded, out, &mut scratch.fft)?;
            }
        }

        Ok(())
    }

    /// Reconstruct one aliased `2N` frame from `N` coefficients.
    pub fn inverse(&self, coefficients: &[f64]) -> DspResult<Vec<f64>> {
        let mut out = vec![0.0; 2 * self.block_size()];
        self.inverse_into(coefficients, &mut out, &mut self.scratch())?;
        Ok(out)
    }

    /// Reconstruct one frame into a caller-provided buffer.
    pub fn inverse_into(
        &self,
        coefficients: &[f64],
        out: &mut [f64],
        scratch: &mut FrameScratch,
    ) -> DspResult<()> {
        let n = self.block_size();
        check_len(n, coefficients.len())?;
        check_len(2 * n, out.len())?;

        match self.mode {
            EngineMode::Dense => {
                let frame = self.matrix.synthesis().dot(&ArrayView1::from(coefficients));
                for (o, v) in out.iter_mut().zip(frame.iter()) {
                    *o = *v;
                }
            }
            EngineMode::Fast => {
                scratch.folded.resize(n, 0.0);
                self.dct
                    .process_into(coefficients, &mut scratch.folded, &mut scratch.fft)?;
                unfold(&scratch.folded, &self.matrix.synthesis_taps(), out);
            }
        }

        Ok(())
    }
}
