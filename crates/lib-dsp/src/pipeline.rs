//! Whole-signal analysis and synthesis.
//!
//! The pipeline owns one [`LappedTransformEngine`] built from a
//! [`TransformConfig`]. Analysis pads the signal once into a
//! [`StridedBuffer`] and yields coefficients frame by frame; synthesis
//! inverts every coefficient frame and overlap-adds it into an
//! [`OverlapAddAccumulator`] that is trimmed back to the signal length.
//!
//! Large inputs can be processed frame-parallel with Rayon. Below
//! `parallel_threshold` frames the parallel entry points fall back to the
//! sequential path.

use crate::accumulator::OverlapAddAccumulator;
use crate::engine::{EngineMode, FrameScratch, LappedTransformEngine};
use crate::error::{check_block_size, DspError, DspResult};
use crate::polyphase::{PolyphaseMatrix, PolyphaseMatrixBuilder};
use crate::strided::StridedBuffer;
use crate::window::{generate_window, WindowType};
use lib_types::{BoundaryMode, CoefficientFrames};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Transform configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Block size `N` (coefficients per frame, frame stride).
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Window family.
    #[serde(default)]
    pub window: WindowType,

    /// Edge policy.
    #[serde(default)]
    pub boundary: BoundaryMode,

    /// Per-frame evaluation strategy.
    #[serde(default)]
    pub mode: EngineMode,

    /// Perfect-reconstruction tolerance; `None` skips the check.
    #[serde(default)]
    pub validate: Option<f64>,

    /// Minimum frame count before the parallel paths use Rayon.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_block_size() -> usize {
    256
}

fn default_parallel_threshold() -> usize {
    64
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            window: WindowType::default(),
            boundary: BoundaryMode::default(),
            mode: EngineMode::default(),
            validate: None,
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

/// Shared flag for cooperative cancellation between frames.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lapped analysis/synthesis over whole signals.
#[derive(Clone)]
pub struct SignalVectorPipeline {
    /// Per-frame transform with the cached matrix pair.
    engine: LappedTransformEngine,

    /// Edge policy for analysis.
    boundary: BoundaryMode,

    /// Frame count at which the parallel paths switch to Rayon.
    parallel_threshold: usize,
}

impl SignalVectorPipeline {
    /// Build the window and matrix pair described by `config`.
    pub fn new(config: &TransformConfig) -> DspResult<Self> {
        check_block_size(config.block_size)?;
        let window = generate_window(config.window, config.block_size);

        let mut builder = PolyphaseMatrixBuilder::new();
        if let Some(tolerance) = config.validate {
            builder = builder.with_validation(tolerance);
        }
        let matrix = builder.build(&window, config.block_size)?;

        Self::from_matrix(Arc::new(matrix), config.mode).map(|pipeline| {
            pipeline
                .with_boundary(config.boundary)
                .with_parallel_threshold(config.parallel_threshold)
        })
    }

    /// Pipeline for an explicit window of length `2 * block_size`.
    pub fn from_window(window: &[f64], block_size: usize) -> DspResult<Self> {
        let matrix = PolyphaseMatrixBuilder::new().build(window, block_size)?;
        Self::from_matrix(Arc::new(matrix), EngineMode::default())
    }

    /// Pipeline around an already built matrix pair.
    pub fn from_matrix(matrix: Arc<PolyphaseMatrix>, mode: EngineMode) -> DspResult<Self> {
        Ok(Self {
            engine: LappedTransformEngine::new(matrix, mode)?,
            boundary: BoundaryMode::default(),
            parallel_threshold: default_parallel_threshold(),
        })
    }

    /// Use a different edge policy for analysis.
    pub fn with_boundary(mut self, boundary: BoundaryMode) -> Self {
        self.boundary = boundary;
        self
    }

    /// Set the frame count at which the parallel paths use Rayon.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Block size `N`.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.engine.block_size()
    }

    /// Edge policy used by [`analyze`](Self::analyze).
    #[inline]
    pub fn boundary(&self) -> BoundaryMode {
        self.boundary
    }

    /// The per-frame engine.
    #[inline]
    pub fn engine(&self) -> &LappedTransformEngine {
        &self.engine
    }

    /// Lazily analyze `signal`, one coefficient frame per step.
    ///
    /// The signal is copied once into a padded buffer; frames are then
    /// borrowed views into that buffer.
    pub fn analyze(&self, signal: &[f64]) -> DspResult<Analysis> {
        let buffer = StridedBuffer::new(signal, self.block_size(), self.boundary)?;
        Ok(Analysis::new(self.engine.clone(), Arc::new(buffer)))
    }

    /// Analyze `signal` with frames distributed across the Rayon pool.
    pub fn analyze_par(&self, signal: &[f64]) -> DspResult<CoefficientFrames> {
        let buffer = StridedBuffer::new(signal, self.block_size(), self.boundary)?;
        let num_frames = buffer.num_frames();

        if num_frames < self.parallel_threshold {
            tracing::debug!("analyze_par: {} frames, sequential", num_frames);
            return Analysis::new(self.engine.clone(), Arc::new(buffer)).collect_frames();
        }

        tracing::debug!("analyze_par: {} frames, parallel", num_frames);

        let n = self.block_size();
        let mut data = vec![0.0; num_frames * n];
        data.par_chunks_mut(n).enumerate().try_for_each_init(
            || self.engine.scratch(),
            |scratch, (index, out)| {
                let frame = buffer.frame_at(index)?;
                self.engine.forward_into(frame, out, scratch)
            },
        )?;

        let frames = Array2::from_shape_vec((num_frames, n), data)
            .map_err(|e| DspError::NumericalInstability(e.to_string()))?;
        Ok(CoefficientFrames::new(frames, signal.len(), self.boundary))
    }

    /// Reconstruct the signal from its coefficient frames.
    ///
    /// Frames are inverted in order and overlap-added; the output is trimmed
    /// to `frames.signal_len` using the boundary policy recorded in `frames`.
    pub fn synthesize(&self, frames: &CoefficientFrames) -> DspResult<Vec<f64>> {
        self.synthesize_sequential(frames, None)
    }

    /// Like [`synthesize`](Self::synthesize), checking `cancel` before each frame.
    pub fn synthesize_with_cancel(
        &self,
        frames: &CoefficientFrames,
        cancel: &CancelToken,
    ) -> DspResult<Vec<f64>> {
        self.synthesize_sequential(frames, Some(cancel))
    }

    /// Reconstruct with frames distributed across the Rayon pool.
    ///
    /// Overlapping frames meet in the accumulator, which serializes them on
    /// the shared stripe.
    pub fn synthesize_par(&self, frames: &CoefficientFrames) -> DspResult<Vec<f64>> {
        self.check_geometry(frames)?;
        let num_frames = frames.num_frames();

        if num_frames < self.parallel_threshold {
            tracing::debug!("synthesize_par: {} frames, sequential", num_frames);
            return self.synthesize_sequential(frames, None);
        }

        tracing::debug!("synthesize_par: {} frames, parallel", num_frames);

        let n = self.block_size();
        let accumulator = OverlapAddAccumulator::new(n, frames.signal_len, frames.boundary);
        let data = frames.frames.as_standard_layout();
        let flat = contiguous(data.as_slice())?;

        flat.par_chunks_exact(n).enumerate().try_for_each_init(
            || (self.engine.scratch(), vec![0.0; 2 * n]),
            |(scratch, frame), (index, coefficients)| {
                self.engine.inverse_into(coefficients, frame, scratch)?;
                accumulator.accumulate(index, frame.as_slice())
            },
        )?;

        Ok(accumulator.into_samples())
    }

    fn synthesize_sequential(
        &self,
        frames: &CoefficientFrames,
        cancel: Option<&CancelToken>,
    ) -> DspResult<Vec<f64>> {
        self.check_geometry(frames)?;

        let n = self.block_size();
        let accumulator = OverlapAddAccumulator::new(n, frames.signal_len, frames.boundary);
        let data = frames.frames.as_standard_layout();
        let flat = contiguous(data.as_slice())?;

        let mut scratch = self.engine.scratch();
        let mut frame = vec![0.0; 2 * n];

        for (index, coefficients) in flat.chunks_exact(n).enumerate() {
            if cancel.map_or(false, CancelToken::is_cancelled) {
                tracing::debug!("Synthesis cancelled after {} frames", index);
                return Err(DspError::Cancelled { completed: index });
            }
            self.engine.inverse_into(coefficients, &mut frame, &mut scratch)?;
            accumulator.accumulate(index, &frame)?;
        }

        Ok(accumulator.into_samples())
    }

    /// Frame width must be `N` and the frame count must match `signal_len`.
    fn check_geometry(&self, frames: &CoefficientFrames) -> DspResult<()> {
        let n = self.block_size();
        if frames.block_size() != n {
            return Err(DspError::ShapeMismatch {
                expected: n,
                actual: frames.block_size(),
            });
        }

        // Frames never cover fewer samples than the recorded signal length
        let capacity = frames.num_frames().saturating_mul(n);
        if frames.signal_len > capacity {
            return Err(DspError::ShapeMismatch {
                expected: capacity,
                actual: frames.signal_len,
            });
        }

        let expected = frames.boundary.num_frames(frames.signal_len, n);
        if frames.num_frames() != expected {
            return Err(DspError::ShapeMismatch {
                expected,
                actual: frames.num_frames(),
            });
        }

        Ok(())
    }
}

fn contiguous(data: Option<&[f64]>) -> DspResult<&[f64]> {
    data.ok_or_else(|| {
        DspError::NumericalInstability("coefficient frames are not contiguous".to_string())
    })
}

/// Lazy, restartable sequence of coefficient frames.
///
/// Yields exactly one `N`-length coefficient vector per frame of the padded
/// signal. Cloning is cheap: the padded buffer and the matrix pair are
/// shared, only the cursor and scratch space are duplicated.
#[derive(Clone)]
pub struct Analysis {
    engine: LappedTransformEngine,
    buffer: Arc<StridedBuffer>,
    next: usize,
    scratch: FrameScratch,
}

impl Analysis {
    fn new(engine: LappedTransformEngine, buffer: Arc<StridedBuffer>) -> Self {
        let scratch = engine.scratch();
        Self {
            engine,
            buffer,
            next: 0,
            scratch,
        }
    }

    /// Rewind to the first frame.
    pub fn restart(&mut self) {
        self.next = 0;
    }

    /// The padded buffer the frames are read from.
    pub fn buffer(&self) -> &StridedBuffer {
        &self.buffer
    }

    /// Materialize every frame, starting from the first.
    pub fn collect_frames(self) -> DspResult<CoefficientFrames> {
        self.collect_inner(None)
    }

    /// Materialize every frame, checking `cancel` before each one.
    pub fn collect_with_cancel(self, cancel: &CancelToken) -> DspResult<CoefficientFrames> {
        self.collect_inner(Some(cancel))
    }

    fn collect_inner(mut self, cancel: Option<&CancelToken>) -> DspResult<CoefficientFrames> {
        self.restart();
        let n = self.engine.block_size();
        let num_frames = self.len();
        let signal_len = self.buffer.signal_len();
        let boundary = self.buffer.boundary();

        let mut data = Vec::with_capacity(num_frames * n);
        let mut completed = 0;
        while self.next < self.buffer.num_frames() {
            if cancel.map_or(false, CancelToken::is_cancelled) {
                tracing::debug!("Analysis cancelled after {} frames", completed);
                return Err(DspError::Cancelled { completed });
            }
            let start = data.len();
            data.resize(start + n, 0.0);
            self.step(&mut data[start..])?;
            completed += 1;
        }

        let frames = Array2::from_shape_vec((num_frames, n), data)
            .map_err(|e| DspError::NumericalInstability(e.to_string()))?;
        Ok(CoefficientFrames::new(frames, signal_len, boundary))
    }

    /// Transform the frame under the cursor into `out` and advance.
    fn step(&mut self, out: &mut [f64]) -> DspResult<()> {
        let frame = self.buffer.frame_at(self.next)?;
        self.engine.forward_into(frame, out, &mut self.scratch)?;
        self.next += 1;
        Ok(())
    }
}

impl Iterator for Analysis {
    type Item = DspResult<Vec<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.buffer.num_frames() {
            return None;
        }
        let mut out = vec![0.0; self.engine.block_size()];
        Some(self.step(&mut out).map(|()| out))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.num_frames().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Analysis {}

/// Analyze `signal` with a window of length `2 * block_size`.
///
/// Frame `i` starts at sample `i * block_size` and the signal is treated as
/// circular, giving `ceil(len / block_size)` frames. Zero-padded edges are
/// available through [`SignalVectorPipeline::with_boundary`].
pub fn analyze(signal: &[f64], block_size: usize, window: &[f64]) -> DspResult<Analysis> {
    SignalVectorPipeline::from_window(window, block_size)?
        .with_boundary(BoundaryMode::Periodic)
        .analyze(signal)
}

/// Reconstruct a signal from frames produced by [`analyze`].
pub fn synthesize(
    frames: &CoefficientFrames,
    block_size: usize,
    window: &[f64],
) -> DspResult<Vec<f64>> {
    SignalVectorPipeline::from_window(window, block_size)?.synthesize(frames)
}
