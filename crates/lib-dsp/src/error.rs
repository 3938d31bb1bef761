//! Error types for lapped-transform operations.

use thiserror::Error;

/// Errors that can occur during transform construction or application.
#[derive(Debug, Error)]
pub enum DspError {
    /// Block size is zero or odd.
    #[error("Block size must be a positive even number, got {0}")]
    InvalidBlockSize(usize),

    /// Window length does not match the block size.
    #[error("Window length mismatch: expected {expected} (2N), got {actual}")]
    InvalidWindowLength { expected: usize, actual: usize },

    /// Window fails the perfect-reconstruction check.
    #[error("Window fails perfect reconstruction: max deviation {deviation:.3e} exceeds tolerance {tolerance:.3e}")]
    InvalidWindow { deviation: f64, tolerance: f64 },

    /// Frame or coefficient length does not match the transform shape.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Frame index outside the buffer.
    #[error("Frame index {index} out of range for {len} frames")]
    OutOfRange { index: usize, len: usize },

    /// Processing stopped by a cancellation request.
    #[error("Operation cancelled after {completed} frames")]
    Cancelled { completed: usize },

    /// Numerical failure inside an FFT or matrix routine.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

impl DspError {
    /// Whether this error reports a rejected window.
    pub fn is_window_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidWindow { .. } | Self::InvalidWindowLength { .. }
        )
    }
}

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;

/// Validate a transform block size: positive and even.
pub fn check_block_size(block_size: usize) -> DspResult<()> {
    if block_size == 0 || block_size % 2 != 0 {
        return Err(DspError::InvalidBlockSize(block_size));
    }
    Ok(())
}

/// Validate that a slice has the expected length.
#[inline]
pub fn check_len(expected: usize, actual: usize) -> DspResult<()> {
    if expected != actual {
        return Err(DspError::ShapeMismatch { expected, actual });
    }
    Ok(())
}
