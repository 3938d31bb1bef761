//! Filterbank diagnostics for transform matrices.
//!
//! Each row of an analysis matrix is the impulse response of one band of
//! the filterbank:
//! - [`frequency_response`]: magnitude spectrum of every row, zero-padded
//!   to twice the row length for finer frequency sampling
//! - [`envelope`]: magnitude of the analytic signal of every row (Hilbert
//!   transform), i.e. the temporal envelope of each basis function
//!
//! Edge discontinuities of a row show up as ringing in its envelope.

use crate::error::{DspError, DspResult};
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use realfft::RealFftPlanner;
use rustfft::FftPlanner;

/// Magnitude frequency response of every matrix row.
///
/// # Arguments
///
/// * `matrix` - Transform matrix, one band per row, `L` columns
///
/// # Returns
///
/// Array of shape `(rows, L + 1)`: `|rfft|` of each row zero-padded to `2L`.
pub fn frequency_response(matrix: &ArrayView2<'_, f64>) -> DspResult<Array2<f64>> {
    let (rows, cols) = matrix.dim();
    if cols == 0 {
        return Err(DspError::ShapeMismatch {
            expected: 1,
            actual: 0,
        });
    }

    let fft_len = 2 * cols;
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(fft_len);

    let mut input = r2c.make_input_vec();
    let mut spectrum = r2c.make_output_vec();
    let mut out = Array2::zeros((rows, cols + 1));

    for (row, mut out_row) in matrix.rows().into_iter().zip(out.rows_mut()) {
        for (i, x) in input.iter_mut().enumerate() {
            *x = if i < cols { row[i] } else { 0.0 };
        }

        r2c.process(&mut input, &mut spectrum)
            .map_err(|e| DspError::NumericalInstability(e.to_string()))?;

        for (o, c) in out_row.iter_mut().zip(spectrum.iter()) {
            *o = c.norm();
        }
    }

    tracing::debug!("frequency_response: {} rows, {} bins", rows, cols + 1);

    Ok(out)
}

/// Envelope (analytic-signal magnitude) of every matrix row.
///
/// The analytic signal is formed in the frequency domain: DC and Nyquist
/// are kept, positive frequencies doubled, negative frequencies zeroed.
pub fn envelope(matrix: &ArrayView2<'_, f64>) -> DspResult<Array2<f64>> {
    let (rows, cols) = matrix.dim();
    if cols == 0 {
        return Err(DspError::ShapeMismatch {
            expected: 1,
            actual: 0,
        });
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(cols);
    let ifft = planner.plan_fft_inverse(cols);

    let gain = analytic_gain(cols);
    let scale = 1.0 / cols as f64;
    let mut buffer = vec![Complex64::new(0.0, 0.0); cols];
    let mut out = Array2::zeros((rows, cols));

    for (row, mut out_row) in matrix.rows().into_iter().zip(out.rows_mut()) {
        for (b, x) in buffer.iter_mut().zip(row.iter()) {
            *b = Complex64::new(*x, 0.0);
        }

        fft.process(&mut buffer);
        for (b, g) in buffer.iter_mut().zip(gain.iter()) {
            *b *= *g;
        }
        ifft.process(&mut buffer);

        for (o, b) in out_row.iter_mut().zip(buffer.iter()) {
            *o = b.norm() * scale;
        }
    }

    Ok(out)
}

/// Spectral weights turning a real spectrum into an analytic one.
fn analytic_gain(len: usize) -> Vec<f64> {
    let mut gain = vec![0.0; len];
    gain[0] = 1.0;
    let half = len / 2;

    if len % 2 == 0 {
        gain[half] = 1.0;
        for g in &mut gain[1..half] {
            *g = 2.0;
        }
    } else {
        for g in &mut gain[1..=half] {
            *g = 2.0;
        }
    }

    gain
}
