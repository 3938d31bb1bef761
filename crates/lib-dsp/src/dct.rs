//! Fast DCT-IV using rustfft.
//!
//! The orthonormal DCT-IV of even length `N` is computed with one
//! `N/2`-point complex FFT:
//! - Pack even samples as real parts and reversed odd samples as imaginary parts
//! - Pre-twiddle by `exp(-i pi (m + 1/4) / N)`
//! - FFT
//! - Post-twiddle by `exp(-i pi k / N)` and unpack real/imaginary parts
//!   into the even and reversed odd outputs
//!
//! The plan and twiddles are computed once; `DctIv` is `Send + Sync` and can
//! be shared across frames and worker threads.

use crate::error::{check_block_size, check_len, DspResult};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// DCT-IV engine with a cached FFT plan.
#[derive(Clone)]
pub struct DctIv {
    /// Transform length.
    n: usize,

    /// Cached `N/2`-point forward FFT.
    fft: Arc<dyn Fft<f64>>,

    /// Input rotation, length `N/2`.
    pre_twiddle: Vec<Complex64>,

    /// Output rotation with the orthonormal scale folded in, length `N/2`.
    post_twiddle: Vec<Complex64>,
}

impl DctIv {
    /// Plan a DCT-IV of length `n` (positive, even).
    pub fn new(n: usize) -> DspResult<Self> {
        check_block_size(n)?;
        let half = n / 2;
        let nf = n as f64;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(half);

        let pre_twiddle = (0..half)
            .map(|m| Complex64::from_polar(1.0, -PI * (m as f64 + 0.25) / nf))
            .collect();

        let scale = (2.0 / nf).sqrt();
        let post_twiddle = (0..half)
            .map(|k| Complex64::from_polar(scale, -PI * k as f64 / nf))
            .collect();

        tracing::debug!("DctIv: N={}, fft_len={}", n, half);

        Ok(Self {
            n,
            fft,
            pre_twiddle,
            post_twiddle,
        })
    }

    /// Transform length.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Always false; a planned transform has positive length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Compute the DCT-IV of `input`, returning a new buffer.
    pub fn process(&self, input: &[f64]) -> DspResult<Vec<f64>> {
        let mut output = vec![0.0; self.n];
        let mut scratch = Vec::with_capacity(self.n / 2);
        self.process_into(input, &mut output, &mut scratch)?;
        Ok(output)
    }

    /// Compute the DCT-IV of `input` into `output`.
    ///
    /// `scratch` is resized as needed and can be reused across calls.
    pub fn process_into(
        &self,
        input: &[f64],
        output: &mut [f64],
        scratch: &mut Vec<Complex64>,
    ) -> DspResult<()> {
        let n = self.n;
        check_len(n, input.len())?;
        check_len(n, output.len())?;
        let half = n / 2;

        scratch.clear();
        scratch.extend((0..half).map(|m| {
            Complex64::new(input[2 * m], input[n - 1 - 2 * m]) * self.pre_twiddle[m]
        }));

        self.fft.process(scratch);

        for (k, (z, t)) in scratch.iter().zip(self.post_twiddle.iter()).enumerate() {
            let u = z * t;
            output[2 * k] = u.re;
            output[n - 1 - 2 * k] = -u.im;
        }

        Ok(())
    }
}
