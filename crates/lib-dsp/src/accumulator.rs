//! Overlap-add output buffer.
//!
//! Inverse-transformed frames are `2N` samples long and neighbours overlap
//! by `N`, so two frames write into every block of the output. The buffer
//! is split into `N`-sample stripes, each behind its own `Mutex`; a frame
//! locks the two stripes it covers in ascending order. Frames that do not
//! share a stripe proceed in parallel and overlapping frames serialize on
//! the shared stripe, so no update is lost and no lock cycle can form.

use crate::error::{check_len, DspError, DspResult};
use lib_types::BoundaryMode;
use std::sync::{Mutex, MutexGuard};

/// Recover the guard from a poisoned mutex instead of panicking.
trait RecoverMutex<T> {
    fn lock_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> RecoverMutex<T> for Mutex<T> {
    fn lock_recover(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Accumulator stripe was poisoned, recovering data");
            poisoned.into_inner()
        })
    }
}

/// Lock-striped overlap-add accumulator.
#[derive(Debug)]
pub struct OverlapAddAccumulator {
    /// One `N`-sample stripe per block of the padded output.
    stripes: Vec<Mutex<Vec<f64>>>,

    /// Block size `N`.
    block_size: usize,

    /// Length of the signal being reconstructed.
    signal_len: usize,

    /// Edge policy used to map the padded output back onto the signal.
    boundary: BoundaryMode,
}

impl OverlapAddAccumulator {
    /// Create a zeroed accumulator for the given frame geometry.
    pub fn new(block_size: usize, signal_len: usize, boundary: BoundaryMode) -> Self {
        let num_stripes = boundary.num_frames(signal_len, block_size) + 1;
        let stripes = (0..num_stripes)
            .map(|_| Mutex::new(vec![0.0; block_size]))
            .collect();

        Self {
            stripes,
            block_size,
            signal_len,
            boundary,
        }
    }

    /// Number of frames this accumulator accepts.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.stripes.len() - 1
    }

    /// Block size `N`.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Add a `2N` frame at frame position `index`.
    ///
    /// Values are summed into the output, never overwritten. Safe to call
    /// concurrently from several threads.
    pub fn accumulate(&self, index: usize, values: &[f64]) -> DspResult<()> {
        let n = self.block_size;
        check_len(2 * n, values.len())?;

        let len = self.num_frames();
        if index >= len {
            return Err(DspError::OutOfRange { index, len });
        }

        // Ascending lock order: stripe `index` before `index + 1`
        let mut head = self.stripes[index].lock_recover();
        let mut tail = self.stripes[index + 1].lock_recover();

        for (o, v) in head.iter_mut().zip(&values[..n]) {
            *o += v;
        }
        for (o, v) in tail.iter_mut().zip(&values[n..]) {
            *o += v;
        }

        Ok(())
    }

    /// Copy of the full padded output, including edge padding.
    pub fn padded_samples(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.stripes.len() * self.block_size);
        for stripe in &self.stripes {
            out.extend_from_slice(&stripe.lock_recover());
        }
        out
    }

    /// Resolve edge padding and trim to the original signal length.
    pub fn into_samples(self) -> Vec<f64> {
        let n = self.block_size;
        let mut padded: Vec<f64> = Vec::with_capacity(self.stripes.len() * n);
        for stripe in self.stripes {
            let values = stripe.into_inner().unwrap_or_else(|poisoned| {
                tracing::warn!("Accumulator stripe was poisoned, recovering data");
                poisoned.into_inner()
            });
            padded.extend(values);
        }

        if self.boundary == BoundaryMode::Periodic {
            // Fold the wrapped tail back onto the first block
            let period = padded.len() - n;
            for i in 0..n {
                padded[i] += padded[period + i];
            }
        }

        let lead = self.boundary.lead(n);
        padded.truncate(lead + self.signal_len);
        padded.drain(..lead);
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_accumulate_adds() {
        let acc = OverlapAddAccumulator::new(2, 4, BoundaryMode::ZeroPad);
        assert_eq!(acc.num_frames(), 3);

        acc.accumulate(0, &[1.0, 1.0, 1.0, 1.0]).unwrap();
        acc.accumulate(1, &[2.0, 2.0, 2.0, 2.0]).unwrap();
        acc.accumulate(2, &[3.0, 3.0, 3.0, 3.0]).unwrap();

        assert_eq!(
            acc.padded_samples(),
            vec![1.0, 1.0, 3.0, 3.0, 5.0, 5.0, 3.0, 3.0]
        );
        assert_eq!(acc.into_samples(), vec![3.0, 3.0, 5.0, 5.0]);
    }

    #[test]
    fn test_periodic_wraps_tail() {
        let acc = OverlapAddAccumulator::new(2, 4, BoundaryMode::Periodic);
        assert_eq!(acc.num_frames(), 2);

        acc.accumulate(0, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        acc.accumulate(1, &[10.0, 20.0, 30.0, 40.0]).unwrap();

        // Frame 1 tail lands on the first block
        assert_eq!(acc.into_samples(), vec![31.0, 42.0, 13.0, 24.0]);
    }

    #[test]
    fn test_accumulate_validates() {
        let acc = OverlapAddAccumulator::new(2, 4, BoundaryMode::ZeroPad);
        assert!(matches!(
            acc.accumulate(0, &[1.0, 2.0]),
            Err(DspError::ShapeMismatch { expected: 4, actual: 2 })
        ));
        assert!(matches!(
            acc.accumulate(3, &[1.0; 4]),
            Err(DspError::OutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_trim_partial_block() {
        let acc = OverlapAddAccumulator::new(4, 3, BoundaryMode::ZeroPad);
        acc.accumulate(0, &[0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 9.0]).unwrap();
        assert_eq!(acc.into_samples(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_concurrent_accumulation_matches_sequential() {
        let block_size = 8;
        let signal_len = 8 * 64;
        let shared = Arc::new(OverlapAddAccumulator::new(
            block_size,
            signal_len,
            BoundaryMode::ZeroPad,
        ));
        let sequential = OverlapAddAccumulator::new(block_size, signal_len, BoundaryMode::ZeroPad);
        let num_frames = shared.num_frames();

        let frame_values = |index: usize| -> Vec<f64> {
            (0..2 * block_size)
                .map(|i| (index * 31 + i) as f64 * 0.125)
                .collect()
        };

        for index in 0..num_frames {
            sequential.accumulate(index, &frame_values(index)).unwrap();
        }

        // Interleave even and odd frames on separate threads, repeated
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let acc = Arc::clone(&shared);
                thread::spawn(move || {
                    for index in (worker % 2..num_frames).step_by(2) {
                        let values: Vec<f64> = (0..2 * block_size)
                            .map(|i| (index * 31 + i) as f64 * 0.125 / 2.0)
                            .collect();
                        acc.accumulate(index, &values).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let concurrent = Arc::try_unwrap(shared).unwrap().into_samples();
        let expected = sequential.into_samples();
        for (a, b) in concurrent.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
