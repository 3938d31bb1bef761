//! Strided, overlapping frame views over a sample buffer.
//!
//! A lapped transform with block size `N` reads `2N`-sample frames that
//! advance by `N`. Instead of copying every frame, the signal is copied once
//! into a padded buffer and each frame is a borrowed `&[f64]` window into
//! it, so every sample is shared by the two frames that overlap it.
//!
//! Padding follows [`BoundaryMode`]:
//!
//! ```text
//! ZeroPad:   [0; N] signal [0; pad] [0; N]        frames = blocks + 1
//! Periodic:  signal [0; pad] signal[..N]          frames = blocks
//! ```

use crate::accumulator::OverlapAddAccumulator;
use crate::error::{check_block_size, DspError, DspResult};
use lib_types::BoundaryMode;
use std::iter::StepBy;
use std::slice::Windows;

/// Overlapping `2N` frames over a padded copy of a signal.
#[derive(Clone, Debug)]
pub struct StridedBuffer {
    /// Padded samples the frames borrow from.
    padded: Vec<f64>,

    /// Block size `N` (frame stride).
    block_size: usize,

    /// Original signal length.
    signal_len: usize,

    /// Edge policy.
    boundary: BoundaryMode,
}

impl StridedBuffer {
    /// Copy `signal` into a padded buffer for block size `block_size`.
    pub fn new(signal: &[f64], block_size: usize, boundary: BoundaryMode) -> DspResult<Self> {
        check_block_size(block_size)?;

        let n = block_size;
        let signal_len = signal.len();
        let padded_len = boundary.padded_len(signal_len, n);
        let lead = boundary.lead(n);

        let mut padded = vec![0.0; padded_len];
        padded[lead..lead + signal_len].copy_from_slice(signal);

        if boundary == BoundaryMode::Periodic {
            // Circular extension: the last frame wraps onto the first block
            let period = padded_len - n;
            let (body, tail) = padded.split_at_mut(period);
            tail.copy_from_slice(&body[..n]);
        }

        Ok(Self {
            padded,
            block_size,
            signal_len,
            boundary,
        })
    }

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

    /// Original signal length.
    #[inline]
    pub fn signal_len(&self) -> usize {
        self.signal_len
    }

    /// Edge policy.
    #[inline]
    pub fn boundary(&self) -> BoundaryMode {
        self.boundary
    }

    /// Number of frames.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.boundary.num_frames(self.signal_len, self.block_size)
    }

    /// Read-only view of frame `index`, starting at padded sample `index * N`.
    pub fn frame_at(&self, index: usize) -> DspResult<&[f64]> {
        let len = self.num_frames();
        if index >= len {
            return Err(DspError::OutOfRange { index, len });
        }
        let start = index * self.block_size;
        Ok(&self.padded[start..start + self.frame_len()])
    }

    /// Iterate over all frames in order.
    ///
    /// The iterator borrows the buffer; calling `frames()` again restarts it.
    pub fn frames(&self) -> StepBy<Windows<'_, f64>> {
        self.padded
            .windows(self.frame_len())
            .step_by(self.block_size)
    }

    /// An empty overlap-add accumulator with this buffer's geometry.
    pub fn accumulator(&self) -> OverlapAddAccumulator {
        OverlapAddAccumulator::new(self.block_size, self.signal_len, self.boundary)
    }
}

/// Lapped view over a block-framed buffer.
///
/// `blocks` holds consecutive `n`-sample blocks; each yielded view spans two
/// neighbouring blocks, so `k` blocks give `k - 1` frames of `2n` samples.
/// A trailing partial block is ignored.
pub fn lap(blocks: &[f64], n: usize) -> impl Iterator<Item = &[f64]> + Clone + '_ {
    let whole = if n == 0 { 0 } else { blocks.len() / n * n };
    let frame_len = 2 * n.max(1);
    blocks[..whole].windows(frame_len).step_by(n.max(1))
}

/// Recover the unique samples from lapped `2n` frames.
///
/// Inverse of [`lap`]: takes the first `n` samples of every frame and the
/// second half of the last frame.
pub fn unlap<'a, I>(frames: I, n: usize) -> DspResult<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut samples = Vec::new();
    let mut last: Option<&[f64]> = None;

    for frame in frames {
        if frame.len() != 2 * n {
            return Err(DspError::ShapeMismatch {
                expected: 2 * n,
                actual: frame.len(),
            });
        }
        samples.extend_from_slice(&frame[..n]);
        last = Some(frame);
    }

    if let Some(frame) = last {
        samples.extend_from_slice(&frame[n..]);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pad_frames() {
        let signal = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let buffer = StridedBuffer::new(&signal, 4, BoundaryMode::ZeroPad).unwrap();

        assert_eq!(buffer.num_frames(), 3);
        assert_eq!(buffer.frame_at(0).unwrap(), &[0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.frame_at(1).unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(buffer.frame_at(2).unwrap(), &[5.0, 6.0, 7.0, 8.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_periodic_frames_wrap() {
        let signal = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let buffer = StridedBuffer::new(&signal, 4, BoundaryMode::Periodic).unwrap();

        assert_eq!(buffer.num_frames(), 2);
        assert_eq!(buffer.frame_at(1).unwrap(), &[5.0, 6.0, 7.0, 8.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_partial_block_zero_padded() {
        let signal = [1.0, 2.0, 3.0];
        let buffer = StridedBuffer::new(&signal, 4, BoundaryMode::ZeroPad).unwrap();

        assert_eq!(buffer.num_frames(), 2);
        assert_eq!(buffer.frame_at(1).unwrap(), &[1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_frames_iterator_matches_frame_at() {
        let signal: Vec<f64> = (0..37).map(|i| i as f64).collect();
        let buffer = StridedBuffer::new(&signal, 8, BoundaryMode::ZeroPad).unwrap();

        let frames: Vec<&[f64]> = buffer.frames().collect();
        assert_eq!(frames.len(), buffer.num_frames());
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(*frame, buffer.frame_at(i).unwrap());
        }

        // Restartable
        assert_eq!(buffer.frames().count(), frames.len());
    }

    #[test]
    fn test_frames_share_memory() {
        let signal = [1.0, 2.0, 3.0, 4.0];
        let buffer = StridedBuffer::new(&signal, 2, BoundaryMode::ZeroPad).unwrap();

        let a = buffer.frame_at(0).unwrap();
        let b = buffer.frame_at(1).unwrap();
        // Second half of frame 0 is the same memory as the first half of frame 1
        assert!(std::ptr::eq(&a[2], &b[0]));
    }

    #[test]
    fn test_frame_out_of_range() {
        let buffer = StridedBuffer::new(&[1.0; 8], 4, BoundaryMode::ZeroPad).unwrap();
        assert!(matches!(
            buffer.frame_at(3),
            Err(DspError::OutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_invalid_block_size() {
        assert!(matches!(
            StridedBuffer::new(&[1.0; 8], 3, BoundaryMode::ZeroPad),
            Err(DspError::InvalidBlockSize(3))
        ));
        assert!(matches!(
            StridedBuffer::new(&[1.0; 8], 0, BoundaryMode::ZeroPad),
            Err(DspError::InvalidBlockSize(0))
        ));
    }

    #[test]
    fn test_accumulator_covers_every_sample_twice() {
        let signal: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        for boundary in [BoundaryMode::ZeroPad, BoundaryMode::Periodic] {
            let buffer = StridedBuffer::new(&signal, 4, boundary).unwrap();
            let acc = buffer.accumulator();
            assert_eq!(acc.num_frames(), buffer.num_frames());

            for (i, frame) in buffer.frames().enumerate() {
                acc.accumulate(i, frame).unwrap();
            }

            let doubled: Vec<f64> = signal.iter().map(|x| 2.0 * x).collect();
            assert_eq!(acc.into_samples(), doubled, "{:?}", boundary);
        }
    }

    #[test]
    fn test_lap_unlap_roundtrip() {
        let blocks: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let frames: Vec<&[f64]> = lap(&blocks, 3).collect();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

        let flat = unlap(frames, 3).unwrap();
        assert_eq!(flat, blocks);
    }

    #[test]
    fn test_unlap_rejects_bad_frame() {
        let frames: Vec<&[f64]> = vec![&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0]];
        assert!(matches!(
            unlap(frames, 2),
            Err(DspError::ShapeMismatch { expected: 4, actual: 2 })
        ));
    }
}
