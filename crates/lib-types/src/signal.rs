//! Uniformly sampled real-valued signals.
//!
//! A `Signal` is the unit of exchange between the transform core and its
//! consumers: file readers, plotting front ends and the CLI all hand plain
//! sample vectors across this boundary.
//!
//! # Sample Semantics
//!
//! For a signal with `L` samples, sample `i` is taken at time `i * dt`.
//! `duration()` returns `L * dt`, the span up to one sample past the last.

use crate::units::{Hertz, Seconds};
use serde::{Deserialize, Serialize};

/// A uniformly-sampled real-valued signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Sample values.
    pub samples: Vec<f64>,

    /// Time step between consecutive samples.
    #[serde(default = "default_dt")]
    pub dt: Seconds,
}

fn default_dt() -> Seconds {
    Seconds::UNIT
}

impl Signal {
    /// Create a new signal from samples.
    pub fn new(samples: Vec<f64>, dt: Seconds) -> Self {
        Self { samples, dt }
    }

    /// Create a signal with a unit sample interval.
    pub fn from_samples(samples: Vec<f64>) -> Self {
        Self::new(samples, Seconds::UNIT)
    }

    /// Number of samples in the signal.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the signal is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Borrow the samples.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    /// Total duration of the signal.
    #[inline]
    pub fn duration(&self) -> Seconds {
        Seconds(self.samples.len() as f64 * self.dt.0)
    }

    /// Sample rate (reciprocal of dt).
    #[inline]
    pub fn sample_rate(&self) -> Hertz {
        self.dt.to_frequency()
    }

    /// Maximum absolute value.
    pub fn max_abs(&self) -> f64 {
        self.samples.iter().map(|v| v.abs()).fold(0.0, f64::max)
    }

    /// Peak-to-peak amplitude.
    pub fn peak_to_peak(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let (min, max) = self.samples.iter().fold((f64::MAX, f64::MIN), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
        max - min
    }

    /// Root mean square value.
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|v| v * v).sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }

    /// Largest absolute sample difference against another signal.
    ///
    /// Returns `f64::INFINITY` when the lengths differ.
    pub fn max_abs_diff(&self, other: &Signal) -> f64 {
        if self.samples.len() != other.samples.len() {
            return f64::INFINITY;
        }
        self.samples
            .iter()
            .zip(other.samples.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Zero-pad the signal to a specified length.
    pub fn zero_pad(&mut self, new_len: usize) {
        if new_len > self.samples.len() {
            self.samples.resize(new_len, 0.0);
        }
    }
}

impl From<Vec<f64>> for Signal {
    fn from(samples: Vec<f64>) -> Self {
        Self::from_samples(samples)
    }
}

impl AsRef<[f64]> for Signal {
    fn as_ref(&self) -> &[f64] {
        &self.samples
    }
}
