//! Physical units with type safety.
//!
//! These newtypes keep sample intervals and frequencies apart so a
//! sample rate is never passed where a period is expected.

use serde::{Deserialize, Serialize};

/// Time duration in seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(pub f64);

impl Seconds {
    /// Unit interval, used when a signal carries no timing information.
    pub const UNIT: Self = Self(1.0);

    #[inline]
    pub fn as_ms(&self) -> f64 {
        self.0 * 1e3
    }

    /// Convert to frequency (reciprocal).
    #[inline]
    pub fn to_frequency(&self) -> Hertz {
        Hertz(1.0 / self.0)
    }
}

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    #[inline]
    pub fn as_khz(&self) -> f64 {
        self.0 * 1e-3
    }

    /// Convert to period (reciprocal).
    #[inline]
    pub fn to_period(&self) -> Seconds {
        Seconds(1.0 / self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_frequency_reciprocal() {
        let rate = Hertz(48_000.0);
        let dt = rate.to_period();
        assert!((dt.to_frequency().0 - 48_000.0).abs() < 1e-6);
        assert!((rate.as_khz() - 48.0).abs() < 1e-12);
        assert!((dt.as_ms() - 1.0 / 48.0).abs() < 1e-12);
    }
}
