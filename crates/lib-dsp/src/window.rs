//! Window functions for lapped transforms.
//!
//! A lapped transform with block size `N` weights each `2N`-sample frame
//! with a window before folding. Perfect reconstruction with the same window
//! on both sides requires the Princen-Bradley conditions:
//!
//! ```text
//! w[n]^2 + w[n + N]^2 = 1
//! w[n] * w[N - 1 - n] = w[n + N] * w[2N - 1 - n]
//! ```
//!
//! for `n` in `0..N`. Sine, Vorbis and Kaiser-Bessel-derived windows satisfy
//! both; Hann and rectangular windows do not and are provided for
//! diagnostics.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function types for lapped transforms.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowType {
    /// Sine window, `sin(pi (n + 1/2) / 2N)`.
    Sine,

    /// Vorbis power-complementary window.
    Vorbis,

    /// Kaiser-Bessel-derived window with shape parameter `alpha`.
    /// AAC uses alpha = 4 for long blocks and 6 for short blocks.
    KaiserBessel { alpha: f64 },

    /// Symmetric Hann window. Not power complementary.
    Hann,

    /// Rectangular window of ones. Not power complementary.
    Rectangular,
}

impl Default for WindowType {
    fn default() -> Self {
        Self::Sine
    }
}

impl WindowType {
    /// Whether this family satisfies Princen-Bradley by construction.
    pub fn is_power_complementary(&self) -> bool {
        matches!(self, Self::Sine | Self::Vorbis | Self::KaiserBessel { .. })
    }
}

/// Compute the zeroth-order modified Bessel function of the first kind, I_0(x).
///
/// Power series; converges quickly for the arguments used by KBD windows.
fn bessel_i0(x: f64) -> f64 {
    let quarter_sq = x * x / 4.0;
    let mut sum = 1.0;
    let mut term = 1.0;

    for k in 1..64 {
        term *= quarter_sq / (k * k) as f64;
        sum += term;
        if term < sum * 1e-17 {
            break;
        }
    }

    sum
}

/// Generate window coefficients for a transform block size.
///
/// # Arguments
///
/// * `window_type` - Type of window function to generate
/// * `block_size` - Transform block size `N`
///
/// # Returns
///
/// Vector of window coefficients, length `2 * block_size`.
pub fn generate_window(window_type: WindowType, block_size: usize) -> Vec<f64> {
    let length = 2 * block_size;
    if length == 0 {
        return Vec::new();
    }

    let m = length as f64;

    match window_type {
        WindowType::Sine => (0..length)
            .map(|i| (PI * (i as f64 + 0.5) / m).sin())
            .collect(),

        WindowType::Vorbis => (0..length)
            .map(|i| {
                let s = (PI * (i as f64 + 0.5) / m).sin();
                (0.5 * PI * s * s).sin()
            })
            .collect(),

        WindowType::KaiserBessel { alpha } => kaiser_bessel_derived(alpha, block_size),

        WindowType::Hann => (0..length)
            .map(|i| {
                let x = i as f64 / (m - 1.0);
                0.5 * (1.0 - (2.0 * PI * x).cos())
            })
            .collect(),

        WindowType::Rectangular => vec![1.0; length],
    }
}

/// Kaiser-Bessel-derived window of length `2N`.
///
/// The first half is the normalized running sum of an `N + 1` point Kaiser
/// window, square-rooted; the second half mirrors it.
fn kaiser_bessel_derived(alpha: f64, block_size: usize) -> Vec<f64> {
    let n = block_size;
    let beta = PI * alpha;
    let denom = bessel_i0(beta);

    let kaiser: Vec<f64> = (0..=n)
        .map(|j| {
            let x = 2.0 * j as f64 / n as f64 - 1.0; // Range [-1, 1]
            bessel_i0(beta * (1.0 - x * x).max(0.0).sqrt()) / denom
        })
        .collect();
    let total: f64 = kaiser.iter().sum();

    let mut window = vec![0.0; 2 * n];
    let mut running = 0.0;
    for i in 0..n {
        running += kaiser[i];
        let w = (running / total).sqrt();
        window[i] = w;
        window[2 * n - 1 - i] = w;
    }

    window
}

/// Maximum deviation of an analysis/synthesis window pair from the
/// biorthogonal perfect-reconstruction conditions.
///
/// ```text
/// s[n] a[n] + s[n + N] a[n + N] = 1
/// s[n] a[N - 1 - n] = s[n + N] a[2N - 1 - n]
/// ```
///
/// Returns `f64::INFINITY` if the windows differ in length or have odd length.
pub fn biorthogonal_error(analysis: &[f64], synthesis: &[f64]) -> f64 {
    let len = analysis.len();
    if len != synthesis.len() || len % 2 != 0 {
        return f64::INFINITY;
    }

    let n = len / 2;
    let (a, s) = (analysis, synthesis);

    (0..n)
        .map(|i| {
            let power = (s[i] * a[i] + s[i + n] * a[i + n] - 1.0).abs();
            let alias = (s[i] * a[n - 1 - i] - s[i + n] * a[2 * n - 1 - i]).abs();
            power.max(alias)
        })
        .fold(0.0, f64::max)
}

/// Maximum deviation of a window from the Princen-Bradley conditions.
pub fn princen_bradley_error(window: &[f64]) -> f64 {
    biorthogonal_error(window, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bessel_i0() {
        // I_0(0) = 1
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-15);

        // I_0(1) = 1.2660658777...
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008_4).abs() < 1e-12);

        // I_0(3) = 4.8807925858...
        assert!((bessel_i0(3.0) - 4.880_792_585_865_024).abs() < 1e-10);

        // Symmetry: I_0(-x) = I_0(x)
        assert!((bessel_i0(-2.0) - bessel_i0(2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_window_length() {
        for window_type in [
            WindowType::Sine,
            WindowType::Vorbis,
            WindowType::KaiserBessel { alpha: 4.0 },
            WindowType::Hann,
            WindowType::Rectangular,
        ] {
            assert_eq!(generate_window(window_type, 16).len(), 32);
        }
        assert!(generate_window(WindowType::Sine, 0).is_empty());
    }

    #[test]
    fn test_sine_window_values() {
        let window = generate_window(WindowType::Sine, 4);
        let expected = (PI / 16.0).sin();
        assert!((window[0] - expected).abs() < 1e-15);
        assert!((window[7] - expected).abs() < 1e-15);
    }

    #[test]
    fn test_power_complementary_windows() {
        for window_type in [
            WindowType::Sine,
            WindowType::Vorbis,
            WindowType::KaiserBessel { alpha: 4.0 },
            WindowType::KaiserBessel { alpha: 6.0 },
        ] {
            for block_size in [2, 4, 64, 256] {
                let window = generate_window(window_type, block_size);
                let err = princen_bradley_error(&window);
                assert!(
                    err < 1e-12,
                    "{:?} N={} deviates by {}",
                    window_type,
                    block_size,
                    err
                );
            }
            assert!(window_type.is_power_complementary());
        }
    }

    #[test]
    fn test_hann_and_rectangular_not_power_complementary() {
        let hann = generate_window(WindowType::Hann, 32);
        assert!(princen_bradley_error(&hann) > 1e-3);

        let rect = generate_window(WindowType::Rectangular, 32);
        assert!((princen_bradley_error(&rect) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_symmetry() {
        let window = generate_window(WindowType::KaiserBessel { alpha: 4.0 }, 32);
        for i in 0..32 {
            assert!(
                (window[i] - window[63 - i]).abs() < 1e-15,
                "Asymmetry at index {}: {} vs {}",
                i,
                window[i],
                window[63 - i]
            );
        }
    }

    #[test]
    fn test_biorthogonal_rejects_mismatched_lengths() {
        let a = generate_window(WindowType::Sine, 4);
        let s = generate_window(WindowType::Sine, 8);
        assert!(biorthogonal_error(&a, &s).is_infinite());
        assert!(princen_bradley_error(&[1.0, 0.5, 0.2]).is_infinite());
    }

    #[test]
    fn test_window_type_serde() {
        let kbd: WindowType = serde_json::from_str(r#"{"type":"kaiser_bessel","alpha":4.0}"#).unwrap();
        assert_eq!(kbd, WindowType::KaiserBessel { alpha: 4.0 });
        assert_eq!(WindowType::default(), WindowType::Sine);
    }
}
