//! Transform configuration loading and validation.

use anyhow::{Context, Result};
use lib_dsp::{TransformConfig, WindowType};
use lib_types::units::{Hertz, Seconds};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level CLI configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolylapConfig {
    /// Transform parameters.
    #[serde(default)]
    pub transform: TransformConfig,

    /// Input signal parameters.
    #[serde(default)]
    pub signal: SignalConfig,
}

/// How input signals are interpreted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Sample rate of CSV input.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: Hertz,

    /// Column holding the sample values when rows are `index,value`.
    #[serde(default = "default_value_column")]
    pub value_column: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            value_column: default_value_column(),
        }
    }
}

fn default_sample_rate() -> Hertz {
    Hertz(48_000.0)
}

fn default_value_column() -> usize {
    1
}

impl SignalConfig {
    /// Sample interval implied by the sample rate.
    pub fn dt(&self) -> Seconds {
        self.sample_rate.to_period()
    }
}

/// Load configuration from a file, or defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<PolylapConfig> {
    let Some(path) = path else {
        let config = PolylapConfig::default();
        validate_config(&config)?;
        return Ok(config);
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: PolylapConfig = if path.extension().map_or(false, |e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| "Failed to parse config as JSON")?
    } else {
        // Assume TOML
        toml::from_str(&content)
            .with_context(|| "Failed to parse config as TOML")?
    };

    validate_config(&config)?;

    tracing::debug!("Loaded configuration: {:?}", config);

    Ok(config)
}

/// Validate configuration.
pub fn validate_config(config: &PolylapConfig) -> Result<()> {
    let transform = &config.transform;

    if transform.block_size < 2 || transform.block_size % 2 != 0 {
        anyhow::bail!(
            "Invalid block size: {}. Must be a positive even number",
            transform.block_size
        );
    }

    if let WindowType::KaiserBessel { alpha } = transform.window {
        if !(alpha.is_finite() && alpha > 0.0) {
            anyhow::bail!("Kaiser-Bessel alpha must be positive (got {})", alpha);
        }
    }

    if let Some(tolerance) = transform.validate {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            anyhow::bail!(
                "Validation tolerance must be positive (got {})",
                tolerance
            );
        }
    }

    if transform.parallel_threshold == 0 {
        anyhow::bail!("parallel_threshold must be at least 1");
    }

    let rate = config.signal.sample_rate.0;
    if !(rate.is_finite() && rate > 0.0) {
        anyhow::bail!("Sample rate must be positive (got {} Hz)", rate);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_dsp::EngineMode;
    use lib_types::BoundaryMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config, PolylapConfig::default());
        assert_eq!(config.transform.block_size, 256);
        assert!((config.signal.dt().0 - 1.0 / 48_000.0).abs() < 1e-15);
    }

    #[test]
    fn test_load_toml() {
        let file = write_temp(
            ".toml",
            r#"
[transform]
block_size = 64
boundary = "periodic"
mode = "dense"
validate = 1e-9

[transform.window]
type = "kaiser_bessel"
alpha = 4.0

[signal]
sample_rate = 44100.0
"#,
        );

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.transform.block_size, 64);
        assert_eq!(config.transform.boundary, BoundaryMode::Periodic);
        assert_eq!(config.transform.mode, EngineMode::Dense);
        assert_eq!(config.transform.validate, Some(1e-9));
        assert_eq!(config.transform.window, WindowType::KaiserBessel { alpha: 4.0 });
        assert_eq!(config.signal.sample_rate, Hertz(44_100.0));
        assert_eq!(config.signal.value_column, 1);
    }

    #[test]
    fn test_load_json() {
        let file = write_temp(
            ".json",
            r#"{"transform": {"block_size": 16, "window": {"type": "vorbis"}}}"#,
        );

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.transform.block_size, 16);
        assert_eq!(config.transform.window, WindowType::Vorbis);
        assert_eq!(config.signal, SignalConfig::default());
    }

    #[test]
    fn test_rejects_odd_block_size() {
        let file = write_temp(".toml", "[transform]\nblock_size = 15\n");
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Invalid block size"));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = PolylapConfig::default();
        config.transform.validate = Some(-1.0);
        assert!(validate_config(&config).is_err());

        let mut config = PolylapConfig::default();
        config.transform.window = WindowType::KaiserBessel { alpha: 0.0 };
        assert!(validate_config(&config).is_err());

        let mut config = PolylapConfig::default();
        config.signal.sample_rate = Hertz(0.0);
        assert!(validate_config(&config).is_err());

        let mut config = PolylapConfig::default();
        config.transform.parallel_threshold = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/polylap.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_temp(".toml", "[transform\nblock_size = ");
        assert!(load_config(Some(file.path())).is_err());
    }
}
