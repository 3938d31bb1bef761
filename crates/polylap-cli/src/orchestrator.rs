//! Command orchestration.

use crate::config::PolylapConfig;
use anyhow::{Context, Result};
use lib_dsp::response::{envelope, frequency_response};
use lib_dsp::window::{generate_window, princen_bradley_error};
use lib_dsp::SignalVectorPipeline;
use lib_types::{CoefficientFrames, Signal};
use ndarray::Array2;
use serde::Serialize;
use std::path::Path;

/// Which matrix the `matrix` command prints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MatrixKind {
    /// Dense analysis matrix, `(N, 2N)`.
    #[default]
    Analysis,
    /// Dense synthesis matrix, `(2N, N)`.
    Synthesis,
    /// Analysis polyphase taps, `(N, 2)`.
    Taps,
}

/// Outcome of an analyze-then-synthesize run.
#[derive(Clone, Debug, Serialize)]
pub struct RoundtripReport {
    pub block_size: usize,
    pub signal_len: usize,
    pub num_frames: usize,
    pub max_error: f64,
    pub rms_error: f64,
    pub perfect_reconstruction_error: f64,
}

/// Window coefficients and their reconstruction diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct WindowReport {
    pub block_size: usize,
    pub coefficients: Vec<f64>,
    pub princen_bradley_error: f64,
    pub perfect_reconstruction_error: f64,
}

/// Runs CLI commands against one configured pipeline.
pub struct Orchestrator {
    config: PolylapConfig,
    pipeline: SignalVectorPipeline,
}

impl Orchestrator {
    /// Build the pipeline described by `config`.
    pub fn new(config: PolylapConfig) -> Result<Self> {
        let pipeline = SignalVectorPipeline::new(&config.transform)
            .context("Failed to build transform")?;

        tracing::info!(
            "Transform ready: N={}, window={:?}, boundary={:?}, mode={:?}",
            config.transform.block_size,
            config.transform.window,
            config.transform.boundary,
            config.transform.mode
        );

        Ok(Self { config, pipeline })
    }

    /// The active configuration.
    pub fn config(&self) -> &PolylapConfig {
        &self.config
    }

    /// Analyze a signal into coefficient frames.
    pub fn analyze(&self, signal: &Signal, parallel: bool) -> Result<CoefficientFrames> {
        let frames = if parallel {
            self.pipeline.analyze_par(signal.as_slice())?
        } else {
            self.pipeline.analyze(signal.as_slice())?.collect_frames()?
        };

        tracing::info!(
            "Analyzed {} samples into {} frames",
            signal.len(),
            frames.num_frames()
        );
        Ok(frames)
    }

    /// Reconstruct a signal from coefficient frames.
    pub fn synthesize(&self, frames: &CoefficientFrames, parallel: bool) -> Result<Signal> {
        let samples = if parallel {
            self.pipeline.synthesize_par(frames)?
        } else {
            self.pipeline.synthesize(frames)?
        };

        tracing::info!(
            "Synthesized {} samples from {} frames",
            samples.len(),
            frames.num_frames()
        );
        Ok(Signal::new(samples, self.config.signal.dt()))
    }

    /// Analyze and resynthesize, reporting the reconstruction error.
    pub fn roundtrip(&self, signal: &Signal, parallel: bool) -> Result<RoundtripReport> {
        let frames = self.analyze(signal, parallel)?;
        let rebuilt = self.synthesize(&frames, parallel)?;

        let rms_error = if signal.is_empty() {
            0.0
        } else {
            let sum_sq: f64 = signal
                .samples
                .iter()
                .zip(rebuilt.samples.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (sum_sq / signal.len() as f64).sqrt()
        };

        Ok(RoundtripReport {
            block_size: self.pipeline.block_size(),
            signal_len: signal.len(),
            num_frames: frames.num_frames(),
            max_error: signal.max_abs_diff(&rebuilt),
            rms_error,
            perfect_reconstruction_error: self
                .pipeline
                .engine()
                .matrix()
                .perfect_reconstruction_error(),
        })
    }

    /// A copy of the requested matrix.
    pub fn matrix(&self, kind: MatrixKind) -> Array2<f64> {
        let matrix = self.pipeline.engine().matrix();
        match kind {
            MatrixKind::Analysis => matrix.analysis().to_owned(),
            MatrixKind::Synthesis => matrix.synthesis().to_owned(),
            MatrixKind::Taps => matrix.analysis_taps().to_owned(),
        }
    }

    /// Frequency response (or envelope) of every analysis band.
    pub fn response(&self, envelope_only: bool) -> Result<Array2<f64>> {
        let matrix = self.pipeline.engine().matrix();
        let analysis = matrix.analysis();
        let response = if envelope_only {
            envelope(&analysis)?
        } else {
            frequency_response(&analysis)?
        };
        Ok(response)
    }

    /// The configured window and its reconstruction diagnostics.
    pub fn window(&self) -> WindowReport {
        let block_size = self.pipeline.block_size();
        let coefficients = generate_window(self.config.transform.window, block_size);
        let princen_bradley_error = princen_bradley_error(&coefficients);

        if princen_bradley_error > 1e-9 {
            tracing::warn!(
                "Window {:?} does not satisfy Princen-Bradley (error {:.3e})",
                self.config.transform.window,
                princen_bradley_error
            );
        }

        WindowReport {
            block_size,
            coefficients,
            princen_bradley_error,
            perfect_reconstruction_error: self
                .pipeline
                .engine()
                .matrix()
                .perfect_reconstruction_error(),
        }
    }
}

/// Read a signal from CSV.
///
/// Each non-empty line holds either a single value or `index,value` (the
/// value is taken from `value_column`). A first line that does not parse
/// as numbers is treated as a header. `#` starts a comment line.
pub fn read_signal_csv(path: &Path, config: &PolylapConfig) -> Result<Signal> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read signal file: {:?}", path))?;
    let samples = parse_signal_csv(&content, config.signal.value_column)
        .with_context(|| format!("Failed to parse signal file: {:?}", path))?;

    tracing::info!("Read {} samples from {:?}", samples.len(), path);
    Ok(Signal::new(samples, config.signal.dt()))
}

fn parse_signal_csv(content: &str, value_column: usize) -> Result<Vec<f64>> {
    let mut samples = Vec::new();
    let mut first_record = true;

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let is_first = std::mem::replace(&mut first_record, false);

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = if fields.len() == 1 {
            fields[0]
        } else {
            fields.get(value_column).copied().with_context(|| {
                format!(
                    "Line {}: no column {} in {:?}",
                    line_no + 1,
                    value_column,
                    line
                )
            })?
        };

        match field.parse::<f64>() {
            Ok(value) => samples.push(value),
            Err(_) if is_first => {
                tracing::debug!("Skipping CSV header: {:?}", line);
            }
            Err(e) => {
                anyhow::bail!("Line {}: invalid sample {:?}: {}", line_no + 1, field, e);
            }
        }
    }

    Ok(samples)
}

/// Read coefficient frames written by the `analyze` command in JSON format.
pub fn read_coefficients(path: &Path) -> Result<CoefficientFrames> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read coefficient file: {:?}", path))?;
    let frames: CoefficientFrames = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse coefficient file: {:?}", path))?;

    tracing::info!(
        "Read {} frames of {} coefficients from {:?}",
        frames.num_frames(),
        frames.block_size(),
        path
    );
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_dsp::WindowType;
    use lib_types::BoundaryMode;
    use std::io::Write;

    fn small_config(block_size: usize) -> PolylapConfig {
        let mut config = PolylapConfig::default();
        config.transform.block_size = block_size;
        config
    }

    #[test]
    fn test_parse_single_column() {
        let samples = parse_signal_csv("1.0\n2.5\n\n-3\n", 1).unwrap();
        assert_eq!(samples, vec![1.0, 2.5, -3.0]);
    }

    #[test]
    fn test_parse_indexed_with_header() {
        let samples = parse_signal_csv("index,value\n0,0.5\n1,0.25\n# note\n2,0.125\n", 1).unwrap();
        assert_eq!(samples, vec![0.5, 0.25, 0.125]);
    }

    #[test]
    fn test_parse_header_after_comments() {
        let content = "# exported by scope\n\n# units: V\nindex,value\n0,1.5\n1,-0.5\n";
        let samples = parse_signal_csv(content, 1).unwrap();
        assert_eq!(samples, vec![1.5, -0.5]);

        // Only the first record may be a header
        assert!(parse_signal_csv("# c\nindex,value\nindex,value\n0,1\n", 1).is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_signal_csv("1.0\nabc\n", 1).is_err());
        assert!(parse_signal_csv("0,1.0\n", 3).is_err());
    }

    #[test]
    fn test_roundtrip_report() {
        let orchestrator = Orchestrator::new(small_config(8)).unwrap();
        let signal = Signal::from_samples((0..50).map(|i| (i as f64 * 0.2).sin()).collect());

        for parallel in [false, true] {
            let report = orchestrator.roundtrip(&signal, parallel).unwrap();
            assert_eq!(report.block_size, 8);
            assert_eq!(report.signal_len, 50);
            assert_eq!(report.num_frames, 8);
            assert!(report.max_error < 1e-9);
            assert!(report.rms_error < 1e-9);
            assert!(report.perfect_reconstruction_error < 1e-9);
        }
    }

    #[test]
    fn test_synthesize_uses_sample_rate() {
        let mut config = small_config(4);
        config.transform.boundary = BoundaryMode::Periodic;
        let orchestrator = Orchestrator::new(config).unwrap();
        let dt = orchestrator.config().signal.dt();
        let signal = Signal::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], dt);

        let frames = orchestrator.analyze(&signal, false).unwrap();
        assert_eq!(frames.num_frames(), 2);

        let rebuilt = orchestrator.synthesize(&frames, false).unwrap();
        assert_eq!(rebuilt.dt, signal.dt);
        assert!(rebuilt.max_abs_diff(&signal) < 1e-9);
    }

    #[test]
    fn test_matrix_kinds() {
        let orchestrator = Orchestrator::new(small_config(8)).unwrap();
        assert_eq!(orchestrator.matrix(MatrixKind::Analysis).dim(), (8, 16));
        assert_eq!(orchestrator.matrix(MatrixKind::Synthesis).dim(), (16, 8));
        assert_eq!(orchestrator.matrix(MatrixKind::Taps).dim(), (8, 2));
    }

    #[test]
    fn test_response_shapes() {
        let orchestrator = Orchestrator::new(small_config(8)).unwrap();
        assert_eq!(orchestrator.response(false).unwrap().dim(), (8, 17));
        assert_eq!(orchestrator.response(true).unwrap().dim(), (8, 16));
    }

    #[test]
    fn test_window_report() {
        let mut config = small_config(16);
        config.transform.window = WindowType::Hann;
        let orchestrator = Orchestrator::new(config).unwrap();

        let report = orchestrator.window();
        assert_eq!(report.coefficients.len(), 32);
        assert!(report.princen_bradley_error > 0.1);
    }

    #[test]
    fn test_coefficient_file_roundtrip() {
        let orchestrator = Orchestrator::new(small_config(4)).unwrap();
        let signal = Signal::from_samples(vec![0.5, -1.0, 2.0, 0.0, 3.0]);
        let frames = orchestrator.analyze(&signal, false).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&frames).unwrap()).unwrap();

        let loaded = read_coefficients(file.path()).unwrap();
        assert_eq!(loaded.signal_len, frames.signal_len);
        assert_eq!(loaded.boundary, frames.boundary);
        assert_eq!(loaded.frames.dim(), frames.frames.dim());
        for (a, b) in loaded.frames.iter().zip(frames.frames.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_read_signal_csv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sample,value").unwrap();
        writeln!(file, "0,1.5").unwrap();
        writeln!(file, "1,-2.5").unwrap();

        let config = PolylapConfig::default();
        let signal = read_signal_csv(file.path(), &config).unwrap();
        assert_eq!(signal.samples, vec![1.5, -2.5]);
        assert_eq!(signal.dt, config.signal.dt());
    }
}
