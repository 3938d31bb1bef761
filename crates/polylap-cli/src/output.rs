//! Result output formatting and writing.

use crate::orchestrator::{RoundtripReport, WindowReport};
use crate::OutputFormat;
use anyhow::{Context, Result};
use lib_types::{CoefficientFrames, Signal};
use ndarray::Array2;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Open `path` for writing, or stdout when no path is given.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

/// Write coefficient frames.
///
/// JSON output can be fed back to the `synthesize` command.
pub fn write_coefficients<W: Write>(
    frames: &CoefficientFrames,
    out: &mut W,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Coefficient Frames")?;
            writeln!(out, "==================")?;
            writeln!(out, "Block Size:  {}", frames.block_size())?;
            writeln!(out, "Frames:      {}", frames.num_frames())?;
            writeln!(out, "Signal Len:  {}", frames.signal_len)?;
            writeln!(out, "Boundary:    {:?}", frames.boundary)?;
            writeln!(out, "Energy:      {:.6}", frames.energy())?;
            writeln!(out)?;
            for (i, frame) in frames.iter().enumerate() {
                let values: Vec<String> = frame.iter().map(|c| format!("{:>12.6}", c)).collect();
                writeln!(out, "[{:>4}] {}", i, values.join(" "))?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(frames)?)?;
        }
        OutputFormat::Csv => {
            let header: Vec<String> = (0..frames.block_size()).map(|k| format!("c{}", k)).collect();
            writeln!(out, "frame,{}", header.join(","))?;
            for (i, frame) in frames.iter().enumerate() {
                let values: Vec<String> = frame.iter().map(|c| c.to_string()).collect();
                writeln!(out, "{},{}", i, values.join(","))?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Write a reconstructed signal.
pub fn write_signal<W: Write>(signal: &Signal, out: &mut W, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Signal")?;
            writeln!(out, "======")?;
            writeln!(out, "Samples:     {}", signal.len())?;
            writeln!(out, "Sample Rate: {:.3} kHz", signal.sample_rate().as_khz())?;
            writeln!(out, "Duration:    {:.3} ms", signal.duration().as_ms())?;
            writeln!(out, "RMS:         {:.6}", signal.rms())?;
            writeln!(out, "Peak:        {:.6}", signal.max_abs())?;
            writeln!(out)?;
            for (i, v) in signal.samples.iter().enumerate() {
                writeln!(out, "{:>8} {:>14.9}", i, v)?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(signal)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "sample,value")?;
            for (i, v) in signal.samples.iter().enumerate() {
                writeln!(out, "{},{}", i, v)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Write a dense matrix, one row per line.
pub fn write_matrix<W: Write>(
    label: &str,
    matrix: &Array2<f64>,
    out: &mut W,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let (rows, cols) = matrix.dim();
            writeln!(out, "{} ({} x {})", label, rows, cols)?;
            for row in matrix.rows() {
                let values: Vec<String> = row.iter().map(|v| format!("{:>10.6}", v)).collect();
                writeln!(out, "{}", values.join(" "))?;
            }
        }
        OutputFormat::Json => {
            let rows: Vec<Vec<f64>> = matrix.rows().into_iter().map(|r| r.to_vec()).collect();
            let json = serde_json::json!({
                "kind": label,
                "shape": [matrix.nrows(), matrix.ncols()],
                "rows": rows,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            for row in matrix.rows() {
                let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                writeln!(out, "{}", values.join(","))?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Write a round-trip report.
pub fn write_roundtrip<W: Write>(
    report: &RoundtripReport,
    out: &mut W,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Round-Trip Reconstruction")?;
            writeln!(out, "=========================")?;
            writeln!(out, "Block Size:  {}", report.block_size)?;
            writeln!(out, "Samples:     {}", report.signal_len)?;
            writeln!(out, "Frames:      {}", report.num_frames)?;
            writeln!(out, "Max Error:   {:.3e}", report.max_error)?;
            writeln!(out, "RMS Error:   {:.3e}", report.rms_error)?;
            writeln!(out, "PR Error:    {:.3e}", report.perfect_reconstruction_error)?;
            writeln!(out)?;
            if report.max_error < 1e-9 {
                writeln!(out, "Status: PASS - perfect reconstruction")?;
            } else {
                writeln!(out, "Status: FAIL - reconstruction error above 1e-9")?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "metric,value")?;
            writeln!(out, "block_size,{}", report.block_size)?;
            writeln!(out, "signal_len,{}", report.signal_len)?;
            writeln!(out, "num_frames,{}", report.num_frames)?;
            writeln!(out, "max_error,{}", report.max_error)?;
            writeln!(out, "rms_error,{}", report.rms_error)?;
            writeln!(out, "perfect_reconstruction_error,{}", report.perfect_reconstruction_error)?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Write window coefficients and diagnostics.
pub fn write_window<W: Write>(report: &WindowReport, out: &mut W, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Window (2N = {})", report.coefficients.len())?;
            writeln!(out, "================")?;
            writeln!(out, "Princen-Bradley Error: {:.3e}", report.princen_bradley_error)?;
            writeln!(out, "PR Error:              {:.3e}", report.perfect_reconstruction_error)?;
            writeln!(out)?;
            for (i, w) in report.coefficients.iter().enumerate() {
                writeln!(out, "{:>6} {:.9}", i, w)?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "index,value")?;
            for (i, w) in report.coefficients.iter().enumerate() {
                writeln!(out, "{},{}", i, w)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::{BoundaryMode, Hertz};

    fn frames() -> CoefficientFrames {
        CoefficientFrames::from_rows(
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            2,
            3,
            BoundaryMode::ZeroPad,
        )
        .unwrap()
    }

    #[test]
    fn test_coefficients_csv() {
        let mut out = Vec::new();
        write_coefficients(&frames(), &mut out, OutputFormat::Csv).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "frame,c0,c1\n0,1,2\n1,3,4\n2,5,6\n");
    }

    #[test]
    fn test_coefficients_json_is_readable() {
        let mut out = Vec::new();
        write_coefficients(&frames(), &mut out, OutputFormat::Json).unwrap();
        let parsed: CoefficientFrames = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, frames());
    }

    #[test]
    fn test_signal_csv() {
        let mut out = Vec::new();
        write_signal(&Signal::from_samples(vec![0.5, -1.0]), &mut out, OutputFormat::Csv).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "sample,value\n0,0.5\n1,-1\n");
    }

    #[test]
    fn test_signal_text_header() {
        let signal = Signal::new(vec![0.0; 48], Hertz(48_000.0).to_period());
        let mut out = Vec::new();
        write_signal(&signal, &mut out, OutputFormat::Text).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Sample Rate: 48.000 kHz"));
        assert!(text.contains("Duration:    1.000 ms"));
    }

    #[test]
    fn test_matrix_text_header() {
        let matrix = Array2::from_elem((2, 3), 0.5);
        let mut out = Vec::new();
        write_matrix("analysis", &matrix, &mut out, OutputFormat::Text).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("analysis (2 x 3)\n"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_roundtrip_text_status() {
        let report = RoundtripReport {
            block_size: 4,
            signal_len: 8,
            num_frames: 3,
            max_error: 1e-15,
            rms_error: 1e-16,
            perfect_reconstruction_error: 1e-16,
        };
        let mut out = Vec::new();
        write_roundtrip(&report, &mut out, OutputFormat::Text).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Status: PASS"));
    }
}
