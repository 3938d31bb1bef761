//! polylap CLI: MDCT lapped transforms via polyphase matrices.
//!
//! This is the main entry point for the polylap command-line tool.

mod config;
mod orchestrator;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use orchestrator::{MatrixKind, Orchestrator};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "polylap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a signal into MDCT coefficient frames
    Analyze {
        /// Path to the signal CSV
        input: PathBuf,

        /// Path to the transform configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Process frames in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Reconstruct a signal from coefficient frames (JSON from `analyze`)
    Synthesize {
        /// Path to the coefficient JSON file
        coefficients: PathBuf,

        /// Path to the transform configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Process frames in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Analyze and resynthesize a signal, reporting reconstruction error
    Roundtrip {
        /// Path to the signal CSV
        input: PathBuf,

        /// Path to the transform configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Process frames in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Print a transform matrix
    Matrix {
        /// Path to the transform configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Which matrix to print
        #[arg(long, value_enum, default_value = "analysis")]
        kind: MatrixKind,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute the filterbank frequency response of the analysis matrix
    Response {
        /// Path to the transform configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output the band envelopes instead of the frequency response
        #[arg(long)]
        envelope: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the window and its Princen-Bradley error
    Window {
        /// Path to the transform configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Analyze { input, config, output, parallel } => {
            run_analyze(&input, config.as_deref(), output.as_deref(), parallel, cli.format)?;
        }
        Commands::Synthesize { coefficients, config, output, parallel } => {
            run_synthesize(&coefficients, config.as_deref(), output.as_deref(), parallel, cli.format)?;
        }
        Commands::Roundtrip { input, config, parallel } => {
            run_roundtrip(&input, config.as_deref(), parallel, cli.format)?;
        }
        Commands::Matrix { config, kind, output } => {
            run_matrix(config.as_deref(), kind, output.as_deref(), cli.format)?;
        }
        Commands::Response { config, envelope, output } => {
            run_response(config.as_deref(), envelope, output.as_deref(), cli.format)?;
        }
        Commands::Window { config } => {
            run_window(config.as_deref(), cli.format)?;
        }
    }

    Ok(())
}

fn run_analyze(
    input: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
    parallel: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = config::load_config(config_path)?;
    let signal = orchestrator::read_signal_csv(input, &config)?;
    let orchestrator = Orchestrator::new(config)?;
    tracing::debug!(
        "Input sample rate: {} Hz",
        orchestrator.config().signal.sample_rate.0
    );

    let frames = orchestrator.analyze(&signal, parallel)?;

    let mut out = output::open_output(output)?;
    output::write_coefficients(&frames, &mut out, format)?;

    if let Some(path) = output {
        tracing::info!("Wrote coefficients to {:?}", path);
    }
    Ok(())
}

fn run_synthesize(
    coefficients: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
    parallel: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut config = config::load_config(config_path)?;
    let frames = orchestrator::read_coefficients(coefficients)?;

    // Block size travels with the coefficients
    if config.transform.block_size != frames.block_size() {
        tracing::info!(
            "Using block size {} from coefficient file (config had {})",
            frames.block_size(),
            config.transform.block_size
        );
        config.transform.block_size = frames.block_size();
        config::validate_config(&config)?;
    }

    let orchestrator = Orchestrator::new(config)?;
    let signal = orchestrator.synthesize(&frames, parallel)?;

    let mut out = output::open_output(output)?;
    output::write_signal(&signal, &mut out, format)?;

    if let Some(path) = output {
        tracing::info!("Wrote signal to {:?}", path);
    }
    Ok(())
}

fn run_roundtrip(
    input: &Path,
    config_path: Option<&Path>,
    parallel: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = config::load_config(config_path)?;
    let signal = orchestrator::read_signal_csv(input, &config)?;
    let orchestrator = Orchestrator::new(config)?;

    let report = orchestrator.roundtrip(&signal, parallel)?;
    if report.max_error >= 1e-9 {
        tracing::warn!("Reconstruction error {:.3e} exceeds 1e-9", report.max_error);
    }

    let mut out = output::open_output(None)?;
    output::write_roundtrip(&report, &mut out, format)
}

fn run_matrix(
    config_path: Option<&Path>,
    kind: MatrixKind,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let orchestrator = Orchestrator::new(config::load_config(config_path)?)?;
    let matrix = orchestrator.matrix(kind);
    let label = match kind {
        MatrixKind::Analysis => "analysis",
        MatrixKind::Synthesis => "synthesis",
        MatrixKind::Taps => "taps",
    };

    let mut out = output::open_output(output)?;
    output::write_matrix(label, &matrix, &mut out, format)?;

    if let Some(path) = output {
        tracing::info!("Wrote {} matrix to {:?}", label, path);
    }
    Ok(())
}

fn run_response(
    config_path: Option<&Path>,
    envelope: bool,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let orchestrator = Orchestrator::new(config::load_config(config_path)?)?;
    let response = orchestrator.response(envelope)?;
    let label = if envelope { "envelope" } else { "frequency_response" };

    let mut out = output::open_output(output)?;
    output::write_matrix(label, &response, &mut out, format)?;

    if let Some(path) = output {
        tracing::info!("Wrote {} to {:?}", label, path);
    }
    Ok(())
}

fn run_window(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let orchestrator = Orchestrator::new(config::load_config(config_path)?)?;
    let report = orchestrator.window();

    let mut out = output::open_output(None)?;
    output::write_window(&report, &mut out, format)
}
