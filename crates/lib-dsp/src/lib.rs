//! # lib-dsp
//!
//! Lapped transform engine built on polyphase matrices and strided buffers.
//!
//! This crate provides the numeric core of the MDCT filterbank:
//!
//! - **Windows**: sine, Vorbis and Kaiser-Bessel-derived windows plus Princen-Bradley checks
//! - **Kernels**: DCT-IV, MDCT and time-domain-aliasing fold matrices
//! - **Polyphase**: analysis/synthesis matrix pairs with perfect-reconstruction validation
//! - **Strided Buffers**: zero-copy overlapping frame views and lock-striped overlap-add
//! - **Engine**: dense or FFT-based per-frame forward/inverse transform
//! - **Pipeline**: whole-signal analysis and synthesis, sequential or with Rayon
//! - **Response**: filterbank frequency response and envelope diagnostics

pub mod error;
pub mod window;
pub mod kernel;
pub mod dct;
pub mod strided;
pub mod accumulator;
pub mod polyphase;
pub mod engine;
pub mod pipeline;
pub mod response;

pub use error::{DspError, DspResult};
pub use window::{generate_window, princen_bradley_error, WindowType};
pub use dct::DctIv;
pub use strided::{lap, unlap, StridedBuffer};
pub use accumulator::OverlapAddAccumulator;
pub use polyphase::{PolyphaseMatrix, PolyphaseMatrixBuilder};
pub use engine::{forward, inverse, EngineMode, LappedTransformEngine};
pub use pipeline::{analyze, synthesize, Analysis, CancelToken, SignalVectorPipeline, TransformConfig};
