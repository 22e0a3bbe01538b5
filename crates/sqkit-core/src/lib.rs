//! Core types, numeric traits, and error types for the sqkit quantization crates.
//!
//! This crate defines the error type (`QuantError`), training and execution
//! configuration, the numeric capability traits every supported element and
//! quantized type implements, and memory-space tagged matrix views. Every
//! other crate in the workspace depends on it.

pub mod config;
pub mod error;
pub mod matrix;
pub mod numeric;
pub mod tracing_config;

pub use config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_DEVICE_BLOCK_SIZE, DEFAULT_PARALLEL_THRESHOLD, DEFAULT_QUANTILE,
    ExecConfig, QuantizerConfig, parse_switch,
};
pub use error::{QuantError, QuantResult};
pub use matrix::{
    Device, DeviceMatrixView, DeviceMatrixViewMut, Host, HostMatrixView, HostMatrixViewMut,
    Matrix, MatrixView, MatrixViewMut, MemorySpace, element_count,
};
pub use numeric::{Element, QuantInt};

pub use half::{bf16, f16};
