//! # sqkit
//!
//! Scalar quantization for vector search: compress wide floating-point
//! feature matrices into narrow integers with one global affine map.
//!
//! Training picks a robust value range by discarding a configurable fraction
//! of extreme values from each tail, using exact order statistics (no
//! sampling). Transforms map every element onto the full range of the target
//! integer type and back. Both run unchanged on the host substrate and on the
//! device substrate, with bit-identical results.
//!
//! # Quick Start
//!
//! ```
//! use sqkit::prelude::*;
//!
//! let data = Matrix::from_rows(&[vec![0.0_f32, 10.0], vec![20.0, 30.0]]).unwrap();
//!
//! let pipeline = HostPipeline::new(QuantizerConfig::with_quantile(1.0));
//! let (quantizer, codes) = pipeline.fit_transform::<f32, i8>(data.view()).unwrap();
//! assert_eq!(codes.as_slice(), &[-128, -43, 42, 127]);
//!
//! let restored = pipeline.reconstruct(&quantizer, codes.view()).unwrap();
//! for (x, y) in data.as_slice().iter().zip(restored.as_slice()) {
//!     assert!(f64::from((x - y).abs()) <= quantizer.step());
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//!  dataset ─► RadixSelector (exact rank k, N-1-k) ─► ScalarQuantizer [min, max]
//!                                                          │
//!                                                      AffineMap
//!                                                          │
//!  float matrix ─► transform ─► integer codes ─► inverse_transform ─► float matrix
//! ```
//!
//! ## Crate Layout
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | [`sqkit-core`](core) | Errors, config, tracing conventions, numeric traits, matrix views |
//! | [`sqkit-exec`](exec) | `ExecutionResource`, host and device substrates, radix select |
//! | [`sqkit-quant`](quant) | `ScalarQuantizer`, `train_scalar`, `transform`, `inverse_transform` |
//!
//! ## Type Support
//!
//! | Element (`T`) | Quantized (`Q`) |
//! |---------------|-----------------|
//! | `f32`, `f64`, `f16`, `bf16` | `i8`, `u8`, `i16` |
//!
//! Every pair is its own static instantiation.
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `SQKIT_QUANTILE` | Default training quantile |
//! | `SQKIT_PARALLEL` | `0`/`false`/`no`/`off` keeps host work on the caller thread |
//! | `SQKIT_PARALLEL_THRESHOLD` | Host element count that enables Rayon |
//! | `SQKIT_CHUNK_SIZE` | Host elements per Rayon task |
//! | `SQKIT_DEVICE_THREADS` | Device worker count (`0` = available parallelism) |
//! | `SQKIT_LOG` / `RUST_LOG` / `SQKIT_LOG_LEVEL` | Filter for [`init_tracing`] |

// ─── Sub-crate module aliases (advanced access) ─────────────────────────────

/// Errors, configuration, numeric traits and matrix views.
pub use sqkit_core as core;
/// Execution substrates and exact rank selection.
pub use sqkit_exec as exec;
/// Range training and affine transforms.
pub use sqkit_quant as quant;

// ─── Core types ─────────────────────────────────────────────────────────────

// Error types
pub use sqkit_core::error::{QuantError, QuantResult};

// Configuration
pub use sqkit_core::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_DEVICE_BLOCK_SIZE, DEFAULT_PARALLEL_THRESHOLD, DEFAULT_QUANTILE,
    ExecConfig, QuantizerConfig,
};

// Numeric capability traits and half-precision types
pub use sqkit_core::numeric::{Element, QuantInt};
pub use sqkit_core::{bf16, f16};

// Matrices and memory spaces
pub use sqkit_core::matrix::{
    Device, DeviceMatrixView, DeviceMatrixViewMut, Host, HostMatrixView, HostMatrixViewMut,
    Matrix, MatrixView, MatrixViewMut, MemorySpace,
};

// Tracing
pub use sqkit_core::tracing_config::init_tracing;

// ─── Execution substrates ───────────────────────────────────────────────────

pub use sqkit_exec::{
    DeviceMatrix, DeviceResources, ExecutionResource, HostResources, RadixSelector, Substrate,
};

// ─── Quantization ───────────────────────────────────────────────────────────

pub use sqkit_quant::{
    AffineMap, ScalarQuantizer, inverse_transform, tail_rank, train_scalar, transform,
};

// ─── Host pipeline convenience API ──────────────────────────────────────────

mod pipeline;
pub use pipeline::HostPipeline;

// ─── Prelude ────────────────────────────────────────────────────────────────

/// Convenience re-exports for common usage.
///
/// ```
/// use sqkit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        DeviceResources, Element, ExecConfig, ExecutionResource, HostPipeline, HostResources,
        Matrix, MatrixView, MatrixViewMut, QuantError, QuantInt, QuantResult, QuantizerConfig,
        ScalarQuantizer, inverse_transform, train_scalar, transform,
    };
}
