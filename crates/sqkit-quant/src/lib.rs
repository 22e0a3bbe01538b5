//! Scalar quantization: outlier-robust range training and affine transforms.
//!
//! [`train_scalar`] scans a dataset once and keeps the central `quantile`
//! fraction of its values as a `[min, max]` interval. [`transform`] maps a
//! float matrix onto the full range of a narrow integer type using that
//! interval, and [`inverse_transform`] maps it back.
//!
//! Every operation is generic over the wide element type `T`
//! (`f32`, `f64`, `f16`, `bf16`), the narrow integer type `Q`
//! (`i8`, `u8`, `i16`) and the execution substrate `R`.
//!
//! ```
//! use sqkit_core::{Matrix, QuantizerConfig};
//! use sqkit_exec::HostResources;
//! use sqkit_quant::{ScalarQuantizer, train_scalar, transform};
//!
//! let data = Matrix::from_rows(&[vec![0.0_f32, 10.0], vec![20.0, 30.0]]).unwrap();
//! let host = HostResources::default();
//! let q: ScalarQuantizer<f32, i8> =
//!     train_scalar(&host, &QuantizerConfig::with_quantile(1.0), data.view()).unwrap();
//!
//! let mut codes = Matrix::filled(2, 2, 0_i8).unwrap();
//! transform(&host, &q, data.view(), codes.view_mut()).unwrap();
//! assert_eq!(codes.as_slice(), &[-128, -43, 42, 127]);
//! ```

pub mod affine;
pub mod quantizer;
pub mod train;
pub mod transform;

pub use affine::AffineMap;
pub use quantizer::ScalarQuantizer;
pub use train::{tail_rank, train_scalar};
pub use transform::{inverse_transform, transform};
