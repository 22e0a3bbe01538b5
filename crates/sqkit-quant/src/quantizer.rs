//! Trained scalar quantizer state.
//!
//! A [`ScalarQuantizer`] is two bounds and nothing else: the `[min, max]`
//! interval that training retained. It is `Copy`, immutable and free to share
//! across any number of concurrent transforms.
//!
//! # Example
//!
//! ```
//! use sqkit_quant::ScalarQuantizer;
//!
//! let q = ScalarQuantizer::<f32, i8>::from_bounds(0.0, 30.0).unwrap();
//! assert_eq!(q.quantize_value(10.0), -43);
//! assert!((q.dequantize_value(-43) - 10.0).abs() <= q.max_error() as f32);
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use sqkit_core::{Element, QuantError, QuantInt, QuantResult};

use crate::affine::AffineMap;

/// Global affine quantizer from element type `T` to integer type `Q`.
///
/// Instances come from `train_scalar` or from [`ScalarQuantizer::from_bounds`];
/// a deserialized instance is checked on first use.
#[derive(Serialize, Deserialize)]
pub struct ScalarQuantizer<T, Q> {
    /// Lower bound of the retained interval.
    min: T,
    /// Upper bound of the retained interval.
    max: T,
    #[serde(skip)]
    _quant: PhantomData<fn() -> Q>,
}

// Manual impls: the `Q` marker must not pick up derive bounds.
impl<T: Copy, Q> Clone for ScalarQuantizer<T, Q> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Copy, Q> Copy for ScalarQuantizer<T, Q> {}

impl<T: PartialEq, Q> PartialEq for ScalarQuantizer<T, Q> {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl<T: Element, Q: QuantInt> fmt::Debug for ScalarQuantizer<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarQuantizer")
            .field("element_type", &T::NAME)
            .field("quant_type", &Q::NAME)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

impl<T: Element, Q: QuantInt> ScalarQuantizer<T, Q> {
    pub(crate) const fn trained(min: T, max: T) -> Self {
        Self {
            min,
            max,
            _quant: PhantomData,
        }
    }

    /// Rebuild a quantizer from bounds persisted elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::UntrainedQuantizer` unless both bounds are finite
    /// and `min <= max`.
    pub fn from_bounds(min: T, max: T) -> QuantResult<Self> {
        let quantizer = Self::trained(min, max);
        quantizer.validate()?;
        Ok(quantizer)
    }

    /// Check that this state could have come out of training.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::UntrainedQuantizer` for non-finite bounds or
    /// `min > max`.
    pub fn validate(&self) -> QuantResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(QuantError::UntrainedQuantizer {
                detail: format!(
                    "bounds must be finite, got [{:?}, {:?}]",
                    self.min, self.max
                ),
            });
        }
        if self.min.to_f64() > self.max.to_f64() {
            return Err(QuantError::UntrainedQuantizer {
                detail: format!(
                    "min {:?} exceeds max {:?}",
                    self.min, self.max
                ),
            });
        }
        Ok(())
    }

    /// Lower bound of the retained interval.
    #[must_use]
    pub const fn min(&self) -> T {
        self.min
    }

    /// Upper bound of the retained interval.
    #[must_use]
    pub const fn max(&self) -> T {
        self.max
    }

    /// `true` when training saw a single distinct value in range.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.affine_map().is_degenerate()
    }

    /// Per-element map shared by every transform of this quantizer.
    #[must_use]
    pub fn affine_map(&self) -> AffineMap {
        AffineMap::for_range::<Q>(self.min.to_f64(), self.max.to_f64())
    }

    /// Width of one quantization step, `(max - min) / (Q::MAX - Q::MIN)`.
    #[must_use]
    pub fn step(&self) -> f64 {
        self.affine_map().step()
    }

    /// Worst-case reconstruction error for in-range inputs: half a step.
    #[must_use]
    pub fn max_error(&self) -> f64 {
        self.step() / 2.0
    }

    /// Quantize a single element.
    #[must_use]
    pub fn quantize_value(&self, x: T) -> Q {
        Q::saturating_from_f64(self.affine_map().quantize(x.to_f64()))
    }

    /// Reconstruct a single element.
    #[must_use]
    pub fn dequantize_value(&self, q: Q) -> T {
        T::from_f64(self.affine_map().dequantize(q.to_f64()))
    }

    /// Memory used by the quantizer parameters (in bytes).
    #[must_use]
    pub const fn parameter_bytes(&self) -> usize {
        2 * std::mem::size_of::<T>()
    }
}
