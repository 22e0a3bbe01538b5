//! Numeric capability traits for wide element types and narrow quantized types.
//!
//! The quantization algorithm is written once against [`Element`] (the wide
//! floating-point type being compressed) and [`QuantInt`] (the narrow integer
//! type it is compressed into). Each supported `(Element, QuantInt)` pair is a
//! separate static instantiation; nothing dispatches on type at run time.
//!
//! Wide types: `f32`, `f64`, `half::f16`, `half::bf16`.
//! Narrow types: `i8` (`[-128, 127]`), `u8` (`[0, 255]`), `i16` (`[-32768, 32767]`).

use std::fmt;

use half::{bf16, f16};

/// A wide floating-point element type that can be trained on and quantized.
///
/// Besides lossless widening to `f64` for the affine arithmetic, every element
/// exposes an *order key*: an unsigned integer whose natural ordering matches
/// the total ordering of the float values (`-inf < ... < -0.0 < +0.0 < ... < +inf`).
/// Exact rank selection runs on these keys, one 8-bit digit at a time.
pub trait Element: Copy + Send + Sync + PartialOrd + fmt::Debug + 'static {
    /// Human-readable type name used in tracing fields.
    const NAME: &'static str;

    /// Number of significant bits in [`Element::order_key`].
    const KEY_BITS: u32;

    /// Widen to `f64`. Exact for every supported type.
    fn to_f64(self) -> f64;

    /// Narrow from `f64`, rounding to the nearest representable value.
    fn from_f64(value: f64) -> Self;

    /// `false` for NaN and infinities.
    fn is_finite(self) -> bool;

    /// Order-preserving unsigned key occupying the low [`Element::KEY_BITS`] bits.
    fn order_key(self) -> u64;

    /// Inverse of [`Element::order_key`].
    fn from_order_key(key: u64) -> Self;
}

/// A narrow integer type that quantized values are stored in.
pub trait QuantInt: Copy + Send + Sync + PartialEq + fmt::Debug + 'static {
    /// Human-readable type name used in tracing fields.
    const NAME: &'static str;

    /// Smallest representable value.
    const MIN: Self;

    /// Largest representable value.
    const MAX: Self;

    /// Widen to `f64`. Exact for every supported type.
    fn to_f64(self) -> f64;

    /// Convert an already rounded `f64`, saturating at the type bounds.
    ///
    /// NaN converts to zero; callers are expected to route NaN elsewhere.
    fn saturating_from_f64(value: f64) -> Self;

    /// `MIN` as `f64`.
    #[must_use]
    fn min_f64() -> f64 {
        Self::MIN.to_f64()
    }

    /// `MAX` as `f64`.
    #[must_use]
    fn max_f64() -> f64 {
        Self::MAX.to_f64()
    }

    /// Number of quantization intervals, `MAX - MIN`.
    #[must_use]
    fn span() -> f64 {
        Self::max_f64() - Self::min_f64()
    }

    /// Midpoint of the representable range, rounded up: `0` for `i8`, `128` for `u8`.
    #[must_use]
    fn midpoint_f64() -> f64 {
        Self::min_f64() + (Self::span() / 2.0).ceil()
    }
}

const fn encode_key(bits: u64, sign_mask: u64, full_mask: u64) -> u64 {
    if bits & sign_mask == 0 {
        bits | sign_mask
    } else {
        !bits & full_mask
    }
}

const fn decode_key(key: u64, sign_mask: u64, full_mask: u64) -> u64 {
    if key & sign_mask == 0 {
        !key & full_mask
    } else {
        key & !sign_mask
    }
}

impl Element for f32 {
    const NAME: &'static str = "f32";
    const KEY_BITS: u32 = 32;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(value: f64) -> Self {
        value as Self
    }

    fn is_finite(self) -> bool {
        Self::is_finite(self)
    }

    fn order_key(self) -> u64 {
        encode_key(u64::from(self.to_bits()), 1 << 31, u64::from(u32::MAX))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_order_key(key: u64) -> Self {
        Self::from_bits(decode_key(key, 1 << 31, u64::from(u32::MAX)) as u32)
    }
}

impl Element for f64 {
    const NAME: &'static str = "f64";
    const KEY_BITS: u32 = 64;

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn is_finite(self) -> bool {
        Self::is_finite(self)
    }

    fn order_key(self) -> u64 {
        encode_key(self.to_bits(), 1 << 63, u64::MAX)
    }

    fn from_order_key(key: u64) -> Self {
        Self::from_bits(decode_key(key, 1 << 63, u64::MAX))
    }
}

impl Element for f16 {
    const NAME: &'static str = "f16";
    const KEY_BITS: u32 = 16;

    fn to_f64(self) -> f64 {
        Self::to_f64(self)
    }

    fn from_f64(value: f64) -> Self {
        Self::from_f64(value)
    }

    fn is_finite(self) -> bool {
        Self::is_finite(self)
    }

    fn order_key(self) -> u64 {
        encode_key(u64::from(self.to_bits()), 1 << 15, u64::from(u16::MAX))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_order_key(key: u64) -> Self {
        Self::from_bits(decode_key(key, 1 << 15, u64::from(u16::MAX)) as u16)
    }
}

impl Element for bf16 {
    const NAME: &'static str = "bf16";
    const KEY_BITS: u32 = 16;

    fn to_f64(self) -> f64 {
        Self::to_f64(self)
    }

    fn from_f64(value: f64) -> Self {
        Self::from_f64(value)
    }

    fn is_finite(self) -> bool {
        Self::is_finite(self)
    }

    fn order_key(self) -> u64 {
        encode_key(u64::from(self.to_bits()), 1 << 15, u64::from(u16::MAX))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_order_key(key: u64) -> Self {
        Self::from_bits(decode_key(key, 1 << 15, u64::from(u16::MAX)) as u16)
    }
}

macro_rules! impl_quant_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl QuantInt for $ty {
                const NAME: &'static str = $name;
                const MIN: Self = <$ty>::MIN;
                const MAX: Self = <$ty>::MAX;

                fn to_f64(self) -> f64 {
                    f64::from(self)
                }

                // Float-to-int `as` casts saturate and send NaN to zero.
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn saturating_from_f64(value: f64) -> Self {
                    value as Self
                }
            }
        )*
    };
}

impl_quant_int!(i8 => "i8", u8 => "u8", i16 => "i16");
