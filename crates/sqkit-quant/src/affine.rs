//! The per-element affine map between a trained float range and an integer range.
//!
//! Both substrates and both directions go through [`AffineMap`]; it is
//! computed once per call from the quantizer bounds and then copied into
//! every worker.

use sqkit_core::QuantInt;

/// Linear map between `[min, max]` and `[lo, hi]`.
///
/// All arithmetic runs in `f64`, which represents every supported element
/// and integer value exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    min: f64,
    max: f64,
    lo: f64,
    hi: f64,
    width: f64,
    midpoint: f64,
}

impl AffineMap {
    /// Map between `[min, max]` and the full range of `Q`.
    ///
    /// Callers pass finite bounds with `min <= max`.
    #[must_use]
    pub fn for_range<Q: QuantInt>(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            lo: Q::min_f64(),
            hi: Q::max_f64(),
            width: max - min,
            midpoint: Q::midpoint_f64(),
        }
    }

    /// `true` when the range collapsed to a single value.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        // Written as a negation so a NaN width also counts as degenerate.
        !(self.max > self.min)
    }

    /// Integer units per float unit, `(hi - lo) / (max - min)`. Zero when degenerate.
    #[must_use]
    pub fn scale(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (self.hi - self.lo) / self.width
        }
    }

    /// Float value of one integer step. Zero when degenerate.
    #[must_use]
    pub fn step(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else if self.width.is_finite() {
            self.width / (self.hi - self.lo)
        } else {
            (self.max * 0.5 - self.min * 0.5) / (self.hi - self.lo) * 2.0
        }
    }

    /// Position of `x` within `[min, max]` as a fraction in `[0, 1]`.
    ///
    /// Used where `scale` overflows: an infinite width or a subnormal one.
    fn fraction(&self, x: f64) -> f64 {
        if self.width.is_finite() {
            (x - self.min) / self.width
        } else {
            // max - min overflowed; both halves fit.
            (x * 0.5 - self.min * 0.5) / (self.max * 0.5 - self.min * 0.5)
        }
    }

    /// Forward map, returning an integral value within `[lo, hi]`.
    ///
    /// Inputs outside `[min, max]` saturate. NaN inputs and a degenerate
    /// range map to the midpoint `lo + ceil((hi - lo) / 2)`. Ties round away
    /// from zero.
    #[must_use]
    pub fn quantize(&self, x: f64) -> f64 {
        if self.is_degenerate() || x.is_nan() {
            return self.midpoint;
        }
        let x = x.clamp(self.min, self.max);
        let scale = self.scale();
        let scaled = if self.width.is_finite() && scale.is_finite() {
            (x - self.min) * scale
        } else {
            self.fraction(x) * (self.hi - self.lo)
        };
        (scaled.round() + self.lo).clamp(self.lo, self.hi)
    }

    /// Inverse map `(q - lo) / scale + min`; `min` when degenerate.
    #[must_use]
    pub fn dequantize(&self, q: f64) -> f64 {
        if self.is_degenerate() {
            return self.min;
        }
        let fraction = (q - self.lo) / (self.hi - self.lo);
        if self.width.is_finite() {
            fraction.mul_add(self.width, self.min)
        } else {
            self.min * (1.0 - fraction) + self.max * fraction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i8_reference_mapping() {
        let map = AffineMap::for_range::<i8>(0.0, 30.0);
        assert_eq!(map.quantize(0.0), -128.0);
        assert_eq!(map.quantize(10.0), -43.0);
        assert_eq!(map.quantize(20.0), 42.0);
        assert_eq!(map.quantize(30.0), 127.0);
        assert!((map.scale() - 8.5).abs() < 1e-12);
    }

    #[test]
    fn saturates_outside_range() {
        let map = AffineMap::for_range::<u8>(-1.0, 1.0);
        assert_eq!(map.quantize(-5.0), 0.0);
        assert_eq!(map.quantize(5.0), 255.0);
        assert_eq!(map.quantize(f64::NEG_INFINITY), 0.0);
        assert_eq!(map.quantize(f64::INFINITY), 255.0);
    }

    #[test]
    fn nan_maps_to_midpoint() {
        assert_eq!(AffineMap::for_range::<i8>(0.0, 1.0).quantize(f64::NAN), 0.0);
        assert_eq!(AffineMap::for_range::<u8>(0.0, 1.0).quantize(f64::NAN), 128.0);
    }

    #[test]
    fn degenerate_range() {
        let map = AffineMap::for_range::<u8>(4.0, 4.0);
        assert!(map.is_degenerate());
        assert_eq!(map.scale(), 0.0);
        assert_eq!(map.step(), 0.0);
        assert_eq!(map.quantize(-1e9), 128.0);
        assert_eq!(map.quantize(4.0), 128.0);
        assert_eq!(map.dequantize(0.0), 4.0);
        assert_eq!(map.dequantize(255.0), 4.0);
    }

    #[test]
    fn ties_round_away_from_zero() {
        // The centre of the range sits exactly halfway between two codes
        // whenever hi - lo is odd.
        assert_eq!(AffineMap::for_range::<u8>(0.0, 2.0).quantize(1.0), 128.0);
        assert_eq!(AffineMap::for_range::<i8>(-1.0, 1.0).quantize(0.0), 0.0);
        assert_eq!(AffineMap::for_range::<i16>(-8.0, 8.0).quantize(0.0), 0.0);
    }

    #[test]
    fn forward_map_multiplies_by_scale() {
        // 0.01 * (255 / 0.1) lands exactly on 25.5; dividing by the width
        // first would land just below it.
        let map = AffineMap::for_range::<i8>(0.0, 0.1);
        assert_eq!(map.quantize(0.01), -102.0);

        for (min, max, x) in [(0.0, 0.3, 0.11), (-1.7, 2.3, 0.45), (1e-3, 7.0, 3.3)] {
            let map = AffineMap::for_range::<u8>(min, max);
            let expected = ((x - min) * (255.0 / (max - min))).round();
            assert_eq!(map.quantize(x), expected, "x={x} in [{min}, {max}]");
        }
    }

    #[test]
    fn subnormal_width_stays_finite() {
        let tiny = f64::from_bits(1);
        let map = AffineMap::for_range::<i8>(0.0, tiny);
        assert!(!map.scale().is_finite());
        assert_eq!(map.quantize(0.0), -128.0);
        assert_eq!(map.quantize(tiny), 127.0);
    }

    #[test]
    fn dequantize_hits_endpoints() {
        let map = AffineMap::for_range::<i16>(-2.5, 7.5);
        assert_eq!(map.dequantize(-32_768.0), -2.5);
        assert!((map.dequantize(32_767.0) - 7.5).abs() < 1e-12);
    }

    #[test]
    fn overflowing_width_stays_finite() {
        let map = AffineMap::for_range::<u8>(-f64::MAX, f64::MAX);
        assert!(!map.width.is_finite());
        assert_eq!(map.quantize(-f64::MAX), 0.0);
        assert_eq!(map.quantize(f64::MAX), 255.0);
        assert_eq!(map.quantize(0.0), 128.0);
        assert!(map.step().is_finite());
        assert_eq!(map.dequantize(0.0), -f64::MAX);
        assert_eq!(map.dequantize(255.0), f64::MAX);
    }
}
