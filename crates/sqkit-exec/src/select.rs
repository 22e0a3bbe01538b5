//! Exact order statistics by parallel radix select.
//!
//! Each finite element maps to an order-preserving integer key
//! ([`Element::order_key`]). Selection walks the key from the most
//! significant 8-bit digit down: one 256-bin histogram per digit, restricted
//! to elements whose higher digits match the prefix fixed so far. The rank's
//! bin fixes the next digit. After `KEY_BITS / 8` passes (2 for 16-bit floats,
//! 4 for `f32`, 8 for `f64`) the prefix *is* the selected key, so ties
//! resolve by value and no element is ever moved or sorted.
//!
//! Non-finite elements are invisible to the selector: they are not counted
//! in the population and never selected.

use sqkit_core::tracing_config::span_names;
use sqkit_core::{Element, MatrixView};
use tracing::trace;

use crate::ExecutionResource;

const RADIX_BITS: u32 = 8;
const RADIX_BINS: usize = 1 << RADIX_BITS;
const DIGIT_MASK: u64 = (1 << RADIX_BITS) - 1;

#[allow(clippy::cast_possible_truncation)]
const fn digit(key: u64, shift: u32) -> usize {
    ((key >> shift) & DIGIT_MASK) as usize
}

/// Bin containing 0-based `rank`, and the number of elements in lower bins.
fn locate(counts: &[u64], rank: u64) -> Option<(usize, u64)> {
    let mut below = 0_u64;
    for (bin, &count) in counts.iter().enumerate() {
        if rank < below + count {
            return Some((bin, below));
        }
        below += count;
    }
    None
}

/// Rank selector over the finite elements of one matrix.
///
/// The top-digit histogram is computed once at construction and shared by
/// every subsequent [`RadixSelector::select`] call.
pub struct RadixSelector<'a, T: Element, R: ExecutionResource> {
    resources: &'a R,
    data: &'a [T],
    root: Vec<u64>,
    population: u64,
}

impl<'a, T: Element, R: ExecutionResource> RadixSelector<'a, T, R> {
    /// Build the selector and its top-digit histogram.
    pub fn new(resources: &'a R, data: MatrixView<'a, T, R::Space>) -> Self {
        let data = data.as_slice();
        let shift = T::KEY_BITS - RADIX_BITS;
        let root = resources.histogram(data, RADIX_BINS, move |x: &T| {
            x.is_finite().then_some(digit(x.order_key(), shift))
        });
        let population: u64 = root.iter().sum();
        trace!(
            target: "sqkit.select",
            element_type = T::NAME,
            len = data.len(),
            population,
            "selector ready"
        );
        Self {
            resources,
            data,
            root,
            population,
        }
    }

    /// Number of finite elements.
    #[must_use]
    pub const fn population(&self) -> u64 {
        self.population
    }

    /// `true` when there is nothing to select from.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.population == 0
    }

    /// Value at 0-based `rank` in ascending order of the finite elements,
    /// or `None` when `rank >= population()`.
    #[must_use]
    pub fn select(&self, rank: u64) -> Option<T> {
        if rank >= self.population {
            return None;
        }
        let _span = tracing::trace_span!(
            target: "sqkit.select",
            span_names::RADIX_SELECT,
            element_type = T::NAME,
            rank,
            population = self.population
        )
        .entered();

        let mut remaining = rank;
        let mut prefix = 0_u64;
        let mut known = 0_u64;
        let mut shift = T::KEY_BITS;
        while shift > 0 {
            shift -= RADIX_BITS;
            let refined;
            let counts: &[u64] = if known == 0 {
                &self.root
            } else {
                refined = self.resources.histogram(self.data, RADIX_BINS, move |x: &T| {
                    let key = x.order_key();
                    (x.is_finite() && key & known == prefix).then_some(digit(key, shift))
                });
                &refined
            };
            let (bin, below) = locate(counts, remaining)?;
            remaining -= below;
            prefix |= (bin as u64) << shift;
            known |= DIGIT_MASK << shift;
        }
        Some(T::from_order_key(prefix))
    }
}

#[cfg(test)]
mod tests {
    use half::{bf16, f16};
    use proptest::prelude::*;
    use sqkit_core::{ExecConfig, HostMatrixView};

    use super::*;
    use crate::{DeviceResources, HostResources};

    fn sorted_finite<T: Element>(data: &[T]) -> Vec<T> {
        let mut finite: Vec<T> = data.iter().copied().filter(|x| x.is_finite()).collect();
        finite.sort_by_key(|x| x.order_key());
        finite
    }

    fn host_view<T>(data: &[T]) -> HostMatrixView<'_, T> {
        HostMatrixView::new(data, 1, data.len()).expect("row vector")
    }

    #[test]
    fn selects_every_rank_of_small_f32() {
        let data = [3.5_f32, -1.0, 0.0, -0.0, 7.25, 3.5, -100.0, 1e-30];
        let host = HostResources::default();
        let selector = RadixSelector::new(&host, host_view(&data));
        let expected = sorted_finite(&data);
        assert_eq!(selector.population(), data.len() as u64);
        for (rank, want) in expected.iter().enumerate() {
            let got = selector.select(rank as u64).expect("in range");
            assert_eq!(got.to_bits(), want.to_bits(), "rank {rank}");
        }
        assert_eq!(selector.select(data.len() as u64), None);
    }

    #[test]
    fn non_finite_values_are_excluded() {
        let data = [f64::NAN, 2.0, f64::INFINITY, -5.0, f64::NEG_INFINITY, 9.0];
        let host = HostResources::sequential();
        let selector = RadixSelector::new(&host, host_view(&data));
        assert_eq!(selector.population(), 3);
        assert_eq!(selector.select(0), Some(-5.0));
        assert_eq!(selector.select(1), Some(2.0));
        assert_eq!(selector.select(2), Some(9.0));
        assert_eq!(selector.select(3), None);
    }

    #[test]
    fn all_non_finite_is_empty() {
        let data = [f32::NAN, f32::INFINITY];
        let host = HostResources::default();
        let selector = RadixSelector::new(&host, host_view(&data));
        assert!(selector.is_empty());
        assert_eq!(selector.select(0), None);
    }

    #[test]
    fn half_precision_types() {
        let data: Vec<f16> = (0..500).map(|i| f16::from_f32((i as f32 - 250.0) * 0.75)).collect();
        let host = HostResources::default();
        let selector = RadixSelector::new(&host, host_view(&data));
        let expected = sorted_finite(&data);
        for rank in [0_usize, 1, 249, 250, 498, 499] {
            assert_eq!(selector.select(rank as u64), Some(expected[rank]));
        }

        let data: Vec<bf16> = (0..300).map(|i| bf16::from_f32((i % 17) as f32 - 8.0)).collect();
        let selector = RadixSelector::new(&host, host_view(&data));
        let expected = sorted_finite(&data);
        for rank in [0_usize, 17, 150, 299] {
            assert_eq!(selector.select(rank as u64), Some(expected[rank]));
        }
    }

    #[test]
    fn device_matches_host() {
        let data: Vec<f32> = (0..20_000)
            .map(|i| ((i * 7_919) % 10_007) as f32 * 0.01 - 40.0)
            .collect();
        let host = HostResources::new(ExecConfig {
            parallel_threshold: 1_000,
            chunk_size: 777,
            ..ExecConfig::default()
        })
        .expect("host");
        let device = DeviceResources::new(&ExecConfig {
            device_threads: 4,
            device_block_size: 256,
            ..ExecConfig::default()
        })
        .expect("device");
        let on_device = device.upload(host_view(&data));

        let on_host = RadixSelector::new(&host, host_view(&data));
        let on_dev = RadixSelector::new(&device, on_device.view());
        for rank in [0_u64, 100, 9_999, 10_000, 19_999] {
            assert_eq!(on_host.select(rank), on_dev.select(rank));
        }
    }

    #[test]
    fn locate_walks_cumulative_counts() {
        let counts = [2_u64, 0, 3, 1];
        assert_eq!(locate(&counts, 0), Some((0, 0)));
        assert_eq!(locate(&counts, 1), Some((0, 0)));
        assert_eq!(locate(&counts, 2), Some((2, 2)));
        assert_eq!(locate(&counts, 4), Some((2, 2)));
        assert_eq!(locate(&counts, 5), Some((3, 5)));
        assert_eq!(locate(&counts, 6), None);
    }

    proptest! {
        #[test]
        fn property_f32_select_matches_sort(
            data in proptest::collection::vec(proptest::num::f32::ANY, 1..300),
            pick in 0.0_f64..1.0,
        ) {
            let expected = sorted_finite(&data);
            let host = HostResources::default();
            let selector = RadixSelector::new(&host, host_view(&data));
            prop_assert_eq!(selector.population(), expected.len() as u64);
            if !expected.is_empty() {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let rank = (pick * expected.len() as f64) as usize;
                let got = selector.select(rank as u64).expect("rank in range");
                prop_assert_eq!(got.to_bits(), expected[rank].to_bits());
            }
        }

        #[test]
        fn property_f64_select_matches_sort(
            data in proptest::collection::vec(-1.0e12_f64..1.0e12, 1..200),
            rank_seed in any::<usize>(),
        ) {
            let expected = sorted_finite(&data);
            let rank = rank_seed % expected.len();
            let host = HostResources::sequential();
            let selector = RadixSelector::new(&host, host_view(&data));
            prop_assert_eq!(selector.select(rank as u64), Some(expected[rank]));
        }
    }
}
