//! Range estimation: outlier-robust `[min, max]` from exact order statistics.

use std::time::Instant;

use sqkit_core::tracing_config::span_names;
use sqkit_core::{Element, MatrixView, QuantError, QuantInt, QuantResult, QuantizerConfig};
use sqkit_exec::{ExecutionResource, RadixSelector};
use tracing::debug;

use crate::quantizer::ScalarQuantizer;

/// Relative distance within which a fractional rank counts as integral.
const RANK_SNAP_TOLERANCE: f64 = 1e-12;

/// Number of elements excluded from each tail: `floor((1 - quantile) / 2 * population)`.
///
/// Products within a relative `1e-12` of an integer snap to it, so decimal
/// quantiles like `0.8` are not pushed one rank down by binary rounding.
/// The result never exceeds `(population - 1) / 2`, keeping the lower rank
/// at or below the upper one.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn tail_rank(quantile: f64, population: u64) -> u64 {
    if population == 0 {
        return 0;
    }
    let exact = (1.0 - quantile) / 2.0 * population as f64;
    let nearest = exact.round();
    let rank = if (exact - nearest).abs() <= RANK_SNAP_TOLERANCE * nearest.max(1.0) {
        nearest
    } else {
        exact.floor()
    };
    (rank.max(0.0) as u64).min((population - 1) / 2)
}

/// Train a scalar quantizer on `dataset`.
///
/// The population is every finite element of the matrix, flattened.
/// `min` is the element at 0-based rank `k` and `max` the element at rank
/// `N - 1 - k`, where `k` is [`tail_rank`]. Host and device substrates give
/// bit-identical bounds.
///
/// # Errors
///
/// - `QuantError::InvalidConfig` if the quantile is outside `(0, 1]`.
/// - `QuantError::InvalidInput` if the dataset is empty, holds no finite
///   value, or lives on another device.
/// - Any error from `resources.synchronize()`.
pub fn train_scalar<T, Q, R>(
    resources: &R,
    config: &QuantizerConfig,
    dataset: MatrixView<'_, T, R::Space>,
) -> QuantResult<ScalarQuantizer<T, Q>>
where
    T: Element,
    Q: QuantInt,
    R: ExecutionResource,
{
    config.validate()?;
    resources.check_owner(dataset.owner())?;
    let (rows, cols) = dataset.shape();
    if dataset.is_empty() {
        return Err(QuantError::InvalidInput {
            detail: format!("cannot train on an empty {rows}x{cols} dataset"),
        });
    }

    let _span = tracing::info_span!(
        target: "sqkit.train",
        span_names::TRAIN,
        substrate = %resources.substrate(),
        rows,
        cols,
        element_type = T::NAME,
        quant_type = Q::NAME,
        quantile = config.quantile
    )
    .entered();
    let start = Instant::now();

    let selector = RadixSelector::new(resources, dataset);
    let population = selector.population();
    if population == 0 {
        return Err(QuantError::InvalidInput {
            detail: format!("{rows}x{cols} dataset contains no finite values"),
        });
    }

    let tail = tail_rank(config.quantile, population);
    let (Some(min), Some(max)) = (selector.select(tail), selector.select(population - 1 - tail))
    else {
        return Err(QuantError::InvalidInput {
            detail: format!("ranks {tail} and {} out of range", population - 1 - tail),
        });
    };
    resources.synchronize()?;

    let duration_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
    debug!(
        target: "sqkit.train",
        population,
        tail_rank = tail,
        min = min.to_f64(),
        max = max.to_f64(),
        duration_us,
        "trained scalar quantizer"
    );
    Ok(ScalarQuantizer::trained(min, max))
}
