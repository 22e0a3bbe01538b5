//! Tracing conventions and optional subscriber setup for sqkit.
//!
//! Every sqkit span and event uses a target under [`TARGET_PREFIX`], so
//! consumers can filter with `RUST_LOG=sqkit=debug`. Installing a subscriber
//! is optional; [`init_tracing`] is a convenience for binaries and tests that
//! do not configure `tracing-subscriber` themselves.
//!
//! # Usage
//!
//! ```ignore
//! use sqkit_core::tracing_config::init_tracing;
//! use tracing::Level;
//!
//! init_tracing(Level::INFO);
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Target prefix used by all sqkit tracing spans and events.
pub const TARGET_PREFIX: &str = "sqkit";

/// Standard span names.
pub mod span_names {
    /// Range estimation over a dataset.
    pub const TRAIN: &str = "sqkit::train";
    /// Forward quantization of a matrix.
    pub const TRANSFORM: &str = "sqkit::transform";
    /// Inverse quantization of a matrix.
    pub const INVERSE_TRANSFORM: &str = "sqkit::inverse_transform";
    /// Exact order-statistic selection.
    pub const RADIX_SELECT: &str = "sqkit::radix_select";
    /// Host <-> device buffer copies.
    pub const DEVICE_COPY: &str = "sqkit::device_copy";
}

/// Structured field names carried by the `sqkit.train` and `sqkit.transform`
/// spans and events.
pub mod field_names {
    pub const SUBSTRATE: &str = "substrate";
    pub const ROWS: &str = "rows";
    pub const COLS: &str = "cols";
    pub const ELEMENT_TYPE: &str = "element_type";
    pub const QUANT_TYPE: &str = "quant_type";
    pub const QUANTILE: &str = "quantile";
    pub const POPULATION: &str = "population";
    pub const TAIL_RANK: &str = "tail_rank";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const DURATION_US: &str = "duration_us";

    /// Every name above, for consumers that index or validate fields.
    pub const ALL: &[&str] = &[
        SUBSTRATE,
        ROWS,
        COLS,
        ELEMENT_TYPE,
        QUANT_TYPE,
        QUANTILE,
        POPULATION,
        TAIL_RANK,
        MIN,
        MAX,
        DURATION_US,
    ];
}

/// Parse a log level string (case-insensitive).
///
/// Recognized values: `trace`, `debug`, `info`, `warn`, `error`.
#[must_use]
pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// `SQKIT_LOG_LEVEL` if set and valid, else `default`.
#[must_use]
pub fn level_from_env(default: Level) -> Level {
    std::env::var("SQKIT_LOG_LEVEL")
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(default)
}

/// Install a stderr `fmt` subscriber.
///
/// Filter priority: `SQKIT_LOG` directives, then `RUST_LOG`, then
/// `sqkit=<default_level>`. Returns `false` when a global subscriber was
/// already installed; that case is not an error.
pub fn init_tracing(default_level: Level) -> bool {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(build_env_filter(default_level))
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

fn build_env_filter(default_level: Level) -> EnvFilter {
    if let Ok(directives) = std::env::var("SQKIT_LOG")
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = level_from_env(default_level);
    EnvFilter::new(format!("{TARGET_PREFIX}={level},warn"))
}
