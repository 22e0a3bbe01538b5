//! Configuration types for training and execution.
//!
//! [`QuantizerConfig`] holds the training knobs consumed by `train_scalar`.
//! [`ExecConfig`] tunes how the host and device substrates split work.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuantError, QuantResult};

/// Default fraction of the value distribution retained by training.
pub const DEFAULT_QUANTILE: f64 = 0.99;
/// Default element count at which the host substrate switches to Rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 65_536;
/// Default elements per Rayon task on the host substrate.
pub const DEFAULT_CHUNK_SIZE: usize = 16_384;
/// Default elements per launch block on the device substrate.
pub const DEFAULT_DEVICE_BLOCK_SIZE: usize = 1_024;

/// Training configuration for a scalar quantizer.
///
/// # Environment Variable Overrides
///
/// | Variable         | Field      | Default |
/// |------------------|------------|---------|
/// | `SQKIT_QUANTILE` | `quantile` | `0.99`  |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizerConfig {
    /// Fraction of the value distribution to keep, within `(0, 1]`.
    /// `(1 - quantile) / 2` of the mass is dropped from each tail.
    pub quantile: f64,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            quantile: DEFAULT_QUANTILE,
        }
    }
}

impl QuantizerConfig {
    /// Config retaining `quantile` of the distribution.
    #[must_use]
    pub const fn with_quantile(quantile: f64) -> Self {
        Self { quantile }
    }

    /// Check the invariant `0 < quantile <= 1`.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidConfig` for zero, negative, NaN or > 1 quantiles.
    pub fn validate(&self) -> QuantResult<()> {
        if self.quantile > 0.0 && self.quantile <= 1.0 {
            Ok(())
        } else {
            Err(QuantError::invalid_config(
                "quantile",
                self.quantile,
                "must be within (0, 1]",
            ))
        }
    }

    /// Load overrides from environment variables.
    ///
    /// Invalid values are ignored with a warning (defaults are kept).
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SQKIT_QUANTILE") {
            match val.trim().parse::<f64>() {
                Ok(q) if q > 0.0 && q <= 1.0 => self.quantile = q,
                _ => tracing::warn!(
                    target: "sqkit.config",
                    value = %val,
                    "ignoring SQKIT_QUANTILE outside (0, 1]"
                ),
            }
        }
        self
    }

    /// Parse from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::ConfigParse` for malformed TOML and
    /// `QuantError::InvalidConfig` when the parsed quantile is out of range.
    pub fn from_toml_str(contents: &str) -> QuantResult<Self> {
        let config: Self = parse_toml(contents, Path::new("<inline>"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::Io` when the file cannot be read, plus every
    /// error of [`QuantizerConfig::from_toml_str`].
    pub fn load(path: &Path) -> QuantResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = parse_toml(&contents, path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Work-splitting knobs for the execution substrates.
///
/// # Environment Variable Overrides
///
/// | Variable                   | Field                | Default  |
/// |----------------------------|----------------------|----------|
/// | `SQKIT_PARALLEL`           | `parallel_enabled`   | `true`   |
/// | `SQKIT_PARALLEL_THRESHOLD` | `parallel_threshold` | `65536`  |
/// | `SQKIT_CHUNK_SIZE`         | `chunk_size`         | `16384`  |
/// | `SQKIT_DEVICE_THREADS`     | `device_threads`     | `0`      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Host: element count at which work moves from sequential to Rayon.
    pub parallel_threshold: usize,

    /// Host: elements per Rayon task.
    pub chunk_size: usize,

    /// Host: allow Rayon at all.
    pub parallel_enabled: bool,

    /// Device: worker count. `0` means the machine's available parallelism.
    pub device_threads: usize,

    /// Device: elements per launch block.
    pub device_block_size: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallel_enabled: true,
            device_threads: 0,
            device_block_size: DEFAULT_DEVICE_BLOCK_SIZE,
        }
    }
}

impl ExecConfig {
    /// Check that chunk and block sizes are non-zero.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> QuantResult<()> {
        if self.chunk_size == 0 {
            return Err(QuantError::invalid_config(
                "chunk_size",
                self.chunk_size,
                "must be at least 1",
            ));
        }
        if self.device_block_size == 0 {
            return Err(QuantError::invalid_config(
                "device_block_size",
                self.device_block_size,
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Load overrides from environment variables.
    ///
    /// Only overrides fields for which environment variables are set.
    /// Invalid values are silently ignored (defaults are kept).
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SQKIT_PARALLEL") {
            self.parallel_enabled = parse_switch(&val);
        }
        if let Ok(val) = std::env::var("SQKIT_PARALLEL_THRESHOLD")
            && let Ok(threshold) = val.trim().parse::<usize>()
        {
            self.parallel_threshold = threshold;
        }
        if let Ok(val) = std::env::var("SQKIT_CHUNK_SIZE")
            && let Ok(size) = val.trim().parse::<usize>()
            && size > 0
        {
            self.chunk_size = size;
        }
        if let Ok(val) = std::env::var("SQKIT_DEVICE_THREADS")
            && let Ok(threads) = val.trim().parse::<usize>()
        {
            self.device_threads = threads;
        }
        self
    }

    /// Parse from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::ConfigParse` for malformed TOML and
    /// `QuantError::InvalidConfig` for zero sizes.
    pub fn from_toml_str(contents: &str) -> QuantResult<Self> {
        let config: Self = parse_toml(contents, Path::new("<inline>"))?;
        config.validate()?;
        Ok(config)
    }
}

/// `false` for `0`, `false`, `no`, `off` (case-insensitive); `true` otherwise.
#[must_use]
pub fn parse_switch(raw: &str) -> bool {
    let normalized = raw.trim();
    !normalized.eq_ignore_ascii_case("0")
        && !normalized.eq_ignore_ascii_case("false")
        && !normalized.eq_ignore_ascii_case("no")
        && !normalized.eq_ignore_ascii_case("off")
}

fn parse_toml<T: serde::de::DeserializeOwned>(contents: &str, path: &Path) -> QuantResult<T> {
    toml::from_str(contents).map_err(|e| QuantError::ConfigParse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}
