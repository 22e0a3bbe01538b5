use std::path::PathBuf;

/// Unified error type covering every failure mode of the sqkit pipeline.
///
/// All variants describe caller programming errors or environment problems;
/// nothing here is transient, so no caller should retry on the same input.
/// Numeric edge cases (a degenerate `min == max` range, outlier saturation)
/// are well-defined lossy behavior and never surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    // === Configuration errors ===
    /// A configuration value is invalid.
    #[error("Invalid config: {field} = \"{value}\" — {reason}")]
    InvalidConfig {
        /// Which config field.
        field: String,
        /// The invalid value.
        value: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A TOML configuration file could not be parsed.
    #[error("Failed to parse config at {path}: {detail}. Fix the file or remove it to use defaults.")]
    ConfigParse {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser diagnostic.
        detail: String,
    },

    // === Input errors ===
    /// The dataset cannot be used for training (empty, or no finite values).
    #[error("Invalid input: {detail}. Training needs at least one finite element.")]
    InvalidInput {
        /// What is wrong with the input.
        detail: String,
    },

    /// Output matrix shape does not match the input matrix shape, or a view's
    /// buffer length disagrees with its declared shape.
    #[error(
        "Shape mismatch: expected {expected_rows}x{expected_cols}, found {found_rows}x{found_cols}. Allocate the output with the input's shape."
    )]
    ShapeMismatch {
        /// Rows required.
        expected_rows: usize,
        /// Columns required.
        expected_cols: usize,
        /// Rows supplied.
        found_rows: usize,
        /// Columns supplied.
        found_cols: usize,
    },

    // === Quantizer state errors ===
    /// The quantizer state was not produced by a successful training call.
    #[error("Untrained quantizer: {detail}. Call train_scalar() on a dataset first.")]
    UntrainedQuantizer {
        /// Which invariant of trained state is violated.
        detail: String,
    },

    // === Execution substrate errors ===
    /// The device substrate could not be brought up.
    #[error("Device unavailable: {reason}. Lower SQKIT_DEVICE_THREADS or use the host substrate.")]
    DeviceUnavailable {
        /// Why the device could not be created.
        reason: String,
    },

    // === I/O errors ===
    /// Wraps `std::io::Error` for config file access.
    #[error("I/O error: {0}. Check file permissions and path.")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the sqkit crates.
pub type QuantResult<T> = Result<T, QuantError>;

impl QuantError {
    /// Build a [`QuantError::ShapeMismatch`] from two `(rows, cols)` pairs.
    #[must_use]
    pub const fn shape_mismatch(expected: (usize, usize), found: (usize, usize)) -> Self {
        Self::ShapeMismatch {
            expected_rows: expected.0,
            expected_cols: expected.1,
            found_rows: found.0,
            found_cols: found.1,
        }
    }

    /// Build a [`QuantError::InvalidConfig`] without repeating `to_owned` calls.
    pub fn invalid_config(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
