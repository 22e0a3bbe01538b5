//! Owned-matrix convenience API for host-resident data.
//!
//! [`HostPipeline`] pairs a training configuration with host resources and
//! allocates output matrices itself, for callers that do not manage buffers.
//!
//! # Example
//!
//! ```
//! use sqkit::{HostPipeline, Matrix, QuantizerConfig};
//!
//! let data = Matrix::from_vec(vec![0.5_f32; 12], 3, 4).unwrap();
//! let pipeline = HostPipeline::new(QuantizerConfig::default());
//! let (quantizer, codes) = pipeline.fit_transform::<f32, u8>(data.view()).unwrap();
//! assert!(quantizer.is_degenerate());
//! assert!(codes.as_slice().iter().all(|c| *c == 128));
//! ```

use std::time::Instant;

use sqkit_core::{Element, HostMatrixView, Matrix, QuantInt, QuantResult, QuantizerConfig};
use sqkit_exec::HostResources;
use sqkit_quant::{ScalarQuantizer, inverse_transform, train_scalar, transform};
use tracing::info;

/// Train-and-transform helper over the host substrate.
#[derive(Debug, Clone, Default)]
pub struct HostPipeline {
    config: QuantizerConfig,
    resources: HostResources,
}

impl HostPipeline {
    /// Pipeline with default host resources.
    #[must_use]
    pub fn new(config: QuantizerConfig) -> Self {
        Self {
            config,
            resources: HostResources::default(),
        }
    }

    /// Pipeline configured entirely from `SQKIT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            config: QuantizerConfig::default().with_env_overrides(),
            resources: HostResources::from_env(),
        }
    }

    /// Replace the host resources.
    #[must_use]
    pub fn with_resources(mut self, resources: HostResources) -> Self {
        self.resources = resources;
        self
    }

    /// Training configuration.
    #[must_use]
    pub const fn config(&self) -> &QuantizerConfig {
        &self.config
    }

    /// Host resources used by every call.
    #[must_use]
    pub const fn resources(&self) -> &HostResources {
        &self.resources
    }

    /// Train a quantizer on `dataset`.
    ///
    /// # Errors
    ///
    /// See [`train_scalar`].
    pub fn fit<T: Element, Q: QuantInt>(
        &self,
        dataset: HostMatrixView<'_, T>,
    ) -> QuantResult<ScalarQuantizer<T, Q>> {
        train_scalar(&self.resources, &self.config, dataset)
    }

    /// Quantize `dataset` into a newly allocated matrix.
    ///
    /// # Errors
    ///
    /// See [`transform`].
    pub fn transform<T: Element, Q: QuantInt>(
        &self,
        quantizer: &ScalarQuantizer<T, Q>,
        dataset: HostMatrixView<'_, T>,
    ) -> QuantResult<Matrix<Q>> {
        let (rows, cols) = dataset.shape();
        let mut codes = Matrix::filled(rows, cols, Q::MIN)?;
        transform(&self.resources, quantizer, dataset, codes.view_mut())?;
        Ok(codes)
    }

    /// Train on `dataset` and quantize it in one call.
    ///
    /// # Errors
    ///
    /// See [`train_scalar`] and [`transform`].
    pub fn fit_transform<T: Element, Q: QuantInt>(
        &self,
        dataset: HostMatrixView<'_, T>,
    ) -> QuantResult<(ScalarQuantizer<T, Q>, Matrix<Q>)> {
        let start = Instant::now();
        let quantizer = self.fit(dataset)?;
        let codes = self.transform(&quantizer, dataset)?;
        info!(
            target: "sqkit.pipeline",
            rows = dataset.rows(),
            cols = dataset.cols(),
            element_type = T::NAME,
            quant_type = Q::NAME,
            min = quantizer.min().to_f64(),
            max = quantizer.max().to_f64(),
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "quantized dataset"
        );
        Ok((quantizer, codes))
    }

    /// Reconstruct approximate elements from `codes` into a newly allocated matrix.
    ///
    /// # Errors
    ///
    /// See [`inverse_transform`].
    pub fn reconstruct<T: Element, Q: QuantInt>(
        &self,
        quantizer: &ScalarQuantizer<T, Q>,
        codes: HostMatrixView<'_, Q>,
    ) -> QuantResult<Matrix<T>> {
        let (rows, cols) = codes.shape();
        let mut restored = Matrix::filled(rows, cols, quantizer.min())?;
        inverse_transform(&self.resources, quantizer, codes, restored.view_mut())?;
        Ok(restored)
    }
}
