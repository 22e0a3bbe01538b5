//! Host substrate: caller thread for small inputs, global Rayon pool above a threshold.

use sqkit_core::{ExecConfig, Host, QuantResult};
use tracing::trace;

use crate::kernels;
use crate::{ExecutionResource, Substrate};

/// Execution resource for host-resident matrices.
///
/// Results never depend on whether the sequential or parallel path ran;
/// only throughput does.
#[derive(Debug, Clone)]
pub struct HostResources {
    config: ExecConfig,
}

impl Default for HostResources {
    fn default() -> Self {
        Self {
            config: ExecConfig::default(),
        }
    }
}

impl HostResources {
    /// Host resources with explicit work-splitting knobs.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidConfig` for a zero chunk size.
    pub fn new(config: ExecConfig) -> QuantResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Host resources configured from `SQKIT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let config = ExecConfig::default().with_env_overrides();
        Self::new(config).unwrap_or_default()
    }

    /// Host resources that never leave the caller thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            config: ExecConfig {
                parallel_enabled: false,
                ..ExecConfig::default()
            },
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecConfig {
        &self.config
    }

    fn use_parallel(&self, len: usize) -> bool {
        self.config.parallel_enabled && len >= self.config.parallel_threshold
    }
}

impl ExecutionResource for HostResources {
    type Space = Host;

    fn substrate(&self) -> Substrate {
        Substrate::Host
    }

    fn map_into<I, O, F>(&self, input: &[I], out: &mut [O], f: F)
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync + Send,
    {
        if self.use_parallel(input.len()) {
            trace!(
                target: "sqkit.host",
                len = input.len(),
                chunk_size = self.config.chunk_size,
                "parallel map"
            );
            kernels::map_parallel(input, out, self.config.chunk_size, &f);
        } else {
            kernels::map_sequential(input, out, &f);
        }
    }

    fn histogram<I, F>(&self, input: &[I], bins: usize, bin_of: F) -> Vec<u64>
    where
        I: Sync,
        F: Fn(&I) -> Option<usize> + Sync + Send,
    {
        if self.use_parallel(input.len()) {
            let alloc = || self.scratch(bins, 0_u64);
            kernels::histogram_parallel(input, self.config.chunk_size, &alloc, &bin_of)
        } else {
            kernels::histogram_sequential(input, self.scratch(bins, 0_u64), &bin_of)
        }
    }

    fn synchronize(&self) -> QuantResult<()> {
        // Host work completes before map_into/histogram return.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_threshold() -> HostResources {
        HostResources::new(ExecConfig {
            parallel_threshold: 8,
            chunk_size: 3,
            ..ExecConfig::default()
        })
        .expect("valid config")
    }

    #[test]
    fn sequential_and_parallel_maps_agree() {
        let input: Vec<f32> = (0..1_000).map(|i| i as f32 * 0.5).collect();
        let mut a = vec![0.0_f64; input.len()];
        let mut b = vec![0.0_f64; input.len()];
        HostResources::sequential().map_into(&input, &mut a, |x| f64::from(*x).sqrt());
        small_threshold().map_into(&input, &mut b, |x| f64::from(*x).sqrt());
        assert_eq!(a, b);
    }

    #[test]
    fn histograms_agree_across_paths() {
        let input: Vec<u16> = (0..4_096_usize)
            .map(|i| u16::try_from(i * 31 % 256).expect("below 256"))
            .collect();
        let bin_of = |x: &u16| Some(usize::from(*x));
        let seq = HostResources::sequential().histogram(&input, 256, bin_of);
        let par = small_threshold().histogram(&input, 256, bin_of);
        assert_eq!(seq, par);
        assert_eq!(seq.iter().sum::<u64>(), 4_096);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = HostResources::new(ExecConfig {
            chunk_size: 0,
            ..ExecConfig::default()
        })
        .expect_err("invalid");
        assert!(matches!(
            err,
            sqkit_core::QuantError::InvalidConfig { ref field, .. } if field == "chunk_size"
        ));
    }

    #[test]
    fn threshold_gates_parallel_path() {
        let host = small_threshold();
        assert!(!host.use_parallel(7));
        assert!(host.use_parallel(8));
        assert!(!HostResources::sequential().use_parallel(usize::MAX));
    }

    #[test]
    fn substrate_and_sync() {
        let host = HostResources::default();
        assert_eq!(host.substrate(), Substrate::Host);
        assert!(host.synchronize().is_ok());
    }
}
