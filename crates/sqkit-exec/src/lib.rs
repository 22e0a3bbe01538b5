//! Execution substrates for sqkit.
//!
//! Quantization is written once against [`ExecutionResource`] and runs on
//! either substrate:
//!
//! - [`HostResources`]: caller thread for small inputs, the global Rayon pool
//!   above [`sqkit_core::DEFAULT_PARALLEL_THRESHOLD`] elements.
//! - [`DeviceResources`]: a dedicated worker pool with device-resident
//!   [`DeviceMatrix`] buffers, every launch split into small blocks.
//!
//! Each resource names its memory space as an associated type, so a matrix
//! view tagged for one substrate cannot be handed to the other.
//!
//! [`RadixSelector`] builds exact order statistics on top of the
//! resource's histogram primitive.

mod kernels;

pub mod device;
pub mod host;
pub mod select;

use std::fmt;

use sqkit_core::{MemorySpace, QuantResult};

pub use device::{DeviceMatrix, DeviceResources};
pub use host::HostResources;
pub use select::RadixSelector;

/// Where a computation executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Substrate {
    /// Host CPU memory and threads.
    Host,
    /// Massively parallel device with its own memory space.
    Device,
}

impl fmt::Display for Substrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Device => write!(f, "device"),
        }
    }
}

/// Buffer allocation, data-parallel dispatch, and synchronization for one substrate.
///
/// Implementations may split work however they like; results must not depend
/// on the split.
pub trait ExecutionResource: Send + Sync {
    /// Memory space of the matrices this resource operates on.
    type Space: MemorySpace;

    /// Which substrate this resource drives.
    fn substrate(&self) -> Substrate;

    /// Write `f(&input[i])` to `out[i]` for every index.
    ///
    /// Callers guarantee `input.len() == out.len()`.
    fn map_into<I, O, F>(&self, input: &[I], out: &mut [O], f: F)
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync + Send;

    /// Count elements per bin. `bin_of` returning `None` (or an index
    /// `>= bins`) skips the element.
    fn histogram<I, F>(&self, input: &[I], bins: usize, bin_of: F) -> Vec<u64>
    where
        I: Sync,
        F: Fn(&I) -> Option<usize> + Sync + Send;

    /// Reject a view whose buffer belongs to another instance of this substrate.
    ///
    /// `owner` is the ordinal recorded on the view, if any. Views without
    /// an owner are accepted. The slice kernels below never see ownership,
    /// so operations taking views call this before launching them.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidInput` for a foreign buffer.
    fn check_owner(&self, owner: Option<usize>) -> QuantResult<()> {
        let _ = owner;
        Ok(())
    }

    /// Scratch buffer of `len` copies of `fill`.
    fn scratch<V: Clone>(&self, len: usize, fill: V) -> Vec<V> {
        vec![fill; len]
    }

    /// Block until all work submitted to this resource has completed.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::DeviceUnavailable` if the substrate was lost.
    fn synchronize(&self) -> QuantResult<()>;
}
