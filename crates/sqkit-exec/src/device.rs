//! Device substrate: a dedicated worker pool with its own resident buffers.
//!
//! `DeviceResources` models a massively parallel accelerator. It owns an
//! explicitly sized Rayon pool that every launch runs on, split into small
//! blocks, and it owns the only constructor for [`DeviceMatrix`] buffers.
//! Host data reaches the device through [`DeviceResources::upload`] and comes
//! back through [`DeviceResources::download`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use sqkit_core::tracing_config::span_names;
use sqkit_core::{
    Device, DeviceMatrixView, DeviceMatrixViewMut, ExecConfig, HostMatrixView, Matrix,
    MatrixView, MatrixViewMut, QuantError, QuantResult, element_count,
};
use tracing::{debug, trace};

use crate::kernels;
use crate::{ExecutionResource, Substrate};

static NEXT_ORDINAL: AtomicUsize = AtomicUsize::new(0);

/// Execution resource for device-resident matrices.
pub struct DeviceResources {
    pool: ThreadPool,
    ordinal: usize,
    block_size: usize,
    launches: AtomicU64,
}

impl std::fmt::Debug for DeviceResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceResources")
            .field("ordinal", &self.ordinal)
            .field("threads", &self.pool.current_num_threads())
            .field("block_size", &self.block_size)
            .field("launches", &self.launches.load(Ordering::Relaxed))
            .finish()
    }
}

impl DeviceResources {
    /// Bring up a device with `config.device_threads` workers
    /// (`0` = available parallelism) and `config.device_block_size` blocks.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidConfig` for a zero block size and
    /// `QuantError::DeviceUnavailable` if the worker pool cannot be spawned.
    pub fn new(config: &ExecConfig) -> QuantResult<Self> {
        config.validate()?;
        let ordinal = NEXT_ORDINAL.fetch_add(1, Ordering::Relaxed);
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.device_threads)
            .thread_name(move |worker| format!("sqkit-device{ordinal}-{worker}"))
            .build()
            .map_err(|e| QuantError::DeviceUnavailable {
                reason: e.to_string(),
            })?;

        debug!(
            target: "sqkit.device",
            ordinal,
            threads = pool.current_num_threads(),
            block_size = config.device_block_size,
            "device ready"
        );

        Ok(Self {
            pool,
            ordinal,
            block_size: config.device_block_size,
            launches: AtomicU64::new(0),
        })
    }

    /// Process-unique device ordinal.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Worker count.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Number of kernels launched so far.
    #[must_use]
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    fn launch<R: Send>(&self, kernel: impl FnOnce() -> R + Send) -> R {
        self.launches.fetch_add(1, Ordering::Relaxed);
        self.pool.install(kernel)
    }

    /// Allocate a device matrix filled with `fill`.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidInput` when `rows * cols` overflows.
    pub fn alloc_matrix<T: Clone + Send + Sync>(
        &self,
        rows: usize,
        cols: usize,
        fill: T,
    ) -> QuantResult<DeviceMatrix<T>> {
        let len = element_count(rows, cols)?;
        Ok(DeviceMatrix {
            data: self.scratch(len, fill),
            rows,
            cols,
            ordinal: self.ordinal,
        })
    }

    /// Copy a host matrix into device memory.
    #[must_use]
    pub fn upload<T: Copy + Send + Sync>(&self, host: HostMatrixView<'_, T>) -> DeviceMatrix<T> {
        let _span = tracing::trace_span!(
            target: "sqkit.device",
            span_names::DEVICE_COPY,
            direction = "upload",
            rows = host.rows(),
            cols = host.cols()
        )
        .entered();

        let src = host.as_slice();
        let mut data = Vec::with_capacity(src.len());
        self.launch(|| {
            src.par_iter()
                .with_min_len(self.block_size)
                .copied()
                .collect_into_vec(&mut data);
        });
        DeviceMatrix {
            data,
            rows: host.rows(),
            cols: host.cols(),
            ordinal: self.ordinal,
        }
    }

    /// Copy a device matrix back into a new host matrix.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidInput` when `matrix` lives on another device.
    pub fn download<T: Copy + Send + Sync>(&self, matrix: &DeviceMatrix<T>) -> QuantResult<Matrix<T>> {
        self.check_ordinal(matrix)?;
        let _span = tracing::trace_span!(
            target: "sqkit.device",
            span_names::DEVICE_COPY,
            direction = "download",
            rows = matrix.rows,
            cols = matrix.cols
        )
        .entered();
        self.synchronize()?;
        let mut host = Vec::with_capacity(matrix.data.len());
        self.launch(|| {
            matrix
                .data
                .par_iter()
                .with_min_len(self.block_size)
                .copied()
                .collect_into_vec(&mut host);
        });
        Matrix::from_vec(host, matrix.rows, matrix.cols)
    }

    /// Copy a device view into an existing host buffer of identical shape.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidInput` when `src` lives on another device
    /// and `QuantError::ShapeMismatch` when the shapes differ.
    pub fn download_into<T: Copy + Send + Sync>(
        &self,
        src: DeviceMatrixView<'_, T>,
        mut dst: MatrixViewMut<'_, T>,
    ) -> QuantResult<()> {
        self.check_owner(src.owner())?;
        if src.shape() != dst.shape() {
            return Err(QuantError::shape_mismatch(src.shape(), dst.shape()));
        }
        self.synchronize()?;
        self.map_into(src.as_slice(), dst.as_mut_slice(), |x| *x);
        Ok(())
    }

    fn check_ordinal<T>(&self, matrix: &DeviceMatrix<T>) -> QuantResult<()> {
        self.check_owner(Some(matrix.ordinal))
    }
}

impl ExecutionResource for DeviceResources {
    type Space = Device;

    fn substrate(&self) -> Substrate {
        Substrate::Device
    }

    fn map_into<I, O, F>(&self, input: &[I], out: &mut [O], f: F)
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync + Send,
    {
        trace!(
            target: "sqkit.device",
            ordinal = self.ordinal,
            len = input.len(),
            "map launch"
        );
        self.launch(|| kernels::map_parallel(input, out, self.block_size, &f));
    }

    fn histogram<I, F>(&self, input: &[I], bins: usize, bin_of: F) -> Vec<u64>
    where
        I: Sync,
        F: Fn(&I) -> Option<usize> + Sync + Send,
    {
        trace!(
            target: "sqkit.device",
            ordinal = self.ordinal,
            len = input.len(),
            bins,
            "histogram launch"
        );
        let alloc = || self.scratch(bins, 0_u64);
        self.launch(|| kernels::histogram_parallel(input, self.block_size, &alloc, &bin_of))
    }

    fn check_owner(&self, owner: Option<usize>) -> QuantResult<()> {
        match owner {
            Some(ordinal) if ordinal != self.ordinal => Err(QuantError::InvalidInput {
                detail: format!(
                    "matrix is resident on device {ordinal} but was passed to device {}",
                    self.ordinal
                ),
            }),
            _ => Ok(()),
        }
    }

    fn synchronize(&self) -> QuantResult<()> {
        // Launches run to completion inside `install`; an empty launch is the
        // barrier for anything a caller spawned onto the pool directly.
        self.pool.install(|| ());
        Ok(())
    }
}

/// Row-major matrix resident in a device's memory.
///
/// Created only by [`DeviceResources`]; views handed out by it carry the
/// [`Device`] memory-space tag.
#[derive(Debug, Clone)]
pub struct DeviceMatrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
    ordinal: usize,
}

impl<T> DeviceMatrix<T> {
    /// `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Ordinal of the owning device.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Read-only device view.
    #[must_use]
    pub fn view(&self) -> DeviceMatrixView<'_, T> {
        // The buffer was sized from (rows, cols) at allocation.
        MatrixView::new(&self.data, self.rows, self.cols)
            .unwrap_or_else(|_| unreachable!("device buffer length matches its shape"))
            .owned_by(self.ordinal)
    }

    /// Mutable device view.
    pub fn view_mut(&mut self) -> DeviceMatrixViewMut<'_, T> {
        MatrixViewMut::new(&mut self.data, self.rows, self.cols)
            .unwrap_or_else(|_| unreachable!("device buffer length matches its shape"))
            .owned_by(self.ordinal)
    }
}
