//! Row-major matrix views tagged with the memory space they live in.
//!
//! Views never own the caller's buffers. The [`MemorySpace`] tag keeps host
//! and device data apart at compile time: an execution resource only accepts
//! views whose space matches its own.

use std::fmt;
use std::marker::PhantomData;

use crate::error::{QuantError, QuantResult};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Host {}
    impl Sealed for super::Device {}
}

/// Marker for the address space a matrix buffer is resident in.
pub trait MemorySpace: sealed::Sealed + Copy + Send + Sync + fmt::Debug + 'static {
    /// Label used in tracing fields.
    const LABEL: &'static str;
}

/// Host-addressable memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host;

/// Memory owned by the parallel device substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device;

impl MemorySpace for Host {
    const LABEL: &'static str = "host";
}

impl MemorySpace for Device {
    const LABEL: &'static str = "device";
}

fn check_len(len: usize, rows: usize, cols: usize) -> QuantResult<()> {
    // A product that overflows can never match a real buffer length.
    match rows.checked_mul(cols) {
        Some(expected) if expected == len => Ok(()),
        _ => Err(QuantError::ShapeMismatch {
            expected_rows: rows,
            expected_cols: cols,
            found_rows: if cols == 0 { 0 } else { len / cols },
            found_cols: cols,
        }),
    }
}

/// Element count of a `rows × cols` buffer.
///
/// # Errors
///
/// Returns `QuantError::InvalidInput` when the product overflows `usize`.
pub fn element_count(rows: usize, cols: usize) -> QuantResult<usize> {
    rows.checked_mul(cols).ok_or_else(|| QuantError::InvalidInput {
        detail: format!("{rows}x{cols} matrix exceeds the address space"),
    })
}

/// Read-only `rows × cols` row-major view.
#[derive(Clone, Copy)]
pub struct MatrixView<'a, T, S: MemorySpace = Host> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    owner: Option<usize>,
    _space: PhantomData<S>,
}

/// Mutable `rows × cols` row-major view.
pub struct MatrixViewMut<'a, T, S: MemorySpace = Host> {
    data: &'a mut [T],
    rows: usize,
    cols: usize,
    owner: Option<usize>,
    _space: PhantomData<S>,
}

/// Host view alias.
pub type HostMatrixView<'a, T> = MatrixView<'a, T, Host>;
/// Mutable host view alias.
pub type HostMatrixViewMut<'a, T> = MatrixViewMut<'a, T, Host>;
/// Device view alias.
pub type DeviceMatrixView<'a, T> = MatrixView<'a, T, Device>;
/// Mutable device view alias.
pub type DeviceMatrixViewMut<'a, T> = MatrixViewMut<'a, T, Device>;

impl<'a, T, S: MemorySpace> MatrixView<'a, T, S> {
    /// Wrap a row-major buffer.
    ///
    /// Device views are normally obtained from a device-resident buffer
    /// rather than built directly.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::ShapeMismatch` when `data.len() != rows * cols`.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> QuantResult<Self> {
        check_len(data.len(), rows, cols)?;
        Ok(Self {
            data,
            rows,
            cols,
            owner: None,
            _space: PhantomData,
        })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total element count.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` when either dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flattened row-major elements.
    #[must_use]
    pub const fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Ordinal of the device whose memory backs this view, when known.
    ///
    /// Views built with [`MatrixView::new`] carry no owner.
    #[must_use]
    pub const fn owner(&self) -> Option<usize> {
        self.owner
    }

    /// Record the device ordinal that owns the buffer.
    #[must_use]
    pub fn owned_by(mut self, ordinal: usize) -> Self {
        self.owner = Some(ordinal);
        self
    }

    /// Borrow row `index`, or `None` when out of range.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&'a [T]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.cols;
        self.data.get(start..start + self.cols)
    }
}

impl<'a, T, S: MemorySpace> MatrixViewMut<'a, T, S> {
    /// Wrap a mutable row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::ShapeMismatch` when `data.len() != rows * cols`.
    pub fn new(data: &'a mut [T], rows: usize, cols: usize) -> QuantResult<Self> {
        check_len(data.len(), rows, cols)?;
        Ok(Self {
            data,
            rows,
            cols,
            owner: None,
            _space: PhantomData,
        })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total element count.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` when either dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flattened row-major elements.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &*self.data
    }

    /// Flattened row-major elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Ordinal of the device whose memory backs this view, when known.
    #[must_use]
    pub const fn owner(&self) -> Option<usize> {
        self.owner
    }

    /// Record the device ordinal that owns the buffer.
    #[must_use]
    pub fn owned_by(mut self, ordinal: usize) -> Self {
        self.owner = Some(ordinal);
        self
    }

    /// Reborrow as a read-only view.
    #[must_use]
    pub fn as_view(&self) -> MatrixView<'_, T, S> {
        MatrixView {
            data: &*self.data,
            rows: self.rows,
            cols: self.cols,
            owner: self.owner,
            _space: PhantomData,
        }
    }
}

impl<T, S: MemorySpace> fmt::Debug for MatrixView<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixView")
            .field("space", &S::LABEL)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl<T, S: MemorySpace> fmt::Debug for MatrixViewMut<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixViewMut")
            .field("space", &S::LABEL)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Owned row-major host matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Matrix<T> {
    /// Take ownership of a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::ShapeMismatch` when `data.len() != rows * cols`.
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> QuantResult<Self> {
        check_len(data.len(), rows, cols)?;
        Ok(Self { data, rows, cols })
    }

    /// Build from equally sized rows.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::ShapeMismatch` when rows have different lengths.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> QuantResult<Self>
    where
        T: Clone,
    {
        let cols = rows.first().map_or(0, |row| row.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(QuantError::shape_mismatch(
                    (rows.len(), cols),
                    (index + 1, row.len()),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            cols,
        })
    }

    /// Matrix filled with `value`.
    ///
    /// # Errors
    ///
    /// Returns `QuantError::InvalidInput` when `rows * cols` overflows.
    pub fn filled(rows: usize, cols: usize, value: T) -> QuantResult<Self>
    where
        T: Clone,
    {
        let len = element_count(rows, cols)?;
        Ok(Self {
            data: vec![value; len],
            rows,
            cols,
        })
    }

    /// `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Flattened row-major elements.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume into the flattened buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Read-only host view.
    #[must_use]
    pub fn view(&self) -> HostMatrixView<'_, T> {
        MatrixView {
            data: &self.data,
            rows: self.rows,
            cols: self.cols,
            owner: None,
            _space: PhantomData,
        }
    }

    /// Mutable host view.
    pub fn view_mut(&mut self) -> HostMatrixViewMut<'_, T> {
        MatrixViewMut {
            data: &mut self.data,
            rows: self.rows,
            cols: self.cols,
            owner: None,
            _space: PhantomData,
        }
    }
}
