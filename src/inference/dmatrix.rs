//! Dense input matrices borrowed from caller buffers.

use super::error::{XgbError, XgbResult};
use super::handle::{MatrixKind, NativeHandle};
use super::xgb_ffi::{error_detail, BstUlong, RawHandle, XgbApi};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A `DMatrixHandle` that reads directly from a caller-owned buffer.
///
/// XGBoost does not copy the data passed to `XGDMatrixCreateFromMat`, so
/// the matrix borrows the buffer for `'a`: the buffer cannot be moved,
/// reallocated, mutated or returned to a pool until the matrix is freed.
#[derive(Debug)]
pub struct DMatrix<'a> {
    handle: NativeHandle<MatrixKind>,
    rows: usize,
    cols: usize,
    _data: PhantomData<&'a [f32]>,
}

impl<'a> DMatrix<'a> {
    /// Wrap `buffer` (row-major, `rows * cols` values) in a matrix handle.
    ///
    /// Values equal to `missing` are treated as absent by the engine. Extra
    /// values past `rows * cols` are ignored.
    pub fn from_dense(
        api: Arc<dyn XgbApi>,
        buffer: &'a [f32],
        rows: usize,
        cols: usize,
        missing: f32,
    ) -> XgbResult<Self> {
        let needed = rows.checked_mul(cols).unwrap_or(usize::MAX);
        if rows == 0 || cols == 0 || buffer.len() < needed {
            return Err(XgbError::ShapeMismatch {
                len: buffer.len(),
                rows,
                cols,
            });
        }

        let mut raw: RawHandle = std::ptr::null_mut();
        let ret = unsafe {
            api.dmatrix_create_from_mat(
                buffer.as_ptr(),
                rows as BstUlong,
                cols as BstUlong,
                missing,
                &mut raw,
            )
        };

        if ret != 0 {
            return Err(XgbError::CreateMatrix {
                rows,
                cols,
                detail: error_detail(api.as_ref()),
            });
        }

        debug!("Created {}x{} DMatrix {:p}", rows, cols, raw);
        let handle = unsafe { NativeHandle::from_raw(api, raw) };
        Ok(Self {
            handle,
            rows,
            cols,
            _data: PhantomData,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) fn raw(&self) -> XgbResult<RawHandle> {
        self.handle.raw()
    }

    pub(crate) fn api_arc(&self) -> &Arc<dyn XgbApi> {
        self.handle.api_arc()
    }

    /// Free the matrix, ending the borrow of its buffer.
    ///
    /// Dropping the matrix does the same but can only log a failure.
    pub fn free(mut self) -> XgbResult<()> {
        self.handle.release()
    }
}
