//! FFI bindings to the XGBoost C API.
//!
//! These bindings match the subset of `xgboost/c_api.h` needed for
//! inference: booster lifecycle, dense matrix construction and prediction.
//!
//! All wrappers go through [`XgbApi`] rather than calling the extern
//! functions directly, so the same ownership code runs against the linked
//! library ([`NativeXgb`], `native` feature) or an in-process stand-in.

use libc::{c_char, c_float, c_int, c_uint, c_void};

/// `bst_ulong` from c_api.h
pub type BstUlong = u64;

/// Opaque `BoosterHandle` / `DMatrixHandle`
pub type RawHandle = *mut c_void;

/// The foreign entry points used by this crate.
///
/// Every status-returning method follows the C API convention: `0` on
/// success, nonzero (normally `-1`) on failure, with a message available
/// from [`XgbApi::last_error`].
///
/// # Safety
///
/// Implementations receive raw pointers exactly as the C API does. Callers
/// must uphold the C API contract for each call: output pointers are valid
/// for writes, handles are live, `data` covers `nrow * ncol` floats and
/// outlives the matrix created from it.
pub trait XgbApi: Send + Sync {
    /// `XGBoosterCreate(dmats, len, out)`
    unsafe fn booster_create(
        &self,
        dmats: *const RawHandle,
        len: BstUlong,
        out: *mut RawHandle,
    ) -> c_int;

    /// `XGBoosterLoadModel(handle, fname)`
    unsafe fn booster_load_model(&self, handle: RawHandle, fname: *const c_char) -> c_int;

    /// `XGDMatrixCreateFromMat(data, nrow, ncol, missing, out)`
    unsafe fn dmatrix_create_from_mat(
        &self,
        data: *const c_float,
        nrow: BstUlong,
        ncol: BstUlong,
        missing: c_float,
        out: *mut RawHandle,
    ) -> c_int;

    /// `XGBoosterPredict(handle, dmat, option_mask, ntree_limit, out_len, out_result)`
    ///
    /// `out_result` is owned by the library and only valid until the next
    /// call into it.
    unsafe fn booster_predict(
        &self,
        handle: RawHandle,
        dmat: RawHandle,
        option_mask: c_int,
        ntree_limit: c_uint,
        out_len: *mut BstUlong,
        out_result: *mut *const c_float,
    ) -> c_int;

    /// `XGDMatrixFree(handle)`
    unsafe fn dmatrix_free(&self, handle: RawHandle) -> c_int;

    /// `XGBoosterFree(handle)`
    unsafe fn booster_free(&self, handle: RawHandle) -> c_int;

    /// `XGBGetLastError()`, copied out of library memory.
    fn last_error(&self) -> Option<String>;
}

/// Last error message, or a placeholder when the library has none.
pub(crate) fn error_detail(api: &dyn XgbApi) -> String {
    api.last_error()
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[cfg(feature = "native")]
mod native {
    use super::{BstUlong, RawHandle, XgbApi};
    use libc::{c_char, c_float, c_int, c_uint};
    use std::ffi::CStr;

    // Link directives are emitted by build.rs
    extern "C" {
        fn XGBGetLastError() -> *const c_char;

        fn XGBoosterCreate(dmats: *const RawHandle, len: BstUlong, out: *mut RawHandle) -> c_int;

        fn XGBoosterLoadModel(handle: RawHandle, fname: *const c_char) -> c_int;

        fn XGDMatrixCreateFromMat(
            data: *const c_float,
            nrow: BstUlong,
            ncol: BstUlong,
            missing: c_float,
            out: *mut RawHandle,
        ) -> c_int;

        fn XGBoosterPredict(
            handle: RawHandle,
            dmat: RawHandle,
            option_mask: c_int,
            ntree_limit: c_uint,
            out_len: *mut BstUlong,
            out_result: *mut *const c_float,
        ) -> c_int;

        fn XGDMatrixFree(handle: RawHandle) -> c_int;

        fn XGBoosterFree(handle: RawHandle) -> c_int;
    }

    /// The linked libxgboost.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NativeXgb;

    impl XgbApi for NativeXgb {
        unsafe fn booster_create(
            &self,
            dmats: *const RawHandle,
            len: BstUlong,
            out: *mut RawHandle,
        ) -> c_int {
            XGBoosterCreate(dmats, len, out)
        }

        unsafe fn booster_load_model(&self, handle: RawHandle, fname: *const c_char) -> c_int {
            XGBoosterLoadModel(handle, fname)
        }

        unsafe fn dmatrix_create_from_mat(
            &self,
            data: *const c_float,
            nrow: BstUlong,
            ncol: BstUlong,
            missing: c_float,
            out: *mut RawHandle,
        ) -> c_int {
            XGDMatrixCreateFromMat(data, nrow, ncol, missing, out)
        }

        unsafe fn booster_predict(
            &self,
            handle: RawHandle,
            dmat: RawHandle,
            option_mask: c_int,
            ntree_limit: c_uint,
            out_len: *mut BstUlong,
            out_result: *mut *const c_float,
        ) -> c_int {
            XGBoosterPredict(handle, dmat, option_mask, ntree_limit, out_len, out_result)
        }

        unsafe fn dmatrix_free(&self, handle: RawHandle) -> c_int {
            XGDMatrixFree(handle)
        }

        unsafe fn booster_free(&self, handle: RawHandle) -> c_int {
            XGBoosterFree(handle)
        }

        fn last_error(&self) -> Option<String> {
            unsafe {
                let ptr = XGBGetLastError();
                if ptr.is_null() {
                    return None;
                }
                Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
            }
        }
    }
}

#[cfg(feature = "native")]
pub use native::NativeXgb;
