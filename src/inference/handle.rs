//! Owned foreign handles with at-most-once release.

use super::error::{XgbError, XgbResult};
use super::xgb_ffi::{error_detail, RawHandle, XgbApi};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

/// Per-kind destructor and error mapping.
pub trait HandleKind {
    /// Name used in error messages and logs.
    const NAME: &'static str;

    /// Call the foreign destructor for this kind.
    ///
    /// # Safety
    ///
    /// `raw` must be a live handle of this kind created through `api`.
    unsafe fn destroy(api: &dyn XgbApi, raw: RawHandle) -> i32;

    /// Error returned when the destructor reports failure.
    fn free_error(detail: String) -> XgbError;
}

/// `BoosterHandle` kind.
#[derive(Debug)]
pub enum BoosterKind {}

/// `DMatrixHandle` kind.
#[derive(Debug)]
pub enum MatrixKind {}

impl HandleKind for BoosterKind {
    const NAME: &'static str = "Booster";

    unsafe fn destroy(api: &dyn XgbApi, raw: RawHandle) -> i32 {
        api.booster_free(raw)
    }

    fn free_error(detail: String) -> XgbError {
        XgbError::FreeBooster { detail }
    }
}

impl HandleKind for MatrixKind {
    const NAME: &'static str = "DMatrix";

    unsafe fn destroy(api: &dyn XgbApi, raw: RawHandle) -> i32 {
        api.dmatrix_free(raw)
    }

    fn free_error(detail: String) -> XgbError {
        XgbError::FreeMatrix { detail }
    }
}

/// A foreign handle with exactly one owner.
///
/// Neither `Clone` nor `Copy`: moving the value moves the obligation to
/// release it. Once released, the raw pointer is never handed out again.
pub struct NativeHandle<K: HandleKind> {
    raw: RawHandle,
    live: bool,
    api: Arc<dyn XgbApi>,
    _kind: PhantomData<K>,
}

// Safety: the handle is only reachable through its single owner, and the
// wrappers never call into the library through `&self` concurrently.
unsafe impl<K: HandleKind> Send for NativeHandle<K> {}

impl<K: HandleKind> NativeHandle<K> {
    /// Take ownership of a handle returned by a successful creation call.
    ///
    /// # Safety
    ///
    /// `raw` must be a live handle of kind `K` produced through `api` and not
    /// owned by anything else.
    pub(crate) unsafe fn from_raw(api: Arc<dyn XgbApi>, raw: RawHandle) -> Self {
        Self {
            raw,
            live: true,
            api,
            _kind: PhantomData,
        }
    }

    /// The raw pointer, or `HandleReleased` once the handle is gone.
    pub fn raw(&self) -> XgbResult<RawHandle> {
        if self.live {
            Ok(self.raw)
        } else {
            Err(XgbError::HandleReleased { kind: K::NAME })
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub(crate) fn api(&self) -> &dyn XgbApi {
        self.api.as_ref()
    }

    pub(crate) fn api_arc(&self) -> &Arc<dyn XgbApi> {
        &self.api
    }

    /// Release the handle through its foreign destructor.
    ///
    /// The handle counts as released even when the destructor reports
    /// failure; a second call never reaches the library.
    pub fn release(&mut self) -> XgbResult<()> {
        if !self.live {
            return Err(XgbError::HandleReleased { kind: K::NAME });
        }
        self.live = false;

        let ret = unsafe { K::destroy(self.api.as_ref(), self.raw) };
        if ret != 0 {
            return Err(K::free_error(error_detail(self.api.as_ref())));
        }
        Ok(())
    }
}

impl<K: HandleKind> fmt::Debug for NativeHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &K::NAME)
            .field("raw", &self.raw)
            .field("live", &self.live)
            .finish()
    }
}

impl<K: HandleKind> Drop for NativeHandle<K> {
    fn drop(&mut self) {
        if self.live {
            if let Err(e) = self.release() {
                warn!("Releasing {} handle on drop: {}", K::NAME, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::fake::FakeXgb;

    fn booster_handle(fake: &Arc<FakeXgb>) -> NativeHandle<BoosterKind> {
        let raw = fake.create_booster_raw();
        unsafe { NativeHandle::from_raw(fake.clone(), raw) }
    }

    #[test]
    fn test_release_twice_is_rejected() {
        let fake = Arc::new(FakeXgb::new());
        let mut handle = booster_handle(&fake);

        assert!(handle.release().is_ok());
        let err = handle.release().unwrap_err();
        assert!(matches!(err, XgbError::HandleReleased { kind: "Booster" }));
        assert_eq!(fake.booster_frees(), 1);
    }

    #[test]
    fn test_raw_fails_after_release() {
        let fake = Arc::new(FakeXgb::new());
        let mut handle = booster_handle(&fake);

        assert!(handle.raw().is_ok());
        handle.release().unwrap();
        assert!(!handle.is_live());
        assert!(matches!(
            handle.raw(),
            Err(XgbError::HandleReleased { .. })
        ));
    }

    #[test]
    fn test_drop_releases_live_handle_once() {
        let fake = Arc::new(FakeXgb::new());
        {
            let _handle = booster_handle(&fake);
        }
        assert_eq!(fake.booster_frees(), 1);

        {
            let mut handle = booster_handle(&fake);
            handle.release().unwrap();
        }
        assert_eq!(fake.booster_frees(), 2);
    }

    #[test]
    fn test_failed_destructor_still_marks_released() {
        let fake = Arc::new(FakeXgb::new());
        let mut handle = booster_handle(&fake);
        fake.fail_next_free();

        let err = handle.release().unwrap_err();
        assert!(matches!(err, XgbError::FreeBooster { .. }));
        assert!(!handle.is_live());
        assert!(matches!(
            handle.release(),
            Err(XgbError::HandleReleased { .. })
        ));
    }

    #[test]
    fn test_ownership_moves_without_duplicating_release() {
        let fake = Arc::new(FakeXgb::new());
        let handle = booster_handle(&fake);
        let moved = handle;
        drop(moved);
        assert_eq!(fake.booster_frees(), 1);
    }
}
