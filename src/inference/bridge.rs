//! Copy-out of library-owned prediction arrays.

/// Copy `len` values from a library-owned result array into `dst`.
///
/// Returns the number of values written. The source array is only valid
/// until the next call into the library, so this must run before anything
/// else touches it.
///
/// # Panics
///
/// Panics if `dst` cannot hold `len` values. A short buffer means the model's
/// output width does not match the configured result width; truncating would
/// silently drop predictions.
///
/// # Safety
///
/// When `len > 0`, `src` must point to at least `len` readable `f32`s that
/// stay valid for the duration of the call.
pub(crate) unsafe fn copy_prediction(src: *const f32, len: usize, dst: &mut [f32]) -> usize {
    assert!(
        len <= dst.len(),
        "prediction has {} values but the result buffer holds {}",
        len,
        dst.len()
    );
    if len == 0 {
        return 0;
    }
    assert!(!src.is_null(), "library returned {} values at a null pointer", len);

    let values = std::slice::from_raw_parts(src, len);
    dst[..len].copy_from_slice(values);
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_reported_count_only() {
        let src = [0.25f32, 0.5, 0.75];
        let mut dst = [9.0f32; 5];

        let n = unsafe { copy_prediction(src.as_ptr(), 2, &mut dst) };

        assert_eq!(n, 2);
        assert_eq!(dst, [0.25, 0.5, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_zero_length_ignores_pointer() {
        let mut dst = [1.0f32; 1];
        let n = unsafe { copy_prediction(std::ptr::null(), 0, &mut dst) };
        assert_eq!(n, 0);
        assert_eq!(dst, [1.0]);
    }

    #[test]
    #[should_panic(expected = "result buffer holds 1")]
    fn test_short_buffer_panics_instead_of_truncating() {
        let src = [1.0f32, 2.0];
        let mut dst = [0.0f32; 1];
        unsafe {
            copy_prediction(src.as_ptr(), 2, &mut dst);
        }
    }

    #[test]
    #[should_panic(expected = "null pointer")]
    fn test_null_source_with_values_panics() {
        let mut dst = [0.0f32; 4];
        unsafe {
            copy_prediction(std::ptr::null(), 3, &mut dst);
        }
    }
}
