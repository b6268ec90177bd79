//! In-process stand-in for libxgboost used by unit tests.
//!
//! Mirrors the parts of the C API contract the wrappers depend on:
//! - handles are opaque non-null pointers, tracked until freed
//! - matrices keep a pointer to the caller's buffer instead of copying it
//! - the predict output array is library-owned and overwritten with NaN
//!   on every subsequent call
//!
//! Scores are deterministic: tree `t` contributes `(t + 1) * 0.1` times the
//! sum of the row's non-missing values, so results depend only on which
//! features are set.

use super::xgb_ffi::{BstUlong, RawHandle, XgbApi};
use libc::{c_char, c_float, c_int, c_uint, c_void};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::CStr;

/// Number of trees in every fake model.
pub(crate) const FAKE_TREES: usize = 4;

struct FakeMatrix {
    data: usize,
    rows: usize,
    cols: usize,
    missing: f32,
}

#[derive(Default)]
struct FakeState {
    next_id: usize,
    boosters: HashMap<usize, bool>,
    matrices: HashMap<usize, FakeMatrix>,
    result: Vec<f32>,
    booster_frees: usize,
    matrix_frees: usize,
    fail_create_booster: bool,
    fail_create_matrix: bool,
    fail_predict: bool,
    fail_next_free: bool,
    model_loads: usize,
    last_model_path: Vec<u8>,
    last_error: Option<String>,
}

impl FakeState {
    fn fail(&mut self, msg: impl Into<String>) -> c_int {
        self.last_error = Some(msg.into());
        -1
    }

    fn alloc_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    fn poison_result(&mut self) {
        self.result.iter_mut().for_each(|v| *v = f32::NAN);
    }
}

pub(crate) struct FakeXgb {
    state: Mutex<FakeState>,
}

impl FakeXgb {
    pub(crate) fn new() -> Self {
        let state = FakeState {
            result: Vec::with_capacity(1024),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub(crate) fn fail_create_booster(&self) {
        self.state.lock().fail_create_booster = true;
    }

    pub(crate) fn fail_create_matrix(&self) {
        self.state.lock().fail_create_matrix = true;
    }

    pub(crate) fn fail_predict(&self) {
        self.state.lock().fail_predict = true;
    }

    pub(crate) fn fail_next_free(&self) {
        self.state.lock().fail_next_free = true;
    }

    pub(crate) fn booster_frees(&self) -> usize {
        self.state.lock().booster_frees
    }

    pub(crate) fn matrix_frees(&self) -> usize {
        self.state.lock().matrix_frees
    }

    /// Calls that reached `booster_load_model`.
    pub(crate) fn model_loads(&self) -> usize {
        self.state.lock().model_loads
    }

    /// Raw bytes of the last path passed to `booster_load_model`.
    pub(crate) fn last_model_path(&self) -> Vec<u8> {
        self.state.lock().last_model_path.clone()
    }

    pub(crate) fn live_boosters(&self) -> usize {
        self.state.lock().boosters.len()
    }

    pub(crate) fn live_matrices(&self) -> usize {
        self.state.lock().matrices.len()
    }

    /// Address of the buffer a live matrix reads from.
    pub(crate) fn matrix_data(&self, raw: RawHandle) -> Option<usize> {
        self.state.lock().matrices.get(&(raw as usize)).map(|m| m.data)
    }

    /// Create a booster without going through the wrappers.
    pub(crate) fn create_booster_raw(&self) -> RawHandle {
        let mut out: RawHandle = std::ptr::null_mut();
        let ret = unsafe { self.booster_create(std::ptr::null(), 0, &mut out) };
        assert_eq!(ret, 0);
        out
    }
}

fn row_sum(row: &[f32], missing: f32) -> f32 {
    row.iter()
        .filter(|v| {
            if missing.is_nan() {
                !v.is_nan()
            } else {
                **v != missing
            }
        })
        .sum()
}

fn tree_weight(tree: usize) -> f32 {
    (tree + 1) as f32 * 0.1
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl XgbApi for FakeXgb {
    unsafe fn booster_create(
        &self,
        _dmats: *const RawHandle,
        len: BstUlong,
        out: *mut RawHandle,
    ) -> c_int {
        let mut state = self.state.lock();
        state.poison_result();
        if state.fail_create_booster {
            return state.fail("booster allocation failed");
        }
        if len != 0 {
            return state.fail("cached training matrices are not supported");
        }
        let id = state.alloc_id();
        state.boosters.insert(id, false);
        *out = id as *mut c_void;
        0
    }

    unsafe fn booster_load_model(&self, handle: RawHandle, fname: *const c_char) -> c_int {
        let mut state = self.state.lock();
        state.poison_result();
        state.model_loads += 1;
        let fname = CStr::from_ptr(fname);
        state.last_model_path = fname.to_bytes().to_vec();
        let path = fname.to_string_lossy().into_owned();
        if !state.boosters.contains_key(&(handle as usize)) {
            return state.fail("invalid booster handle");
        }
        if path.contains("missing") || path.contains("corrupt") {
            return state.fail(format!("failed to read model file {}", path));
        }
        state.boosters.insert(handle as usize, true);
        0
    }

    unsafe fn dmatrix_create_from_mat(
        &self,
        data: *const c_float,
        nrow: BstUlong,
        ncol: BstUlong,
        missing: c_float,
        out: *mut RawHandle,
    ) -> c_int {
        let mut state = self.state.lock();
        state.poison_result();
        if state.fail_create_matrix {
            return state.fail("matrix allocation failed");
        }
        if data.is_null() || nrow == 0 || ncol == 0 {
            return state.fail("empty matrix");
        }
        let id = state.alloc_id();
        state.matrices.insert(
            id,
            FakeMatrix {
                data: data as usize,
                rows: nrow as usize,
                cols: ncol as usize,
                missing,
            },
        );
        *out = id as *mut c_void;
        0
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
        let mut state = self.state.lock();
        state.poison_result();
        if state.fail_predict {
            return state.fail("prediction failed");
        }
        match state.boosters.get(&(handle as usize)) {
            Some(true) => {}
            Some(false) => return state.fail("booster has no model"),
            None => return state.fail("invalid booster handle"),
        }
        let (data, rows, cols, missing) = match state.matrices.get(&(dmat as usize)) {
            Some(m) => (m.data as *const f32, m.rows, m.cols, m.missing),
            None => return state.fail("invalid matrix handle"),
        };
        let values = std::slice::from_raw_parts(data, rows * cols);
        let trees = match ntree_limit as usize {
            0 => FAKE_TREES,
            n => n.min(FAKE_TREES),
        };
        let total_weight: f32 = (0..trees).map(tree_weight).sum();

        let mut result = std::mem::take(&mut state.result);
        result.clear();
        for row in values.chunks(cols) {
            let margin = total_weight * row_sum(row, missing);
            match option_mask {
                0 => result.push(sigmoid(margin)),
                1 => result.push(margin),
                2 => result.extend((0..trees).map(|t| (t * 2 + usize::from(margin > 0.0)) as f32)),
                4 => {
                    result.extend(row.iter().map(|v| {
                        let present = if missing.is_nan() { !v.is_nan() } else { *v != missing };
                        if present {
                            total_weight * v
                        } else {
                            0.0
                        }
                    }));
                    result.push(0.0);
                }
                other => {
                    state.result = result;
                    return state.fail(format!("unsupported option_mask {}", other));
                }
            }
        }
        state.result = result;
        *out_len = state.result.len() as BstUlong;
        *out_result = state.result.as_ptr();
        0
    }

    unsafe fn dmatrix_free(&self, handle: RawHandle) -> c_int {
        let mut state = self.state.lock();
        state.poison_result();
        if std::mem::take(&mut state.fail_next_free) {
            state.matrices.remove(&(handle as usize));
            return state.fail("matrix free failed");
        }
        if state.matrices.remove(&(handle as usize)).is_none() {
            return state.fail("double free of matrix handle");
        }
        state.matrix_frees += 1;
        0
    }

    unsafe fn booster_free(&self, handle: RawHandle) -> c_int {
        let mut state = self.state.lock();
        state.poison_result();
        if std::mem::take(&mut state.fail_next_free) {
            state.boosters.remove(&(handle as usize));
            return state.fail("booster free failed");
        }
        if state.boosters.remove(&(handle as usize)).is_none() {
            return state.fail("double free of booster handle");
        }
        state.booster_frees += 1;
        0
    }

    fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }
}
