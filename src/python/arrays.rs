//! Conversions between numpy arrays and motionflow grids.

use nalgebra::DMatrix;
use numpy::ndarray::{Array3, ArrayView1, ArrayView2, ArrayView3};
use numpy::{IntoPyArray, PyArray3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::{ChannelOrder, FlowField, RgbImage, ValidityMask};

/// Map a library error to a Python `ValueError`.
pub fn to_py_err(err: crate::Error) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Copy an (H, W) array into a DMatrix.
pub fn array2_to_dmatrix(arr: &ArrayView2<'_, f64>) -> DMatrix<f64> {
    DMatrix::from_fn(arr.nrows(), arr.ncols(), |r, c| arr[[r, c]])
}

/// Copy a 1D array into a Vec.
pub fn array1_to_vec(arr: &ArrayView1<'_, f64>) -> Vec<f64> {
    arr.iter().cloned().collect()
}

/// Decode an (H, W, 2) array in (u, v) order.
pub fn array3_to_flow(arr: &ArrayView3<'_, f64>) -> PyResult<FlowField> {
    let (height, width, channels) = arr.dim();
    if channels != 2 {
        return Err(PyValueError::new_err(format!(
            "flow must have shape (H, W, 2), got (H, W, {})",
            channels
        )));
    }
    let data: Vec<f64> = arr.iter().cloned().collect();
    FlowField::from_interleaved(height, width, &data, ChannelOrder::XY).map_err(to_py_err)
}

/// Encode a flow field as an (H, W, 2) array in (u, v) order.
pub fn flow_to_array3<'py>(py: Python<'py>, flow: &FlowField) -> Bound<'py, PyArray3<f64>> {
    let (height, width) = flow.shape();
    let mut arr = Array3::zeros((height, width, 2));
    for r in 0..height {
        for c in 0..width {
            let (dy, dx) = flow.get(r, c);
            arr[[r, c, 0]] = dx;
            arr[[r, c, 1]] = dy;
        }
    }
    arr.into_pyarray_bound(py)
}

/// Encode an image as an (H, W, 3) array.
pub fn image_to_array3<'py>(py: Python<'py>, image: &RgbImage) -> Bound<'py, PyArray3<f64>> {
    let (height, width) = image.shape();
    let mut arr = Array3::zeros((height, width, 3));
    for r in 0..height {
        for c in 0..width {
            let px = image.get(r, c);
            for k in 0..3 {
                arr[[r, c, k]] = px[k];
            }
        }
    }
    arr.into_pyarray_bound(py)
}

/// Interpret an (H, W) weight array as a validity mask (weights above 0.5).
pub fn array2_to_validity(arr: &ArrayView2<'_, f64>) -> ValidityMask {
    ValidityMask::from_weights(&array2_to_dmatrix(arr))
}
