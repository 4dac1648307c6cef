//! Python bindings for motionflow using PyO3.
//!
//! The functions take and return numpy arrays in the layouts used by the
//! dataset harness: flow as (H, W, 2) in (u, v) order, masks as float grids.

use numpy::{PyArray3, PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3};
use pyo3::prelude::*;

mod arrays;

use arrays::{
    array1_to_vec, array2_to_dmatrix, array2_to_validity, array3_to_flow, flow_to_array3,
    image_to_array3, to_py_err,
};

use crate::{
    CameraIntrinsics, ColorScale, CompositorConfig, DepthMap, ErrorImageStyle, InstanceMask,
    RigidMotion,
};

/// Compose dense flow from depth, instance motions and camera motion.
///
/// Args:
///     depth: (H, W) depth map.
///     motions: (N, 12) or (N, 15) flat instance motions.
///     masks: (N, H, W) instance masks.
///     camera_motion: (12,) or (15,) flat camera motion.
///     camera_intrinsics: (3,) [f, cx, cy] or (4,) [fx, fy, cx, cy].
///
/// Returns:
///     (H, W, 2) flow in (u, v) order.
#[pyfunction]
pub fn dense_flow_from_motion<'py>(
    py: Python<'py>,
    depth: PyReadonlyArray2<'py, f64>,
    motions: PyReadonlyArray2<'py, f64>,
    masks: PyReadonlyArray3<'py, f64>,
    camera_motion: PyReadonlyArray1<'py, f64>,
    camera_intrinsics: PyReadonlyArray1<'py, f64>,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    let depth = DepthMap::new(array2_to_dmatrix(&depth.as_array()));

    let motions_arr = motions.as_array();
    let instance_motions = motions_arr
        .outer_iter()
        .map(|row| RigidMotion::from_slice(&array1_to_vec(&row)))
        .collect::<crate::Result<Vec<_>>>()
        .map_err(to_py_err)?;

    let masks_arr = masks.as_array();
    let instance_masks: Vec<InstanceMask> = masks_arr
        .outer_iter()
        .map(|mask| InstanceMask::new(array2_to_dmatrix(&mask)))
        .collect();

    let camera = RigidMotion::from_slice(&array1_to_vec(&camera_motion.as_array()))
        .map_err(to_py_err)?;
    let intrinsics = CameraIntrinsics::from_slice(&array1_to_vec(&camera_intrinsics.as_array()))
        .map_err(to_py_err)?;

    let flow = crate::dense_flow_from_motion(
        &depth,
        &instance_motions,
        &instance_masks,
        &camera,
        &intrinsics,
        &CompositorConfig::default(),
    )
    .map_err(to_py_err)?;

    Ok(flow_to_array3(py, &flow))
}

/// Convert (H, W, 2) flow to an (H, W, 3) color image in [0, 1].
#[pyfunction]
#[pyo3(signature = (flow, mask=None, max_flow=None))]
pub fn flow_to_color<'py>(
    py: Python<'py>,
    flow: PyReadonlyArray3<'py, f64>,
    mask: Option<PyReadonlyArray2<'py, f64>>,
    max_flow: Option<f64>,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    let flow = array3_to_flow(&flow.as_array())?;
    let mask = mask.map(|m| array2_to_validity(&m.as_array()));
    let scale = max_flow.map_or(ColorScale::PerFieldMax, ColorScale::Fixed);

    let image = crate::flow_to_color(&flow, mask.as_ref(), scale).map_err(to_py_err)?;
    Ok(image_to_array3(py, &image))
}

/// Visualize the error between two (H, W, 2) flows as an (H, W, 3) image.
#[pyfunction]
#[pyo3(signature = (flow_1, flow_2, mask_occ, mask_noc=None, log_colors=true))]
pub fn flow_error_image<'py>(
    py: Python<'py>,
    flow_1: PyReadonlyArray3<'py, f64>,
    flow_2: PyReadonlyArray3<'py, f64>,
    mask_occ: PyReadonlyArray2<'py, f64>,
    mask_noc: Option<PyReadonlyArray2<'py, f64>>,
    log_colors: bool,
) -> PyResult<Bound<'py, PyArray3<f64>>> {
    let predicted = array3_to_flow(&flow_1.as_array())?;
    let reference = array3_to_flow(&flow_2.as_array())?;
    let validity = array2_to_validity(&mask_occ.as_array());
    let (height, width) = validity.shape();
    let non_occluded = match mask_noc {
        Some(m) => array2_to_validity(&m.as_array()),
        None => crate::ValidityMask::all_valid(height, width),
    };
    let style = if log_colors {
        ErrorImageStyle::LogColors
    } else {
        ErrorImageStyle::Linear
    };

    let image =
        crate::error_image_with_occlusion(&predicted, &reference, &validity, &non_occluded, style)
            .map_err(to_py_err)?;
    Ok(image_to_array3(py, &image))
}

/// Average end-point error between two (H, W, 2) flows over an (H, W) mask.
#[pyfunction]
pub fn flow_error_avg(
    flow_1: PyReadonlyArray3<'_, f64>,
    flow_2: PyReadonlyArray3<'_, f64>,
    mask: PyReadonlyArray2<'_, f64>,
) -> PyResult<f64> {
    let predicted = array3_to_flow(&flow_1.as_array())?;
    let reference = array3_to_flow(&flow_2.as_array())?;
    let validity = array2_to_validity(&mask.as_array());
    crate::average_endpoint_error(&predicted, &reference, &validity).map_err(to_py_err)
}

/// Python module for motionflow.
#[pymodule]
fn _motionflow(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(dense_flow_from_motion, m)?)?;
    m.add_function(wrap_pyfunction!(flow_to_color, m)?)?;
    m.add_function(wrap_pyfunction!(flow_error_image, m)?)?;
    m.add_function(wrap_pyfunction!(flow_error_avg, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
