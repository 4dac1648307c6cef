//! End-to-end fixture tests for motionflow.
//!
//! These tests compare composed flow and end-point error against reference
//! values computed independently for a small scene with two overlapping
//! instances, a rotating camera and missing depth.
//!
//! Run with: cargo test fixture

use nalgebra::DMatrix;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use motionflow::{
    average_endpoint_error, dense_flow_from_motion, CameraIntrinsics, ChannelOrder,
    CompositorConfig, DepthMap, FlowEvaluator, FlowField, InstanceMask, RigidMotion,
    ValidityMask,
};

// ============================================================================
// Fixture JSON Schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct Fixture {
    height: usize,
    width: usize,
    depth: Vec<f64>,
    intrinsics: Vec<f64>,
    instance_motions: Vec<Vec<f64>>,
    instance_masks: Vec<Vec<f64>>,
    camera_motion: Vec<f64>,
    expected_flow_dy: Vec<f64>,
    expected_flow_dx: Vec<f64>,
    /// Interleaved (u, v) reference flow; undefined pixels are stored as 0.
    reference_flow_uv: Vec<f64>,
    /// (row, col) pixels whose reference flow is undefined.
    reference_invalid: Vec<[usize; 2]>,
    expected_epe: f64,
    expected_num_valid: usize,
}

// ============================================================================
// Test Helpers
// ============================================================================

fn find_testdata_dir() -> PathBuf {
    let candidates = [
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/fixtures"),
        PathBuf::from("testdata/fixtures"),
        PathBuf::from("../testdata/fixtures"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return candidate.clone();
        }
    }
    panic!("Could not find testdata/fixtures directory");
}

fn load_fixture(scenario: &str) -> Fixture {
    let path = find_testdata_dir().join(format!("fixture_{}.json", scenario));

    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));

    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

fn compose(fixture: &Fixture) -> FlowField {
    let (h, w) = (fixture.height, fixture.width);
    let depth = DepthMap::from_row_slice(h, w, &fixture.depth).expect("valid depth");
    let intrinsics = CameraIntrinsics::from_slice(&fixture.intrinsics).expect("valid intrinsics");
    let motions: Vec<RigidMotion> = fixture
        .instance_motions
        .iter()
        .map(|m| RigidMotion::from_slice(m).expect("valid motion"))
        .collect();
    let masks: Vec<InstanceMask> = fixture
        .instance_masks
        .iter()
        .map(|m| InstanceMask::new(DMatrix::from_row_slice(h, w, m)))
        .collect();
    let camera = RigidMotion::from_slice(&fixture.camera_motion).expect("valid camera motion");

    dense_flow_from_motion(
        &depth,
        &motions,
        &masks,
        &camera,
        &intrinsics,
        &CompositorConfig::default(),
    )
    .expect("composition succeeds")
}

/// Reference flow with NaN restored at undefined pixels.
fn reference(fixture: &Fixture) -> FlowField {
    let mut flow = FlowField::from_interleaved(
        fixture.height,
        fixture.width,
        &fixture.reference_flow_uv,
        ChannelOrder::XY,
    )
    .expect("valid reference flow");
    for &[r, c] in &fixture.reference_invalid {
        flow.dy[(r, c)] = f64::NAN;
        flow.dx[(r, c)] = f64::NAN;
    }
    flow
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn fixture_two_instances_composed_flow() {
    let fixture = load_fixture("two_instances");
    let flow = compose(&fixture);

    for r in 0..fixture.height {
        for c in 0..fixture.width {
            let i = r * fixture.width + c;
            let (dy, dx) = flow.get(r, c);
            assert!(
                (dy - fixture.expected_flow_dy[i]).abs() < 1e-9,
                "pixel ({}, {}): dy expected {}, got {}",
                r,
                c,
                fixture.expected_flow_dy[i],
                dy
            );
            assert!(
                (dx - fixture.expected_flow_dx[i]).abs() < 1e-9,
                "pixel ({}, {}): dx expected {}, got {}",
                r,
                c,
                fixture.expected_flow_dx[i],
                dx
            );
        }
    }
}

#[test]
fn fixture_two_instances_epe() {
    let fixture = load_fixture("two_instances");
    let flow = compose(&fixture);

    let reference = reference(&fixture);
    let validity = ValidityMask::from_reference_flow(&reference);
    assert_eq!(validity.num_valid(), fixture.expected_num_valid);

    let reference = reference.sanitized();
    let epe = average_endpoint_error(&flow, &reference, &validity).unwrap();
    assert!(
        (epe - fixture.expected_epe).abs() < 1e-9,
        "EPE expected {}, got {}",
        fixture.expected_epe,
        epe
    );

    let evaluation = FlowEvaluator::default()
        .evaluate(&flow, &reference, &validity)
        .unwrap();
    assert!((evaluation.average_epe - fixture.expected_epe).abs() < 1e-9);
    // the single perturbed pixel has error 5 > 3 px
    assert!((evaluation.outlier_ratio - 1.0 / fixture.expected_num_valid as f64).abs() < 1e-12);
}
