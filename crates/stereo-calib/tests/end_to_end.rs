//! End-to-end scenarios over the full calibrate -> store -> map ->
//! rectify chain, driven by synthetic geometry with known ground truth.

use nalgebra::{Point2, Point3, Rotation3, Vector3};
use stereo_calib::store::{self, CalibrationRecord};
use stereo_calib::{
    build_undistort_map, BrownConrady5, CalibrationEstimator, CameraCalibration, ChessboardSpec,
    GrayImage, PinholeIntrinsics, RemapTable, StereoRectificationMaps, StereoRectifier,
    UndistortPolicy, ViewPose,
};
use stereo_calib_core::project_point;

fn ground_truth_camera() -> (PinholeIntrinsics, BrownConrady5) {
    (
        PinholeIntrinsics {
            fx: 960.0,
            fy: 955.0,
            cx: 648.0,
            cy: 354.0,
            skew: 0.0,
        },
        BrownConrady5 {
            k1: -0.21,
            k2: 0.06,
            p1: 0.0009,
            p2: -0.0007,
            k3: 0.0,
        },
    )
}

/// Render the 9x6 board through the ground-truth model for `n` poses
/// spread over tilt, roll and distance.
fn render_views(
    intr: &PinholeIntrinsics,
    dist: &BrownConrady5,
    n: usize,
) -> (Vec<Vec<Point3<f64>>>, Vec<Vec<Point2<f64>>>) {
    let board = ChessboardSpec::default().object_points();

    let mut object_sets = Vec::new();
    let mut image_sets = Vec::new();
    for i in 0..n {
        let phase = i as f64 * 0.61;
        let pose = ViewPose::from_rotation(
            &Rotation3::from_euler_angles(
                0.3 * phase.sin(),
                0.3 * (phase + 1.1).cos(),
                0.15 * (phase * 0.7).sin(),
            ),
            Vector3::new(
                -0.1 + 0.05 * phase.cos(),
                -0.075 + 0.04 * phase.sin(),
                0.45 + 0.03 * (i % 5) as f64,
            ),
        );
        object_sets.push(board.clone());
        image_sets.push(
            board
                .iter()
                .map(|p| project_point(intr, dist, &pose, p))
                .collect(),
        );
    }
    (object_sets, image_sets)
}

#[test]
fn twenty_views_recover_the_camera_model() {
    let (intr_gt, dist_gt) = ground_truth_camera();
    let (object_sets, image_sets) = render_views(&intr_gt, &dist_gt, 20);

    let calibration = CalibrationEstimator::default()
        .estimate(&object_sets, &image_sets, (1280, 720))
        .expect("calibration");

    assert!(
        calibration.reprojection_rms < 0.5,
        "rms {} px",
        calibration.reprojection_rms
    );
    assert!((calibration.intrinsics.fx - intr_gt.fx).abs() / intr_gt.fx < 0.01);
    assert!((calibration.intrinsics.fy - intr_gt.fy).abs() / intr_gt.fy < 0.01);
    assert!((calibration.distortion.k1 - dist_gt.k1).abs() < 0.01);
    assert!((calibration.distortion.k2 - dist_gt.k2).abs() < 0.01);
    assert!((calibration.distortion.p1 - dist_gt.p1).abs() < 0.01);
    assert!((calibration.distortion.p2 - dist_gt.p2).abs() < 0.01);
    assert!((calibration.distortion.k3 - dist_gt.k3).abs() < 0.01);
    assert_eq!(calibration.poses.len(), 20);
}

#[test]
fn calibration_artifact_round_trips_through_the_store() {
    let (intr_gt, dist_gt) = ground_truth_camera();
    let (object_sets, image_sets) = render_views(&intr_gt, &dist_gt, 6);

    let calibration = CalibrationEstimator::default()
        .estimate(&object_sets, &image_sets, (1280, 720))
        .expect("calibration");
    let map = build_undistort_map(
        &calibration,
        calibration.resolution,
        UndistortPolicy::Balanced { alpha: 1.0 },
    )
    .expect("map");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("camera.json");
    let record = CalibrationRecord {
        calibration,
        undistort_map: Some(map),
    };
    store::save_calibration(&path, &record).unwrap();
    let loaded = store::load_calibration(&path).unwrap();

    // Bit-exact equality across every numeric field, map included.
    assert_eq!(loaded, record);
}

#[test]
fn rebuilding_maps_from_a_loaded_artifact_is_bit_identical() {
    let (intr_gt, dist_gt) = ground_truth_camera();
    let (object_sets, image_sets) = render_views(&intr_gt, &dist_gt, 5);
    let calibration = CalibrationEstimator::default()
        .estimate(&object_sets, &image_sets, (1280, 720))
        .expect("calibration");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("camera.json");
    store::save_calibration(
        &path,
        &CalibrationRecord {
            calibration: calibration.clone(),
            undistort_map: None,
        },
    )
    .unwrap();
    let loaded = store::load_calibration(&path).unwrap().calibration;

    let policy = UndistortPolicy::Balanced { alpha: 0.3 };
    let before = build_undistort_map(&calibration, calibration.resolution, policy).unwrap();
    let after = build_undistort_map(&loaded, loaded.resolution, policy).unwrap();
    assert_eq!(before, after);
}

fn identity_table(width: usize, height: usize) -> RemapTable {
    let mut map_x = Vec::with_capacity(width * height);
    let mut map_y = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            map_x.push(x as f32);
            map_y.push(y as f32);
        }
    }
    RemapTable::from_planes(width, height, map_x, map_y).unwrap()
}

#[test]
fn identity_stereo_maps_pass_solid_pairs_through_the_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo_maps.json.gz");

    let maps = StereoRectificationMaps {
        left: identity_table(640, 480),
        right: identity_table(640, 480),
    };
    store::save_stereo_maps(&path, &maps).unwrap();
    let rectifier = StereoRectifier::new(store::load_stereo_maps(&path).unwrap());

    let left = GrayImage::from_vec(640, 480, vec![60; 640 * 480]).unwrap();
    let right = GrayImage::from_vec(640, 480, vec![200; 640 * 480]).unwrap();
    let (out_left, out_right) = rectifier
        .rectify_pair(&left.view(), &right.view())
        .expect("rectify");

    assert_eq!(out_left, left);
    assert_eq!(out_right, right);
}

#[test]
fn undistorting_through_built_maps_straightens_the_model() {
    // Remapping the distorted projection of a known grid through the
    // identity-policy map must land each grid point back on its pinhole
    // projection: the map encodes exactly the forward distortion.
    let (intr, dist) = ground_truth_camera();
    let calibration = CameraCalibration {
        intrinsics: intr,
        distortion: dist,
        poses: Vec::new(),
        resolution: (1280, 720),
        reprojection_rms: 0.0,
    };
    let map = build_undistort_map(&calibration, (1280, 720), UndistortPolicy::Identity).unwrap();

    for (x, y) in [(100usize, 100usize), (640, 360), (1200, 650), (30, 700)] {
        let (sx, sy) = map.table.source_of(x, y);

        let n = intr.normalize(Point2::new(x as f64, y as f64));
        let expected = intr.denormalize(dist.distort(&n));
        assert!((sx as f64 - expected.x).abs() < 1e-3, "x at ({x},{y})");
        assert!((sy as f64 - expected.y).abs() < 1e-3, "y at ({x},{y})");
    }
}
