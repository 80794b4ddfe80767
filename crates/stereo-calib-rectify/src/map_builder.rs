use crate::policy::{resolve_target_camera, Rect, UndistortPolicy};
use crate::RectifyError;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use stereo_calib_core::{CameraCalibration, PinholeIntrinsics, RemapTable};

/// A remap table together with the camera it was derived against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UndistortMap {
    pub table: RemapTable,
    /// Intrinsics of the undistorted destination image.
    pub target_intrinsics: PinholeIntrinsics,
    /// Destination-pixel region guaranteed to sample inside the source.
    pub valid_region: Rect,
}

/// Derive the per-pixel undistortion map for one camera.
///
/// Pure function of its inputs: identical calibration, resolution and
/// policy produce bit-identical tables. Each destination pixel is pushed
/// through the inverse target projection, forward-distorted, and
/// reprojected through the source intrinsics; entries keep fractional
/// precision so the applier can use any interpolation kernel.
pub fn build_undistort_map(
    calibration: &CameraCalibration,
    target_resolution: (u32, u32),
    policy: UndistortPolicy,
) -> Result<UndistortMap, RectifyError> {
    let target = resolve_target_camera(calibration, target_resolution, policy)?;

    let (width, height) = (target_resolution.0 as usize, target_resolution.1 as usize);
    let mut map_x = vec![0.0f32; width * height];
    let mut map_y = vec![0.0f32; width * height];

    for y in 0..height {
        for x in 0..width {
            let n = target
                .intrinsics
                .normalize(Point2::new(x as f64, y as f64));
            let d = calibration.distortion.distort(&n);
            let src = calibration.intrinsics.denormalize(d);

            let idx = y * width + x;
            map_x[idx] = src.x as f32;
            map_y[idx] = src.y as f32;
        }
    }

    debug!(
        "undistort map built for {width}x{height}, target fx={:.2} fy={:.2}",
        target.intrinsics.fx, target.intrinsics.fy
    );
    Ok(UndistortMap {
        table: RemapTable::from_planes(width, height, map_x, map_y)?,
        target_intrinsics: target.intrinsics,
        valid_region: target.valid_region,
    })
}

/// Quantize a remap table into two 16-bit planes for visual inspection.
///
/// Each axis is rescaled by the table resolution into `[0, 65535]`
/// (out-of-frame entries clamp to the ends). Debug artifact only; the
/// rectification path always consumes the full-precision table.
pub fn quantize_map_for_preview(table: &RemapTable) -> (Vec<u16>, Vec<u16>) {
    let quantize = |v: f32, denom: f32| -> u16 {
        let norm = (v / denom).clamp(0.0, 1.0);
        (norm * 65535.0).round() as u16
    };

    let w = table.width as f32;
    let h = table.height as f32;
    let plane_x = table.map_x.iter().map(|&v| quantize(v, w)).collect();
    let plane_y = table.map_y.iter().map(|&v| quantize(v, h)).collect();
    (plane_x, plane_y)
}
