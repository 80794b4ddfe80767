use crate::RectifyError;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use stereo_calib_core::{CameraCalibration, PinholeIntrinsics, DEFAULT_UNDISTORT_ITERS};

/// Target-matrix policy of the undistortion map builder.
///
/// Both variants feed the same map-generation routine; the policy only
/// decides which intrinsic matrix the destination image is built
/// against.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum UndistortPolicy {
    /// Reuse the original intrinsic matrix: maximal sharpness, unchanged
    /// field of view, dark borders where the distortion footprint leaves
    /// the frame.
    Identity,
    /// Derive an optimal new intrinsic matrix controlled by
    /// `alpha` in [0, 1]: 0 crops to the largest all-valid rectangle,
    /// 1 keeps every original pixel including invalid border regions.
    Balanced { alpha: f64 },
}

/// Axis-aligned pixel rectangle, used for the valid-pixel region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Resolved destination camera for map generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetCamera {
    pub intrinsics: PinholeIntrinsics,
    /// Destination-pixel region guaranteed to sample inside the source
    /// frame; callers may crop to it.
    pub valid_region: Rect,
}

/// Number of samples per axis when probing the undistorted footprint.
const GRID_SAMPLES: usize = 17;

/// Resolve the policy into the target intrinsics and valid region for a
/// given output resolution.
pub fn resolve_target_camera(
    calibration: &CameraCalibration,
    target_resolution: (u32, u32),
    policy: UndistortPolicy,
) -> Result<TargetCamera, RectifyError> {
    match policy {
        UndistortPolicy::Identity => Ok(TargetCamera {
            intrinsics: calibration.intrinsics,
            valid_region: Rect {
                x: 0,
                y: 0,
                width: target_resolution.0,
                height: target_resolution.1,
            },
        }),
        UndistortPolicy::Balanced { alpha } => {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(RectifyError::InvalidAlpha(alpha));
            }
            Ok(balanced_target(calibration, target_resolution, alpha))
        }
    }
}

/// Optimal-new-camera-matrix derivation.
///
/// Probes a grid over the source frame, undistorts it into the
/// normalized plane, and bounds the footprint twice: the outer
/// rectangle encloses every undistorted sample (alpha = 1 keeps all
/// source pixels), the inner rectangle is clipped by the extreme
/// samples of each edge (alpha = 0 keeps only all-valid pixels). The
/// blended rectangle is then mapped onto the full target resolution.
fn balanced_target(
    calibration: &CameraCalibration,
    target_resolution: (u32, u32),
    alpha: f64,
) -> TargetCamera {
    let intr = &calibration.intrinsics;
    let dist = &calibration.distortion;
    let (src_w, src_h) = calibration.resolution;
    let (dst_w, dst_h) = (target_resolution.0 as f64, target_resolution.1 as f64);

    let n = GRID_SAMPLES;
    let step_x = (src_w as f64 - 1.0) / (n - 1) as f64;
    let step_y = (src_h as f64 - 1.0) / (n - 1) as f64;

    // Undistorted normalized coordinates of the sample grid.
    let mut grid = vec![[0.0f64; 2]; n * n];
    for (idx, cell) in grid.iter_mut().enumerate() {
        let (i, j) = (idx % n, idx / n);
        let pixel = Point2::new(i as f64 * step_x, j as f64 * step_y);
        let und = dist.undistort(&intr.normalize(pixel), DEFAULT_UNDISTORT_ITERS);
        *cell = [und.x, und.y];
    }

    let mut outer = [f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY];
    for c in &grid {
        outer[0] = outer[0].min(c[0]);
        outer[1] = outer[1].max(c[0]);
        outer[2] = outer[2].min(c[1]);
        outer[3] = outer[3].max(c[1]);
    }

    // Inner bounds: the most constraining sample of each source edge.
    let mut inner = [f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY];
    for k in 0..n {
        let left = grid[k * n];
        let right = grid[k * n + n - 1];
        let top = grid[k];
        let bottom = grid[(n - 1) * n + k];
        inner[0] = inner[0].max(left[0]);
        inner[1] = inner[1].min(right[0]);
        inner[2] = inner[2].max(top[1]);
        inner[3] = inner[3].min(bottom[1]);
    }

    let rect_to_k = |x0: f64, x1: f64, y0: f64, y1: f64| -> PinholeIntrinsics {
        let fx = dst_w / (x1 - x0);
        let fy = dst_h / (y1 - y0);
        PinholeIntrinsics {
            fx,
            fy,
            cx: -x0 * fx,
            cy: -y0 * fy,
            skew: 0.0,
        }
    };

    let k_inner = rect_to_k(inner[0], inner[1], inner[2], inner[3]);
    let k_outer = rect_to_k(outer[0], outer[1], outer[2], outer[3]);

    let blend = |a: f64, b: f64| a * (1.0 - alpha) + b * alpha;
    let intrinsics = PinholeIntrinsics {
        fx: blend(k_inner.fx, k_outer.fx),
        fy: blend(k_inner.fy, k_outer.fy),
        cx: blend(k_inner.cx, k_outer.cx),
        cy: blend(k_inner.cy, k_outer.cy),
        skew: 0.0,
    };

    // Valid region: the inner rectangle seen through the blended matrix.
    let x0 = (intrinsics.fx * inner[0] + intrinsics.cx).clamp(0.0, dst_w);
    let x1 = (intrinsics.fx * inner[1] + intrinsics.cx).clamp(0.0, dst_w);
    let y0 = (intrinsics.fy * inner[2] + intrinsics.cy).clamp(0.0, dst_h);
    let y1 = (intrinsics.fy * inner[3] + intrinsics.cy).clamp(0.0, dst_h);
    let valid_region = Rect {
        x: x0.ceil() as u32,
        y: y0.ceil() as u32,
        width: (x1.floor() - x0.ceil()).max(0.0) as u32,
        height: (y1.floor() - y0.ceil()).max(0.0) as u32,
    };

    TargetCamera {
        intrinsics,
        valid_region,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_calib_core::BrownConrady5;

    fn calibration(k1: f64) -> CameraCalibration {
        CameraCalibration {
            intrinsics: PinholeIntrinsics {
                fx: 800.0,
                fy: 800.0,
                cx: 320.0,
                cy: 240.0,
                skew: 0.0,
            },
            distortion: BrownConrady5 {
                k1,
                ..BrownConrady5::zero()
            },
            poses: Vec::new(),
            resolution: (640, 480),
            reprojection_rms: 0.0,
        }
    }

    #[test]
    fn identity_policy_keeps_original_intrinsics() {
        let calib = calibration(-0.2);
        let target =
            resolve_target_camera(&calib, (640, 480), UndistortPolicy::Identity).unwrap();
        assert_eq!(target.intrinsics, calib.intrinsics);
        assert_eq!(
            target.valid_region,
            Rect {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn alpha_outside_unit_interval_is_rejected() {
        let calib = calibration(-0.2);
        assert!(matches!(
            resolve_target_camera(&calib, (640, 480), UndistortPolicy::Balanced { alpha: 1.5 }),
            Err(RectifyError::InvalidAlpha(_))
        ));
    }

    #[test]
    fn alpha_zero_region_is_inside_alpha_one_region() {
        let calib = calibration(-0.2);
        let crop =
            resolve_target_camera(&calib, (640, 480), UndistortPolicy::Balanced { alpha: 0.0 })
                .unwrap();
        let keep =
            resolve_target_camera(&calib, (640, 480), UndistortPolicy::Balanced { alpha: 1.0 })
                .unwrap();
        assert!(crop.valid_region.area() <= keep.valid_region.area());
        // With alpha = 0 the whole destination frame is valid by
        // construction (up to rounding at the borders).
        assert!(crop.valid_region.width >= 638);
        assert!(crop.valid_region.height >= 478);
    }

    #[test]
    fn zero_distortion_reduces_to_the_source_frame() {
        let calib = calibration(0.0);
        let target =
            resolve_target_camera(&calib, (640, 480), UndistortPolicy::Balanced { alpha: 0.5 })
                .unwrap();
        // Undistorted footprint equals the source frame, so the optimal
        // matrix reproduces the original projection up to rounding.
        assert!((target.intrinsics.fx - 800.0).abs() / 800.0 < 0.01);
        assert!((target.intrinsics.fy - 800.0).abs() / 800.0 < 0.01);
        assert!((target.intrinsics.cx - 320.0).abs() < 2.0);
        assert!((target.intrinsics.cy - 240.0).abs() < 2.0);
    }
}
