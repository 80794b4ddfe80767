use crate::BrownConrady5;
use nalgebra::{Matrix3, Point2, Point3, Rotation3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Pinhole projection parameters of one lens.
///
/// `skew` is kept for completeness; every estimator in this workspace
/// forces it to zero, which matches real stereo camera modules.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
}

impl PinholeIntrinsics {
    pub fn k_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    pub fn from_k_matrix(k: &Matrix3<f64>) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
        }
    }

    /// Normalized camera ray -> pixel.
    #[inline]
    pub fn denormalize(&self, n: Vector2<f64>) -> Point2<f64> {
        Point2::new(
            self.fx * n.x + self.skew * n.y + self.cx,
            self.fy * n.y + self.cy,
        )
    }

    /// Pixel -> normalized camera ray (closed-form inverse of `denormalize`).
    #[inline]
    pub fn normalize(&self, p: Point2<f64>) -> Vector2<f64> {
        let y = (p.y - self.cy) / self.fy;
        let x = (p.x - self.cx - self.skew * y) / self.fx;
        Vector2::new(x, y)
    }
}

/// Pose of the calibration target relative to the camera for one view,
/// stored as an axis-angle rotation vector and a translation vector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewPose {
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl ViewPose {
    pub fn from_rotation(rotation: &Rotation3<f64>, tvec: Vector3<f64>) -> Self {
        Self {
            rvec: rotation.scaled_axis(),
            tvec,
        }
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::new(self.rvec)
    }

    /// Map a board point (board frame, Z=0 plane) into the camera frame.
    #[inline]
    pub fn transform(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation() * p + self.tvec
    }
}

/// Project a board point through the full camera model.
pub fn project_point(
    intrinsics: &PinholeIntrinsics,
    distortion: &BrownConrady5,
    pose: &ViewPose,
    point: &Point3<f64>,
) -> Point2<f64> {
    let pc = pose.transform(point);
    let n = Vector2::new(pc.x / pc.z, pc.y / pc.z);
    intrinsics.denormalize(distortion.distort(&n))
}

/// Result of one camera's calibration run.
///
/// Immutable after creation; `poses` holds one entry per image that
/// contributed a matched point set, in input order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub intrinsics: PinholeIntrinsics,
    pub distortion: BrownConrady5,
    pub poses: Vec<ViewPose>,
    /// (width, height) of the calibration images.
    pub resolution: (u32, u32),
    /// Root-mean-square reprojection error over all views, in pixels.
    pub reprojection_rms: f64,
}
