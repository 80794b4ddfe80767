use crate::distortion_fit::{fit_distortion, DistortionFitOptions, DistortionFitView};
use crate::homography::estimate_homography;
use crate::pose::pose_from_homography;
use crate::refine::{refine_calibration, RefineOptions};
use crate::zhang::{focal_fallback_init, intrinsics_from_homographies};
use crate::SolverError;
use log::{debug, warn};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use stereo_calib_core::{BrownConrady5, CameraCalibration};

/// Options of the full calibration estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EstimatorOptions {
    pub distortion_init: DistortionFitOptions,
    pub refine: RefineOptions,
    /// Below this view count the estimator logs a stability warning;
    /// calibration still runs, down to a single view.
    pub min_recommended_views: usize,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            distortion_init: DistortionFitOptions::default(),
            refine: RefineOptions::default(),
            min_recommended_views: 15,
        }
    }
}

/// Full intrinsic calibration of one camera from matched point sets.
///
/// Consumes parallel sequences of board-frame object points and detected
/// image points (one pair per successfully detected view) and solves the
/// 5-parameter radial+tangential camera model by minimizing total
/// reprojection error across all views simultaneously.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationEstimator {
    pub options: EstimatorOptions,
}

impl CalibrationEstimator {
    pub fn new(options: EstimatorOptions) -> Self {
        Self { options }
    }

    /// Run the estimate. `resolution` is the shared (width, height) of
    /// every calibration image.
    ///
    /// At least one matched view is required; 15-20 well-spread views are
    /// recommended for numerically stable intrinsics (a warning is
    /// logged below [`EstimatorOptions::min_recommended_views`]).
    pub fn estimate(
        &self,
        object_points: &[Vec<Point3<f64>>],
        image_points: &[Vec<Point2<f64>>],
        resolution: (u32, u32),
    ) -> Result<CameraCalibration, SolverError> {
        if object_points.len() != image_points.len() {
            return Err(SolverError::ViewCountMismatch {
                object: object_points.len(),
                image: image_points.len(),
            });
        }
        if object_points.is_empty() {
            return Err(SolverError::InsufficientCalibrationData);
        }
        for (view, (obj, img)) in object_points.iter().zip(image_points).enumerate() {
            if obj.len() != img.len() || obj.len() < 4 {
                return Err(SolverError::PointCountMismatch {
                    view,
                    object: obj.len(),
                    image: img.len(),
                });
            }
            if obj.iter().any(|p| p.z != 0.0) {
                return Err(SolverError::NonPlanarObjectPoints { view });
            }
        }

        let n_views = object_points.len();
        if n_views < self.options.min_recommended_views {
            warn!(
                "calibrating from {n_views} views; {}+ are recommended for stable intrinsics",
                self.options.min_recommended_views
            );
        }

        // Per-view plane homographies on the raw (distorted) pixels.
        let board_2d: Vec<Vec<Point2<f64>>> = object_points
            .iter()
            .map(|obj| obj.iter().map(|p| Point2::new(p.x, p.y)).collect())
            .collect();
        let mut homographies = Vec::with_capacity(n_views);
        for (view, (board, img)) in board_2d.iter().zip(image_points).enumerate() {
            let h = estimate_homography(board, img)
                .map_err(|_| SolverError::HomographyFailed { view })?;
            homographies.push(h);
        }

        // Closed-form intrinsics init; the focal fallback covers both
        // too-few-views and degenerate-pose failures of Zhang's system.
        let intrinsics0 = if n_views >= 3 {
            intrinsics_from_homographies(&homographies).or_else(|err| {
                debug!("Zhang init failed ({err}), using focal fallback");
                focal_fallback_init(&homographies, resolution)
            })?
        } else {
            focal_fallback_init(&homographies, resolution)?
        };
        let mut intrinsics0 = intrinsics0;
        intrinsics0.skew = 0.0;
        let k0 = intrinsics0.k_matrix();

        // Linear distortion init; zero is an acceptable start when the
        // residual system is degenerate (the refinement recovers it).
        let fit_views: Vec<DistortionFitView<'_>> = homographies
            .iter()
            .zip(board_2d.iter().zip(image_points))
            .map(|(h, (b, p))| DistortionFitView {
                homography: *h,
                board_points: b,
                pixel_points: p,
            })
            .collect();
        let distortion0 = match fit_distortion(&k0, &fit_views, self.options.distortion_init) {
            Ok(d) => d,
            Err(err) => {
                debug!("distortion init failed ({err}), starting from zero");
                BrownConrady5::zero()
            }
        };

        let mut poses0 = Vec::with_capacity(n_views);
        for h in &homographies {
            poses0.push(pose_from_homography(&k0, h)?);
        }

        let refined = refine_calibration(
            intrinsics0,
            distortion0,
            poses0,
            object_points,
            image_points,
            &self.options.refine,
        );

        let n_points: usize = object_points.iter().map(Vec::len).sum();
        let reprojection_rms = (refined.cost / n_points as f64).sqrt();
        debug!("calibration refined: rms = {reprojection_rms:.4} px over {n_points} points");

        Ok(CameraCalibration {
            intrinsics: refined.intrinsics,
            distortion: refined.distortion,
            poses: refined.poses,
            resolution,
            reprojection_rms,
        })
    }
}
