//! Intrinsic camera calibration from planar chessboard views.
//!
//! Given matched board/image point sets across many views of one camera,
//! the estimator recovers pinhole intrinsics, Brown-Conrady distortion
//! and a per-view target pose by minimizing total reprojection error.
//!
//! Stages:
//! 1. Per-view plane homographies (normalized DLT).
//! 2. Closed-form intrinsics init (Zhang's constraints for 3+ views, a
//!    focal-from-homography fallback below that).
//! 3. Linear distortion init from homography residuals.
//! 4. Planar pose decomposition per view.
//! 5. Joint Levenberg-Marquardt refinement of everything at once.
//!
//! The whole pipeline is deterministic for identical inputs: every
//! initial condition is derived from the data and the refinement runs a
//! fixed schedule.

mod distortion_fit;
mod error;
mod estimator;
mod homography;
mod pose;
mod refine;
mod zhang;

pub use distortion_fit::{estimate_distortion_from_homographies, DistortionFitOptions};
pub use error::SolverError;
pub use estimator::{CalibrationEstimator, EstimatorOptions};
pub use homography::estimate_homography;
pub use pose::pose_from_homography;
pub use refine::RefineOptions;
pub use zhang::intrinsics_from_homographies;
