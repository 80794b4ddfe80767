//! High-level facade crate for the `stereo-calib-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the core, detector, solver and rectify crates
//! - the calibration store (versioned on-disk artifacts)
//! - the per-camera directory calibration pipeline with an observer
//!   hook for debug side effects
//! - (feature `image`) end-to-end helpers that run the ChESS corner
//!   front-end (`chess-corners`) and the grid detector on decoded images
//! - (feature `cli`) the `stereo-calib` binary with `calibrate`,
//!   `build-maps` and `rectify` subcommands
//!
//! ## Quickstart
//!
//! ```no_run
//! use stereo_calib::pipeline::{calibrate_from_dir, PipelineOptions};
//! use stereo_calib::observer::NullObserver;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = PipelineOptions::default().with_camera_label("left");
//! let calibration = calibrate_from_dir("left_images", &options, &mut NullObserver)?;
//! println!("rms = {:.3} px", calibration.reprojection_rms);
//! # Ok(())
//! # }
//! ```

pub use stereo_calib_chessboard as chessboard;
pub use stereo_calib_core as core;
pub use stereo_calib_rectify as rectify;
pub use stereo_calib_solver as solver;

pub use stereo_calib_core::{
    BrownConrady5, CameraCalibration, ChessboardSpec, GrayImage, GrayImageView,
    PinholeIntrinsics, RemapTable, ViewPose,
};
pub use stereo_calib_rectify::{
    build_undistort_map, InterpolationMode, StereoRectificationMaps, StereoRectifier,
    UndistortMap, UndistortPolicy,
};
pub use stereo_calib_solver::{CalibrationEstimator, EstimatorOptions};

pub mod observer;
pub mod store;

#[cfg(feature = "image")]
pub mod detect;
#[cfg(feature = "image")]
pub mod pipeline;
