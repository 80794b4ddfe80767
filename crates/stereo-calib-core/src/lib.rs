//! Core types for stereo camera calibration and rectification.
//!
//! This crate is intentionally small and purely geometric. It owns the
//! camera model (pinhole intrinsics, Brown-Conrady distortion, per-view
//! poses), the grayscale image view types, and the remap tables shared by
//! the detector, solver and rectification crates. It does *not* depend on
//! any concrete corner detector or image codec.

mod board;
mod camera;
mod corner;
mod distortion;
mod error;
mod image;
mod logger;
mod remap_table;

pub use board::ChessboardSpec;
pub use camera::{project_point, CameraCalibration, PinholeIntrinsics, ViewPose};
pub use corner::Corner;
pub use distortion::{BrownConrady5, DEFAULT_UNDISTORT_ITERS};
pub use error::CoreError;
pub use image::{sample_bilinear, GrayImage, GrayImageView};
pub use remap_table::RemapTable;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
