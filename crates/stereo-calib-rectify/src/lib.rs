//! Undistortion map derivation and stereo remap application.
//!
//! The map builder turns a camera calibration into a per-pixel remap
//! table under one of two target-matrix policies (keep the original
//! intrinsics, or an optimal matrix balanced between cropping and
//! keeping every source pixel). The applier resamples raw image pairs
//! through previously built tables; it is stateless and safe to share
//! across frame-processing workers.

mod error;
mod map_builder;
mod policy;
mod remap;
mod stereo;

pub use error::{RectifyError, Side};
pub use map_builder::{build_undistort_map, quantize_map_for_preview, UndistortMap};
pub use policy::{resolve_target_camera, Rect, TargetCamera, UndistortPolicy};
pub use remap::{remap, InterpolationMode};
pub use stereo::{StereoRectificationMaps, StereoRectifier};
