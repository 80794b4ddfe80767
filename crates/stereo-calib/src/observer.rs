//! Observer hook for per-image calibration side effects.
//!
//! The estimator and pipeline stay free of file-system side effects;
//! anything that wants to draw detected corners or persist debug
//! artifacts implements [`CalibrationObserver`] and receives one
//! callback per processed image.

use std::path::Path;
use stereo_calib_chessboard::DetectedBoard;
use stereo_calib_core::GrayImageView;

/// Per-image callbacks of the calibration pipeline.
pub trait CalibrationObserver {
    /// A chessboard was detected and refined in `image`.
    fn on_corners(&mut self, _image_path: &Path, _image: &GrayImageView<'_>, _board: &DetectedBoard) {
    }

    /// Pattern detection failed for `image_path` (non-fatal; the
    /// pipeline skips the image and continues).
    fn on_pattern_not_found(&mut self, _image_path: &Path) {}
}

/// Observer that does nothing.
pub struct NullObserver;

impl CalibrationObserver for NullObserver {}

/// Writes corner-overlay PNGs into a debug directory, one per detected
/// image, mirroring the classic "detected corners" dump of calibration
/// workflows. Failures to write are logged and never interrupt the run.
#[cfg(feature = "image")]
pub struct DebugDumpObserver {
    dir: std::path::PathBuf,
    index: usize,
}

#[cfg(feature = "image")]
impl DebugDumpObserver {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, index: 0 })
    }
}

#[cfg(feature = "image")]
impl CalibrationObserver for DebugDumpObserver {
    fn on_corners(&mut self, image_path: &Path, image: &GrayImageView<'_>, board: &DetectedBoard) {
        let mut rgb = image::RgbImage::new(image.width as u32, image.height as u32);
        for (i, pixel) in rgb.pixels_mut().enumerate() {
            let v = image.data[i];
            *pixel = image::Rgb([v, v, v]);
        }

        for corner in &board.corners {
            draw_cross(&mut rgb, corner.x, corner.y);
        }

        let out = self.dir.join(format!("detected_corners_{}.png", self.index));
        self.index += 1;
        if let Err(err) = rgb.save(&out) {
            log::warn!(
                "failed to write debug overlay for {}: {err}",
                image_path.display()
            );
        }
    }
}

#[cfg(feature = "image")]
fn draw_cross(img: &mut image::RgbImage, x: f64, y: f64) {
    const ARM: i64 = 4;
    let (cx, cy) = (x.round() as i64, y.round() as i64);
    for d in -ARM..=ARM {
        for (px, py) in [(cx + d, cy), (cx, cy + d)] {
            if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
                img.put_pixel(px as u32, py as u32, image::Rgb([255, 0, 0]));
            }
        }
    }
}
