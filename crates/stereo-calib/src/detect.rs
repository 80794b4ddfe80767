//! End-to-end detection helpers over decoded images.
//!
//! Wires the `chess-corners` ChESS front-end into the grid detector so
//! callers can go straight from an `image::GrayImage` to an ordered,
//! refined chessboard.

use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor, ThresholdMode};
use nalgebra::Point2;
use stereo_calib_chessboard::{BoardGridDetector, DetectedBoard, DetectorParams};
use stereo_calib_core::{ChessboardSpec, Corner, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Reasonable default settings for the ChESS corner detector.
///
/// Tuned for well-lit calibration captures; override for difficult
/// real-world footage.
pub fn default_chess_config() -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.threshold_mode = ThresholdMode::Relative;
    cfg.threshold_value = 0.2;
    cfg.nms_radius = 2;
    cfg
}

/// Convert an `image::GrayImage` into the lightweight core view type.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Detect ChESS corners and adapt them into core [`Corner`]s.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, cfg), fields(width = img.width(), height = img.height()))
)]
pub fn detect_corners(img: &::image::GrayImage, cfg: &ChessConfig) -> Vec<Corner> {
    find_chess_corners_image(img, cfg)
        .unwrap_or_default()
        .iter()
        .map(adapt_chess_corner)
        .collect()
}

/// Run pattern detection end-to-end: ChESS corners -> grid recovery ->
/// sub-pixel refinement.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, chess_cfg, params),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn detect_chessboard(
    img: &::image::GrayImage,
    spec: &ChessboardSpec,
    chess_cfg: &ChessConfig,
    params: DetectorParams,
) -> Option<DetectedBoard> {
    let corners = detect_corners(img, chess_cfg);
    let detector = BoardGridDetector::new(params);
    detector.detect(&gray_view(img), spec, &corners)
}

/// Convenience overload using [`default_chess_config`].
pub fn detect_chessboard_default(
    img: &::image::GrayImage,
    spec: &ChessboardSpec,
) -> Option<DetectedBoard> {
    detect_chessboard(img, spec, &default_chess_config(), DetectorParams::default())
}

fn adapt_chess_corner(c: &CornerDescriptor) -> Corner {
    Corner {
        position: Point2::new(c.x, c.y),
        orientation: c.axes[0].angle,
        strength: c.response,
    }
}
