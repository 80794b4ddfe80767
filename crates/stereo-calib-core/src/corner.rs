use nalgebra::Point2;

/// A raw detected chessboard corner candidate.
///
/// `orientation` is the angle of the dark/light diagonal through the
/// corner, defined modulo pi; `strength` is the detector response used
/// for filtering and tie-breaking.
#[derive(Clone, Copy, Debug)]
pub struct Corner {
    pub position: Point2<f32>,
    pub orientation: f32,
    pub strength: f32,
}
