use crate::gridgraph::{assign_grid_coordinates, connected_components, GridGraph};
use crate::params::DetectorParams;
use crate::refine::refine_corners;
use log::{debug, info};
use nalgebra::{Point2, Vector2};
use stereo_calib_core::{ChessboardSpec, Corner, GrayImageView};

/// A fully recovered chessboard grid.
///
/// `corners` has exactly `spec.corner_count()` entries in canonical
/// row-major order: the first row runs along increasing image x, rows
/// advance along increasing image y.
#[derive(Clone, Debug)]
pub struct DetectedBoard {
    pub corners: Vec<Point2<f64>>,
}

/// Chessboard grid detector over raw corner candidates.
///
/// The detector is corner-source agnostic: it consumes [`Corner`] clouds
/// produced by any front-end (the facade crate wires up ChESS corners).
pub struct BoardGridDetector {
    pub params: DetectorParams,
}

impl BoardGridDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    /// Full pattern detection: grid recovery plus sub-pixel refinement.
    ///
    /// Returns `None` when the board cannot be recovered; the caller is
    /// expected to log the image identity and continue.
    pub fn detect(
        &self,
        img: &GrayImageView<'_>,
        spec: &ChessboardSpec,
        corners: &[Corner],
    ) -> Option<DetectedBoard> {
        let mut board = self.detect_from_corners(spec, corners)?;
        refine_corners(img, &mut board.corners, &self.params.refine);
        Some(board)
    }

    /// Grid recovery without touching image pixels (unit-testable on
    /// synthetic corner clouds).
    pub fn detect_from_corners(
        &self,
        spec: &ChessboardSpec,
        corners: &[Corner],
    ) -> Option<DetectedBoard> {
        let expected = spec.corner_count();

        let strong: Vec<Corner> = corners
            .iter()
            .copied()
            .filter(|c| c.strength >= self.params.min_strength)
            .collect();
        debug!("{} corner candidates after strength filter", strong.len());
        if strong.len() < expected {
            info!(
                "not enough corner candidates ({} < {expected})",
                strong.len()
            );
            return None;
        }

        let Some(axis_angle) = estimate_grid_axis(&strong) else {
            info!("no dominant grid axis in corner orientations");
            return None;
        };

        let graph = GridGraph::new(&strong, axis_angle, &self.params.graph);

        for component in connected_components(&graph) {
            if component.len() != expected {
                continue;
            }
            let cells = assign_grid_coordinates(&graph, &component);
            if let Some(board) = canonical_order(spec, &strong, &cells) {
                return Some(board);
            }
        }

        info!(
            "no connected component fills the {}x{} grid",
            spec.inner_cols, spec.inner_rows
        );
        None
    }
}

/// Dominant grid axis from corner orientations, modulo pi/2.
///
/// Chessboard corner diagonals come in two clusters 90 degrees apart, so
/// doubling the angle still cancels between clusters. Accumulating in
/// quadruple-angle space folds both clusters onto one direction; a
/// quarter of the mean angle recovers the diagonal axis, and shifting by
/// 45 degrees lands on the grid axis. Any pi/2 ambiguity only relabels
/// the BFS axes, which `canonical_order` resolves later.
fn estimate_grid_axis(corners: &[Corner]) -> Option<f32> {
    let mut sum = Vector2::<f32>::zeros();
    let mut weight_sum = 0.0f32;

    for c in corners {
        let w = c.strength.max(0.0);
        if w <= 0.0 {
            continue;
        }
        let four_theta = 4.0 * c.orientation;
        sum += w * Vector2::new(four_theta.cos(), four_theta.sin());
        weight_sum += w;
    }

    // Unweighted fallback when the front-end reports no strengths.
    if weight_sum <= 0.0 {
        for c in corners {
            let four_theta = 4.0 * c.orientation;
            sum += Vector2::new(four_theta.cos(), four_theta.sin());
        }
        weight_sum = corners.len() as f32;
    }
    if weight_sum <= 0.0 {
        return None;
    }

    let mean = sum / weight_sum;
    if mean.norm_squared() < 1e-6 {
        return None;
    }

    let diagonal = 0.25 * mean.y.atan2(mean.x);
    Some(diagonal - std::f32::consts::FRAC_PI_4)
}

/// Fold BFS cells into canonical row-major order.
///
/// Accepts the transposed assignment (rows and columns swapped by the
/// BFS frame) and both axis polarities; rejects components whose extent
/// does not match the expected board or that fill any cell zero or twice.
fn canonical_order(
    spec: &ChessboardSpec,
    corners: &[Corner],
    cells: &[(usize, i32, i32)],
) -> Option<DetectedBoard> {
    let cols = spec.inner_cols as usize;
    let rows = spec.inner_rows as usize;

    let (mut min_i, mut min_j) = (i32::MAX, i32::MAX);
    let (mut max_i, mut max_j) = (i32::MIN, i32::MIN);
    for &(_, i, j) in cells {
        min_i = min_i.min(i);
        min_j = min_j.min(j);
        max_i = max_i.max(i);
        max_j = max_j.max(j);
    }
    let extent_i = (max_i - min_i + 1) as usize;
    let extent_j = (max_j - min_j + 1) as usize;

    let transpose = if (extent_i, extent_j) == (cols, rows) {
        false
    } else if (extent_i, extent_j) == (rows, cols) {
        true
    } else {
        return None;
    };

    let mut grid: Vec<Option<usize>> = vec![None; cols * rows];
    for &(node, i, j) in cells {
        let (mut c, mut r) = (
            (i - min_i) as usize, //
            (j - min_j) as usize,
        );
        if transpose {
            std::mem::swap(&mut c, &mut r);
        }
        let slot = &mut grid[r * cols + c];
        if slot.is_some() {
            return None; // two corners claimed one cell
        }
        *slot = Some(node);
    }
    let grid: Vec<usize> = grid.into_iter().collect::<Option<_>>()?;

    let at = |c: usize, r: usize| corners[grid[r * cols + c]].position;

    // Column axis should run along increasing image x, row axis along
    // increasing image y; flip whichever does not.
    let u = at(cols - 1, 0) - at(0, 0);
    let v = at(0, rows - 1) - at(0, 0);
    let flip_cols = u.x < 0.0;
    let flip_rows = v.y < 0.0;

    let mut out = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        let r = if flip_rows { rows - 1 - r } else { r };
        for c in 0..cols {
            let c = if flip_cols { cols - 1 - c } else { c };
            let p = at(c, r);
            out.push(Point2::new(p.x as f64, p.y as f64));
        }
    }

    Some(DetectedBoard { corners: out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn grid_corners(
        spec: &ChessboardSpec,
        spacing: f32,
        angle: f32,
        origin: (f32, f32),
    ) -> Vec<Corner> {
        let (sin, cos) = angle.sin_cos();
        let mut corners = Vec::new();
        for j in 0..spec.inner_rows {
            for i in 0..spec.inner_cols {
                let (x, y) = (i as f32 * spacing, j as f32 * spacing);
                let orientation = if (i + j) % 2 == 0 {
                    FRAC_PI_4 + angle
                } else {
                    3.0 * FRAC_PI_4 + angle
                };
                corners.push(Corner {
                    position: Point2::new(
                        origin.0 + cos * x - sin * y,
                        origin.1 + sin * x + cos * y,
                    ),
                    orientation,
                    strength: 1.0,
                });
            }
        }
        corners
    }

    fn spec_9x6() -> ChessboardSpec {
        ChessboardSpec {
            inner_cols: 9,
            inner_rows: 6,
            square_size_m: 0.025,
        }
    }

    #[test]
    fn recovers_upright_grid_in_row_major_order() {
        let spec = spec_9x6();
        let corners = grid_corners(&spec, 20.0, 0.0, (100.0, 50.0));
        let detector = BoardGridDetector::new(DetectorParams::default());

        let board = detector
            .detect_from_corners(&spec, &corners)
            .expect("full grid");
        assert_eq!(board.corners.len(), spec.corner_count());

        for j in 0..6 {
            for i in 0..9 {
                let p = board.corners[j * 9 + i];
                assert!((p.x - (100.0 + i as f64 * 20.0)).abs() < 1e-3);
                assert!((p.y - (50.0 + j as f64 * 20.0)).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn recovers_shuffled_and_rotated_grid() {
        let spec = spec_9x6();
        let mut corners = grid_corners(&spec, 18.0, 0.35, (300.0, 200.0));
        corners.reverse();
        // Swap a few entries so input order carries no grid information.
        corners.swap(3, 40);
        corners.swap(11, 27);

        let detector = BoardGridDetector::new(DetectorParams::default());
        let board = detector
            .detect_from_corners(&spec, &corners)
            .expect("full grid");

        // Row-major canonical order: x grows along a row, y grows down
        // the first column.
        let first = board.corners[0];
        let row_end = board.corners[8];
        let col_end = board.corners[5 * 9];
        assert!(row_end.x > first.x);
        assert!(col_end.y > first.y);

        // All rows keep a consistent spacing along the row direction.
        for j in 0..6 {
            for i in 1..9 {
                let a = board.corners[j * 9 + i - 1];
                let b = board.corners[j * 9 + i];
                let d = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
                assert!((d - 18.0).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn rejects_incomplete_grid() {
        let spec = spec_9x6();
        let mut corners = grid_corners(&spec, 20.0, 0.0, (0.0, 0.0));
        corners.pop();
        let detector = BoardGridDetector::new(DetectorParams::default());
        assert!(detector.detect_from_corners(&spec, &corners).is_none());
    }

    #[test]
    fn rejects_clutter_without_grid_structure() {
        let spec = spec_9x6();
        // Corners on a line cannot form the 2D grid.
        let corners: Vec<Corner> = (0..60)
            .map(|i| Corner {
                position: Point2::new(i as f32 * 10.0, 0.0),
                orientation: if i % 2 == 0 {
                    FRAC_PI_4
                } else {
                    3.0 * FRAC_PI_4
                },
                strength: 1.0,
            })
            .collect();
        let detector = BoardGridDetector::new(DetectorParams::default());
        assert!(detector.detect_from_corners(&spec, &corners).is_none());
    }
}
