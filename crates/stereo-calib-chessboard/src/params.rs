use serde::{Deserialize, Serialize};

/// Neighbor-linking parameters for the grid graph.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct GridGraphParams {
    /// Lower spacing bound in pixels; non-positive means derive both
    /// bounds from nearest-neighbor statistics of the corner cloud.
    pub min_spacing_pix: f32,
    /// Upper spacing bound in pixels (see `min_spacing_pix`).
    pub max_spacing_pix: f32,
    pub k_neighbors: usize,
    pub orientation_tolerance_deg: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 0.0,
            max_spacing_pix: 0.0,
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
        }
    }
}

/// Parameters of the chessboard grid detector.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct DetectorParams {
    /// Minimal corner strength to consider.
    pub min_strength: f32,
    pub graph: GridGraphParams,
    pub refine: RefineParams,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_strength: 0.0,
            graph: GridGraphParams::default(),
            refine: RefineParams::default(),
        }
    }
}

/// Convergence policy of the sub-pixel corner search.
///
/// Refinement stops when either `max_iters` iterations elapse or the
/// positional update drops below `eps_pix`, whichever triggers first.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RefineParams {
    /// Half size of the search window; 5 gives the classic 11x11 window.
    pub half_window: usize,
    pub max_iters: u32,
    pub eps_pix: f64,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iters: 30,
            eps_pix: 0.001,
        }
    }
}
