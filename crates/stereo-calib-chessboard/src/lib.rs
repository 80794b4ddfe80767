//! Chessboard pattern detector for stereo calibration.
//!
//! Recovers the full inner-corner grid of a known chessboard from a cloud
//! of raw corner candidates, orders it canonically (row-major, first row
//! along increasing image x), and refines each corner to sub-pixel
//! accuracy against the source image.
//!
//! Pipeline:
//! 1. Filter corner candidates by detector strength.
//! 2. Estimate the dominant grid axis from corner orientations
//!    (double-angle trick, orientations live modulo pi).
//! 3. Derive the expected corner spacing from nearest-neighbor distances.
//! 4. Link each corner to up to 4 neighbors (spacing window + diagonal
//!    orthogonality), classified right/left/up/down in the grid-axis frame.
//! 5. BFS the 4-connected graph, assign integer (i, j) cells.
//! 6. Accept the component that fills the expected grid exactly (the
//!    transposed grid is accepted and folded back).
//! 7. Refine accepted corners with an iterative gradient-orthogonality
//!    search in an 11x11 window.
//!
//! Detection failure is non-fatal: callers log the image and move on,
//! so one bad frame never aborts a calibration run.

mod detector;
mod geom;
mod gridgraph;
mod params;
mod refine;

pub use detector::{BoardGridDetector, DetectedBoard};
pub use gridgraph::{GridGraph, NeighborDirection, NodeNeighbor};
pub use params::{DetectorParams, GridGraphParams, RefineParams};
pub use refine::refine_corners;
