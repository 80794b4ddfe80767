/// Errors produced by the calibration estimator.
#[derive(thiserror::Error, Debug)]
pub enum SolverError {
    /// No view contributed a matched point set; the calibration run for
    /// this camera cannot proceed.
    #[error("insufficient calibration data: zero matched views")]
    InsufficientCalibrationData,

    #[error("object/image view counts differ (object={object}, image={image})")]
    ViewCountMismatch { object: usize, image: usize },

    #[error("view {view}: object/image point counts differ (object={object}, image={image})")]
    PointCountMismatch {
        view: usize,
        object: usize,
        image: usize,
    },

    #[error("view {view}: object points must lie on the Z=0 plane")]
    NonPlanarObjectPoints { view: usize },

    #[error("view {view}: homography estimation failed")]
    HomographyFailed { view: usize },

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
}
