//! Per-camera calibration pipeline: directory scan, per-image detection
//! with skip-and-continue, batch solve, optional artifact write.

use crate::detect::{default_chess_config, detect_chessboard, gray_view};
use crate::observer::CalibrationObserver;
use crate::store::{save_calibration, CalibrationRecord, StoreError};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use stereo_calib_chessboard::DetectorParams;
use stereo_calib_core::{CameraCalibration, ChessboardSpec, CoreError};
use stereo_calib_solver::{CalibrationEstimator, EstimatorOptions, SolverError};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("no calibration images (*.png) found in {}", .dir.display())]
    NoImages { dir: PathBuf },

    #[error(
        "camera {camera}: insufficient calibration data: no chessboard \
         detected in any of {images} images"
    )]
    InsufficientCalibrationData { camera: String, images: usize },

    #[error("failed to decode {}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Board(#[from] CoreError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration of one camera's calibration run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub board: ChessboardSpec,
    pub detector: DetectorParams,
    pub estimator: EstimatorOptions,
    /// Label used in logs and error reports ("left", "right", ...).
    pub camera_label: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            board: ChessboardSpec::default(),
            detector: DetectorParams::default(),
            estimator: EstimatorOptions::default(),
            camera_label: "camera".to_string(),
        }
    }
}

impl PipelineOptions {
    pub fn with_camera_label(mut self, label: impl Into<String>) -> Self {
        self.camera_label = label.into();
        self
    }
}

/// Calibrate one camera from a directory of chessboard images.
///
/// Scans `dir` for `*.png` files in filename order, detects the board in
/// each (failures are logged per file and skipped), takes the first
/// successfully processed image's resolution as authoritative, and runs
/// the batch estimate over all matched point sets. The `observer`
/// receives one callback per image for debug side effects.
pub fn calibrate_from_dir(
    dir: impl AsRef<Path>,
    options: &PipelineOptions,
    observer: &mut dyn CalibrationObserver,
) -> Result<CameraCalibration, PipelineError> {
    let dir = dir.as_ref();
    options.board.validate()?;

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"))
        })
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(PipelineError::NoImages {
            dir: dir.to_path_buf(),
        });
    }

    let chess_cfg = default_chess_config();
    let object = options.board.object_points();

    let mut resolution: Option<(u32, u32)> = None;
    let mut object_sets = Vec::new();
    let mut image_sets = Vec::new();

    for path in &paths {
        let img = image::ImageReader::open(path)
            .map_err(|err| PipelineError::ImageDecode {
                path: path.clone(),
                source: image::ImageError::IoError(err),
            })?
            .decode()
            .map_err(|err| PipelineError::ImageDecode {
                path: path.clone(),
                source: err,
            })?
            .to_luma8();

        // The first successfully decoded image pins the run resolution.
        let this_resolution = (img.width(), img.height());
        let run_resolution = *resolution.get_or_insert(this_resolution);
        if this_resolution != run_resolution {
            warn!(
                "camera {}: skipping {} ({}x{} differs from run resolution {}x{})",
                options.camera_label,
                path.display(),
                this_resolution.0,
                this_resolution.1,
                run_resolution.0,
                run_resolution.1
            );
            continue;
        }

        match detect_chessboard(&img, &options.board, &chess_cfg, options.detector) {
            Some(board) => {
                observer.on_corners(path, &gray_view(&img), &board);
                object_sets.push(object.clone());
                image_sets.push(board.corners);
            }
            None => {
                warn!(
                    "camera {}: chessboard not found in image {}",
                    options.camera_label,
                    path.display()
                );
                observer.on_pattern_not_found(path);
            }
        }
    }

    if image_sets.is_empty() {
        return Err(PipelineError::InsufficientCalibrationData {
            camera: options.camera_label.clone(),
            images: paths.len(),
        });
    }
    info!(
        "camera {}: {} of {} images contributed point sets",
        options.camera_label,
        image_sets.len(),
        paths.len()
    );

    let estimator = CalibrationEstimator::new(options.estimator);
    let calibration = estimator.estimate(
        &object_sets,
        &image_sets,
        resolution.expect("resolution set by first image"),
    )?;
    info!(
        "camera {}: calibrated, reprojection rms = {:.4} px",
        options.camera_label, calibration.reprojection_rms
    );
    Ok(calibration)
}

/// Calibrate from a directory and persist the result.
///
/// Nothing is written when calibration fails, so a failed run never
/// leaves a partial artifact behind.
pub fn calibrate_and_store(
    dir: impl AsRef<Path>,
    artifact_path: impl AsRef<Path>,
    options: &PipelineOptions,
    observer: &mut dyn CalibrationObserver,
) -> Result<CameraCalibration, PipelineError> {
    let calibration = calibrate_from_dir(dir, options, observer)?;
    save_calibration(
        artifact_path,
        &CalibrationRecord {
            calibration: calibration.clone(),
            undistort_map: None,
        },
    )?;
    Ok(calibration)
}
