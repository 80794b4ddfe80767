//! Versioned on-disk artifacts for calibration results and stereo maps.
//!
//! Calibration results are plain pretty-printed JSON so they stay
//! inspectable; stereo map sets are gzip-compressed JSON because the
//! four full-resolution planes get large. Both carry a schema tag and
//! version that are checked on load, and every numeric field round-trips
//! bit-exactly (serde_json emits the shortest representation that parses
//! back to the same float).

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use stereo_calib_core::{CameraCalibration, RemapTable};
use stereo_calib_rectify::{StereoRectificationMaps, UndistortMap};

const CALIBRATION_SCHEMA: &str = "stereo-calib/camera-calibration";
const CALIBRATION_VERSION: u32 = 1;
const STEREO_MAPS_SCHEMA: &str = "stereo-calib/stereo-maps";
const STEREO_MAPS_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("artifact not found: {}", .path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("artifact corrupt: {}: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One camera's persisted calibration, optionally with a precomputed
/// undistortion map cached alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub calibration: CameraCalibration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undistort_map: Option<UndistortMap>,
}

#[derive(Serialize, Deserialize)]
struct CalibrationArtifact {
    schema: String,
    version: u32,
    #[serde(flatten)]
    record: CalibrationRecord,
}

#[derive(Serialize, Deserialize)]
struct StereoMapArtifact {
    schema: String,
    version: u32,
    maps: StereoRectificationMaps,
}

/// Persist a calibration result (serialize first, write once, so a
/// serialization failure leaves no partial artifact behind).
pub fn save_calibration(path: impl AsRef<Path>, record: &CalibrationRecord) -> Result<(), StoreError> {
    let artifact = CalibrationArtifact {
        schema: CALIBRATION_SCHEMA.to_string(),
        version: CALIBRATION_VERSION,
        record: record.clone(),
    };
    let json = serde_json::to_string_pretty(&artifact)?;
    fs::write(path, json)?;
    Ok(())
}

/// Restore a calibration result.
pub fn load_calibration(path: impl AsRef<Path>) -> Result<CalibrationRecord, StoreError> {
    let path = path.as_ref();
    let raw = read_artifact(path)?;
    let artifact: CalibrationArtifact =
        serde_json::from_slice(&raw).map_err(|err| corrupt(path, err.to_string()))?;
    check_schema(path, &artifact.schema, artifact.version, CALIBRATION_SCHEMA, CALIBRATION_VERSION)?;
    if let Some(map) = &artifact.record.undistort_map {
        check_table_shape(path, "undistort map", &map.table)?;
    }
    Ok(artifact.record)
}

/// Persist a stereo rectification map set (gzipped JSON).
pub fn save_stereo_maps(
    path: impl AsRef<Path>,
    maps: &StereoRectificationMaps,
) -> Result<(), StoreError> {
    let artifact = StereoMapArtifact {
        schema: STEREO_MAPS_SCHEMA.to_string(),
        version: STEREO_MAPS_VERSION,
        maps: maps.clone(),
    };
    let json = serde_json::to_vec(&artifact)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    fs::write(path, compressed)?;
    Ok(())
}

/// Restore a stereo rectification map set.
pub fn load_stereo_maps(path: impl AsRef<Path>) -> Result<StereoRectificationMaps, StoreError> {
    let path = path.as_ref();
    let raw = read_artifact(path)?;

    let mut decoder = GzDecoder::new(raw.as_slice());
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|err| corrupt(path, format!("gzip: {err}")))?;

    let artifact: StereoMapArtifact =
        serde_json::from_slice(&json).map_err(|err| corrupt(path, err.to_string()))?;
    check_schema(path, &artifact.schema, artifact.version, STEREO_MAPS_SCHEMA, STEREO_MAPS_VERSION)?;
    check_table_shape(path, "left map", &artifact.maps.left)?;
    check_table_shape(path, "right map", &artifact.maps.right)?;
    Ok(artifact.maps)
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, StoreError> {
    match fs::read(path) {
        Ok(raw) => Ok(raw),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(StoreError::ArtifactNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

fn corrupt(path: &Path, reason: String) -> StoreError {
    StoreError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason,
    }
}

fn check_schema(
    path: &Path,
    schema: &str,
    version: u32,
    expected_schema: &str,
    expected_version: u32,
) -> Result<(), StoreError> {
    if schema != expected_schema {
        return Err(corrupt(
            path,
            format!("schema {schema:?}, expected {expected_schema:?}"),
        ));
    }
    if version != expected_version {
        return Err(corrupt(
            path,
            format!("version {version}, expected {expected_version}"),
        ));
    }
    Ok(())
}

fn check_table_shape(path: &Path, what: &str, table: &RemapTable) -> Result<(), StoreError> {
    let expected = table.width * table.height;
    if table.map_x.len() != expected || table.map_y.len() != expected {
        return Err(corrupt(
            path,
            format!(
                "{what}: planes of {}/{} entries for {}x{}",
                table.map_x.len(),
                table.map_y.len(),
                table.width,
                table.height
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use stereo_calib_core::{BrownConrady5, PinholeIntrinsics, ViewPose};

    fn sample_calibration(views: usize) -> CameraCalibration {
        CameraCalibration {
            intrinsics: PinholeIntrinsics {
                fx: 812.2501220703125,
                fy: 814.75,
                cx: 640.125,
                cy: 360.0625,
                skew: 0.0,
            },
            distortion: BrownConrady5 {
                k1: -0.18345678901234567,
                k2: 0.0512345,
                p1: 1.25e-4,
                p2: -3.5e-5,
                k3: 1.0e-7,
            },
            poses: (0..views)
                .map(|i| ViewPose {
                    rvec: Vector3::new(0.1 * i as f64, -0.2, 0.05),
                    tvec: Vector3::new(0.01, -0.02, 0.5 + i as f64 * 0.1),
                })
                .collect(),
            resolution: (1280, 720),
            reprojection_rms: 0.2345678912345,
        }
    }

    #[test]
    fn calibration_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("left.json");

        for views in [1usize, 40] {
            let record = CalibrationRecord {
                calibration: sample_calibration(views),
                undistort_map: None,
            };
            save_calibration(&path, &record).unwrap();
            let loaded = load_calibration(&path).unwrap();
            assert_eq!(loaded, record);
        }
    }

    #[test]
    fn missing_artifact_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            load_calibration(&missing),
            Err(StoreError::ArtifactNotFound { .. })
        ));
        assert!(matches!(
            load_stereo_maps(&missing),
            Err(StoreError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn garbage_artifact_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{\"schema\": \"something-else\"}").unwrap();
        assert!(matches!(
            load_calibration(&path),
            Err(StoreError::ArtifactCorrupt { .. })
        ));

        fs::write(&path, b"not even gzip").unwrap();
        assert!(matches!(
            load_stereo_maps(&path),
            Err(StoreError::ArtifactCorrupt { .. })
        ));
    }

    #[test]
    fn stereo_maps_round_trip_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo_maps.json.gz");

        let table = |offset: f32| {
            RemapTable::from_planes(
                4,
                3,
                (0..12).map(|i| i as f32 * 0.5 + offset).collect(),
                (0..12).map(|i| i as f32 * 0.25 - offset).collect(),
            )
            .unwrap()
        };
        let maps = StereoRectificationMaps {
            left: table(0.125),
            right: table(-7.75),
        };

        save_stereo_maps(&path, &maps).unwrap();
        let loaded = load_stereo_maps(&path).unwrap();
        assert_eq!(loaded, maps);
    }

    #[test]
    fn wrong_plane_shape_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_maps.json.gz");

        let artifact = serde_json::json!({
            "schema": STEREO_MAPS_SCHEMA,
            "version": STEREO_MAPS_VERSION,
            "maps": {
                "left": {"width": 4, "height": 3, "map_x": [0.0], "map_y": [0.0]},
                "right": {"width": 4, "height": 3, "map_x": [0.0], "map_y": [0.0]},
            },
        });
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(serde_json::to_vec(&artifact).unwrap().as_slice())
            .unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        assert!(matches!(
            load_stereo_maps(&path),
            Err(StoreError::ArtifactCorrupt { .. })
        ));
    }
}
