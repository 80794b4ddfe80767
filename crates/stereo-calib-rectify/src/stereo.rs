use crate::remap::{remap, InterpolationMode};
use crate::{RectifyError, Side};
use serde::{Deserialize, Serialize};
use stereo_calib_core::{GrayImage, GrayImageView, RemapTable};

/// Left/right remap tables produced by a stereo extrinsic calibration
/// step and loaded here as an opaque artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoRectificationMaps {
    pub left: RemapTable,
    pub right: RemapTable,
}

/// Applies stereo rectification maps to incoming frame pairs.
///
/// Stateless beyond the immutable maps: `rectify_pair` takes `&self`,
/// so one rectifier can be shared read-only across frame workers.
#[derive(Clone, Debug)]
pub struct StereoRectifier {
    maps: StereoRectificationMaps,
    interpolation: InterpolationMode,
    border_value: u8,
}

impl StereoRectifier {
    pub fn new(maps: StereoRectificationMaps) -> Self {
        Self {
            maps,
            interpolation: InterpolationMode::Bicubic,
            border_value: 0,
        }
    }

    pub fn with_interpolation(mut self, interpolation: InterpolationMode) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_border_value(mut self, border_value: u8) -> Self {
        self.border_value = border_value;
        self
    }

    pub fn maps(&self) -> &StereoRectificationMaps {
        &self.maps
    }

    /// Rectify a raw left/right pair.
    ///
    /// Both inputs must match the resolution their side's map was built
    /// for; a mismatch fails this call only, not the surrounding frame
    /// loop.
    pub fn rectify_pair(
        &self,
        left: &GrayImageView<'_>,
        right: &GrayImageView<'_>,
    ) -> Result<(GrayImage, GrayImage), RectifyError> {
        check_resolution(Side::Left, left, &self.maps.left)?;
        check_resolution(Side::Right, right, &self.maps.right)?;

        let rectified_left = remap(left, &self.maps.left, self.interpolation, self.border_value);
        let rectified_right = remap(
            right,
            &self.maps.right,
            self.interpolation,
            self.border_value,
        );
        Ok((rectified_left, rectified_right))
    }
}

fn check_resolution(
    side: Side,
    img: &GrayImageView<'_>,
    table: &RemapTable,
) -> Result<(), RectifyError> {
    if img.width != table.width || img.height != table.height {
        return Err(RectifyError::ResolutionMismatch {
            side,
            expected_w: table.width as u32,
            expected_h: table.height as u32,
            actual_w: img.width as u32,
            actual_h: img.height as u32,
        });
    }
    Ok(())
}
