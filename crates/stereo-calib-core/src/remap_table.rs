use crate::CoreError;
use serde::{Deserialize, Serialize};

/// Per-destination-pixel lookup of the fractional source coordinate to
/// sample, used to correct distortion or apply stereo rectification.
///
/// Entries are continuous-valued (never rounded) so any interpolation
/// kernel can consume the table. Read-only once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemapTable {
    pub width: usize,
    pub height: usize,
    /// Row-major source x coordinate per destination pixel.
    pub map_x: Vec<f32>,
    /// Row-major source y coordinate per destination pixel.
    pub map_y: Vec<f32>,
}

impl RemapTable {
    pub fn from_planes(
        width: usize,
        height: usize,
        map_x: Vec<f32>,
        map_y: Vec<f32>,
    ) -> Result<Self, CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        let expected = width
            .checked_mul(height)
            .ok_or(CoreError::InvalidDimensions { width, height })?;
        if map_x.len() != expected || map_y.len() != expected {
            return Err(CoreError::MapShapeMismatch {
                width,
                height,
                map_x_len: map_x.len(),
                map_y_len: map_y.len(),
            });
        }
        Ok(Self {
            width,
            height,
            map_x,
            map_y,
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    #[inline]
    pub fn source_of(&self, x: usize, y: usize) -> (f32, f32) {
        let idx = y * self.width + x;
        (self.map_x[idx], self.map_y[idx])
    }
}
