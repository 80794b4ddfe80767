use crate::CoreError;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Fixed geometry of the calibration chessboard.
///
/// `inner_cols` x `inner_rows` counts *inner* corners (a 10x7-square board
/// has 9x6 of them). Configuration-level and immutable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChessboardSpec {
    pub inner_cols: u32,
    pub inner_rows: u32,
    /// Side length of one square in meters.
    pub square_size_m: f64,
}

impl Default for ChessboardSpec {
    fn default() -> Self {
        Self {
            inner_cols: 9,
            inner_rows: 6,
            square_size_m: 0.025,
        }
    }
}

impl ChessboardSpec {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.inner_cols < 2 || self.inner_rows < 2 || !(self.square_size_m > 0.0) {
            return Err(CoreError::InvalidBoard {
                inner_cols: self.inner_cols,
                inner_rows: self.inner_rows,
                square_size_m: self.square_size_m,
            });
        }
        Ok(())
    }

    pub fn corner_count(&self) -> usize {
        self.inner_cols as usize * self.inner_rows as usize
    }

    /// Board-frame corner coordinates on the Z=0 plane, in canonical
    /// row-major order: row outer, column inner, x = col * square,
    /// y = row * square. Generated once and reused for every view.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        let mut points = Vec::with_capacity(self.corner_count());
        for row in 0..self.inner_rows {
            for col in 0..self.inner_cols {
                points.push(Point3::new(
                    col as f64 * self.square_size_m,
                    row as f64 * self.square_size_m,
                    0.0,
                ));
            }
        }
        points
    }
}
