use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Default fixed-point iteration count for [`BrownConrady5::undistort`].
pub const DEFAULT_UNDISTORT_ITERS: u32 = 8;

/// Five-parameter Brown-Conrady lens distortion (k1, k2, p1, p2, k3).
///
/// Coefficient order in [`BrownConrady5::as_array`] follows the common
/// calibration-artifact convention: radial k1, k2, tangential p1, p2,
/// then the higher-order radial k3.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady5 {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn as_array(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn from_array(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    /// Apply forward distortion to a normalized camera ray.
    #[inline]
    pub fn distort(&self, n: &Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let xd = x * radial + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        Vector2::new(xd, yd)
    }

    /// Invert the distortion by fixed-point iteration.
    ///
    /// Converges quickly for the moderate distortion this model is meant
    /// for; `iters` bounds the work and keeps the result deterministic.
    pub fn undistort(&self, distorted: &Vector2<f64>, iters: u32) -> Vector2<f64> {
        let mut n = *distorted;
        for _ in 0..iters {
            let r2 = n.x * n.x + n.y * n.y;
            let r4 = r2 * r2;
            let r6 = r4 * r2;
            let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

            let dx = 2.0 * self.p1 * n.x * n.y + self.p2 * (r2 + 2.0 * n.x * n.x);
            let dy = self.p1 * (r2 + 2.0 * n.y * n.y) + 2.0 * self.p2 * n.x * n.y;

            n.x = (distorted.x - dx) / radial;
            n.y = (distorted.y - dy) / radial;
        }
        n
    }
}
