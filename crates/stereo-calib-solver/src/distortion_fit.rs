use crate::SolverError;
use nalgebra::{DMatrix, DVector, Matrix3, Point2, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use stereo_calib_core::BrownConrady5;

/// Options controlling the linear distortion initialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DistortionFitOptions {
    /// Fix tangential coefficients (p1, p2) to zero.
    pub fix_tangential: bool,
    /// Fix the r^6 radial coefficient (k3) to zero. The k3 term overfits
    /// easily on narrow-FOV data, so the conservative default keeps it
    /// out of the linear stage; the nonlinear refinement decides later.
    pub fix_k3: bool,
}

impl Default for DistortionFitOptions {
    fn default() -> Self {
        Self {
            fix_tangential: false,
            fix_k3: true,
        }
    }
}

/// One view's contribution to the distortion fit: the plane homography
/// computed from *distorted* pixels plus the raw correspondences, so the
/// homography residuals carry the distortion signal.
pub(crate) struct DistortionFitView<'a> {
    pub homography: Matrix3<f64>,
    pub board_points: &'a [Point2<f64>],
    pub pixel_points: &'a [Point2<f64>],
}

/// Linear least-squares Brown-Conrady estimate from homography residuals,
/// given fixed intrinsics. Intended as initialization only; accuracy for
/// strong wide-angle distortion comes from the nonlinear refinement.
pub(crate) fn fit_distortion(
    k: &Matrix3<f64>,
    views: &[DistortionFitView<'_>],
    opts: DistortionFitOptions,
) -> Result<BrownConrady5, SolverError> {
    let total_points: usize = views.iter().map(|v| v.board_points.len()).sum();

    let n_params = match (opts.fix_tangential, opts.fix_k3) {
        (true, true) => 2,
        (true, false) => 3,
        (false, true) => 4,
        (false, false) => 5,
    };
    if 2 * total_points < n_params + 2 {
        return Err(SolverError::DegenerateGeometry(
            "not enough points for distortion fit",
        ));
    }

    let k_inv = k
        .try_inverse()
        .ok_or(SolverError::DegenerateGeometry("intrinsics not invertible"))?;

    let normalized = |p: Point2<f64>| -> Vector2<f64> {
        let v = k_inv * Vector3::new(p.x, p.y, 1.0);
        Vector2::new(v.x / v.z, v.y / v.z)
    };

    let mut a = DMatrix::<f64>::zeros(2 * total_points, n_params);
    let mut b = DVector::<f64>::zeros(2 * total_points);

    let mut max_r2 = 0.0f64;
    let mut row = 0;
    for view in views {
        for (board_pt, pixel_obs) in view.board_points.iter().zip(view.pixel_points) {
            let ideal_h = view.homography * Vector3::new(board_pt.x, board_pt.y, 1.0);
            let ideal = Point2::new(ideal_h.x / ideal_h.z, ideal_h.y / ideal_h.z);

            let n_ideal = normalized(ideal);
            let n_obs = normalized(*pixel_obs);
            let residual = n_obs - n_ideal;

            let (x, y) = (n_ideal.x, n_ideal.y);
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            max_r2 = max_r2.max(r2);

            // n_obs ~ n_ideal + radial + tangential, linear in the
            // coefficients at fixed n_ideal.
            let mut col = 0;
            a[(row, col)] = x * r2;
            a[(row + 1, col)] = y * r2;
            col += 1;

            a[(row, col)] = x * r4;
            a[(row + 1, col)] = y * r4;
            col += 1;

            if !opts.fix_k3 {
                let r6 = r4 * r2;
                a[(row, col)] = x * r6;
                a[(row + 1, col)] = y * r6;
                col += 1;
            }

            if !opts.fix_tangential {
                let xy = x * y;
                a[(row, col)] = 2.0 * xy;
                a[(row + 1, col)] = r2 + 2.0 * y * y;
                col += 1;
                a[(row, col)] = r2 + 2.0 * x * x;
                a[(row + 1, col)] = 2.0 * xy;
            }

            b[row] = residual.x;
            b[row + 1] = residual.y;
            row += 2;
        }
    }

    if max_r2 < 1e-6 {
        return Err(SolverError::DegenerateGeometry(
            "no radial diversity for distortion fit",
        ));
    }

    let svd = a.svd(true, true);
    let x = svd
        .solve(&b, 1e-12)
        .map_err(|_| SolverError::DegenerateGeometry("SVD failed in distortion fit"))?;

    let mut col = 0;
    let k1 = x[col];
    col += 1;
    let k2 = x[col];
    col += 1;
    let k3 = if opts.fix_k3 {
        0.0
    } else {
        let v = x[col];
        col += 1;
        v
    };
    let (p1, p2) = if opts.fix_tangential {
        (0.0, 0.0)
    } else {
        (x[col], x[col + 1])
    };

    Ok(BrownConrady5 { k1, k2, p1, p2, k3 })
}

/// Public wrapper over [`fit_distortion`] taking owned per-view slices.
pub fn estimate_distortion_from_homographies(
    k: &Matrix3<f64>,
    homographies: &[Matrix3<f64>],
    board_points: &[Vec<Point2<f64>>],
    pixel_points: &[Vec<Point2<f64>>],
    opts: DistortionFitOptions,
) -> Result<BrownConrady5, SolverError> {
    let views: Vec<DistortionFitView<'_>> = homographies
        .iter()
        .zip(board_points.iter().zip(pixel_points))
        .map(|(h, (b, p))| DistortionFitView {
            homography: *h,
            board_points: b,
            pixel_points: p,
        })
        .collect();
    fit_distortion(k, &views, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Rotation3, Translation3};
    use stereo_calib_core::PinholeIntrinsics;

    fn k_mtx() -> Matrix3<f64> {
        PinholeIntrinsics {
            fx: 800.0,
            fy: 800.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        }
        .k_matrix()
    }

    fn board_points() -> Vec<Point2<f64>> {
        let mut pts = Vec::new();
        for i in 0..7 {
            for j in 0..7 {
                pts.push(Point2::new(i as f64 * 0.03, j as f64 * 0.03));
            }
        }
        pts
    }

    fn view_with_distortion(
        k: &Matrix3<f64>,
        dist: &BrownConrady5,
        rot: Rotation3<f64>,
        t: Vector3<f64>,
        board: &[Point2<f64>],
    ) -> (Matrix3<f64>, Vec<Point2<f64>>) {
        let iso = Isometry3::from_parts(Translation3::from(t), rot.into());

        let mut pixels = Vec::new();
        for bp in board {
            let p3 = iso.transform_point(&nalgebra::Point3::new(bp.x, bp.y, 0.0));
            let n = Vector2::new(p3.x / p3.z, p3.y / p3.z);
            let nd = dist.distort(&n);
            let ph = k * Vector3::new(nd.x, nd.y, 1.0);
            pixels.push(Point2::new(ph.x / ph.z, ph.y / ph.z));
        }

        // Ideal (distortion-free) homography H = K [r1 r2 t].
        let binding = iso.rotation.to_rotation_matrix();
        let r = binding.matrix();
        let mut h = Matrix3::zeros();
        h.set_column(0, &(k * r.column(0)));
        h.set_column(1, &(k * r.column(1)));
        h.set_column(2, &(k * t));
        (h, pixels)
    }

    #[test]
    fn recovers_radial_coefficients_approximately() {
        let k = k_mtx();
        let dist_gt = BrownConrady5 {
            k1: -0.2,
            k2: 0.05,
            p1: 0.0,
            p2: 0.0,
            k3: 0.0,
        };
        let board = board_points();

        let poses = [
            (
                Rotation3::from_euler_angles(0.1, 0.0, 0.05),
                Vector3::new(0.1, -0.05, 1.0),
            ),
            (
                Rotation3::from_euler_angles(-0.05, 0.15, -0.1),
                Vector3::new(-0.05, 0.1, 1.2),
            ),
            (
                Rotation3::from_euler_angles(0.2, -0.1, 0.0),
                Vector3::new(0.0, 0.0, 0.9),
            ),
        ];

        let mut hs = Vec::new();
        let mut pixels = Vec::new();
        let mut boards = Vec::new();
        for (rot, t) in poses {
            let (h, px) = view_with_distortion(&k, &dist_gt, rot, t, &board);
            hs.push(h);
            pixels.push(px);
            boards.push(board.clone());
        }

        let opts = DistortionFitOptions {
            fix_tangential: true,
            fix_k3: true,
        };
        let est =
            estimate_distortion_from_homographies(&k, &hs, &boards, &pixels, opts).expect("fit");

        // Linear approximation: expect the right sign and rough scale.
        assert!(est.k1.signum() == dist_gt.k1.signum());
        assert!((est.k1 - dist_gt.k1).abs() < 0.1, "k1 {}", est.k1);
        assert!((est.k2 - dist_gt.k2).abs() < 0.05, "k2 {}", est.k2);
        assert_eq!(est.p1, 0.0);
        assert_eq!(est.p2, 0.0);
        assert_eq!(est.k3, 0.0);
    }

    #[test]
    fn rejects_centered_degenerate_data() {
        let k = k_mtx();
        // A single point at the principal point: no radial signal.
        let hs = [Matrix3::identity()];
        let boards = vec![vec![Point2::new(640.0, 360.0)]];
        let pixels = vec![vec![Point2::new(640.0, 360.0)]];
        assert!(estimate_distortion_from_homographies(
            &k,
            &hs,
            &boards,
            &pixels,
            DistortionFitOptions::default()
        )
        .is_err());
    }
}
