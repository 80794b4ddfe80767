use crate::SolverError;
use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalize_points(pts: &[Point2<f64>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    // Hartley preconditioning: translate to centroid, scale so the mean
    // distance becomes sqrt(2).
    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x - cx;
        let dy = p.y - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let t = hartley_normalization(cx, cy, mean_dist);

    let mut out = Vec::with_capacity(pts.len());
    for p in pts {
        let v = t * Vector3::new(p.x, p.y, 1.0);
        out.push(Point2::new(v[0], v[1]));
    }
    (out, t)
}

/// Estimate H such that `p_img ~ H * p_board` from 4+ correspondences
/// using the normalized DLT.
pub fn estimate_homography(
    board_pts: &[Point2<f64>],
    img_pts: &[Point2<f64>],
) -> Result<Matrix3<f64>, SolverError> {
    if board_pts.len() != img_pts.len() || board_pts.len() < 4 {
        return Err(SolverError::DegenerateGeometry(
            "homography needs 4+ matched points",
        ));
    }

    let (b, tb) = normalize_points(board_pts);
    let (i, ti) = normalize_points(img_pts);

    // Build A (2N x 9), Ah = 0.
    let n = board_pts.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let x = b[k].x;
        let y = b[k].y;
        let u = i[k].x;
        let v = i[k].y;

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // h = right singular vector of the smallest singular value.
    let svd = a.svd(true, true);
    let vt = svd
        .v_t
        .ok_or(SolverError::DegenerateGeometry("SVD failed in DLT"))?;
    let h = vt.row(vt.nrows() - 1);

    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // Denormalize: H = Ti^{-1} * Hn * Tb, then scale h33 to 1.
    let ti_inv = ti
        .try_inverse()
        .ok_or(SolverError::DegenerateGeometry("normalization not invertible"))?;
    let h_den = ti_inv * hn * tb;
    let s = h_den[(2, 2)];
    if s.abs() < 1e-12 {
        return Err(SolverError::DegenerateGeometry("homography scale vanished"));
    }
    Ok(h_den / s)
}
