use crate::SolverError;
use nalgebra::{DMatrix, Matrix3, SVector};
use stereo_calib_core::PinholeIntrinsics;

/// The 6-vector v_ij(H) of Zhang's absolute-conic constraints.
fn v_ij(h: &Matrix3<f64>, i: usize, j: usize) -> SVector<f64, 6> {
    let hi = h.column(i);
    let hj = h.column(j);
    SVector::<f64, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Closed-form intrinsics from 3+ plane homographies (Zhang's method).
pub fn intrinsics_from_homographies(
    homographies: &[Matrix3<f64>],
) -> Result<PinholeIntrinsics, SolverError> {
    if homographies.len() < 3 {
        return Err(SolverError::DegenerateGeometry(
            "Zhang init needs 3+ homographies",
        ));
    }

    let m = homographies.len();
    let mut vmtx = DMatrix::<f64>::zeros(2 * m, 6);
    for (k, h) in homographies.iter().enumerate() {
        let v11 = v_ij(h, 0, 0);
        let v22 = v_ij(h, 1, 1);
        let v12 = v_ij(h, 0, 1);
        vmtx.row_mut(2 * k).copy_from(&v12.transpose());
        vmtx.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    // V b = 0: take the singular vector of the smallest singular value.
    let svd = vmtx.svd(true, true);
    let v_t = svd
        .v_t
        .ok_or(SolverError::DegenerateGeometry("SVD failed in Zhang init"))?;
    let b = v_t.row(v_t.nrows() - 1);

    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    let denom_rel = if denom_norm > 0.0 {
        denom.abs() / denom_norm
    } else {
        0.0
    };
    if denom_rel <= 1e-9 {
        return Err(SolverError::DegenerateGeometry(
            "near-parallel board poses in Zhang init",
        ));
    }

    let cy = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + cy * (b12 * b13 - b11 * b23)) / b11;
    if lambda.signum() != b11.signum() {
        return Err(SolverError::DegenerateGeometry(
            "inconsistent conic sign in Zhang init",
        ));
    }

    let fx = (lambda / b11).sqrt();
    let fy = (lambda * b11 / denom).sqrt();
    let skew = -b12 * fx * fx * fy / lambda;
    let cx = skew * cy / fy - b13 * fx * fx / lambda;

    Ok(PinholeIntrinsics {
        fx,
        fy,
        cx,
        cy,
        skew,
    })
}

/// Fallback intrinsics init for fewer than three views: pin the
/// principal point to the image center, force square pixels, and read
/// the focal length off the homography constraints that remain linear
/// under those assumptions.
pub fn focal_fallback_init(
    homographies: &[Matrix3<f64>],
    resolution: (u32, u32),
) -> Result<PinholeIntrinsics, SolverError> {
    let cx = resolution.0 as f64 * 0.5;
    let cy = resolution.1 as f64 * 0.5;
    let shift = Matrix3::new(1.0, 0.0, -cx, 0.0, 1.0, -cy, 0.0, 0.0, 1.0);

    let mut inv_f2_sum = 0.0;
    let mut count = 0usize;
    for h in homographies {
        let h = shift * h;
        let (h11, h12) = (h[(0, 0)], h[(0, 1)]);
        let (h21, h22) = (h[(1, 0)], h[(1, 1)]);
        let (h31, h32) = (h[(2, 0)], h[(2, 1)]);

        // With B = diag(1/f^2, 1/f^2, 1):
        // h1' B h2 = 0        ->  (h11 h12 + h21 h22)/f^2 = -h31 h32
        // h1' B h1 = h2' B h2 ->  (h11^2 + h21^2 - h12^2 - h22^2)/f^2
        //                          = h32^2 - h31^2
        let pairs = [
            (h11 * h12 + h21 * h22, -h31 * h32),
            (
                h11 * h11 + h21 * h21 - h12 * h12 - h22 * h22,
                h32 * h32 - h31 * h31,
            ),
        ];
        for (den, num) in pairs {
            if den.abs() > 1e-12 {
                let inv_f2 = num / den;
                if inv_f2.is_finite() && inv_f2 > 0.0 {
                    inv_f2_sum += inv_f2;
                    count += 1;
                }
            }
        }
    }

    if count == 0 {
        return Err(SolverError::DegenerateGeometry(
            "no usable focal constraint in fallback init",
        ));
    }

    let f = (count as f64 / inv_f2_sum).sqrt();
    Ok(PinholeIntrinsics {
        fx: f,
        fy: f,
        cx,
        cy,
        skew: 0.0,
    })
}
