use crate::SolverError;
use nalgebra::{Matrix3, Rotation3, Vector3};
use stereo_calib_core::ViewPose;

/// Decompose a plane-induced homography into the board pose, assuming
/// the target lies on its own Z=0 plane: H ~ K [r1 r2 t].
pub fn pose_from_homography(
    k: &Matrix3<f64>,
    h: &Matrix3<f64>,
) -> Result<ViewPose, SolverError> {
    let k_inv = k
        .try_inverse()
        .ok_or(SolverError::DegenerateGeometry("intrinsics not invertible"))?;

    let k_inv_h1 = k_inv * h.column(0);
    let k_inv_h2 = k_inv * h.column(1);
    let h3 = h.column(2).into_owned();

    // Scale factor: average of the first two column norms.
    let norm1 = k_inv_h1.norm();
    let norm2 = k_inv_h2.norm();
    if norm1 < 1e-12 || norm2 < 1e-12 {
        return Err(SolverError::DegenerateGeometry("rank-deficient homography"));
    }
    let lambda = 1.0 / ((norm1 + norm2) * 0.5);

    let r1 = lambda * k_inv_h1;
    let r2 = lambda * k_inv_h2;
    let r3 = r1.cross(&r2);

    let mut r_mat = Matrix3::<f64>::zeros();
    r_mat.set_column(0, &r1);
    r_mat.set_column(1, &r2);
    r_mat.set_column(2, &r3);

    // Project onto SO(3) via SVD, fixing the sign if needed.
    let svd = r_mat.svd(true, true);
    let u = svd
        .u
        .ok_or(SolverError::DegenerateGeometry("SVD failed in pose init"))?;
    let v_t = svd
        .v_t
        .ok_or(SolverError::DegenerateGeometry("SVD failed in pose init"))?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let mut tvec: Vector3<f64> = lambda * (k_inv * h3);
    let mut rotation = Rotation3::from_matrix_unchecked(r_orth);

    // The plane decomposition is sign-ambiguous; pick the solution with
    // the board in front of the camera.
    if tvec.z < 0.0 {
        tvec = -tvec;
        let mut m = rotation.into_inner();
        m.column_mut(0).neg_mut();
        m.column_mut(1).neg_mut();
        rotation = Rotation3::from_matrix_unchecked(m);
    }

    Ok(ViewPose::from_rotation(&rotation, tvec))
}
