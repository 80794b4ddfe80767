use nalgebra::{DMatrix, DVector, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use stereo_calib_core::{project_point, BrownConrady5, PinholeIntrinsics, ViewPose};

/// Schedule of the joint Levenberg-Marquardt refinement.
///
/// The schedule is fixed and data-independent, which keeps the whole
/// estimator deterministic for identical inputs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefineOptions {
    pub max_iters: usize,
    pub lambda_init: f64,
    /// Relative cost-decrease threshold that stops the iteration early.
    pub cost_tol: f64,
    /// Keep k3 at its initial value instead of refining it.
    pub fix_k3: bool,
    /// Keep p1/p2 at their initial values instead of refining them.
    pub fix_tangential: bool,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            max_iters: 30,
            lambda_init: 1e-3,
            cost_tol: 1e-12,
            fix_k3: false,
            fix_tangential: false,
        }
    }
}

/// Refined model returned by [`refine_calibration`].
pub(crate) struct Refined {
    pub intrinsics: PinholeIntrinsics,
    pub distortion: BrownConrady5,
    pub poses: Vec<ViewPose>,
    /// Sum of squared pixel residuals at the solution.
    pub cost: f64,
}

const INTRINSIC_PARAMS: usize = 4; // fx fy cx cy, skew pinned to zero
const DISTORTION_PARAMS: usize = 5; // k1 k2 p1 p2 k3
const POSE_PARAMS: usize = 6; // rvec tvec

fn pack(
    intrinsics: &PinholeIntrinsics,
    distortion: &BrownConrady5,
    poses: &[ViewPose],
) -> DVector<f64> {
    let mut p = DVector::zeros(INTRINSIC_PARAMS + DISTORTION_PARAMS + POSE_PARAMS * poses.len());
    p[0] = intrinsics.fx;
    p[1] = intrinsics.fy;
    p[2] = intrinsics.cx;
    p[3] = intrinsics.cy;
    p[4] = distortion.k1;
    p[5] = distortion.k2;
    p[6] = distortion.p1;
    p[7] = distortion.p2;
    p[8] = distortion.k3;
    for (v, pose) in poses.iter().enumerate() {
        let base = INTRINSIC_PARAMS + DISTORTION_PARAMS + POSE_PARAMS * v;
        for i in 0..3 {
            p[base + i] = pose.rvec[i];
            p[base + 3 + i] = pose.tvec[i];
        }
    }
    p
}

fn unpack(p: &DVector<f64>, n_views: usize) -> (PinholeIntrinsics, BrownConrady5, Vec<ViewPose>) {
    let intrinsics = PinholeIntrinsics {
        fx: p[0],
        fy: p[1],
        cx: p[2],
        cy: p[3],
        skew: 0.0,
    };
    let distortion = BrownConrady5 {
        k1: p[4],
        k2: p[5],
        p1: p[6],
        p2: p[7],
        k3: p[8],
    };
    let mut poses = Vec::with_capacity(n_views);
    for v in 0..n_views {
        let base = INTRINSIC_PARAMS + DISTORTION_PARAMS + POSE_PARAMS * v;
        poses.push(ViewPose {
            rvec: Vector3::new(p[base], p[base + 1], p[base + 2]),
            tvec: Vector3::new(p[base + 3], p[base + 4], p[base + 5]),
        });
    }
    (intrinsics, distortion, poses)
}

fn residuals(
    p: &DVector<f64>,
    object_points: &[Vec<Point3<f64>>],
    image_points: &[Vec<Point2<f64>>],
    out: &mut DVector<f64>,
) {
    let (intrinsics, distortion, poses) = unpack(p, object_points.len());
    let mut row = 0;
    for ((obj, img), pose) in object_points.iter().zip(image_points).zip(&poses) {
        for (op, ip) in obj.iter().zip(img) {
            let proj = project_point(&intrinsics, &distortion, pose, op);
            out[row] = proj.x - ip.x;
            out[row + 1] = proj.y - ip.y;
            row += 2;
        }
    }
}

fn cost_of(r: &DVector<f64>) -> f64 {
    let c = r.norm_squared();
    if c.is_finite() {
        c
    } else {
        f64::INFINITY
    }
}

/// Jointly refine intrinsics, distortion and all view poses by
/// Levenberg-Marquardt over the total reprojection error.
///
/// The Jacobian is taken by central differences per active parameter;
/// damping scales the diagonal of the normal equations (Marquardt
/// variant), so parameter magnitudes do not need pre-scaling.
pub(crate) fn refine_calibration(
    intrinsics: PinholeIntrinsics,
    distortion: BrownConrady5,
    poses: Vec<ViewPose>,
    object_points: &[Vec<Point3<f64>>],
    image_points: &[Vec<Point2<f64>>],
    options: &RefineOptions,
) -> Refined {
    let n_views = poses.len();
    let n_residuals: usize = 2 * object_points.iter().map(Vec::len).sum::<usize>();

    let mut active: Vec<usize> = (0..INTRINSIC_PARAMS + DISTORTION_PARAMS + POSE_PARAMS * n_views)
        .collect();
    if options.fix_tangential {
        active.retain(|&i| i != 6 && i != 7);
    }
    if options.fix_k3 {
        active.retain(|&i| i != 8);
    }

    let mut p = pack(&intrinsics, &distortion, &poses);
    let mut r = DVector::zeros(n_residuals);
    residuals(&p, object_points, image_points, &mut r);
    let mut cost = cost_of(&r);

    let mut lambda = options.lambda_init;
    let mut r_try = DVector::zeros(n_residuals);
    let mut r_plus = DVector::zeros(n_residuals);
    let mut r_minus = DVector::zeros(n_residuals);

    for _ in 0..options.max_iters {
        // Central-difference Jacobian over the active parameters.
        let mut jac = DMatrix::<f64>::zeros(n_residuals, active.len());
        for (col, &idx) in active.iter().enumerate() {
            let step = 1e-6 * (1.0 + p[idx].abs());
            let saved = p[idx];

            p[idx] = saved + step;
            residuals(&p, object_points, image_points, &mut r_plus);
            p[idx] = saved - step;
            residuals(&p, object_points, image_points, &mut r_minus);
            p[idx] = saved;

            let inv = 0.5 / step;
            for row in 0..n_residuals {
                jac[(row, col)] = (r_plus[row] - r_minus[row]) * inv;
            }
        }

        let jtj = jac.transpose() * &jac;
        let jtr = jac.transpose() * &r;

        let mut accepted = false;
        for _ in 0..10 {
            let mut damped = jtj.clone();
            for d in 0..damped.nrows() {
                damped[(d, d)] += lambda * damped[(d, d)].max(1e-12);
            }

            let Some(chol) = damped.cholesky() else {
                lambda *= 10.0;
                continue;
            };
            let delta = chol.solve(&(-&jtr));

            let mut p_try = p.clone();
            for (col, &idx) in active.iter().enumerate() {
                p_try[idx] += delta[col];
            }
            residuals(&p_try, object_points, image_points, &mut r_try);
            let cost_try = cost_of(&r_try);

            if cost_try < cost {
                p = p_try;
                std::mem::swap(&mut r, &mut r_try);
                let improvement = (cost - cost_try) / cost.max(f64::MIN_POSITIVE);
                cost = cost_try;
                lambda = (lambda * 0.1).max(1e-15);
                accepted = true;
                if improvement < options.cost_tol {
                    let (intrinsics, distortion, poses) = unpack(&p, n_views);
                    return Refined {
                        intrinsics,
                        distortion,
                        poses,
                        cost,
                    };
                }
                break;
            }
            lambda *= 10.0;
        }

        if !accepted {
            break; // no productive step at any damping: converged
        }
    }

    let (intrinsics, distortion, poses) = unpack(&p, n_views);
    Refined {
        intrinsics,
        distortion,
        poses,
        cost,
    }
}
