use crate::params::RefineParams;
use nalgebra::{Matrix2, Point2, Vector2};
use stereo_calib_core::{sample_bilinear, GrayImageView};

/// Refine corner positions to sub-pixel accuracy in place.
///
/// For each corner, iterates the gradient-orthogonality condition: at the
/// true saddle point every window pixel's intensity gradient is
/// orthogonal to the vector from the corner to that pixel. Each
/// iteration solves the 2x2 normal system of that condition over a
/// Gaussian-weighted window centered on the current estimate and moves
/// the estimate to the solution. Iteration stops after
/// `params.max_iters` rounds or once the update falls below
/// `params.eps_pix`, whichever triggers first.
///
/// Corners whose window degenerates (flat texture) or whose update
/// diverges past the window keep their unrefined position.
pub fn refine_corners(
    img: &GrayImageView<'_>,
    corners: &mut [Point2<f64>],
    params: &RefineParams,
) {
    for corner in corners.iter_mut() {
        *corner = refine_corner(img, *corner, params);
    }
}

fn refine_corner(img: &GrayImageView<'_>, initial: Point2<f64>, params: &RefineParams) -> Point2<f64> {
    let half = params.half_window as i32;
    let mut p = initial;

    for _ in 0..params.max_iters {
        let mut g = Matrix2::<f64>::zeros();
        let mut b = Vector2::<f64>::zeros();

        for wy in -half..=half {
            for wx in -half..=half {
                let qx = p.x + wx as f64;
                let qy = p.y + wy as f64;

                // Central-difference gradient at the (fractional) sample.
                let gx = 0.5
                    * (sample_bilinear(img, qx + 1.0, qy)
                        - sample_bilinear(img, qx - 1.0, qy));
                let gy = 0.5
                    * (sample_bilinear(img, qx, qy + 1.0)
                        - sample_bilinear(img, qx, qy - 1.0));

                let nx = wx as f64 / half as f64;
                let ny = wy as f64 / half as f64;
                let w = (-(nx * nx + ny * ny)).exp();

                let gxx = w * gx * gx;
                let gxy = w * gx * gy;
                let gyy = w * gy * gy;

                g[(0, 0)] += gxx;
                g[(0, 1)] += gxy;
                g[(1, 0)] += gxy;
                g[(1, 1)] += gyy;
                b.x += gxx * qx + gxy * qy;
                b.y += gxy * qx + gyy * qy;
            }
        }

        let Some(g_inv) = g.try_inverse() else {
            return initial; // flat window, nothing to refine against
        };
        let solved = g_inv * b;
        let next = Point2::new(solved.x, solved.y);
        if !next.x.is_finite() || !next.y.is_finite() {
            return initial;
        }

        let shift = (next - p).norm();
        if (next - initial).norm() > half as f64 {
            return initial; // diverged out of the search window
        }
        p = next;
        if shift < params.eps_pix {
            break;
        }
    }

    p
}
