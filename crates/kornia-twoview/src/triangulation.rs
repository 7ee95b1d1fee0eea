use rayon::prelude::*;

use crate::camera::CameraMatrix;
use crate::error::{check_same_len, TwoViewError};
use crate::linalg;

/// Triangulate one correspondence from two cameras.
///
/// Solves the 6x6 homogeneous system
///
/// ```text
/// [ P1  -x1   0 ] [ X  ]
/// [ P2   0  -x2 ] [ l1 ] = 0
///                 [ l2 ]
/// ```
///
/// for the 3d point `X` and the projective depths `l1`, `l2`.
///
/// Returns `[X, Y, Z, 1]`. When the solution lies at infinity (no parallax) the
/// raw unit-norm homogeneous vector is returned instead, with `w ~ 0`.
///
/// # Errors
///
/// [`TwoViewError::DegenerateInput`] if the inputs are not finite or the system is zero.
pub fn triangulate_point(
    x1: &[f64; 3],
    x2: &[f64; 3],
    p1: &CameraMatrix,
    p2: &CameraMatrix,
) -> Result<[f64; 4], TwoViewError> {
    let mut m = faer::Mat::<f64>::zeros(6, 6);
    for r in 0..3 {
        for c in 0..4 {
            m.write(r, c, p1.0[r][c]);
            m.write(r + 3, c, p2.0[r][c]);
        }
        m.write(r, 4, -x1[r]);
        m.write(r + 3, 5, -x2[r]);
    }

    let nv = linalg::null_vector(&m)?;
    let v = &nv.vector;
    let x = [v[0], v[1], v[2], v[3]];

    match dehomogenize_point3(&x) {
        Some([a, b, c]) => Ok([a, b, c, 1.0]),
        None => {
            let n = linalg::norm(&x);
            if n <= f64::MIN_POSITIVE {
                return Err(TwoViewError::DegenerateInput(
                    "triangulation has no solution for the 3d point",
                ));
            }
            Ok(x.map(|c| c / n))
        }
    }
}

/// Triangulate a batch of correspondences from two cameras.
///
/// Every correspondence is solved independently with [`triangulate_point`] in
/// parallel; the output keeps the input order.
///
/// # Errors
///
/// * [`TwoViewError::ShapeMismatch`] if the point counts differ.
/// * [`TwoViewError::DegenerateInput`] if any single triangulation fails.
pub fn triangulate(
    points1: &[[f64; 3]],
    points2: &[[f64; 3]],
    p1: &CameraMatrix,
    p2: &CameraMatrix,
) -> Result<Vec<[f64; 4]>, TwoViewError> {
    check_same_len("points1", points1, "points2", points2)?;
    points1
        .par_iter()
        .zip(points2.par_iter())
        .map(|(x1, x2)| triangulate_point(x1, x2, p1, p2))
        .collect()
}

/// Divide a homogeneous 3d point by its last coordinate.
///
/// Returns `None` for points at infinity.
pub fn dehomogenize_point3(x: &[f64; 4]) -> Option<[f64; 3]> {
    let w = x[3];
    if !w.is_finite() || w.abs() <= linalg::EPS * linalg::norm(x) {
        return None;
    }
    Some([x[0] / w, x[1] / w, x[2] / w])
}
