use serde::{Deserialize, Serialize};

use crate::epipole::compute_left_epipole;
use crate::error::{check_same_len, TwoViewError};
use crate::linalg::{self, Mat33, Mat34};
use crate::normalize::normalize_points;

/// Minimal number of 2d-3d correspondences for the DLT camera fit.
pub const DLT_MIN_CORRESPONDENCES: usize = 6;

/// A 3x4 projective camera `x = P * X`, defined up to scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraMatrix(pub Mat34);

impl CameraMatrix {
    /// The canonical camera `[I | 0]`.
    pub fn canonical() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ])
    }

    /// Build `[M | t]` from its left 3x3 block and last column.
    pub fn from_rotation_translation(rotation: &Mat33, translation: &[f64; 3]) -> Self {
        let mut p = [[0.0; 4]; 3];
        for (i, row) in p.iter_mut().enumerate() {
            row[..3].copy_from_slice(&rotation[i]);
            row[3] = translation[i];
        }
        Self(p)
    }

    /// Build `K * [R | t]`.
    pub fn from_intrinsics_pose(k: &Mat33, rotation: &Mat33, translation: &[f64; 3]) -> Self {
        Self::from_rotation_translation(
            &linalg::matmul33(k, rotation),
            &linalg::mat33_mul_vec3(k, translation),
        )
    }

    /// The underlying row-major 3x4 array.
    pub fn as_array(&self) -> &Mat34 {
        &self.0
    }

    /// Left 3x3 block of the camera matrix.
    ///
    /// For a calibrated camera `[R | t]` this is the rotation.
    pub fn rotation(&self) -> Mat33 {
        let p = &self.0;
        [
            [p[0][0], p[0][1], p[0][2]],
            [p[1][0], p[1][1], p[1][2]],
            [p[2][0], p[2][1], p[2][2]],
        ]
    }

    /// Last column of the camera matrix.
    pub fn translation(&self) -> [f64; 3] {
        [self.0[0][3], self.0[1][3], self.0[2][3]]
    }

    /// Project a homogeneous 3d point, returning the homogeneous image point.
    pub fn project(&self, x: &[f64; 4]) -> [f64; 3] {
        self.0
            .map(|row| row[0] * x[0] + row[1] * x[1] + row[2] * x[2] + row[3] * x[3])
    }

    /// Project a homogeneous 3d point to pixel coordinates.
    ///
    /// Returns `None` if the image point lies at infinity.
    pub fn project_point(&self, x: &[f64; 4]) -> Option<[f64; 2]> {
        linalg::dehomogenize2(&self.project(x))
    }

    /// Signed depth of a homogeneous 3d point in front of the camera.
    ///
    /// Uses `depth = sign(det M) * w / (T * |m3|)` where `M` is the left 3x3
    /// block, `m3` its last row, `w` the third coordinate of `P * X` and `T` the
    /// last coordinate of `X`. The value is invariant to the scale of both `P`
    /// and `X`; a positive depth means the point is in front of the camera.
    /// Returns `None` for points at infinity or a camera whose centre is at infinity.
    pub fn depth(&self, x: &[f64; 4]) -> Option<f64> {
        let m = self.rotation();
        let det = linalg::det_mat33(&m);
        let m3_norm = linalg::norm(&m[2]);
        let t = x[3];
        if det.abs() <= f64::MIN_POSITIVE
            || m3_norm <= f64::MIN_POSITIVE
            || t.abs() <= linalg::EPS * linalg::norm(x)
        {
            return None;
        }
        let w = self.project(x)[2];
        Some(det.signum() * w / (t * m3_norm))
    }

    /// Representative with unit Frobenius norm and a positive largest-magnitude entry.
    ///
    /// Two cameras equal up to scale have the same normalized representative.
    pub fn normalized(&self) -> Self {
        let flat = self.0.iter().flatten().copied().collect::<Vec<_>>();
        let norm = linalg::norm(&flat);
        if norm <= f64::MIN_POSITIVE {
            return *self;
        }
        let pivot = flat
            .iter()
            .copied()
            .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        let s = pivot.signum() / norm;
        Self(self.0.map(|row| row.map(|v| v * s)))
    }
}

/// Second camera of an uncalibrated pair from a fundamental matrix.
///
/// With the first camera fixed at `[I | 0]`, returns `P2 = [[e']_x * F | e']`
/// where `e'` is the left epipole (`F^T e' = 0`). The raw homogeneous epipole is
/// used, so the construction is valid when the epipole is at infinity. The pair
/// is defined up to a projective transformation of space.
///
/// # Errors
///
/// [`TwoViewError::DegenerateInput`] if `f` is zero, not finite or has rank below 2.
pub fn camera_from_fundamental(f: &Mat33) -> Result<CameraMatrix, TwoViewError> {
    let e = compute_left_epipole(f)?.homogeneous();
    let m = linalg::matmul33(&linalg::skew(&e), f);
    Ok(CameraMatrix::from_rotation_translation(&m, &e))
}

/// Recenter and rescale homogeneous world points to a mean distance of `sqrt(3)`.
///
/// Returns the 4x4 similarity `U` together with the transformed points `U * X`.
fn normalize_points3d(
    points: &[[f64; 4]],
) -> Result<([[f64; 4]; 4], Vec<[f64; 4]>), TwoViewError> {
    let euclidean = points
        .iter()
        .map(|x| {
            if !x[3].is_finite() || x[3].abs() <= linalg::EPS * linalg::norm(x) {
                return Err(TwoViewError::DegenerateInput(
                    "cannot condition a world point at infinity",
                ));
            }
            Ok([x[0] / x[3], x[1] / x[3], x[2] / x[3]])
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n = euclidean.len() as f64;
    let mut centroid = [0.0; 3];
    for x in &euclidean {
        for (c, v) in centroid.iter_mut().zip(x) {
            *c += v / n;
        }
    }

    let mean_dist = euclidean
        .iter()
        .map(|x| {
            let d = [x[0] - centroid[0], x[1] - centroid[1], x[2] - centroid[2]];
            linalg::norm(&d)
        })
        .sum::<f64>()
        / n;

    let extent = centroid.iter().fold(1.0f64, |acc, c| acc.max(c.abs()));
    if !mean_dist.is_finite() || mean_dist <= linalg::EPS * extent {
        log::debug!("world point conditioning failed: mean distance {mean_dist:e}");
        return Err(TwoViewError::DegenerateInput(
            "world points have zero spread and cannot be conditioned",
        ));
    }

    let s = 3f64.sqrt() / mean_dist;
    let transform = [
        [s, 0.0, 0.0, -s * centroid[0]],
        [0.0, s, 0.0, -s * centroid[1]],
        [0.0, 0.0, s, -s * centroid[2]],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let conditioned = euclidean
        .iter()
        .map(|x| {
            [
                s * (x[0] - centroid[0]),
                s * (x[1] - centroid[1]),
                s * (x[2] - centroid[2]),
                1.0,
            ]
        })
        .collect();

    Ok((transform, conditioned))
}

/// Estimate a camera matrix from 2d-3d correspondences with the DLT.
///
/// Both point sets are conditioned first: the image points with
/// [`normalize_points`] and the world points with the 3d analogue (centroid at
/// the origin, mean distance `sqrt(3)`). The conditioned system
/// `P' * X_i - lambda_i * x_i = 0` has size `3n x (12 + n)`, with one free scale
/// `lambda_i` per point. The first 12 entries of its null vector give `P'`, and
/// the result is `P = T^-1 * P' * U`, returned with unit Frobenius norm.
///
/// # Arguments
///
/// * `points2d` - Homogeneous image points (at least 6).
/// * `points3d` - Corresponding homogeneous world points.
///
/// # Errors
///
/// * [`TwoViewError::ShapeMismatch`] if the point counts differ.
/// * [`TwoViewError::InsufficientCorrespondences`] with fewer than 6 points.
/// * [`TwoViewError::DegenerateInput`] if a point lies at infinity, a point set has
///   zero spread, or the points do not determine a unique camera (e.g. all world
///   points on a plane).
pub fn estimate_projection_matrix(
    points2d: &[[f64; 3]],
    points3d: &[[f64; 4]],
) -> Result<CameraMatrix, TwoViewError> {
    check_same_len("points2d", points2d, "points3d", points3d)?;
    let n = points2d.len();
    if n < DLT_MIN_CORRESPONDENCES {
        return Err(TwoViewError::InsufficientCorrespondences {
            required: DLT_MIN_CORRESPONDENCES,
            actual: n,
        });
    }

    let image = normalize_points(points2d)?;
    let (world_transform, world) = normalize_points3d(points3d)?;

    let mut a = faer::Mat::<f64>::zeros(3 * n, 12 + n);
    for (i, (x, xw)) in image.points.iter().zip(&world).enumerate() {
        for r in 0..3 {
            for c in 0..4 {
                a.write(3 * i + r, 4 * r + c, xw[c]);
            }
            a.write(3 * i + r, 12 + i, -x[r]);
        }
    }

    let nv = linalg::null_vector(&a)?;
    if nv.conditioning <= linalg::EPS {
        return Err(TwoViewError::DegenerateInput(
            "correspondences do not determine a unique camera matrix",
        ));
    }

    let v = &nv.vector;
    let conditioned = [
        [v[0], v[1], v[2], v[3]],
        [v[4], v[5], v[6], v[7]],
        [v[8], v[9], v[10], v[11]],
    ];

    // P' * U
    let mut pu = [[0.0; 4]; 3];
    for (i, row) in pu.iter_mut().enumerate() {
        for (j, out) in row.iter_mut().enumerate() {
            *out = (0..4)
                .map(|k| conditioned[i][k] * world_transform[k][j])
                .sum();
        }
    }

    // T^-1 for T = [[s, 0, tx], [0, s, ty], [0, 0, 1]]
    let t = &image.transform;
    let inv_s = 1.0 / t[0][0];
    let t_inv = [
        [inv_s, 0.0, -t[0][2] * inv_s],
        [0.0, inv_s, -t[1][2] * inv_s],
        [0.0, 0.0, 1.0],
    ];

    let mut p = [[0.0; 4]; 3];
    for (i, row) in p.iter_mut().enumerate() {
        for (j, out) in row.iter_mut().enumerate() {
            *out = (0..3).map(|k| t_inv[i][k] * pu[k][j]).sum();
        }
    }

    Ok(CameraMatrix(p).normalized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fundamental::{estimate_fundamental_normalized, sampson_distance};
    use crate::test_utils::{intrinsics, synthetic_scene};
    use crate::triangulation::{dehomogenize_point3, triangulate};
    use approx::assert_relative_eq;

    fn assert_camera_eq(a: &CameraMatrix, b: &CameraMatrix, epsilon: f64) {
        let (a, b) = (a.normalized(), b.normalized());
        for i in 0..3 {
            for j in 0..4 {
                assert_relative_eq!(a.0[i][j], b.0[i][j], epsilon = epsilon);
            }
        }
    }

    #[test]
    fn test_project_and_depth() {
        let p = CameraMatrix::from_rotation_translation(&linalg::IDENTITY_MAT33, &[0.0, 0.0, 1.0]);
        let x = [1.0, 2.0, 3.0, 1.0];
        assert_eq!(p.project_point(&x), Some([0.25, 0.5]));
        assert_relative_eq!(p.depth(&x).unwrap_or(f64::NAN), 4.0);
        // invariant to the homogeneous scale of both the point and the camera
        let x_scaled = [-2.0, -4.0, -6.0, -2.0];
        let p_scaled = CameraMatrix(p.0.map(|row| row.map(|v| -3.0 * v)));
        assert_relative_eq!(p_scaled.depth(&x_scaled).unwrap_or(f64::NAN), 4.0);
        // behind the camera
        assert!(p.depth(&[0.0, 0.0, -5.0, 1.0]).unwrap_or(f64::NAN) < 0.0);
        // at infinity
        assert_eq!(p.depth(&[0.0, 0.0, 1.0, 0.0]), None);
    }

    #[test]
    fn test_estimate_projection_matrix_recovers_camera() -> Result<(), TwoViewError> {
        let k = intrinsics(700.0, 320.0, 240.0);
        let scene = synthetic_scene(12, &k, 5);
        let p = estimate_projection_matrix(&scene.x2, &scene.points3d)?;
        assert_camera_eq(&p, &scene.p2, 1e-8);
        Ok(())
    }

    #[test]
    fn test_estimate_projection_matrix_minimal() -> Result<(), TwoViewError> {
        let k = intrinsics(500.0, 300.0, 200.0);
        for seed in [0, 1, 2, 3, 4, 5, 21] {
            let scene = synthetic_scene(6, &k, seed);
            let p = estimate_projection_matrix(&scene.x1, &scene.points3d)?;
            assert_camera_eq(&p, &scene.p1, 1e-8);
            let p = estimate_projection_matrix(&scene.x2, &scene.points3d)?;
            assert_camera_eq(&p, &scene.p2, 1e-8);
        }
        Ok(())
    }

    #[test]
    fn test_estimate_projection_matrix_far_from_origin() -> Result<(), TwoViewError> {
        let k = intrinsics(700.0, 320.0, 240.0);
        let scene = synthetic_scene(8, &k, 13);

        // shift the image by 1e4 pixels and the world by 1e3 units along x
        let h = [[1.0, 0.0, 1e4], [0.0, 1.0, 1e4], [0.0, 0.0, 1.0]];
        let points2d = scene
            .x2
            .iter()
            .map(|x| linalg::mat33_mul_vec3(&h, x))
            .collect::<Vec<_>>();
        let points3d = scene
            .points3d
            .iter()
            .map(|x| [x[0] + 1e3 * x[3], x[1], x[2], x[3]])
            .collect::<Vec<_>>();

        // P' = H * P * G^-1 with G the world shift
        let mut expected = [[0.0; 4]; 3];
        for (i, row) in expected.iter_mut().enumerate() {
            for (j, out) in row.iter_mut().enumerate() {
                *out = (0..3).map(|k| h[i][k] * scene.p2.0[k][j]).sum();
            }
        }
        for row in expected.iter_mut() {
            row[3] -= 1e3 * row[0];
        }

        let p = estimate_projection_matrix(&points2d, &points3d)?;
        assert_camera_eq(&p, &CameraMatrix(expected), 1e-8);
        Ok(())
    }

    #[test]
    fn test_estimate_projection_matrix_point_at_infinity() {
        let k = intrinsics(500.0, 300.0, 200.0);
        let scene = synthetic_scene(8, &k, 3);
        let mut points3d = scene.points3d.clone();
        points3d[4][3] = 0.0;
        assert!(matches!(
            estimate_projection_matrix(&scene.x1, &points3d),
            Err(TwoViewError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_estimate_projection_matrix_errors() {
        let x = vec![[0.0, 0.0, 1.0]; 6];
        let xw = vec![[0.0, 0.0, 1.0, 1.0]; 5];
        assert!(matches!(
            estimate_projection_matrix(&x, &xw),
            Err(TwoViewError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            estimate_projection_matrix(&x[..5], &xw),
            Err(TwoViewError::InsufficientCorrespondences { required: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_estimate_projection_matrix_planar_is_degenerate() {
        let p = CameraMatrix::from_rotation_translation(&linalg::IDENTITY_MAT33, &[0.1, 0.0, 4.0]);
        let points3d = (0..8)
            .map(|i| [(i % 4) as f64, (i / 4) as f64 + 0.3 * i as f64, 0.0, 1.0])
            .collect::<Vec<_>>();
        let points2d = points3d.iter().map(|x| p.project(x)).collect::<Vec<_>>();
        assert!(matches!(
            estimate_projection_matrix(&points2d, &points3d),
            Err(TwoViewError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_camera_from_fundamental_is_consistent() -> Result<(), TwoViewError> {
        let k = intrinsics(600.0, 320.0, 240.0);
        let scene = synthetic_scene(25, &k, 9);
        let f = estimate_fundamental_normalized(&scene.x1, &scene.x2)?;

        let p1 = CameraMatrix::canonical();
        let p2 = camera_from_fundamental(&f)?;

        // projective reconstruction reprojects exactly into both views
        let points = triangulate(&scene.x1, &scene.x2, &p1, &p2)?;
        for (x, (x1, x2)) in points.iter().zip(scene.x1.iter().zip(scene.x2.iter())) {
            let u1 = p1.project_point(x).unwrap_or([f64::NAN; 2]);
            let u2 = p2.project_point(x).unwrap_or([f64::NAN; 2]);
            assert_relative_eq!(u1[0], x1[0], epsilon = 1e-6);
            assert_relative_eq!(u1[1], x1[1], epsilon = 1e-6);
            assert_relative_eq!(u2[0], x2[0], epsilon = 1e-6);
            assert_relative_eq!(u2[1], x2[1], epsilon = 1e-6);
            assert!(dehomogenize_point3(x).is_some());
            assert!(sampson_distance(&f, x1, x2) < 1e-10);
        }
        Ok(())
    }
}
