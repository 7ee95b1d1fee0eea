use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::camera::CameraMatrix;
use crate::linalg::{self, Mat33, IDENTITY_MAT33};

/// A noise-free two-camera scene with known ground truth.
pub(crate) struct SyntheticScene {
    pub points3d: Vec<[f64; 4]>,
    pub x1: Vec<[f64; 3]>,
    pub x2: Vec<[f64; 3]>,
    pub p1: CameraMatrix,
    pub p2: CameraMatrix,
    pub rotation: Mat33,
    pub translation: [f64; 3],
}

pub(crate) fn intrinsics(focal: f64, cx: f64, cy: f64) -> Mat33 {
    [[focal, 0.0, cx], [0.0, focal, cy], [0.0, 0.0, 1.0]]
}

pub(crate) fn inverse_intrinsics(k: &Mat33) -> Mat33 {
    let (fx, fy, cx, cy) = (k[0][0], k[1][1], k[0][2], k[1][2]);
    [
        [1.0 / fx, 0.0, -cx / fx],
        [0.0, 1.0 / fy, -cy / fy],
        [0.0, 0.0, 1.0],
    ]
}

pub(crate) fn axis_angle_to_rotation_matrix(axis: &[f64; 3], angle: f64) -> Mat33 {
    let n = linalg::norm(axis);
    let [x, y, z] = axis.map(|v| v / n);
    let (s, c) = angle.sin_cos();
    let t = 1.0 - c;
    [
        [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
        [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
        [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
    ]
}

pub(crate) fn fundamental_from_pose(k: &Mat33, rotation: &Mat33, translation: &[f64; 3]) -> Mat33 {
    let k_inv = inverse_intrinsics(k);
    let e = linalg::matmul33(&linalg::skew(translation), rotation);
    linalg::matmul33(&linalg::transpose33(&k_inv), &linalg::matmul33(&e, &k_inv))
}

fn to_pixel(p: &CameraMatrix, x: &[f64; 4]) -> [f64; 3] {
    let u = p.project(x);
    [u[0] / u[2], u[1] / u[2], 1.0]
}

/// Random points in front of both cameras `K [I | 0]` and `K [R | t]`.
pub(crate) fn synthetic_scene(n: usize, k: &Mat33, seed: u64) -> SyntheticScene {
    let mut rng = StdRng::seed_from_u64(seed);
    let rotation = axis_angle_to_rotation_matrix(&[0.1, 1.0, 0.05], 0.2);
    let translation = [-1.0, 0.1, 0.2];
    let p1 = CameraMatrix::from_intrinsics_pose(k, &IDENTITY_MAT33, &[0.0; 3]);
    let p2 = CameraMatrix::from_intrinsics_pose(k, &rotation, &translation);

    let points3d = (0..n)
        .map(|_| {
            [
                rng.random_range(-1.5..1.5),
                rng.random_range(-1.5..1.5),
                rng.random_range(4.0..8.0),
                1.0,
            ]
        })
        .collect::<Vec<_>>();
    let x1 = points3d.iter().map(|x| to_pixel(&p1, x)).collect();
    let x2 = points3d.iter().map(|x| to_pixel(&p2, x)).collect();

    SyntheticScene {
        points3d,
        x1,
        x2,
        p1,
        p2,
        rotation,
        translation,
    }
}

/// Interleave `m` random correspondences whose Sampson error under `f` exceeds 10 px^2.
///
/// Returns the corrupted point sets and the sorted indices of the original points.
pub(crate) fn add_outliers(
    x1: &[[f64; 3]],
    x2: &[[f64; 3]],
    f: &Mat33,
    m: usize,
    seed: u64,
) -> (Vec<[f64; 3]>, Vec<[f64; 3]>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let total = x1.len() + m;
    let step = (total / m.max(1)).max(1);

    let (mut out1, mut out2, mut inliers) = (Vec::new(), Vec::new(), Vec::new());
    let (mut next_inlier, mut placed) = (0, 0);
    for idx in 0..total {
        let outlier_slot = idx % step == step - 1 && placed < m;
        if outlier_slot || next_inlier == x1.len() {
            let (a, b) = loop {
                let a = [rng.random_range(0.0..640.0), rng.random_range(0.0..480.0), 1.0];
                let b = [rng.random_range(0.0..640.0), rng.random_range(0.0..480.0), 1.0];
                if crate::fundamental::sampson_distance(f, &a, &b) > 10.0 {
                    break (a, b);
                }
            };
            out1.push(a);
            out2.push(b);
            placed += 1;
        } else {
            out1.push(x1[next_inlier]);
            out2.push(x2[next_inlier]);
            inliers.push(idx);
            next_inlier += 1;
        }
    }
    (out1, out2, inliers)
}
