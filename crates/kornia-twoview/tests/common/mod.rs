#![allow(dead_code)]

use kornia_twoview::{
    linalg::{self, Mat33, IDENTITY_MAT33},
    sampson_distance, CameraMatrix,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

pub struct Scene {
    pub k: Mat33,
    pub rotation: Mat33,
    pub translation: [f64; 3],
    pub p1: CameraMatrix,
    pub p2: CameraMatrix,
    pub points3d: Vec<[f64; 4]>,
    pub x1: Vec<[f64; 3]>,
    pub x2: Vec<[f64; 3]>,
}

pub fn intrinsics(focal: f64, cx: f64, cy: f64) -> Mat33 {
    [[focal, 0.0, cx], [0.0, focal, cy], [0.0, 0.0, 1.0]]
}

/// Rotation about the y axis followed by a rotation about the x axis.
pub fn rotation_yx(yaw: f64, pitch: f64) -> Mat33 {
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let ry = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
    let rx = [[1.0, 0.0, 0.0], [0.0, cp, -sp], [0.0, sp, cp]];
    linalg::matmul33(&rx, &ry)
}

pub fn fundamental_from_pose(k: &Mat33, rotation: &Mat33, translation: &[f64; 3]) -> Mat33 {
    let (f, cx, cy) = (k[0][0], k[0][2], k[1][2]);
    let k_inv = [[1.0 / f, 0.0, -cx / f], [0.0, 1.0 / f, -cy / f], [0.0, 0.0, 1.0]];
    let e = linalg::matmul33(&linalg::skew(translation), rotation);
    linalg::matmul33(&linalg::transpose33(&k_inv), &linalg::matmul33(&e, &k_inv))
}

fn project(p: &CameraMatrix, x: &[f64; 4]) -> [f64; 3] {
    let u = p.project(x);
    [u[0] / u[2], u[1] / u[2], 1.0]
}

pub fn scene(n: usize, seed: u64) -> Scene {
    let mut rng = StdRng::seed_from_u64(seed);
    let k = intrinsics(750.0, 320.0, 240.0);
    let rotation = rotation_yx(0.15, -0.05);
    let translation = [-0.8, 0.05, 0.15];
    let p1 = CameraMatrix::from_intrinsics_pose(&k, &IDENTITY_MAT33, &[0.0; 3]);
    let p2 = CameraMatrix::from_intrinsics_pose(&k, &rotation, &translation);

    let points3d = (0..n)
        .map(|_| {
            [
                rng.random_range(-2.0..2.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(5.0..10.0),
                1.0,
            ]
        })
        .collect::<Vec<_>>();
    let x1 = points3d.iter().map(|x| project(&p1, x)).collect();
    let x2 = points3d.iter().map(|x| project(&p2, x)).collect();

    Scene {
        k,
        rotation,
        translation,
        p1,
        p2,
        points3d,
        x1,
        x2,
    }
}

/// Append `m` correspondences far from their epipolar lines and shuffle everything.
///
/// Returns the corrupted sets and the sorted positions of the original points.
pub fn with_outliers(
    scene: &Scene,
    m: usize,
    seed: u64,
) -> (Vec<[f64; 3]>, Vec<[f64; 3]>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let f = fundamental_from_pose(&scene.k, &scene.rotation, &scene.translation);

    let mut pairs = scene
        .x1
        .iter()
        .zip(scene.x2.iter())
        .map(|(a, b)| (*a, *b, true))
        .collect::<Vec<_>>();
    while pairs.len() < scene.x1.len() + m {
        let a = [rng.random_range(0.0..640.0), rng.random_range(0.0..480.0), 1.0];
        let b = [rng.random_range(0.0..640.0), rng.random_range(0.0..480.0), 1.0];
        if sampson_distance(&f, &a, &b) > 25.0 {
            pairs.push((a, b, false));
        }
    }

    pairs.shuffle(&mut rng);

    let inliers = pairs
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.2.then_some(i))
        .collect();
    let (x1, x2) = pairs.iter().map(|p| (p.0, p.1)).unzip();
    (x1, x2, inliers)
}
