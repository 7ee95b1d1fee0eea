use serde::{Deserialize, Serialize};

use crate::error::{check_same_len, TwoViewError};
use crate::linalg::{self, Mat33};
use crate::normalize::normalize_points;

/// Minimal number of correspondences for the 8-point algorithm.
pub const FUNDAMENTAL_SAMPLE_SIZE: usize = 8;

/// Below this |F[2,2]| / |F| the canonical rescale is rejected.
const CANONICAL_SCALE_TOL: f64 = 1e-10;

/// A pair of homogeneous image points observing the same scene point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Point in the first view.
    pub x1: [f64; 3],
    /// Point in the second view.
    pub x2: [f64; 3],
}

impl Correspondence {
    /// Create a new correspondence.
    pub fn new(x1: [f64; 3], x2: [f64; 3]) -> Self {
        Self { x1, x2 }
    }

    /// Zip two point arrays into correspondences.
    ///
    /// # Errors
    ///
    /// [`TwoViewError::ShapeMismatch`] if the arrays have different lengths.
    pub fn from_slices(
        points1: &[[f64; 3]],
        points2: &[[f64; 3]],
    ) -> Result<Vec<Self>, TwoViewError> {
        check_same_len("points1", points1, "points2", points2)?;
        Ok(points1
            .iter()
            .zip(points2)
            .map(|(x1, x2)| Self::new(*x1, *x2))
            .collect())
    }

    /// Sampson error of this correspondence under `f`.
    pub fn sampson_error(&self, f: &Mat33) -> f64 {
        sampson_distance(f, &self.x1, &self.x2)
    }
}

/// Representative chosen for the scale-free fundamental matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FundamentalScale {
    /// Divide by `F[2,2]` so that the bottom-right entry is one.
    ///
    /// Fails with [`TwoViewError::UnstableNormalization`] when `F[2,2]` is near zero.
    #[default]
    Canonical,
    /// Unit Frobenius norm.
    Frobenius,
}

/// Estimate the fundamental matrix with the (unnormalized) 8-point algorithm.
///
/// Solves `x2^T * F * x1 = 0` in the least-squares sense from the homogeneous
/// points and enforces rank 2 on the result, which is returned with unit
/// Frobenius norm.
///
/// # Arguments
///
/// * `points1` - Homogeneous points in the first view (at least 8).
/// * `points2` - Corresponding homogeneous points in the second view.
///
/// # Errors
///
/// * [`TwoViewError::ShapeMismatch`] if the point counts differ.
/// * [`TwoViewError::InsufficientCorrespondences`] with fewer than 8 points.
/// * [`TwoViewError::DegenerateInput`] if the points do not determine a unique solution.
pub fn estimate_fundamental(
    points1: &[[f64; 3]],
    points2: &[[f64; 3]],
) -> Result<Mat33, TwoViewError> {
    check_same_len("points1", points1, "points2", points2)?;
    if points1.len() < FUNDAMENTAL_SAMPLE_SIZE {
        return Err(TwoViewError::InsufficientCorrespondences {
            required: FUNDAMENTAL_SAMPLE_SIZE,
            actual: points1.len(),
        });
    }

    // row i: [x2*x1, x2*y1, x2*w1, y2*x1, y2*y1, y2*w1, w2*x1, w2*y1, w2*w1]
    let mut a = faer::Mat::<f64>::zeros(points1.len(), 9);
    for (i, (x1, x2)) in points1.iter().zip(points2).enumerate() {
        for r in 0..3 {
            for c in 0..3 {
                a.write(i, 3 * r + c, x2[r] * x1[c]);
            }
        }
    }

    let nv = linalg::null_vector(&a)?;
    if nv.conditioning <= linalg::EPS {
        return Err(TwoViewError::DegenerateInput(
            "correspondences do not determine a unique fundamental matrix",
        ));
    }

    let f = &nv.vector;
    let f = [[f[0], f[1], f[2]], [f[3], f[4], f[5]], [f[6], f[7], f[8]]];
    let f = enforce_rank2(&f);

    Ok(linalg::scale_mat33(&f, 1.0 / linalg::norm_mat33(&f)))
}

/// Estimate the fundamental matrix with the normalized 8-point algorithm.
///
/// The result is scaled so that `F[2,2] == 1`.
///
/// Example:
///
/// ```no_run
/// use kornia_twoview::estimate_fundamental_normalized;
///
/// # let points1 = vec![[0.0, 0.0, 1.0]; 8];
/// # let points2 = vec![[0.0, 0.0, 1.0]; 8];
/// let f = estimate_fundamental_normalized(&points1, &points2)?;
/// # Ok::<(), kornia_twoview::TwoViewError>(())
/// ```
///
/// # Errors
///
/// Same as [`estimate_fundamental_normalized_with`] with [`FundamentalScale::Canonical`].
pub fn estimate_fundamental_normalized(
    points1: &[[f64; 3]],
    points2: &[[f64; 3]],
) -> Result<Mat33, TwoViewError> {
    estimate_fundamental_normalized_with(points1, points2, FundamentalScale::Canonical)
}

/// Estimate the fundamental matrix with the normalized 8-point algorithm and an explicit scale.
///
/// Both point sets are conditioned with [`normalize_points`], `F_hat` is estimated in
/// normalized coordinates and mapped back with `F = T2^T * F_hat * T1`.
///
/// # Errors
///
/// * [`TwoViewError::ShapeMismatch`] if the point counts differ.
/// * [`TwoViewError::InsufficientCorrespondences`] with fewer than 8 points.
/// * [`TwoViewError::DegenerateInput`] for coincident points, points at infinity or
///   configurations without a unique solution.
/// * [`TwoViewError::UnstableNormalization`] if `scale` is canonical and `F[2,2]` is near zero.
pub fn estimate_fundamental_normalized_with(
    points1: &[[f64; 3]],
    points2: &[[f64; 3]],
    scale: FundamentalScale,
) -> Result<Mat33, TwoViewError> {
    check_same_len("points1", points1, "points2", points2)?;
    if points1.len() < FUNDAMENTAL_SAMPLE_SIZE {
        return Err(TwoViewError::InsufficientCorrespondences {
            required: FUNDAMENTAL_SAMPLE_SIZE,
            actual: points1.len(),
        });
    }

    let norm1 = normalize_points(points1)?;
    let norm2 = normalize_points(points2)?;

    let f_hat = estimate_fundamental(&norm1.points, &norm2.points)?;

    // denormalize: F = T2^T * F_hat * T1
    let f = linalg::matmul33(
        &linalg::matmul33(&linalg::transpose33(&norm2.transform), &f_hat),
        &norm1.transform,
    );

    rescale_fundamental(&f, scale)
}

/// Pick a representative of the scale-free matrix `f`.
///
/// # Errors
///
/// * [`TwoViewError::DegenerateInput`] if `f` is zero or not finite.
/// * [`TwoViewError::UnstableNormalization`] if `scale` is canonical and `F[2,2]` is near zero.
pub fn rescale_fundamental(f: &Mat33, scale: FundamentalScale) -> Result<Mat33, TwoViewError> {
    let norm = linalg::norm_mat33(f);
    if !norm.is_finite() || norm <= f64::MIN_POSITIVE {
        return Err(TwoViewError::DegenerateInput(
            "fundamental matrix is zero or not finite",
        ));
    }

    match scale {
        FundamentalScale::Canonical => {
            let value = f[2][2] / norm;
            if value.abs() < CANONICAL_SCALE_TOL {
                log::debug!("canonical rescale rejected: F[2,2] / |F| = {value:e}");
                return Err(TwoViewError::UnstableNormalization { value });
            }
            Ok(linalg::scale_mat33(f, 1.0 / f[2][2]))
        }
        FundamentalScale::Frobenius => Ok(linalg::scale_mat33(f, 1.0 / norm)),
    }
}

/// Project a 3x3 matrix onto the rank-2 matrices closest in Frobenius norm.
pub fn enforce_rank2(f: &Mat33) -> Mat33 {
    let svd = linalg::svd3(f);
    svd.recompose(&[svd.s[0], svd.s[1], 0.0])
}

/// First-order geometric (Sampson) error of a correspondence under `f`.
///
/// Returns `r^2 / d` with `r = x2^T * F * x1` and
/// `d = (F x1)_0^2 + (F x1)_1^2 + (F^T x2)_0^2 + (F^T x2)_1^2`. Image points are
/// expected with `w = 1`, so the error is in squared pixels. When `d` vanishes
/// (both points sit on their epipoles) the error is `f64::INFINITY`.
pub fn sampson_distance(f: &Mat33, x1: &[f64; 3], x2: &[f64; 3]) -> f64 {
    let fx1 = linalg::mat33_mul_vec3(f, x1);
    let ftx2 = epipolar_line_left(f, x2);
    let r = linalg::dot_product3(x2, &fx1);
    let denom = fx1[0] * fx1[0] + fx1[1] * fx1[1] + ftx2[0] * ftx2[0] + ftx2[1] * ftx2[1];
    if denom <= f64::MIN_POSITIVE {
        return f64::INFINITY;
    }
    r * r / denom
}

/// Epipolar line `F * x1` in the second view.
pub fn epipolar_line(f: &Mat33, x1: &[f64; 3]) -> [f64; 3] {
    linalg::mat33_mul_vec3(f, x1)
}

/// Epipolar line `F^T * x2` in the first view.
pub fn epipolar_line_left(f: &Mat33, x2: &[f64; 3]) -> [f64; 3] {
    [
        f[0][0] * x2[0] + f[1][0] * x2[1] + f[2][0] * x2[2],
        f[0][1] * x2[0] + f[1][1] * x2[1] + f[2][1] * x2[2],
        f[0][2] * x2[0] + f[1][2] * x2[1] + f[2][2] * x2[2],
    ]
}

/// Perpendicular distance between a finite point and a homogeneous line.
///
/// # Errors
///
/// [`TwoViewError::DegenerateInput`] if the point or the line is at infinity.
pub fn point_line_distance(line: &[f64; 3], x: &[f64; 3]) -> Result<f64, TwoViewError> {
    let p = linalg::dehomogenize2(x)
        .ok_or(TwoViewError::DegenerateInput("point lies at infinity"))?;
    let dir = line[0].hypot(line[1]);
    if dir <= f64::MIN_POSITIVE {
        return Err(TwoViewError::DegenerateInput("line lies at infinity"));
    }
    Ok((line[0] * p[0] + line[1] * p[1] + line[2]).abs() / dir)
}
