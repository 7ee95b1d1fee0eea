use crate::error::TwoViewError;

/// Row-major 3x3 matrix.
pub type Mat33 = [[f64; 3]; 3];

/// Row-major 3x4 matrix.
pub type Mat34 = [[f64; 4]; 3];

/// Relative tolerance used to detect vanishing coordinates and singular values.
pub(crate) const EPS: f64 = 1e-12;

/// 3x3 identity matrix.
pub const IDENTITY_MAT33: Mat33 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Multiply two 3x3 matrices.
pub fn matmul33(a: &Mat33, b: &Mat33) -> Mat33 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Transpose a 3x3 matrix.
pub fn transpose33(a: &Mat33) -> Mat33 {
    [
        [a[0][0], a[1][0], a[2][0]],
        [a[0][1], a[1][1], a[2][1]],
        [a[0][2], a[1][2], a[2][2]],
    ]
}

/// Multiply a 3x3 matrix by a 3-vector.
pub fn mat33_mul_vec3(a: &Mat33, v: &[f64; 3]) -> [f64; 3] {
    [
        dot_product3(&a[0], v),
        dot_product3(&a[1], v),
        dot_product3(&a[2], v),
    ]
}

/// Determinant of a 3x3 matrix.
pub fn det_mat33(a: &Mat33) -> f64 {
    a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1])
        - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
        + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0])
}

/// Dot product of two 3-vectors.
pub fn dot_product3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross-product matrix of `v`, such that `skew(v) * w = v x w`.
///
/// Example:
///
/// ```
/// use kornia_twoview::linalg::{mat33_mul_vec3, skew};
///
/// let a = [1.0, 0.0, 0.0];
/// let b = [0.0, 1.0, 0.0];
/// assert_eq!(mat33_mul_vec3(&skew(&a), &b), [0.0, 0.0, 1.0]);
/// ```
pub fn skew(v: &[f64; 3]) -> Mat33 {
    [[0.0, -v[2], v[1]], [v[2], 0.0, -v[0]], [-v[1], v[0], 0.0]]
}

/// Frobenius norm of a 3x3 matrix.
pub fn norm_mat33(a: &Mat33) -> f64 {
    a.iter().flatten().map(|v| v * v).sum::<f64>().sqrt()
}

/// Multiply every entry of a 3x3 matrix by `s`.
pub fn scale_mat33(a: &Mat33, s: f64) -> Mat33 {
    a.map(|row| row.map(|v| v * s))
}

/// Euclidean norm of a slice.
///
/// ```
/// assert_eq!(kornia_twoview::linalg::norm(&[3.0, 4.0, 0.0]), 5.0);
/// ```
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Lift pixel coordinates to homogeneous points with `w = 1`.
pub fn homogenize(points: &[[f64; 2]]) -> Vec<[f64; 3]> {
    points.iter().map(|p| [p[0], p[1], 1.0]).collect()
}

/// Divide a homogeneous 2d point by its last coordinate.
///
/// Returns `None` for points at infinity.
pub fn dehomogenize2(p: &[f64; 3]) -> Option<[f64; 2]> {
    if p[2].abs() <= EPS * norm(p) || !p[2].is_finite() {
        return None;
    }
    Some([p[0] / p[2], p[1] / p[2]])
}

/// Singular value decomposition `A = U * diag(s) * V^T` of a 3x3 matrix.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Svd3 {
    pub u: Mat33,
    pub s: [f64; 3],
    pub v: Mat33,
}

impl Svd3 {
    /// Rebuild `U * diag(s) * V^T` with the given singular values.
    pub fn recompose(&self, s: &[f64; 3]) -> Mat33 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, val) in row.iter_mut().enumerate() {
                *val = (0..3).map(|k| self.u[i][k] * s[k] * self.v[j][k]).sum();
            }
        }
        out
    }
}

/// Full SVD of a 3x3 matrix; singular values are sorted in non-increasing order.
pub(crate) fn svd3(a: &Mat33) -> Svd3 {
    let mat = faer::Mat::<f64>::from_fn(3, 3, |i, j| a[i][j]);
    let svd = mat.svd();
    let (u, v, s) = (svd.u(), svd.v(), svd.s_diagonal());

    let mut out = Svd3 {
        u: [[0.0; 3]; 3],
        s: [0.0; 3],
        v: [[0.0; 3]; 3],
    };
    for i in 0..3 {
        out.s[i] = s.read(i);
        for j in 0..3 {
            out.u[i][j] = u.read(i, j);
            out.v[i][j] = v.read(i, j);
        }
    }
    out
}

/// Right singular vector of the smallest singular value of a linear system.
#[derive(Debug, Clone)]
pub(crate) struct NullVector {
    /// Unit-norm solution of `A x = 0` in the least-squares sense.
    pub vector: Vec<f64>,
    /// Second smallest over largest singular value.
    ///
    /// Close to zero when the null space has more than one dimension.
    pub conditioning: f64,
}

/// Solve the homogeneous system `A x = 0` subject to `|x| = 1`.
///
/// Singular values beyond the number of rows are treated as zero, so an
/// under-determined system reports `conditioning == 0`.
pub(crate) fn null_vector(a: &faer::Mat<f64>) -> Result<NullVector, TwoViewError> {
    let (nrows, ncols) = (a.nrows(), a.ncols());
    if nrows == 0 || ncols < 2 {
        return Err(TwoViewError::DegenerateInput("empty linear system"));
    }

    for j in 0..ncols {
        for i in 0..nrows {
            if !a.read(i, j).is_finite() {
                return Err(TwoViewError::DegenerateInput(
                    "linear system contains non-finite coefficients",
                ));
            }
        }
    }

    let svd = a.svd();
    let s = svd.s_diagonal();
    let sigma = |k: usize| if k < s.nrows() { s.read(k) } else { 0.0 };

    let sigma_max = sigma(0);
    if sigma_max <= f64::MIN_POSITIVE {
        return Err(TwoViewError::DegenerateInput("linear system is identically zero"));
    }

    let v = svd.v();
    let vector = (0..ncols).map(|i| v.read(i, ncols - 1)).collect();

    Ok(NullVector {
        vector,
        conditioning: sigma(ncols - 2) / sigma_max,
    })
}
