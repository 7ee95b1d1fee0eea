use crate::error::TwoViewError;
use crate::linalg::{self, Mat33};

/// An epipole, the image of the other camera's centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Epipole {
    /// A finite image point `[x, y, 1]`.
    Finite([f64; 3]),
    /// A point at infinity, given as the raw unit-norm homogeneous direction.
    AtInfinity([f64; 3]),
}

impl Epipole {
    fn from_homogeneous(e: [f64; 3]) -> Self {
        match linalg::dehomogenize2(&e) {
            Some([x, y]) => Self::Finite([x, y, 1.0]),
            None => Self::AtInfinity(e),
        }
    }

    /// Homogeneous coordinates of the epipole.
    pub fn homogeneous(&self) -> [f64; 3] {
        match self {
            Self::Finite(e) | Self::AtInfinity(e) => *e,
        }
    }

    /// Pixel coordinates, or `None` when the epipole lies at infinity.
    pub fn point(&self) -> Option<[f64; 2]> {
        match self {
            Self::Finite(e) => Some([e[0], e[1]]),
            Self::AtInfinity(_) => None,
        }
    }

    /// Whether the epipole lies at infinity (parallel epipolar lines).
    pub fn is_at_infinity(&self) -> bool {
        matches!(self, Self::AtInfinity(_))
    }
}

/// Compute the (right) epipole of `f` in the first image, such that `F * e = 0`.
///
/// # Errors
///
/// [`TwoViewError::DegenerateInput`] if `f` is zero, not finite or has rank below 2.
///
/// Example:
///
/// ```
/// use kornia_twoview::{compute_epipole, linalg::skew};
///
/// // camera translated along x: epipolar lines are parallel to the x axis
/// let f = skew(&[1.0, 0.0, 0.0]);
/// let e = compute_epipole(&f).unwrap();
/// assert!(e.is_at_infinity());
/// ```
pub fn compute_epipole(f: &Mat33) -> Result<Epipole, TwoViewError> {
    let norm = linalg::norm_mat33(f);
    if !norm.is_finite() || norm <= f64::MIN_POSITIVE {
        return Err(TwoViewError::DegenerateInput(
            "fundamental matrix is zero or not finite",
        ));
    }

    let svd = linalg::svd3(f);
    if svd.s[1] <= linalg::EPS * svd.s[0] {
        return Err(TwoViewError::DegenerateInput(
            "fundamental matrix has rank below 2",
        ));
    }

    Ok(Epipole::from_homogeneous([
        svd.v[0][2],
        svd.v[1][2],
        svd.v[2][2],
    ]))
}

/// Compute the left epipole of `f` in the second image, such that `F^T * e' = 0`.
///
/// # Errors
///
/// Same as [`compute_epipole`].
pub fn compute_left_epipole(f: &Mat33) -> Result<Epipole, TwoViewError> {
    compute_epipole(&linalg::transpose33(f))
}
