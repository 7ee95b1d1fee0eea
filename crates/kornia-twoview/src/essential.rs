use crate::camera::CameraMatrix;
use crate::error::TwoViewError;
use crate::linalg::{self, Mat33};

/// Rotation by 90 degrees about the z axis used to split an essential matrix.
const W: Mat33 = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];

/// Build an essential matrix from a fundamental matrix and camera intrinsics.
///
/// E = K2^T * F * K1
pub fn essential_from_fundamental(f: &Mat33, k1: &Mat33, k2: &Mat33) -> Mat33 {
    linalg::matmul33(&linalg::matmul33(&linalg::transpose33(k2), f), k1)
}

/// Decomposition of a matrix onto the essential manifold with consistent factors.
struct EssentialSvd {
    u: Mat33,
    v: Mat33,
    essential: Mat33,
}

fn essential_svd(e: &Mat33) -> Result<EssentialSvd, TwoViewError> {
    let norm = linalg::norm_mat33(e);
    if !norm.is_finite() || norm <= f64::MIN_POSITIVE {
        return Err(TwoViewError::DegenerateInput(
            "essential matrix is zero or not finite",
        ));
    }

    let svd = linalg::svd3(e);
    let mut v = svd.v;
    // keeps U * W * V^T a proper rotation
    if linalg::det_mat33(&svd.u) * linalg::det_mat33(&v) < 0.0 {
        v = linalg::scale_mat33(&v, -1.0);
    }

    let projected = linalg::Svd3 { v, ..svd }.recompose(&[1.0, 1.0, 0.0]);
    Ok(EssentialSvd {
        u: svd.u,
        v,
        essential: projected,
    })
}

/// Enforce the (1,1,0) singular value constraint on an essential matrix.
///
/// # Errors
///
/// [`TwoViewError::DegenerateInput`] if `e` is zero or not finite.
pub fn enforce_essential_constraints(e: &Mat33) -> Result<Mat33, TwoViewError> {
    Ok(essential_svd(e)?.essential)
}

/// Which of the two rotations `U * W * V^T` or `U * W^T * V^T` a candidate uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationBranch {
    /// `R = U * W * V^T`.
    W,
    /// `R = U * W^T * V^T`.
    WTransposed,
}

/// Sign of the baseline `t = +-U[:, 2]` of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaselineSign {
    /// `t = U[:, 2]`.
    Positive,
    /// `t = -U[:, 2]`.
    Negative,
}

/// Identifies one of the four pose candidates of an essential matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoseTag {
    /// Rotation branch.
    pub rotation: RotationBranch,
    /// Baseline sign.
    pub baseline: BaselineSign,
}

impl PoseTag {
    /// All four tags in storage order.
    pub const ALL: [PoseTag; 4] = [
        PoseTag {
            rotation: RotationBranch::W,
            baseline: BaselineSign::Positive,
        },
        PoseTag {
            rotation: RotationBranch::W,
            baseline: BaselineSign::Negative,
        },
        PoseTag {
            rotation: RotationBranch::WTransposed,
            baseline: BaselineSign::Positive,
        },
        PoseTag {
            rotation: RotationBranch::WTransposed,
            baseline: BaselineSign::Negative,
        },
    ];

    fn index(&self) -> usize {
        let r = match self.rotation {
            RotationBranch::W => 0,
            RotationBranch::WTransposed => 2,
        };
        let b = match self.baseline {
            BaselineSign::Positive => 0,
            BaselineSign::Negative => 1,
        };
        r + b
    }
}

/// The four second-camera candidates `[R | t]` of an essential matrix.
///
/// The first camera is `[I | 0]`. Exactly one candidate places the scene in front
/// of both cameras; picking it is left to the caller, e.g. by triangulating a few
/// points with each candidate and checking [`CameraMatrix::depth`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseCandidates {
    cameras: [CameraMatrix; 4],
    essential: Mat33,
}

impl PoseCandidates {
    /// The candidate identified by `tag`.
    pub fn get(&self, tag: PoseTag) -> &CameraMatrix {
        &self.cameras[tag.index()]
    }

    /// Iterate over all candidates with their tags.
    pub fn iter(&self) -> impl Iterator<Item = (PoseTag, &CameraMatrix)> + '_ {
        PoseTag::ALL.into_iter().zip(self.cameras.iter())
    }

    /// The essential matrix after projection onto singular values (1, 1, 0).
    pub fn essential(&self) -> &Mat33 {
        &self.essential
    }

    /// Consume the candidates into tagged cameras.
    pub fn into_cameras(self) -> [(PoseTag, CameraMatrix); 4] {
        let c = self.cameras;
        [
            (PoseTag::ALL[0], c[0]),
            (PoseTag::ALL[1], c[1]),
            (PoseTag::ALL[2], c[2]),
            (PoseTag::ALL[3], c[3]),
        ]
    }
}

/// Decompose an essential matrix into its four candidate second cameras.
///
/// The input is first projected onto the essential manifold, so any matrix
/// estimated from calibrated correspondences can be passed. With
/// `E = U * diag(1, 1, 0) * V^T` the candidates are
/// `[U W V^T | u3]`, `[U W V^T | -u3]`, `[U W^T V^T | u3]` and `[U W^T V^T | -u3]`.
///
/// # Errors
///
/// [`TwoViewError::DegenerateInput`] if `e` is zero or not finite.
pub fn decompose_essential(e: &Mat33) -> Result<PoseCandidates, TwoViewError> {
    let EssentialSvd { u, v, essential } = essential_svd(e)?;
    let vt = linalg::transpose33(&v);

    let r1 = linalg::matmul33(&linalg::matmul33(&u, &W), &vt);
    let r2 = linalg::matmul33(&linalg::matmul33(&u, &linalg::transpose33(&W)), &vt);
    let t = [u[0][2], u[1][2], u[2][2]];
    let t_neg = t.map(|c| -c);

    Ok(PoseCandidates {
        cameras: [
            CameraMatrix::from_rotation_translation(&r1, &t),
            CameraMatrix::from_rotation_translation(&r1, &t_neg),
            CameraMatrix::from_rotation_translation(&r2, &t),
            CameraMatrix::from_rotation_translation(&r2, &t_neg),
        ],
        essential,
    })
}
