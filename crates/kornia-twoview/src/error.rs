/// Errors returned by the two-view geometry routines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TwoViewError {
    /// Paired inputs have different lengths.
    #[error("Mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    ShapeMismatch {
        /// Label for the left-hand slice.
        left_name: &'static str,
        /// Length of the left-hand slice.
        left_len: usize,
        /// Label for the right-hand slice.
        right_name: &'static str,
        /// Length of the right-hand slice.
        right_len: usize,
    },

    /// Not enough correspondences for the requested solver.
    #[error("Need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences required by the solver.
        required: usize,
        /// Actual number of correspondences provided.
        actual: usize,
    },

    /// The input configuration does not determine a unique solution.
    #[error("Degenerate input: {0}")]
    DegenerateInput(&'static str),

    /// RANSAC did not reach the minimum inlier count within its iteration budget.
    #[error("RANSAC found no consensus: best hypothesis had {best_inliers} inliers, {required} required")]
    NoConsensus {
        /// Inlier count of the best hypothesis seen.
        best_inliers: usize,
        /// Minimum inlier count requested by the caller.
        required: usize,
    },

    /// The canonical F[2,2] = 1 rescale is numerically unstable.
    #[error("Cannot rescale fundamental matrix: F[2,2] = {value:e} is too close to zero")]
    UnstableNormalization {
        /// The offending F[2,2] entry of the unit-norm estimate.
        value: f64,
    },
}

/// Check that two paired slices have the same length.
pub(crate) fn check_same_len<A, B>(
    left_name: &'static str,
    left: &[A],
    right_name: &'static str,
    right: &[B],
) -> Result<(), TwoViewError> {
    if left.len() != right.len() {
        return Err(TwoViewError::ShapeMismatch {
            left_name,
            left_len: left.len(),
            right_name,
            right_len: right.len(),
        });
    }
    Ok(())
}
