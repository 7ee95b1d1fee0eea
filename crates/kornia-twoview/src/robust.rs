use crate::error::TwoViewError;
use crate::fundamental::{
    estimate_fundamental_normalized_with, rescale_fundamental, Correspondence, FundamentalScale,
    FUNDAMENTAL_SAMPLE_SIZE,
};
use crate::linalg::Mat33;
use crate::ransac::{ransac, Estimator, RansacParams, RansacResult};

/// Normalized 8-point fit scored by the Sampson error.
///
/// Hypotheses are kept at unit Frobenius norm so that a sample with `F[2,2] ~ 0`
/// is still scored instead of being rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FundamentalEstimator;

impl Estimator for FundamentalEstimator {
    type Datum = Correspondence;
    type Model = Mat33;

    fn sample_size(&self) -> usize {
        FUNDAMENTAL_SAMPLE_SIZE
    }

    fn fit(&self, data: &[Correspondence]) -> Result<Mat33, TwoViewError> {
        let (x1, x2): (Vec<_>, Vec<_>) = data.iter().map(|c| (c.x1, c.x2)).unzip();
        estimate_fundamental_normalized_with(&x1, &x2, FundamentalScale::Frobenius)
    }

    fn error(&self, f: &Mat33, c: &Correspondence) -> f64 {
        c.sampson_error(f)
    }
}

/// Estimate the fundamental matrix robustly with RANSAC.
///
/// The returned model is scaled so that `F[2,2] == 1`; see
/// [`estimate_fundamental_robust_with`] to choose another representative.
///
/// Example:
///
/// ```no_run
/// use kornia_twoview::{estimate_fundamental_robust, RansacParams};
///
/// # let points1 = vec![[0.0, 0.0, 1.0]; 8];
/// # let points2 = vec![[0.0, 0.0, 1.0]; 8];
/// let params = RansacParams {
///     threshold: 1e-3,
///     random_seed: Some(7),
///     ..Default::default()
/// };
/// let result = estimate_fundamental_robust(&points1, &points2, &params)?;
/// println!("{} inliers", result.inliers.len());
/// # Ok::<(), kornia_twoview::TwoViewError>(())
/// ```
pub fn estimate_fundamental_robust(
    points1: &[[f64; 3]],
    points2: &[[f64; 3]],
    params: &RansacParams,
) -> Result<RansacResult<Mat33>, TwoViewError> {
    estimate_fundamental_robust_with(points1, points2, params, FundamentalScale::Canonical)
}

/// Estimate the fundamental matrix robustly and pick its scale explicitly.
///
/// # Arguments
///
/// * `points1` - Homogeneous points in the first view, with `w = 1` so that
///   `params.threshold` is in squared pixels.
/// * `points2` - Corresponding homogeneous points in the second view.
/// * `params` - RANSAC configuration.
/// * `scale` - Representative of the final model.
///
/// # Errors
///
/// * [`TwoViewError::ShapeMismatch`] if the point counts differ.
/// * [`TwoViewError::InsufficientCorrespondences`] with fewer than 8 points.
/// * [`TwoViewError::NoConsensus`] if no hypothesis reaches `params.min_inliers`.
/// * [`TwoViewError::UnstableNormalization`] if `scale` is canonical and the
///   consensus model has `F[2,2] ~ 0`.
pub fn estimate_fundamental_robust_with(
    points1: &[[f64; 3]],
    points2: &[[f64; 3]],
    params: &RansacParams,
    scale: FundamentalScale,
) -> Result<RansacResult<Mat33>, TwoViewError> {
    let data = Correspondence::from_slices(points1, points2)?;
    let result = ransac(&FundamentalEstimator, &data, params)?;
    let model = rescale_fundamental(&result.model, scale)?;
    Ok(RansacResult { model, ..result })
}
