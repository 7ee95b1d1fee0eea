use crate::error::TwoViewError;
use crate::linalg::{self, Mat33};

/// Points conditioned for a linear solver together with the transform that produced them.
#[derive(Debug, Clone)]
pub struct NormalizedPoints {
    /// Similarity transform `T = [[s, 0, -s*mx], [0, s, -s*my], [0, 0, 1]]`.
    pub transform: Mat33,
    /// Transformed points `T * x`, with `w = 1`.
    pub points: Vec<[f64; 3]>,
}

/// Recenter and rescale homogeneous 2d points for numerical conditioning.
///
/// The points are dehomogenized, shifted so that their centroid is the origin and
/// scaled so that their average distance to the origin is `sqrt(2)`.
///
/// # Errors
///
/// * [`TwoViewError::InsufficientCorrespondences`] if `points` is empty.
/// * [`TwoViewError::DegenerateInput`] if a point lies at infinity or all points coincide.
///
/// Example:
///
/// ```
/// use kornia_twoview::normalize_points;
///
/// let points = vec![[0.0, 0.0, 1.0], [2.0, 0.0, 1.0], [2.0, 2.0, 1.0], [0.0, 2.0, 1.0]];
/// let normalized = normalize_points(&points).unwrap();
/// assert_eq!(normalized.points.len(), 4);
/// ```
pub fn normalize_points(points: &[[f64; 3]]) -> Result<NormalizedPoints, TwoViewError> {
    if points.is_empty() {
        return Err(TwoViewError::InsufficientCorrespondences {
            required: 1,
            actual: 0,
        });
    }

    let euclidean = points
        .iter()
        .map(|p| {
            linalg::dehomogenize2(p).ok_or(TwoViewError::DegenerateInput(
                "cannot normalize a point at infinity",
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n = euclidean.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in &euclidean {
        mx += p[0];
        my += p[1];
    }
    mx /= n;
    my /= n;

    let mean_dist = euclidean
        .iter()
        .map(|p| ((p[0] - mx).powi(2) + (p[1] - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    // relative to the centroid magnitude so that far-away clusters are still detected
    let extent = mx.abs().max(my.abs()).max(1.0);
    if !mean_dist.is_finite() || mean_dist <= linalg::EPS * extent {
        log::debug!("normalization failed: mean distance {mean_dist:e} for {n} points");
        return Err(TwoViewError::DegenerateInput(
            "points have zero spread and cannot be normalized",
        ));
    }

    let scale = std::f64::consts::SQRT_2 / mean_dist;
    let transform = [
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0],
    ];

    let points = euclidean
        .iter()
        .map(|p| [(p[0] - mx) * scale, (p[1] - my) * scale, 1.0])
        .collect();

    Ok(NormalizedPoints { transform, points })
}
