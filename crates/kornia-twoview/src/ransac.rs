use std::cmp::Ordering;

use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::TwoViewError;

/// Controls how RANSAC trials are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// Run every trial sequentially on the current thread.
    #[default]
    Serial,

    /// Evaluate trials on the global Rayon thread pool.
    ///
    /// Produces the same result as [`ExecutionStrategy::Serial`] for a fixed seed.
    Parallel,
}

/// Parameters for RANSAC model estimation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Maximum number of RANSAC iterations.
    pub max_iterations: usize,
    /// Inlier threshold; a datum is an inlier when its error is strictly below it.
    pub threshold: f64,
    /// Minimum number of inliers required for acceptance.
    pub min_inliers: usize,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
    /// Refit the model on the full consensus set of the best hypothesis.
    pub refine: bool,
    /// How trials are scheduled.
    pub strategy: ExecutionStrategy,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            threshold: 1e-6,
            min_inliers: 20,
            random_seed: Some(0),
            refine: true,
            strategy: ExecutionStrategy::Serial,
        }
    }
}

/// Result of a RANSAC model fit.
#[derive(Clone, Debug, PartialEq)]
pub struct RansacResult<M> {
    /// Estimated model.
    pub model: M,
    /// Sorted indices of the inlier data.
    pub inliers: Vec<usize>,
    /// Mean error over the inliers (lower is better).
    pub mean_error: f64,
    /// Number of trials whose minimal sample produced a hypothesis.
    pub iterations: usize,
}

/// A model that can be fitted to minimal samples and scored per datum.
pub trait Estimator {
    /// A single observation, e.g. a point correspondence.
    type Datum;
    /// The fitted model.
    type Model;

    /// Number of data in a minimal sample.
    fn sample_size(&self) -> usize;

    /// Fit a model to at least [`Estimator::sample_size`] data.
    fn fit(&self, data: &[Self::Datum]) -> Result<Self::Model, TwoViewError>;

    /// Error of one datum under `model`.
    fn error(&self, model: &Self::Model, datum: &Self::Datum) -> f64;
}

struct Hypothesis<M> {
    trial: usize,
    model: M,
    inliers: Vec<usize>,
    mean_error: f64,
}

impl<M> Hypothesis<M> {
    // more inliers, then lower mean error, then the earlier trial
    fn rank(&self, other: &Self) -> Ordering {
        self.inliers
            .len()
            .cmp(&other.inliers.len())
            .then_with(|| other.mean_error.total_cmp(&self.mean_error))
            .then_with(|| other.trial.cmp(&self.trial))
    }
}

fn pick_best<M>(a: Hypothesis<M>, b: Hypothesis<M>) -> Hypothesis<M> {
    match a.rank(&b) {
        Ordering::Less => b,
        _ => a,
    }
}

// best hypothesis so far and the number of trials that produced one
type Tally<M> = (Hypothesis<M>, usize);

fn merge<M>((a, na): Tally<M>, (b, nb): Tally<M>) -> Tally<M> {
    (pick_best(a, b), na + nb)
}

/// splitmix64 finalizer.
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed of one trial, a pure function of the base seed and the trial index.
fn trial_seed(base: u64, trial: usize) -> u64 {
    base ^ splitmix64(trial as u64)
}

fn score<E: Estimator>(
    estimator: &E,
    model: &E::Model,
    data: &[E::Datum],
    threshold: f64,
) -> (Vec<usize>, f64) {
    let mut inliers = Vec::new();
    let mut total = 0.0;
    for (i, datum) in data.iter().enumerate() {
        let err = estimator.error(model, datum);
        if err < threshold {
            inliers.push(i);
            total += err;
        }
    }
    let mean_error = if inliers.is_empty() {
        f64::INFINITY
    } else {
        total / inliers.len() as f64
    };
    (inliers, mean_error)
}

fn run_trial<E>(
    estimator: &E,
    data: &[E::Datum],
    threshold: f64,
    trial: usize,
    base_seed: u64,
) -> Option<Hypothesis<E::Model>>
where
    E: Estimator,
    E::Datum: Clone,
{
    let mut rng = StdRng::seed_from_u64(trial_seed(base_seed, trial));
    let sample = rand::seq::index::sample(&mut rng, data.len(), estimator.sample_size());
    let subset = sample.iter().map(|i| data[i].clone()).collect::<Vec<_>>();

    let model = match estimator.fit(&subset) {
        Ok(model) => model,
        Err(err) => {
            log::trace!("ransac trial {trial}: fit rejected: {err}");
            return None;
        }
    };

    let (inliers, mean_error) = score(estimator, &model, data, threshold);
    Some(Hypothesis {
        trial,
        model,
        inliers,
        mean_error,
    })
}

/// Robustly fit a model with random sample consensus.
///
/// Each trial draws a minimal sample without replacement, fits a candidate model
/// and counts the data whose error is below `params.threshold`. The hypothesis with
/// the most inliers wins; ties go to the lower mean inlier error, then to the
/// earlier trial. Every trial seeds its own generator from the base seed and its
/// index, so serial and parallel runs agree.
///
/// # Arguments
///
/// * `estimator` - The model to fit.
/// * `data` - The observations, including outliers.
/// * `params` - Iteration budget, threshold, seed and scheduling.
///
/// # Errors
///
/// * [`TwoViewError::InsufficientCorrespondences`] if `data` is smaller than a minimal sample.
/// * [`TwoViewError::NoConsensus`] if no hypothesis reaches `params.min_inliers`.
pub fn ransac<E>(
    estimator: &E,
    data: &[E::Datum],
    params: &RansacParams,
) -> Result<RansacResult<E::Model>, TwoViewError>
where
    E: Estimator + Sync,
    E::Datum: Clone + Send + Sync,
    E::Model: Send,
{
    let sample_size = estimator.sample_size();
    if data.len() < sample_size {
        return Err(TwoViewError::InsufficientCorrespondences {
            required: sample_size,
            actual: data.len(),
        });
    }

    let base_seed = match params.random_seed {
        Some(seed) => seed,
        None => rand::rng().random::<u64>(),
    };

    log::debug!(
        "ransac: {} data, sample size {}, {} iterations, threshold {:e}, {:?}",
        data.len(),
        sample_size,
        params.max_iterations,
        params.threshold,
        params.strategy
    );

    let trial = |t: usize| run_trial(estimator, data, params.threshold, t, base_seed);
    let tally = match params.strategy {
        ExecutionStrategy::Serial => (0..params.max_iterations)
            .filter_map(trial)
            .fold(None, |acc: Option<Tally<E::Model>>, hyp| match acc {
                Some((best, n)) if best.rank(&hyp) != Ordering::Less => Some((best, n + 1)),
                acc => {
                    log::trace!(
                        "ransac trial {}: new best with {} inliers, mean error {:e}",
                        hyp.trial,
                        hyp.inliers.len(),
                        hyp.mean_error
                    );
                    Some((hyp, acc.map_or(1, |(_, n)| n + 1)))
                }
            }),
        ExecutionStrategy::Parallel => (0..params.max_iterations)
            .into_par_iter()
            .filter_map(trial)
            .map(|hyp| (hyp, 1))
            .reduce_with(merge),
    };

    let (best, iterations) = match tally {
        Some((best, n)) => (Some(best), n),
        None => (None, 0),
    };

    let best = match best {
        Some(best) if best.inliers.len() >= params.min_inliers => best,
        best => {
            let best_inliers = best.map_or(0, |b| b.inliers.len());
            log::debug!(
                "ransac: no consensus after {iterations} hypotheses, best has {best_inliers} inliers, {} required",
                params.min_inliers
            );
            return Err(TwoViewError::NoConsensus {
                best_inliers,
                required: params.min_inliers,
            });
        }
    };

    let mut result = RansacResult {
        model: best.model,
        inliers: best.inliers,
        mean_error: best.mean_error,
        iterations,
    };

    if params.refine {
        let subset = result
            .inliers
            .iter()
            .map(|&i| data[i].clone())
            .collect::<Vec<_>>();
        match estimator.fit(&subset) {
            Ok(model) => {
                let (inliers, mean_error) = score(estimator, &model, data, params.threshold);
                if inliers.len() >= result.inliers.len() {
                    result = RansacResult {
                        model,
                        inliers,
                        mean_error,
                        ..result
                    };
                } else {
                    log::debug!(
                        "ransac: refit dropped to {} inliers, keeping the sampled model",
                        inliers.len()
                    );
                }
            }
            Err(err) => log::warn!("ransac: refit on the consensus set failed: {err}"),
        }
    }

    log::debug!(
        "ransac: consensus of {} / {} with mean error {:e}",
        result.inliers.len(),
        data.len(),
        result.mean_error
    );

    Ok(result)
}
