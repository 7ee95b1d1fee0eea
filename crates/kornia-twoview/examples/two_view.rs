use argh::FromArgs;
use rand::{rngs::StdRng, Rng, SeedableRng};

use kornia_twoview::{
    decompose_essential, essential_from_fundamental, estimate_fundamental_robust,
    estimate_projection_matrix, linalg, triangulate, CameraMatrix, ExecutionStrategy,
    RansacParams,
};

#[derive(FromArgs)]
/// Two-view reconstruction of a synthetic scene
struct Args {
    /// number of scene points
    #[argh(option, default = "200")]
    num_points: usize,

    /// fraction of correspondences replaced by outliers
    #[argh(option, default = "0.3")]
    outlier_ratio: f64,

    /// uniform pixel noise amplitude
    #[argh(option, default = "0.5")]
    noise: f64,

    /// inlier threshold on the Sampson error (squared pixels)
    #[argh(option, default = "2.0")]
    threshold: f64,

    /// random seed for the scene and RANSAC
    #[argh(option, default = "0")]
    seed: u64,

    /// evaluate RANSAC trials in parallel
    #[argh(switch)]
    parallel: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let k = [[720.0, 0.0, 320.0], [0.0, 720.0, 240.0], [0.0, 0.0, 1.0]];
    let (s, c) = 0.12f64.sin_cos();
    let rotation = [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]];
    let p1 = CameraMatrix::from_intrinsics_pose(&k, &linalg::IDENTITY_MAT33, &[0.0; 3]);
    let p2 = CameraMatrix::from_intrinsics_pose(&k, &rotation, &[-1.0, 0.0, 0.1]);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut x1 = Vec::with_capacity(args.num_points);
    let mut x2 = Vec::with_capacity(args.num_points);
    for _ in 0..args.num_points {
        let x = [
            rng.random_range(-2.0..2.0),
            rng.random_range(-1.5..1.5),
            rng.random_range(4.0..9.0),
            1.0,
        ];
        let mut noisy = |p: &CameraMatrix| -> Option<[f64; 3]> {
            let [u, v] = p.project_point(&x)?;
            Some([
                u + rng.random_range(-args.noise..=args.noise),
                v + rng.random_range(-args.noise..=args.noise),
                1.0,
            ])
        };
        let (Some(a), Some(mut b)) = (noisy(&p1), noisy(&p2)) else {
            continue;
        };
        if rng.random_bool(args.outlier_ratio.clamp(0.0, 1.0)) {
            b = [rng.random_range(0.0..640.0), rng.random_range(0.0..480.0), 1.0];
        }
        x1.push(a);
        x2.push(b);
    }
    println!("Generated #{} correspondences", x1.len());

    let params = RansacParams {
        threshold: args.threshold,
        random_seed: Some(args.seed),
        strategy: if args.parallel {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Serial
        },
        ..Default::default()
    };
    let result = estimate_fundamental_robust(&x1, &x2, &params)?;
    println!(
        "Fundamental matrix: {:?}\n#{} inliers, mean Sampson error {:.4}",
        result.model,
        result.inliers.len(),
        result.mean_error
    );

    let in1 = result.inliers.iter().map(|&i| x1[i]).collect::<Vec<_>>();
    let in2 = result.inliers.iter().map(|&i| x2[i]).collect::<Vec<_>>();

    // cheirality: keep the candidate with the most points in front of both cameras
    let e = essential_from_fundamental(&result.model, &k, &k);
    let candidates = decompose_essential(&e)?;
    let mut best = None;
    for (tag, pose) in candidates.iter() {
        let q2 = CameraMatrix::from_intrinsics_pose(&k, &pose.rotation(), &pose.translation());
        let points = triangulate(&in1, &in2, &p1, &q2)?;
        let in_front = points
            .iter()
            .filter(|x| {
                p1.depth(x).is_some_and(|d| d > 0.0) && q2.depth(x).is_some_and(|d| d > 0.0)
            })
            .count();
        println!("Candidate {tag:?}: {in_front} / {} points in front", points.len());
        if best.as_ref().map_or(true, |(_, n, _)| in_front > *n) {
            best = Some((tag, in_front, q2));
        }
    }

    let Some((tag, _, q2)) = best else {
        return Err("no pose candidate".into());
    };
    println!("Selected pose {tag:?}: {:?}", candidates.get(tag));

    let points = triangulate(&in1, &in2, &p1, &q2)?;
    let p2_dlt = estimate_projection_matrix(&in2, &points)?;
    println!("Re-estimated second camera (DLT): {:?}", p2_dlt.normalized());
    println!("Recovered second camera (pose):   {:?}", q2.normalized());

    Ok(())
}
