use astrochop::lambert::{
    FailureReason, LambertProblem, LambertSolver, LambertSolverError, Outcome, SolverSettings,
    TransferDirection, solve_single, term_ratio,
};
use astrochop::orbits::propagate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MU_SUN: f64 = 1.327_124_400_18e11; // km^3 / s^2
const AU_KM: f64 = 149_597_870.7; // km
const MU_EARTH: f64 = 398_600.0;

#[test]
fn lambert_quarter_orbit_matches_circular_velocity() {
    let r1 = [AU_KM, 0.0, 0.0];
    let r2 = [0.0, AU_KM, 0.0];
    let tof = (std::f64::consts::PI / 2.0) * (AU_KM.powi(3) / MU_SUN).sqrt();

    let (v1, v2) =
        solve_single(r1, r2, tof, MU_SUN, TransferDirection::Prograde).expect("lambert solve");

    let expected_speed = (MU_SUN / AU_KM).sqrt();
    assert!(v1[0].abs() < 1e-6 * expected_speed, "v1 = {v1:?}");
    assert!((v1[1] - expected_speed).abs() < 1e-6 * expected_speed);
    assert!((v2[0] + expected_speed).abs() < 1e-6 * expected_speed);
    assert!(v2[1].abs() < 1e-6 * expected_speed, "v2 = {v2:?}");
}

#[test]
fn retrograde_quarter_geometry_goes_the_long_way() {
    let (v1, _) = solve_single(
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        1.5 * std::f64::consts::PI,
        1.0,
        TransferDirection::Retrograde,
    )
    .expect("lambert solve");
    assert!((v1[1] + 1.0).abs() < 1e-6, "v1 = {v1:?}");
}

/// Curtis, *Orbital Mechanics for Engineering Students*, Example 5.2.
#[test]
fn textbook_geocentric_case() {
    let (v1, v2) = solve_single(
        [5_000.0, 10_000.0, 2_100.0],
        [-14_600.0, 2_500.0, 7_000.0],
        3_600.0,
        MU_EARTH,
        TransferDirection::Prograde,
    )
    .expect("lambert solve");
    let expected_v1 = [-5.9925, 1.9254, 3.2456];
    let expected_v2 = [-3.3125, -4.1966, -0.38529];
    for k in 0..3 {
        assert!((v1[k] - expected_v1[k]).abs() < 1e-4, "v1 = {v1:?}");
        assert!((v2[k] - expected_v2[k]).abs() < 1e-4, "v2 = {v2:?}");
    }
}

#[test]
fn converged_cells_round_trip_through_kepler_propagation() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut r1s = Vec::new();
    let mut r2s = Vec::new();
    let mut tofs = Vec::new();
    let mut directions = Vec::new();
    for k in 0..400 {
        r1s.push(random_point(&mut rng));
        r2s.push(random_point(&mut rng));
        tofs.push(10f64.powf(rng.random_range(-0.5..1.0)));
        directions.push(if k % 2 == 0 {
            TransferDirection::Prograde
        } else {
            TransferDirection::Retrograde
        });
    }
    let problem = LambertProblem::new(r1s.clone(), r2s.clone(), tofs.clone(), directions).unwrap();
    let solver = LambertSolver::new(1.0, SolverSettings::default()).unwrap();
    let batch = solver.solve(&problem);

    assert_eq!(batch.counts().converged, 400);
    let elliptic = batch.iter().filter(|s| s.z > 0.0).count();
    let hyperbolic = batch.iter().filter(|s| s.z < 0.0).count();
    assert!(elliptic > 50 && hyperbolic > 50, "{elliptic} / {hyperbolic}");

    for (k, solution) in batch.iter().enumerate() {
        let (v1, v2) = solution.velocities().unwrap();
        let (r, v) = propagate(&r1s[k], &v1, tofs[k], 1.0).unwrap();
        let r_scale = norm(&r2s[k]);
        let v_scale = norm(&v2);
        for axis in 0..3 {
            assert!(
                (r[axis] - r2s[k][axis]).abs() < 1e-6 * r_scale,
                "cell {k}: position {r:?} vs {:?}",
                r2s[k]
            );
            assert!(
                (v[axis] - v2[axis]).abs() < 1e-6 * v_scale,
                "cell {k}: velocity {v:?} vs {v2:?}"
            );
        }
    }
}

#[test]
fn degenerate_cells_are_rejected_without_disturbing_neighbours() {
    let problem = LambertProblem::uniform(
        vec![[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
        vec![[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        vec![std::f64::consts::FRAC_PI_2, 2.0, -1.0, 1.0],
        TransferDirection::Prograde,
    )
    .unwrap();
    let solver = LambertSolver::new(1.0, SolverSettings::default()).unwrap();
    let batch = solver.solve(&problem);

    assert!(batch.solutions()[0].is_converged());
    for cell in 1..4 {
        let solution = batch.solutions()[cell];
        assert_eq!(
            solution.outcome,
            Outcome::Failed(FailureReason::DegenerateGeometry)
        );
        assert!(solution.departure_velocity_km_s.iter().all(|v| v.is_nan()));
    }
    let counts = batch.counts();
    assert_eq!((counts.converged, counts.rejected), (1, 3));
}

#[test]
fn iteration_cap_marks_slow_cells_diverged() {
    // Flight time at the initial iterate z = 0 converges on the first sweep.
    let (term, ratio) = term_ratio(0.0, 0.1);
    let a = 1.0;
    let y = 2.0 + a * term;
    let instant_tof = y.sqrt() * (ratio * y + a);

    let problem = LambertProblem::uniform(
        vec![[1.0, 0.0, 0.0]; 2],
        vec![[0.0, 1.0, 0.0]; 2],
        vec![instant_tof, std::f64::consts::FRAC_PI_2],
        TransferDirection::Prograde,
    )
    .unwrap();
    let settings = SolverSettings {
        max_iterations: 1,
        ..SolverSettings::default()
    };
    let batch = LambertSolver::new(1.0, settings).unwrap().solve(&problem);

    assert_eq!(
        batch.solutions()[0].outcome,
        Outcome::Converged { iterations: 1 }
    );
    assert_eq!(
        batch.solutions()[1].failure(),
        Some(FailureReason::MaxIterationsExceeded)
    );
    assert_eq!(batch.iterations_used(), 1);

    let err = LambertSolver::new(1.0, settings)
        .unwrap()
        .solve_one(
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            std::f64::consts::FRAC_PI_2,
            TransferDirection::Prograde,
        )
        .unwrap_err();
    assert_eq!(err, LambertSolverError::MaxIterations { iterations: 1 });
}

#[test]
fn cell_results_do_not_depend_on_batch_companions() {
    let target = ([1.0, 0.2, 0.0], [-0.7, 1.1, 0.05], 2.3);
    let alone = LambertSolver::new(1.0, SolverSettings::default())
        .unwrap()
        .solve(&LambertProblem::single(
            target.0,
            target.1,
            target.2,
            TransferDirection::Prograde,
        ));

    let mut rng = StdRng::seed_from_u64(42);
    let mut r1s: Vec<_> = (0..31).map(|_| random_point(&mut rng)).collect();
    let mut r2s: Vec<_> = (0..31).map(|_| random_point(&mut rng)).collect();
    let mut tofs: Vec<_> = (0..31).map(|_| rng.random_range(0.3..8.0)).collect();
    r1s.insert(17, target.0);
    r2s.insert(17, target.1);
    tofs.insert(17, target.2);
    // A rejected companion must not change anything either.
    r1s.push([1.0, 0.0, 0.0]);
    r2s.push([2.0, 0.0, 0.0]);
    tofs.push(1.0);
    let problem = LambertProblem::uniform(r1s, r2s, tofs, TransferDirection::Prograde).unwrap();
    let batch = LambertSolver::new(1.0, SolverSettings::default())
        .unwrap()
        .solve(&problem);

    assert_eq!(batch.solutions()[17], alone.solutions()[0]);
}

#[test]
fn solve_single_reports_degenerate_geometry() {
    let err = solve_single(
        [AU_KM, 0.0, 0.0],
        [-AU_KM, 0.0, 0.0],
        1.0e7,
        MU_SUN,
        TransferDirection::Prograde,
    )
    .unwrap_err();
    assert_eq!(err, LambertSolverError::Degenerate);
}

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Position with radius in 0.5..3 and latitude within ±0.4 rad.
fn random_point(rng: &mut StdRng) -> [f64; 3] {
    let r: f64 = rng.random_range(0.5..3.0);
    let theta = rng.random_range(0.0..std::f64::consts::TAU);
    let phi: f64 = rng.random_range(-0.4..0.4);
    [
        r * theta.cos() * phi.cos(),
        r * theta.sin() * phi.cos(),
        r * phi.sin(),
    ]
}
