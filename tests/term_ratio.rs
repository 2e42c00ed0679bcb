use astrochop::lambert::{RatioScratch, Regime, TermRatioEngine};

fn relative(a: f64, b: f64) -> f64 {
    (a - b).abs() / b.abs()
}

#[test]
fn series_and_half_angle_agree_across_the_threshold() {
    for &threshold in &[0.05, 0.1, 0.2] {
        for &sign in &[1.0, -1.0] {
            let edge = sign * threshold;
            let inside = edge * (1.0 - 1e-9);
            let outside = edge * (1.0 + 1e-9);
            assert_eq!(Regime::classify(inside, threshold), Regime::Series);
            assert_ne!(Regime::classify(outside, threshold), Regime::Series);

            let engine = TermRatioEngine::new(threshold);
            let mut scratch = RatioScratch::with_len(2);
            engine.evaluate(&[inside, outside], &mut scratch);
            assert_eq!(scratch.small, [true, false]);
            assert!(
                relative(scratch.term[0], scratch.term[1]) < 1e-10,
                "term jumps at {edge}"
            );
            assert!(
                relative(scratch.ratio[0], scratch.ratio[1]) < 1e-10,
                "ratio jumps at {edge}"
            );
        }
    }
}

#[test]
fn every_output_element_is_written() {
    let z: Vec<f64> = (0..=400).map(|k| -60.0 + 0.245 * k as f64).collect();
    assert!(z.iter().all(|&v| v < 4.0 * std::f64::consts::PI.powi(2)));
    let mut scratch = RatioScratch::with_len(z.len());
    scratch.term.fill(f64::NAN);
    scratch.ratio.fill(f64::NAN);

    TermRatioEngine::default().evaluate(&z, &mut scratch);

    for (k, &zk) in z.iter().enumerate() {
        assert!(scratch.term[k].is_finite(), "term at z = {zk}");
        assert!(scratch.ratio[k].is_finite(), "ratio at z = {zk}");
        assert_eq!(scratch.small[k], zk.abs() < 0.1);
        assert!(scratch.ratio[k] > 0.0);
    }
    // Series and hyperbolic cells sit next to each other in one pass.
    assert!(scratch.small.iter().any(|&s| s));
    assert!(scratch.small.iter().any(|&s| !s));
}

#[test]
fn term_decreases_monotonically_in_z() {
    let z: Vec<f64> = (0..200).map(|k| -30.0 + 0.3 * k as f64).collect();
    let mut scratch = RatioScratch::with_len(z.len());
    TermRatioEngine::default().evaluate(&z, &mut scratch);
    // term(z) = −√2 cos(√z/2) rises from −∞ towards √2 over the domain.
    for pair in scratch.term.windows(2) {
        assert!(pair[1] > pair[0]);
    }
}
