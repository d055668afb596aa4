//! Scenario tests for 3-D dome layouts.

use approx::assert_relative_eq;
use vbapan::{Dimension, Error, Orientation, Panner, SpeakerLayout};

/// Lower ring of four speakers plus an elevated ring of four.
fn dome_layout() -> SpeakerLayout {
    SpeakerLayout::from_angles(
        &[
            (45.0, 0.0),
            (135.0, 0.0),
            (225.0, 0.0),
            (315.0, 0.0),
            (45.0, 45.0),
            (135.0, 45.0),
            (225.0, 45.0),
            (315.0, 45.0),
        ],
        Dimension::Three,
    )
    .unwrap()
}

#[test]
fn dome_panner_constructs() {
    // Construction implies a full triangulation: non-empty, within the
    // set cap, and covering every speaker.
    let panner = Panner::new(&dome_layout()).unwrap();
    assert_eq!(panner.outputs(), 8);
}

#[test]
fn on_speaker_pan_is_identity_in_3d() {
    let mut panner = Panner::new(&dome_layout()).unwrap();
    panner.pan(135.0, 45.0, 0.0);

    let gains = panner.gains();
    assert_relative_eq!(gains[5], 1.0, epsilon = 1e-9);
    for (i, &g) in gains.iter().enumerate() {
        if i != 5 {
            assert_relative_eq!(g, 0.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn at_most_three_speakers_active_without_spread() {
    let mut panner = Panner::new(&dome_layout()).unwrap();
    for azi in 0..72 {
        for ele in 0..18 {
            panner.pan(azi as f64 * 5.0, ele as f64 * 5.0, 0.0);
            let active = panner.gains().iter().filter(|&&g| g > 0.0).count();
            assert!(
                (1..=3).contains(&active),
                "{} active speakers at ({}, {})",
                active,
                azi * 5,
                ele * 5
            );
        }
    }
}

#[test]
fn gains_stay_finite_at_the_zenith() {
    let mut panner = Panner::new(&dome_layout()).unwrap();
    panner.pan(0.0, 90.0, 0.0);
    let sum: f64 = panner.gains().iter().sum();
    assert!(sum > 0.0, "zenith direction must not go silent");
    for &g in panner.gains() {
        assert!(g >= 0.0 && g.is_finite());
    }
}

#[test]
fn ring_spread_widens_in_3d() {
    let mut panner = Panner::new(&dome_layout()).unwrap();
    panner.pan(45.0, 20.0, 0.0);
    let focused = panner.gains().iter().filter(|&&g| g > 0.0).count();

    panner.pan(45.0, 20.0, 60.0);
    let widened = panner.gains().iter().filter(|&&g| g > 0.0).count();
    assert!(widened >= focused);

    let norm: f64 = panner.gains().iter().map(|g| g * g).sum::<f64>().sqrt();
    assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
}

#[test]
fn successive_spread_calls_stay_coherent() {
    // The spread base carries over between calls; a slowly moving widened
    // source must not produce wildly different gain vectors step to step.
    let mut panner = Panner::new(&dome_layout()).unwrap();
    panner.pan(0.0, 10.0, 40.0);
    let mut previous = panner.gains().to_vec();
    for step in 1..60 {
        panner.pan(step as f64, 10.0, 40.0);
        let delta: f64 = panner
            .gains()
            .iter()
            .zip(&previous)
            .map(|(g, p)| (g - p).abs())
            .sum();
        assert!(delta < 0.5, "gain jump of {} at step {}", delta, step);
        previous = panner.gains().to_vec();
    }
}

#[test]
fn explicit_triplets_bypass_triangulation() {
    let layout = SpeakerLayout::from_angles(
        &[(0.0, 0.0), (120.0, 0.0), (-120.0, 0.0), (0.0, 90.0)],
        Dimension::Three,
    )
    .unwrap();
    let mut panner =
        Panner::with_triplets(&layout, &[[0, 1, 3], [1, 2, 3], [2, 0, 3]]).unwrap();

    panner.pan(0.0, 45.0, 0.0);
    let gains = panner.gains();
    assert!(gains[0] > 0.0 && gains[3] > 0.0);
    assert_relative_eq!(gains[1], 0.0, epsilon = 1e-9);
    assert_relative_eq!(gains[2], 0.0, epsilon = 1e-9);
}

#[test]
fn explicit_triplets_reject_bad_indices() {
    let layout = dome_layout();
    assert!(matches!(
        Panner::with_triplets(&layout, &[[0, 1, 42]]),
        Err(Error::InvalidSpeakerSet { .. })
    ));
}

#[test]
fn flipped_orientation_reinterprets_elevation() {
    let mut panner = Panner::new(&dome_layout()).unwrap();
    panner.set_orientation(Orientation::FlipYz);
    assert_eq!(panner.orientation(), Orientation::FlipYz);

    // Under the flipped convention an "up" source points along the room's
    // Y axis, which sits between the two left-side speakers at ear level.
    panner.pan(0.0, 90.0, 0.0);
    for &g in panner.gains() {
        assert!(g >= 0.0 && g.is_finite());
    }
    assert!(panner.gains()[0] > 0.0 || panner.gains()[1] > 0.0);
}

#[test]
fn independent_spread_fills_the_dome() {
    let mut panner = Panner::new(&dome_layout()).unwrap();
    panner.pan_independent_spread(0.0, 20.0, 0.9, 0.9);

    let active = panner.gains().iter().filter(|&&g| g > 0.0).count();
    assert_eq!(active, 8, "full spread must reach every speaker");

    let norm: f64 = panner.gains().iter().map(|g| g * g).sum::<f64>().sqrt();
    assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
}

#[test]
fn collinear_layout_reports_degenerate_triangulation() {
    let layout = SpeakerLayout::from_angles(
        &[(0.0, -30.0), (0.0, 0.0), (0.0, 30.0), (0.0, 60.0)],
        Dimension::Three,
    )
    .unwrap();
    assert!(matches!(
        Panner::new(&layout),
        Err(Error::DegenerateTriangulation)
    ));
}
