//! Source spreading: widening a virtual source from a point to a region.
//!
//! Two independent strategies. Ring spreading samples a cone of auxiliary
//! directions around the main one and sums their panning gains; independent
//! spreading deviates azimuth and elevation separately with a power falloff
//! per step. Both run on the audio thread and allocate nothing; the caller
//! provides the scratch buffer.

use crate::gains::compute_gains;
use crate::layout::Dimension;
use crate::math::{AngularVector, CartesianVector};
use crate::panner::Orientation;
use crate::triangulation::SpeakerSet;

/// Ring spread above this many degrees also feeds every channel directly,
/// filling in the center of the widened source.
const RING_BOOST_THRESHOLD: f64 = 70.0;

/// Independent spread above this fraction (on both axes) feeds every active
/// output directly.
const INDEPENDENT_BOOST_THRESHOLD: f64 = 0.8;

/// Ring spreading: 16 auxiliary directions (3-D) or a fan of 6 (2-D) around
/// the main direction, summed into `gains` and L2-normalized.
///
/// `spread_base` persists across calls so that successive widened
/// directions stay temporally coherent instead of re-seeding the ring.
#[allow(clippy::too_many_arguments)]
pub(crate) fn spread_ring(
    sets: &mut [SpeakerSet],
    dimension: Dimension,
    orientation: Orientation,
    azimuth: f64,
    cart_dir: CartesianVector,
    spread: f64,
    spread_base: &mut CartesianVector,
    gains: &mut [f64],
    scratch: &mut [f64],
) {
    match dimension {
        Dimension::Three => {
            let mut bases = [CartesianVector::new(0.0, 0.0, 0.0); 16];

            let first_dir = new_spread_dir(cart_dir, *spread_base, azimuth, spread, orientation);
            *spread_base = new_spread_base(first_dir, cart_dir, spread);

            // Four mutually orthogonal bases around the main direction...
            bases[0] = *spread_base;
            bases[1] = spread_base.cross(&cart_dir);
            bases[2] = bases[1].cross(&cart_dir);
            bases[3] = bases[2].cross(&cart_dir);
            // ...their midpoints...
            bases[4] = bases[0].mean(&bases[1]);
            bases[5] = bases[1].mean(&bases[2]);
            bases[6] = bases[2].mean(&bases[3]);
            bases[7] = bases[3].mean(&bases[0]);
            // ...and blends pulled toward the main direction at half and
            // quarter angle.
            bases[8] = cart_dir.mean(&bases[0]);
            bases[9] = cart_dir.mean(&bases[1]);
            bases[10] = cart_dir.mean(&bases[2]);
            bases[11] = cart_dir.mean(&bases[3]);
            bases[12] = cart_dir.mean(&bases[8]);
            bases[13] = cart_dir.mean(&bases[9]);
            bases[14] = cart_dir.mean(&bases[10]);
            bases[15] = cart_dir.mean(&bases[11]);

            accumulate(sets, dimension, first_dir, gains, scratch);
            for base in &bases[1..] {
                let dir = new_spread_dir(cart_dir, *base, azimuth, spread, orientation);
                accumulate(sets, dimension, dir, gains, scratch);
            }
        }
        Dimension::Two => {
            for deviation in [-1.0, -0.5, -0.25, 0.25, 0.5, 1.0] {
                let dir = orientation
                    .to_cartesian(&AngularVector::new(azimuth + deviation * spread, 0.0));
                accumulate(sets, dimension, dir, gains, scratch);
            }
        }
    }

    if spread > RING_BOOST_THRESHOLD {
        let over = (spread - RING_BOOST_THRESHOLD) / 30.0;
        let boost = over * over * 20.0;
        for gain in gains.iter_mut() {
            *gain += boost;
        }
    }

    let norm = l2_norm(gains);
    if norm > 1e-12 {
        for gain in gains.iter_mut() {
            *gain /= norm;
        }
    }
}

/// Independent azimuth/elevation spreading: up to 4×8 auxiliary directions
/// at geometrically increasing deviations, weighted by `10^(-0.15·step)`,
/// accumulated and normalized over the active output set.
#[allow(clippy::too_many_arguments)]
pub(crate) fn spread_azi_ele(
    sets: &mut [SpeakerSet],
    orientation: Orientation,
    azimuth: f64,
    elevation: f64,
    azi_spread: f64,
    ele_spread: f64,
    active: &[usize],
    gains: &mut [f64],
    scratch: &mut [f64],
) {
    for step in 1..=4 {
        let step = step as f64;
        let weight = 10f64.powf(-0.15 * step);
        let azi_dev = step * azi_spread * 45.0;
        let ele_dev = step * ele_spread * 22.5;
        for (da, de) in [
            (azi_dev, ele_dev),
            (-azi_dev, ele_dev),
            (azi_dev, -ele_dev),
            (-azi_dev, -ele_dev),
            (azi_dev, 0.0),
            (-azi_dev, 0.0),
            (0.0, ele_dev),
            (0.0, -ele_dev),
        ] {
            let dir = orientation.to_cartesian(&AngularVector::new(
                wrap_degrees(azimuth + da),
                (elevation + de).clamp(-90.0, 90.0),
            ));
            compute_gains(sets, dir, scratch, Dimension::Three);
            for &out in active {
                gains[out] += scratch[out] * weight;
            }
        }
    }

    if azi_spread > INDEPENDENT_BOOST_THRESHOLD && ele_spread > INDEPENDENT_BOOST_THRESHOLD {
        let boost = (azi_spread - INDEPENDENT_BOOST_THRESHOLD) / 0.2
            * (ele_spread - INDEPENDENT_BOOST_THRESHOLD)
            / 0.2
            * 0.1;
        for &out in active {
            gains[out] += boost;
        }
    }

    normalize_active(gains, active);
}

/// 2-D variant of the independent spreader: azimuth deviations only.
pub(crate) fn spread_azi(
    sets: &mut [SpeakerSet],
    orientation: Orientation,
    azimuth: f64,
    azi_spread: f64,
    active: &[usize],
    gains: &mut [f64],
    scratch: &mut [f64],
) {
    for step in 1..=4 {
        let step = step as f64;
        let weight = 10f64.powf(-0.15 * step);
        let azi_dev = step * azi_spread * 45.0;
        for da in [azi_dev, -azi_dev] {
            let dir =
                orientation.to_cartesian(&AngularVector::new(wrap_degrees(azimuth + da), 0.0));
            compute_gains(sets, dir, scratch, Dimension::Two);
            for &out in active {
                gains[out] += scratch[out] * weight;
            }
        }
    }

    normalize_active(gains, active);
}

fn accumulate(
    sets: &mut [SpeakerSet],
    dimension: Dimension,
    dir: CartesianVector,
    gains: &mut [f64],
    scratch: &mut [f64],
) {
    compute_gains(sets, dir, scratch, dimension);
    for (gain, &aux) in gains.iter_mut().zip(scratch.iter()) {
        *gain += aux;
    }
}

/// Spherically interpolate from the main direction toward a spread base by
/// the spread angle.
///
/// When the base has (nearly) collapsed onto the main direction, it is
/// re-seeded 90° to the side so the interpolation stays well-conditioned.
fn new_spread_dir(
    cart_dir: CartesianVector,
    mut base: CartesianVector,
    azimuth: f64,
    spread: f64,
    orientation: Orientation,
) -> CartesianVector {
    let mut gamma = cart_dir.angle_between(&base).to_degrees();
    if gamma < 1.0 {
        base = orientation.to_cartesian(&AngularVector::new(azimuth + 90.0, 0.0));
        gamma = cart_dir.angle_between(&base).to_degrees();
    }
    let beta = 180.0 - gamma;
    let sin_beta = beta.to_radians().sin();
    if sin_beta.abs() < 1e-9 {
        return cart_dir;
    }
    let b = spread.to_radians().sin() / sin_beta;
    let a = (180.0 - spread - beta).to_radians().sin() / sin_beta;
    CartesianVector::new(
        a * cart_dir.x + b * base.x,
        a * cart_dir.y + b * base.y,
        a * cart_dir.z + b * base.z,
    )
    .normalized()
}

/// Re-derive the stored spread base from the first auxiliary direction, by
/// removing its component along the main direction.
fn new_spread_base(
    spread_dir: CartesianVector,
    cart_dir: CartesianVector,
    spread: f64,
) -> CartesianVector {
    let d = spread.to_radians().cos();
    CartesianVector::new(
        spread_dir.x - d * cart_dir.x,
        spread_dir.y - d * cart_dir.y,
        spread_dir.z - d * cart_dir.z,
    )
    .normalized()
}

fn wrap_degrees(mut azimuth: f64) -> f64 {
    while azimuth > 180.0 {
        azimuth -= 360.0;
    }
    while azimuth < -180.0 {
        azimuth += 360.0;
    }
    azimuth
}

fn l2_norm(gains: &[f64]) -> f64 {
    gains.iter().map(|&g| g * g).sum::<f64>().sqrt()
}

fn normalize_active(gains: &mut [f64], active: &[usize]) {
    let norm = active
        .iter()
        .map(|&out| gains[out] * gains[out])
        .sum::<f64>()
        .sqrt();
    if norm > 1e-12 {
        for &out in active {
            gains[out] /= norm;
        }
    }
}
