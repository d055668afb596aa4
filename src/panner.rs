//! The per-source panner: owns the speaker-set table, the current
//! direction, and the gain buffers, and exposes the control-rate entry
//! points the surrounding audio pipeline calls.

use crate::error::{Error, Result};
use crate::gains::compute_gains;
use crate::layout::{Dimension, SpeakerLayout};
use crate::math::{AngularVector, CartesianVector};
use crate::spread::{spread_azi, spread_azi_ele, spread_ring};
use crate::triangulation::{sets_from_triplets, triangulate, SpeakerSet};

/// Gain smoothing coefficient per block: `y = g + (y - g) * 0.99`.
const SMOOTHING_COEFF: f64 = 0.99;

/// Axis convention for incoming directions.
///
/// Speaker layouts are always room-centric; a head-centric caller selects
/// [`Orientation::FlipYz`] and the source direction is converted with the
/// Y and Z axes exchanged instead of transforming the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Direct,
    FlipYz,
}

impl Orientation {
    pub(crate) fn to_cartesian(self, angles: &AngularVector) -> CartesianVector {
        match self {
            Orientation::Direct => angles.to_cartesian(),
            Orientation::FlipYz => angles.to_cartesian_flip_y_z(),
        }
    }
}

/// A VBAP panner for one virtual source.
///
/// Construction triangulates the layout (or validates explicit triplets)
/// and is the only fallible and allocating phase; a `Panner` that exists is
/// always ready to pan. [`Panner::pan`] and
/// [`Panner::pan_independent_spread`] are allocation-free and bounded by
/// the capped set-table size, so they are safe to call from the audio
/// thread.
///
/// Cloning deep-copies the set table and gain state; clones never alias.
#[derive(Debug, Clone)]
pub struct Panner {
    dimension: Dimension,
    orientation: Orientation,
    sets: Vec<SpeakerSet>,
    /// Outputs referenced by at least one speaker set.
    active_outputs: Vec<usize>,
    gains: Vec<f64>,
    /// Smoothing state, advanced by [`Panner::smoothed_gains`].
    smoothed: Vec<f64>,
    scratch: Vec<f64>,
    ang_dir: AngularVector,
    cart_dir: CartesianVector,
    /// Carried across ring-spread calls for temporal coherence.
    spread_base: CartesianVector,
}

impl Panner {
    /// Build a panner by triangulating `layout`.
    pub fn new(layout: &SpeakerLayout) -> Result<Self> {
        let sets = triangulate(layout)?;
        Ok(Self::from_parts(layout, sets))
    }

    /// Build a panner from hand-authored speaker triplets, bypassing
    /// triangulation. The layout must be 3-D; indices are 0-based and must
    /// cover every speaker.
    pub fn with_triplets(layout: &SpeakerLayout, triplets: &[[usize; 3]]) -> Result<Self> {
        if layout.dimension() != Dimension::Three {
            return Err(Error::InvalidLayout(
                "explicit triplets require a 3-D layout".into(),
            ));
        }
        let sets = sets_from_triplets(layout, triplets)?;
        Ok(Self::from_parts(layout, sets))
    }

    fn from_parts(layout: &SpeakerLayout, sets: Vec<SpeakerSet>) -> Self {
        let per_set = layout.dimension().gains_per_set();
        let mut active_outputs: Vec<usize> =
            sets.iter().flat_map(|s| s.ids[..per_set].to_vec()).collect();
        active_outputs.sort_unstable();
        active_outputs.dedup();

        let outputs = layout.len();
        let ang_dir = AngularVector::new(0.0, 0.0);
        Self {
            dimension: layout.dimension(),
            orientation: Orientation::Direct,
            sets,
            active_outputs,
            gains: vec![0.0; outputs],
            smoothed: vec![0.0; outputs],
            scratch: vec![0.0; outputs],
            ang_dir,
            cart_dir: ang_dir.to_cartesian(),
            spread_base: CartesianVector::new(0.0, 1.0, 0.0),
        }
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Number of output channels (equals the layout's speaker count).
    pub fn outputs(&self) -> usize {
        self.gains.len()
    }

    /// Current direction in angular form.
    pub fn direction(&self) -> AngularVector {
        self.ang_dir
    }

    /// Per-channel gains from the last `pan` call. All non-negative.
    pub fn gains(&self) -> &[f64] {
        &self.gains
    }

    /// Advance the per-channel smoothing state one block toward the current
    /// gains and return it. Call once per audio block; the exponential
    /// approach avoids clicks on direction changes.
    pub fn smoothed_gains(&mut self) -> &[f64] {
        for (y, &gain) in self.smoothed.iter_mut().zip(self.gains.iter()) {
            *y = gain + (*y - gain) * SMOOTHING_COEFF;
        }
        &self.smoothed
    }

    /// Pan to `azimuth`/`elevation` (degrees), widened by ring spreading.
    ///
    /// `spread` is in degrees, clamped to [0, 100]; 0 is a point source.
    /// Azimuth accepts any range; elevation is clamped to [-90, 90] and
    /// ignored for 2-D layouts.
    pub fn pan(&mut self, azimuth: f64, elevation: f64, spread: f64) {
        self.update_direction(azimuth, elevation);
        compute_gains(&mut self.sets, self.cart_dir, &mut self.gains, self.dimension);

        let spread = spread.clamp(0.0, 100.0);
        if spread > 0.0 {
            spread_ring(
                &mut self.sets,
                self.dimension,
                self.orientation,
                self.ang_dir.azimuth,
                self.cart_dir,
                spread,
                &mut self.spread_base,
                &mut self.gains,
                &mut self.scratch,
            );
        }
    }

    /// Pan with independent azimuth and elevation spreading.
    ///
    /// Spread arguments are fractions clamped to [0, 1]. For 2-D layouts
    /// the elevation spread is ignored.
    pub fn pan_independent_spread(
        &mut self,
        azimuth: f64,
        elevation: f64,
        azi_spread: f64,
        ele_spread: f64,
    ) {
        self.update_direction(azimuth, elevation);
        compute_gains(&mut self.sets, self.cart_dir, &mut self.gains, self.dimension);

        let azi_spread = azi_spread.clamp(0.0, 1.0);
        let ele_spread = ele_spread.clamp(0.0, 1.0);
        match self.dimension {
            Dimension::Three => {
                if azi_spread > 0.0 || ele_spread > 0.0 {
                    spread_azi_ele(
                        &mut self.sets,
                        self.orientation,
                        self.ang_dir.azimuth,
                        self.ang_dir.elevation,
                        azi_spread,
                        ele_spread,
                        &self.active_outputs,
                        &mut self.gains,
                        &mut self.scratch,
                    );
                }
            }
            Dimension::Two => {
                if azi_spread > 0.0 {
                    spread_azi(
                        &mut self.sets,
                        self.orientation,
                        self.ang_dir.azimuth,
                        azi_spread,
                        &self.active_outputs,
                        &mut self.gains,
                        &mut self.scratch,
                    );
                }
            }
        }
    }

    fn update_direction(&mut self, azimuth: f64, elevation: f64) {
        let azimuth = wrap_azimuth(self.ang_dir.azimuth, azimuth);
        let elevation = match self.dimension {
            Dimension::Two => 0.0,
            Dimension::Three => elevation.clamp(-90.0, 90.0),
        };
        self.ang_dir = AngularVector::new(azimuth, elevation);
        self.cart_dir = self.orientation.to_cartesian(&self.ang_dir);
    }
}

/// Normalize `azimuth` to [0, 360), then fold it into the revolution of the
/// previous value when the two are more than 300° apart.
///
/// A continuously rising control crossing the 0/360 seam otherwise arrives
/// as a near-−360° jump, which reads as a full-circle sweep ("chirp") to
/// anything tracking successive directions.
fn wrap_azimuth(previous: f64, azimuth: f64) -> f64 {
    let mut azimuth = azimuth.rem_euclid(360.0);
    if azimuth - previous < -300.0 {
        azimuth += 360.0;
    } else if azimuth - previous > 300.0 {
        azimuth -= 360.0;
    }
    azimuth
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn octagon() -> SpeakerLayout {
        let angles: Vec<(f64, f64)> = (0..8).map(|i| (45.0 * i as f64, 0.0)).collect();
        SpeakerLayout::from_angles(&angles, Dimension::Two).unwrap()
    }

    fn dome() -> SpeakerLayout {
        let angles = [
            (45.0, 0.0),
            (135.0, 0.0),
            (225.0, 0.0),
            (315.0, 0.0),
            (45.0, 45.0),
            (135.0, 45.0),
            (225.0, 45.0),
            (315.0, 45.0),
        ];
        SpeakerLayout::from_angles(&angles, Dimension::Three).unwrap()
    }

    #[test]
    fn test_wrap_azimuth_folds_seam_crossing() {
        assert_relative_eq!(wrap_azimuth(359.0, 361.0), 361.0);
        assert_relative_eq!(wrap_azimuth(359.0, 1.0), 361.0);
        assert_relative_eq!(wrap_azimuth(1.0, 359.0), -1.0);
        assert_relative_eq!(wrap_azimuth(0.0, 45.0), 45.0);
        // -45 wraps to 315, then folds back into the previous revolution.
        assert_relative_eq!(wrap_azimuth(0.0, -45.0), -45.0);
    }

    #[test]
    fn test_pan_is_idempotent_without_spread() {
        let mut panner = Panner::new(&octagon()).unwrap();
        panner.pan(22.5, 0.0, 0.0);
        let first = panner.gains().to_vec();
        panner.pan(22.5, 0.0, 0.0);
        assert_eq!(first, panner.gains());
    }

    #[test]
    fn test_pan_after_seam_crossing_is_idempotent() {
        let mut panner = Panner::new(&octagon()).unwrap();
        panner.pan(359.0, 0.0, 0.0);
        panner.pan(1.0, 0.0, 0.0);
        let first = panner.gains().to_vec();
        panner.pan(1.0, 0.0, 0.0);
        assert_eq!(first, panner.gains());
    }

    #[test]
    fn test_spread_widens_active_set() {
        let mut panner = Panner::new(&octagon()).unwrap();
        panner.pan(0.0, 0.0, 0.0);
        let focused = panner.gains().iter().filter(|&&g| g > 0.0).count();
        panner.pan(0.0, 0.0, 45.0);
        let widened = panner.gains().iter().filter(|&&g| g > 0.0).count();
        assert!(widened >= focused);
        assert!(widened > 1);
    }

    #[test]
    fn test_spread_output_is_normalized() {
        let mut panner = Panner::new(&octagon()).unwrap();
        panner.pan(10.0, 0.0, 80.0);
        let norm: f64 = panner.gains().iter().map(|g| g * g).sum::<f64>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_independent_spread_3d() {
        let mut panner = Panner::new(&dome()).unwrap();
        panner.pan_independent_spread(45.0, 20.0, 0.5, 0.5);
        let active = panner.gains().iter().filter(|&&g| g > 0.0).count();
        assert!(active > 3);
        for &g in panner.gains() {
            assert!(g >= 0.0 && g.is_finite());
        }
        let norm: f64 = panner.gains().iter().map(|g| g * g).sum::<f64>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smoothed_gains_converge() {
        let mut panner = Panner::new(&octagon()).unwrap();
        panner.pan(90.0, 0.0, 0.0);
        let mut last = 0.0;
        for _ in 0..1000 {
            last = panner.smoothed_gains()[2];
        }
        assert_relative_eq!(last, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_smoothing_moves_gradually() {
        let mut panner = Panner::new(&octagon()).unwrap();
        panner.pan(90.0, 0.0, 0.0);
        let first = panner.smoothed_gains()[2];
        assert!(first > 0.0 && first < 0.05, "first block step was {}", first);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut panner = Panner::new(&octagon()).unwrap();
        panner.pan(22.5, 0.0, 0.0);
        let snapshot = panner.clone();
        panner.pan(180.0, 0.0, 0.0);
        assert_ne!(snapshot.gains(), panner.gains());
    }

    #[test]
    fn test_flip_y_z_swaps_elevation_axis() {
        let mut direct = Panner::new(&dome()).unwrap();
        let mut flipped = Panner::new(&dome()).unwrap();
        flipped.set_orientation(Orientation::FlipYz);

        direct.pan(45.0, 20.0, 0.0);
        flipped.pan(45.0, 20.0, 0.0);
        assert_ne!(direct.gains(), flipped.gains());

        // With no elevation and no lateral component the conventions agree.
        direct.pan(0.0, 0.0, 0.0);
        flipped.pan(0.0, 0.0, 0.0);
        assert_eq!(direct.gains(), flipped.gains());
    }

    #[test]
    fn test_with_triplets_rejects_2d_layout() {
        let err = Panner::with_triplets(&octagon(), &[[0, 1, 2]]);
        assert!(matches!(err, Err(Error::InvalidLayout(_))));
    }
}
