//! The per-frame gain solver.
//!
//! Real-time hot path: no allocation, no I/O, bounded by the (capped)
//! number of speaker sets.

use crate::layout::Dimension;
use crate::math::CartesianVector;
use crate::triangulation::SpeakerSet;

/// Coefficients below this count as audibly negative when ranking sets.
const NEGATIVE_GAIN_TOLERANCE: f64 = -0.05;

/// Project `direction` onto every set's inverse basis, pick the best-fit
/// set, and scatter its coefficients into `out` (one slot per physical
/// output channel). `out` is cleared first; no written gain is negative.
///
/// Selection heuristic: fewest coefficients below -0.05, tie-broken by the
/// largest minimum coefficient. A set that needs no negative gain contains
/// the direction; among several, prefer the one whose weakest speaker is
/// least attenuated.
pub(crate) fn compute_gains(
    sets: &mut [SpeakerSet],
    direction: CartesianVector,
    out: &mut [f64],
    dimension: Dimension,
) {
    let per_set = dimension.gains_per_set();

    let mut winner = 0usize;
    let mut best_neg = u8::MAX;
    let mut best_min = f64::NEG_INFINITY;

    for (idx, set) in sets.iter_mut().enumerate() {
        let mut smallest = f64::INFINITY;
        let mut neg_count = 0u8;
        for row in 0..per_set {
            let coeff = match dimension {
                Dimension::Three => {
                    set.inv_mat[3 * row] * direction.x
                        + set.inv_mat[3 * row + 1] * direction.y
                        + set.inv_mat[3 * row + 2] * direction.z
                }
                Dimension::Two => {
                    set.inv_mat[2 * row] * direction.x + set.inv_mat[2 * row + 1] * direction.y
                }
            };
            set.gains[row] = coeff;
            if coeff < smallest {
                smallest = coeff;
            }
            if coeff < NEGATIVE_GAIN_TOLERANCE {
                neg_count += 1;
            }
        }
        set.smallest_gain = smallest;
        set.neg_count = neg_count;

        if neg_count < best_neg || (neg_count == best_neg && smallest > best_min) {
            best_neg = neg_count;
            best_min = smallest;
            winner = idx;
        }
    }

    out.fill(0.0);
    if sets.is_empty() {
        return;
    }

    let set = &mut sets[winner];
    // Direction opposite to or degenerate against the whole winning basis:
    // feed all member speakers equally rather than going silent.
    if set.gains[..per_set].iter().all(|&g| g <= 0.0) {
        set.gains[..per_set].fill(1.0);
    }
    for row in 0..per_set {
        out[set.ids[row]] = set.gains[row].max(0.0);
    }
}
