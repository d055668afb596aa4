//! Speaker-set selection: 3-D triangulation and 2-D pairing.
//!
//! Runs once at setup time (or on layout change), never on the audio thread.
//! The 3-D path scores every unordered speaker triple, greedily removes
//! crossing edges shortest-first, discards triangles that contain another
//! speaker, and inverts each survivor's basis matrix. The 2-D path connects
//! azimuth-adjacent pairs around the ring.

use crate::error::{Error, Result};
use crate::layout::{Dimension, Speaker, SpeakerLayout};
use crate::math::CartesianVector;
use crate::MAX_SETS;
use tracing::{debug, warn};

/// Minimum "volume over total side length" for a candidate triple.
const MIN_VOL_P_SIDE_LGTH: f64 = 0.01;

/// A triple is only considered when at least one speaker pair sits within
/// this many degrees of equal elevation. Rejects slivers formed against
/// outliers (e.g. a subwoofer far below an otherwise level ring).
const ELEVATION_PAIR_TOLERANCE: f64 = 5.0;

/// Arcs passing within this many radians of a speaker are treated as
/// non-crossing; the construction is too degenerate to trust.
const INTERSECT_TOLERANCE: f64 = 0.01;

/// Widest 2-D gap that still gets a panning basis, in radians (~170°).
const MAX_PAIR_GAP: f64 = std::f64::consts::PI - 0.175;

/// A panning basis: 2 or 3 speaker indices with the inverse of the matrix
/// whose columns are their unit direction vectors.
///
/// Indices are 0-based positions in the owning layout. The scratch fields
/// are overwritten by every gain-solver call; keeping them inline keeps the
/// hot path free of allocation.
#[derive(Debug, Clone)]
pub(crate) struct SpeakerSet {
    /// Speaker indices; a 2-D pair uses only the first two.
    pub ids: [usize; 3],
    /// Row-major inverse basis; a 2-D pair uses only the first four slots.
    pub inv_mat: [f64; 9],
    /// Scratch: raw coefficients from the last solver call.
    pub gains: [f64; 3],
    /// Scratch: smallest coefficient from the last solver call.
    pub smallest_gain: f64,
    /// Scratch: coefficients below -0.05 in the last solver call.
    pub neg_count: u8,
}

impl SpeakerSet {
    fn new(ids: [usize; 3], inv_mat: [f64; 9]) -> Self {
        Self {
            ids,
            inv_mat,
            gains: [0.0; 3],
            smallest_gain: 0.0,
            neg_count: 0,
        }
    }
}

/// Build the speaker-set table for a layout.
pub(crate) fn triangulate(layout: &SpeakerLayout) -> Result<Vec<SpeakerSet>> {
    let sets = match layout.dimension() {
        Dimension::Three => choose_triplets(layout.speakers()),
        Dimension::Two => choose_pairs(layout.speakers()),
    };

    validate_sets(sets, layout)
}

/// Common post-conditions for triangulated and explicitly supplied tables:
/// non-empty, within the capacity cap, and covering every speaker.
fn validate_sets(sets: Vec<SpeakerSet>, layout: &SpeakerLayout) -> Result<Vec<SpeakerSet>> {
    if sets.is_empty() {
        warn!(
            speakers = layout.len(),
            "triangulation produced no usable speaker sets"
        );
        return Err(Error::DegenerateTriangulation);
    }
    if sets.len() > MAX_SETS {
        return Err(Error::TooManySets(sets.len()));
    }

    let per_set = layout.dimension().gains_per_set();
    let mut covered = vec![false; layout.len()];
    for set in &sets {
        for &id in &set.ids[..per_set] {
            covered[id] = true;
        }
    }
    if let Some(orphan) = covered.iter().position(|&c| !c) {
        warn!(speaker = orphan, "speaker is not part of any speaker set");
        return Err(Error::DegenerateTriangulation);
    }

    debug!(sets = sets.len(), speakers = layout.len(), "speaker-set table built");
    Ok(sets)
}

/// Build an explicit triplet table, bypassing triangulation.
pub(crate) fn sets_from_triplets(
    layout: &SpeakerLayout,
    triplets: &[[usize; 3]],
) -> Result<Vec<SpeakerSet>> {
    let speakers = layout.speakers();
    let mut sets = Vec::with_capacity(triplets.len());
    for &ids in triplets {
        for &id in &ids {
            if id >= speakers.len() {
                return Err(Error::InvalidSpeakerSet {
                    set: ids,
                    reason: format!("speaker index {} out of range", id),
                });
            }
        }
        if ids[0] == ids[1] || ids[0] == ids[2] || ids[1] == ids[2] {
            return Err(Error::InvalidSpeakerSet {
                set: ids,
                reason: "duplicate speaker index".into(),
            });
        }
        let inv = invert_3x3(
            &speakers[ids[0]].coords,
            &speakers[ids[1]].coords,
            &speakers[ids[2]].coords,
        )
        .ok_or_else(|| Error::InvalidSpeakerSet {
            set: ids,
            reason: "speaker directions are coplanar with the origin".into(),
        })?;
        sets.push(SpeakerSet::new(ids, inv));
    }

    validate_sets(sets, layout)
}

// ---------------------------------------------------------------------------
// 3-D triangulation
// ---------------------------------------------------------------------------

/// Symmetric edge-connection matrix over speaker indices.
struct Connections {
    flags: Vec<bool>,
    n: usize,
}

impl Connections {
    fn new(n: usize) -> Self {
        Self {
            flags: vec![false; n * n],
            n,
        }
    }

    fn connect(&mut self, i: usize, j: usize) {
        self.flags[i * self.n + j] = true;
        self.flags[j * self.n + i] = true;
    }

    fn disconnect(&mut self, i: usize, j: usize) {
        self.flags[i * self.n + j] = false;
        self.flags[j * self.n + i] = false;
    }

    fn connected(&self, i: usize, j: usize) -> bool {
        self.flags[i * self.n + j]
    }
}

fn choose_triplets(speakers: &[Speaker]) -> Vec<SpeakerSet> {
    let n = speakers.len();
    let mut connections = Connections::new(n);
    let mut candidates: Vec<[usize; 3]> = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if vol_p_side_lgth(&speakers[i], &speakers[j], &speakers[k])
                    > MIN_VOL_P_SIDE_LGTH
                    && has_level_pair(&speakers[i], &speakers[j], &speakers[k])
                {
                    connections.connect(i, j);
                    connections.connect(j, k);
                    connections.connect(i, k);
                    candidates.push([i, j, k]);
                }
            }
        }
    }

    // Rank connected edges by arc length and sweep shortest-first,
    // disconnecting any other edge whose great-circle arc crosses the one
    // being kept. Shorter edges win, which makes the sweep deterministic.
    let mut edges: Vec<(f64, usize, usize)> = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if connections.connected(i, j) {
                let arc = speakers[i].coords.angle_between(&speakers[j].coords);
                edges.push((arc, i, j));
            }
        }
    }
    edges.sort_by(|a, b| a.0.total_cmp(&b.0));

    for &(_, fst, sec) in &edges {
        if !connections.connected(fst, sec) {
            continue;
        }
        for j in 0..n {
            for k in (j + 1)..n {
                if j == fst || j == sec || k == fst || k == sec {
                    continue;
                }
                if connections.connected(j, k)
                    && lines_intersect(speakers, fst, sec, j, k)
                {
                    connections.disconnect(j, k);
                }
            }
        }
    }

    // Keep triples whose edges all survived the sweep and whose spherical
    // triangle contains no other speaker.
    let mut sets = Vec::new();
    for &[i, j, k] in &candidates {
        if !connections.connected(i, j)
            || !connections.connected(i, k)
            || !connections.connected(j, k)
        {
            continue;
        }
        let Some(inv) = invert_3x3(&speakers[i].coords, &speakers[j].coords, &speakers[k].coords)
        else {
            continue;
        };
        if any_speaker_inside(&inv, [i, j, k], speakers) {
            continue;
        }
        sets.push(SpeakerSet::new([i, j, k], inv));
    }
    sets
}

/// Signed parallelepiped volume of the triple, divided by the sum of its
/// pairwise angular separations. Near-zero for slivers and for collinear
/// triples.
fn vol_p_side_lgth(a: &Speaker, b: &Speaker, c: &Speaker) -> f64 {
    let volume = a.coords.cross_raw(&b.coords).dot(&c.coords).abs();
    let side_length = a.coords.angle_between(&b.coords)
        + a.coords.angle_between(&c.coords)
        + b.coords.angle_between(&c.coords);
    if side_length > 1e-5 {
        volume / side_length
    } else {
        0.0
    }
}

fn has_level_pair(a: &Speaker, b: &Speaker, c: &Speaker) -> bool {
    let (ea, eb, ec) = (a.angles.elevation, b.angles.elevation, c.angles.elevation);
    (ea - eb).abs() <= ELEVATION_PAIR_TOLERANCE
        || (ea - ec).abs() <= ELEVATION_PAIR_TOLERANCE
        || (eb - ec).abs() <= ELEVATION_PAIR_TOLERANCE
}

/// Whether the great-circle arcs (i,j) and (k,l) cross.
///
/// The crossing point of the two planes spanned by each speaker pair is the
/// cross product of their plane normals; the arcs intersect when that point
/// (or its antipode) lies on both arcs. Arcs passing within
/// [`INTERSECT_TOLERANCE`] of any endpoint are declared non-crossing, which
/// sidesteps false positives from near-collinear configurations.
fn lines_intersect(speakers: &[Speaker], i: usize, j: usize, k: usize, l: usize) -> bool {
    let v1 = speakers[i].coords.cross(&speakers[j].coords);
    let v2 = speakers[k].coords.cross(&speakers[l].coords);
    let v3 = v1.cross(&v2);
    let neg_v3 = CartesianVector::new(-v3.x, -v3.y, -v3.z);

    let dist_ij = speakers[i].coords.angle_between(&speakers[j].coords);
    let dist_kl = speakers[k].coords.angle_between(&speakers[l].coords);

    let dist_iv3 = speakers[i].coords.angle_between(&v3);
    let dist_jv3 = speakers[j].coords.angle_between(&v3);
    let dist_kv3 = speakers[k].coords.angle_between(&v3);
    let dist_lv3 = speakers[l].coords.angle_between(&v3);

    let dist_inv3 = speakers[i].coords.angle_between(&neg_v3);
    let dist_jnv3 = speakers[j].coords.angle_between(&neg_v3);
    let dist_knv3 = speakers[k].coords.angle_between(&neg_v3);
    let dist_lnv3 = speakers[l].coords.angle_between(&neg_v3);

    // Crossing point lands on a speaker: degenerate, report no crossing.
    if dist_iv3 <= INTERSECT_TOLERANCE
        || dist_jv3 <= INTERSECT_TOLERANCE
        || dist_kv3 <= INTERSECT_TOLERANCE
        || dist_lv3 <= INTERSECT_TOLERANCE
        || dist_inv3 <= INTERSECT_TOLERANCE
        || dist_jnv3 <= INTERSECT_TOLERANCE
        || dist_knv3 <= INTERSECT_TOLERANCE
        || dist_lnv3 <= INTERSECT_TOLERANCE
    {
        return false;
    }

    // The crossing point is on an arc when its distances to the arc's
    // endpoints sum to the arc length.
    ((dist_iv3 + dist_jv3 - dist_ij).abs() <= INTERSECT_TOLERANCE
        && (dist_kv3 + dist_lv3 - dist_kl).abs() <= INTERSECT_TOLERANCE)
        || ((dist_inv3 + dist_jnv3 - dist_ij).abs() <= INTERSECT_TOLERANCE
            && (dist_knv3 + dist_lnv3 - dist_kl).abs() <= INTERSECT_TOLERANCE)
}

/// Whether any other speaker's direction falls inside the spherical triangle
/// of `ids`, tested with the triplet's barycentric coordinates.
fn any_speaker_inside(inv_mat: &[f64; 9], ids: [usize; 3], speakers: &[Speaker]) -> bool {
    for (idx, speaker) in speakers.iter().enumerate() {
        if ids.contains(&idx) {
            continue;
        }
        let d = speaker.coords;
        let inside = (0..3).all(|row| {
            let coord =
                inv_mat[3 * row] * d.x + inv_mat[3 * row + 1] * d.y + inv_mat[3 * row + 2] * d.z;
            coord >= -0.001
        });
        if inside {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// 2-D pairing
// ---------------------------------------------------------------------------

fn choose_pairs(speakers: &[Speaker]) -> Vec<SpeakerSet> {
    let n = speakers.len();

    // Signed in-plane angle of each speaker, then a ring ordering.
    let angle_of = |s: &Speaker| -> f64 {
        let azi = s.angles.azimuth.to_radians();
        let (x, y) = (azi.cos(), azi.sin());
        let a = x.clamp(-1.0, 1.0).acos();
        if y < 0.0 {
            -a
        } else {
            a
        }
    };
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| angle_of(&speakers[a]).total_cmp(&angle_of(&speakers[b])));

    let mut sets = Vec::new();
    let mut push_pair = |a: usize, b: usize| {
        if let Some(inv) = invert_2x2(&speakers[a], &speakers[b]) {
            sets.push(SpeakerSet::new([a, b, 0], inv));
        }
    };

    for w in order.windows(2) {
        let gap = angle_of(&speakers[w[1]]) - angle_of(&speakers[w[0]]);
        if gap <= MAX_PAIR_GAP {
            push_pair(w[0], w[1]);
        }
    }
    // Wraparound pair across the back of the ring.
    let first = order[0];
    let last = order[n - 1];
    let gap = std::f64::consts::TAU - angle_of(&speakers[last]) + angle_of(&speakers[first]);
    if gap <= MAX_PAIR_GAP {
        push_pair(last, first);
    }

    sets
}

// ---------------------------------------------------------------------------
// Basis inversion
// ---------------------------------------------------------------------------

/// Invert the 3×3 matrix whose columns are the three unit directions, via
/// the adjugate/determinant formula. `None` when the directions are
/// coplanar with the origin (singular basis).
fn invert_3x3(
    l1: &CartesianVector,
    l2: &CartesianVector,
    l3: &CartesianVector,
) -> Option<[f64; 9]> {
    let c23 = l2.cross_raw(l3);
    let c31 = l3.cross_raw(l1);
    let c12 = l1.cross_raw(l2);
    let det = l1.dot(&c23);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        c23.x * inv_det,
        c23.y * inv_det,
        c23.z * inv_det,
        c31.x * inv_det,
        c31.y * inv_det,
        c31.z * inv_det,
        c12.x * inv_det,
        c12.y * inv_det,
        c12.z * inv_det,
    ])
}

/// 2×2 inverse of the in-plane azimuth unit vectors of a speaker pair,
/// stored row-major in the first four matrix slots.
fn invert_2x2(a: &Speaker, b: &Speaker) -> Option<[f64; 9]> {
    let a_azi = a.angles.azimuth.to_radians();
    let b_azi = b.angles.azimuth.to_radians();
    let (x1, y1) = (a_azi.cos(), a_azi.sin());
    let (x2, y2) = (b_azi.cos(), b_azi.sin());

    let det = x1 * y2 - x2 * y1;
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    let mut mat = [0.0; 9];
    mat[0] = y2 * inv_det;
    mat[1] = -x2 * inv_det;
    mat[2] = -y1 * inv_det;
    mat[3] = x1 * inv_det;
    Some(mat)
}
