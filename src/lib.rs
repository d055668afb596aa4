//! # vbapan - Vector-Base Amplitude Panning
//!
//! Positions a virtual sound source over an arbitrary loudspeaker array
//! (a ring of speakers in the plane or a full 3-D dome) by computing one
//! non-negative gain per output channel such that the reproduced direction
//! matches a requested azimuth/elevation, optionally spread over a wider
//! region.
//!
//! ## Architecture
//!
//! - **math** - cartesian/angular conversions and vector primitives
//! - **layout** - speaker arrangement ingestion and validation
//! - **triangulation** - one-time selection of speaker triplets (3-D) or
//!   adjacent pairs (2-D) with their inverse basis matrices
//! - **gains** - the per-frame solver: pick the best-fit set, solve for
//!   barycentric-like gains
//! - **spread** - widening strategies (ring sampling, independent
//!   azimuth/elevation deviation)
//! - **panner** - the per-source façade holding direction, gain buffers,
//!   and smoothing state
//!
//! Setup (layout loading, triangulation) allocates freely and reports
//! typed errors; the panning entry points are allocation-free, run in time
//! bounded by the capped set-table size, and are safe on the audio thread.
//!
//! ## Quick Start
//!
//! ```
//! use vbapan::{Dimension, Panner, SpeakerLayout};
//!
//! // A quad ring in the horizontal plane.
//! let layout = SpeakerLayout::from_angles(
//!     &[(45.0, 0.0), (135.0, 0.0), (225.0, 0.0), (315.0, 0.0)],
//!     Dimension::Two,
//! )?;
//! let mut panner = Panner::new(&layout)?;
//!
//! // Once per control update: direction in degrees, spread 0-100.
//! panner.pan(90.0, 0.0, 0.0);
//!
//! // Once per audio block: scale each channel by its (smoothed) gain.
//! let gains = panner.smoothed_gains();
//! assert_eq!(gains.len(), 4);
//! # Ok::<(), vbapan::Error>(())
//! ```

/// Capacity cap on speakers per layout.
///
/// Real-time code holds no dynamic allocation on the hot path; fixed caps
/// keep the per-call work bounded. Exceeding one is a construction-time
/// error, never a truncation.
pub const MAX_SPEAKERS: usize = 256;

/// Capacity cap on speaker sets (triplets/pairs) per panner.
pub const MAX_SETS: usize = 128;

mod error;
pub use error::{Error, Result};

mod math;
pub use math::{AngularVector, CartesianVector};

mod layout;
pub use layout::{Dimension, Speaker, SpeakerLayout};

mod triangulation;

mod gains;
mod spread;

mod panner;
pub use panner::{Orientation, Panner};
