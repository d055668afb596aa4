//! Error types for vbapan.

use thiserror::Error;

/// Error type for layout loading and panner construction.
///
/// Nothing here is retryable: the geometry is deterministic, so the only
/// recovery is fixing the input layout.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid speaker layout: {0}")]
    InvalidLayout(String),

    #[error("Too many speakers: {0} (maximum is 256)")]
    TooManySpeakers(usize),

    #[error("Layout triangulation produced no usable speaker sets")]
    DegenerateTriangulation,

    #[error("Triangulation produced {0} speaker sets (maximum is 128)")]
    TooManySets(usize),

    #[error("Invalid speaker set {set:?}: {reason}")]
    InvalidSpeakerSet { set: [usize; 3], reason: String },

    #[error("Malformed layout file at line {line}: {reason}")]
    ParseLayout { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
