//! Loudspeaker layout ingestion and validation.
//!
//! A [`SpeakerLayout`] is an ordered list of loudspeaker directions plus a
//! dimension tag. It can be built from explicit azimuth/elevation pairs or
//! parsed from a line-oriented text file (`<count>` on the first line, then
//! `<count>` lines of `azimuth elevation` in degrees).

use crate::error::{Error, Result};
use crate::math::{AngularVector, CartesianVector};
use crate::MAX_SPEAKERS;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Layout dimensionality: a planar ring or a full 3-D dome.
///
/// Using an enum instead of a raw 2/3 tag makes an out-of-range dimension
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Speakers in the horizontal plane; elevation is ignored.
    Two,
    /// Speakers on a dome; panning uses triplets.
    Three,
}

impl Dimension {
    /// Gains per speaker set: 2 for pairs, 3 for triplets.
    pub(crate) fn gains_per_set(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }
}

/// One loudspeaker: angular direction plus its cached cartesian form.
///
/// The angular form is the source of truth; the cartesian form is derived
/// from it at construction.
#[derive(Debug, Clone, Copy)]
pub struct Speaker {
    pub angles: AngularVector,
    pub coords: CartesianVector,
}

impl Speaker {
    fn from_angles(azimuth: f64, elevation: f64) -> Self {
        let angles = AngularVector::new(azimuth, elevation);
        Self {
            angles,
            coords: angles.to_cartesian(),
        }
    }
}

/// An ordered, validated loudspeaker arrangement.
#[derive(Debug, Clone)]
pub struct SpeakerLayout {
    speakers: Vec<Speaker>,
    dimension: Dimension,
}

impl SpeakerLayout {
    /// Build a layout from `(azimuth, elevation)` pairs in degrees.
    ///
    /// Fails with [`Error::InvalidLayout`] for fewer than 3 speakers and
    /// [`Error::TooManySpeakers`] above [`MAX_SPEAKERS`].
    pub fn from_angles(angles: &[(f64, f64)], dimension: Dimension) -> Result<Self> {
        if angles.len() < 3 {
            return Err(Error::InvalidLayout(format!(
                "need at least 3 speakers, got {}",
                angles.len()
            )));
        }
        if angles.len() > MAX_SPEAKERS {
            return Err(Error::TooManySpeakers(angles.len()));
        }
        let speakers = angles
            .iter()
            .map(|&(azi, ele)| Speaker::from_angles(azi, ele))
            .collect();
        Ok(Self {
            speakers,
            dimension,
        })
    }

    /// Load a layout from a text file.
    ///
    /// Format: first line is the speaker count, each following line holds
    /// `azimuth elevation` as whitespace-separated degrees. Lines beyond
    /// the declared count are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P, dimension: Dimension) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let header = lines.next().ok_or_else(|| Error::ParseLayout {
            line: 1,
            reason: "empty file".into(),
        })??;
        let count: usize = header.trim().parse().map_err(|_| Error::ParseLayout {
            line: 1,
            reason: format!("expected speaker count, got {:?}", header.trim()),
        })?;

        let mut angles = Vec::with_capacity(count.min(MAX_SPEAKERS));
        for line_no in 2..count + 2 {
            let line = lines.next().ok_or_else(|| Error::ParseLayout {
                line: line_no,
                reason: format!("file ends before {} declared speakers", count),
            })??;
            let mut fields = line.split_whitespace();
            let azimuth = parse_field(fields.next(), line_no)?;
            let elevation = parse_field(fields.next(), line_no)?;
            angles.push((azimuth, elevation));
        }

        Self::from_angles(&angles, dimension)
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Number of output channels this layout drives.
    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}

fn parse_field(field: Option<&str>, line_no: usize) -> Result<f64> {
    let field = field.ok_or_else(|| Error::ParseLayout {
        line: line_no,
        reason: "expected `azimuth elevation`".into(),
    })?;
    field.parse().map_err(|_| Error::ParseLayout {
        line: line_no,
        reason: format!("not a number: {:?}", field),
    })
}
