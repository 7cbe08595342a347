use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::errors::{CoreError, CoreResult};

/// A selectable encoding variant of the same content.
///
/// Ordering compares height first, then frame rate, so a sorted list of
/// qualities runs from the smallest rendition to the largest. Labels follow
/// the usual `"<height>p[<fps>]"` convention (`"720p"`, `"1080p60"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quality {
    label: String,
    height: u32,
    frame_rate: u32,
}

/// Frame rate assumed when a label does not carry one.
const DEFAULT_FRAME_RATE: u32 = 30;

impl Quality {
    pub fn new(label: impl Into<String>, height: u32, frame_rate: u32) -> Self {
        Self {
            label: label.into(),
            height,
            frame_rate,
        }
    }

    /// Parse a conventional rendition label such as `"480p"` or `"1080p60"`.
    pub fn parse(label: &str) -> CoreResult<Self> {
        let rest = label
            .strip_suffix('p')
            .map(|height| (height, None))
            .or_else(|| {
                label
                    .find('p')
                    .map(|at| (&label[..at], Some(&label[at + 1..])))
            });

        let Some((height, fps)) = rest else {
            return Err(CoreError::InvalidQuality(label.to_owned()));
        };

        let height: u32 = height
            .parse()
            .map_err(|_| CoreError::InvalidQuality(label.to_owned()))?;
        let frame_rate = match fps {
            None | Some("") => DEFAULT_FRAME_RATE,
            Some(fps) => fps
                .parse()
                .map_err(|_| CoreError::InvalidQuality(label.to_owned()))?,
        };

        Ok(Self::new(label, height, frame_rate))
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl FromStr for Quality {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl PartialOrd for Quality {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quality {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.height, self.frame_rate).cmp(&(other.height, other.frame_rate))
    }
}
