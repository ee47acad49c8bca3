//! Sample tags and tagged samples.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ShapeError;
use crate::point_group::PointGroup;

/// Dental arch a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    /// Upper arch, marked `U`.
    Upper,
    /// Lower arch, marked `L`.
    Lower,
}

impl Arch {
    /// The single-letter marker used in tags.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Upper => 'U',
            Self::Lower => 'L',
        }
    }

    /// Parses a `U`/`L` marker.
    #[must_use]
    pub const fn from_marker(c: char) -> Option<Self> {
        match c {
            'U' => Some(Self::Upper),
            'L' => Some(Self::Lower),
            _ => None,
        }
    }
}

/// Identifier of one sample: an integer index plus an arch marker.
///
/// The textual form is `"{index}{U|L}"`, e.g. `"37U"`.
///
/// # Example
///
/// ```
/// use shape_types::{Arch, Tag};
///
/// let tag: Tag = "37U".parse().unwrap();
/// assert_eq!(tag.index(), 37);
/// assert_eq!(tag.arch(), Arch::Upper);
/// assert_eq!(tag.to_string(), "37U");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    index: u32,
    arch: Arch,
}

impl Tag {
    /// Creates a tag.
    #[must_use]
    pub const fn new(index: u32, arch: Arch) -> Self {
        Self { index, arch }
    }

    /// Sample index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Arch marker.
    #[must_use]
    pub const fn arch(self) -> Arch {
        self.arch
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.index, self.arch.marker())
    }
}

impl FromStr for Tag {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ShapeError::InvalidTag(s.to_string());
        let marker = s.chars().last().ok_or_else(invalid)?;
        let arch = Arch::from_marker(marker).ok_or_else(invalid)?;
        let digits = &s[..s.len() - marker.len_utf8()];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index = digits.parse().map_err(|_| invalid())?;
        Ok(Self { index, arch })
    }
}

impl Serialize for Arch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.marker())
    }
}

impl<'de> Deserialize<'de> for Arch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut chars = s.chars();
        match (chars.next().and_then(Self::from_marker), chars.next()) {
            (Some(arch), None) => Ok(arch),
            _ => Err(serde::de::Error::custom(format!(
                "invalid arch marker {s:?}, expected \"U\" or \"L\""
            ))),
        }
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A point group together with the tag of the sample it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Provenance of the points.
    pub tag: Tag,
    /// The sample's points.
    pub group: PointGroup,
}

impl Sample {
    /// Pairs a tag with a point group.
    #[must_use]
    pub const fn new(tag: Tag, group: PointGroup) -> Self {
        Self { tag, group }
    }

    /// Number of points in the sample.
    #[must_use]
    pub fn len(&self) -> usize {
        self.group.len()
    }

    /// Returns true if the sample has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for s in ["0U", "129L", "37U"] {
            let tag: Tag = s.parse().unwrap();
            assert_eq!(tag.to_string(), s);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for s in ["", "U", "12", "12X", "-3U", "1 2L", "12u"] {
            assert!(
                matches!(s.parse::<Tag>(), Err(ShapeError::InvalidTag(_))),
                "accepted {s:?}"
            );
        }
    }

    #[test]
    fn test_ordering_is_by_index_then_arch() {
        let a = Tag::new(2, Arch::Lower);
        let b = Tag::new(10, Arch::Upper);
        assert!(a < b);
        assert!(Tag::new(2, Arch::Upper) < a);
    }

    #[test]
    fn test_sample_len() {
        let sample = Sample::new(
            Tag::new(1, Arch::Upper),
            PointGroup::from_rows(&[[0.0, 0.0, 0.0]]),
        );
        assert_eq!(sample.len(), 1);
        assert!(!sample.is_empty());
    }
}
