//! Calendar dimensions a date handle can be projected onto.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::utils::error::{Error, Result};

/// One calendar field of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateDimension {
    /// Full year (`Y`).
    #[serde(rename = "Y")]
    Year,
    /// Month, 1-based (`M`).
    #[serde(rename = "M")]
    Month,
    /// Day of week, Sunday = 0 (`W`).
    #[serde(rename = "W")]
    Weekday,
    /// Day of month (`D`).
    #[serde(rename = "D")]
    Day,
    /// Hour (`h`).
    #[serde(rename = "h")]
    Hour,
    /// Minute (`m`).
    #[serde(rename = "m")]
    Minute,
    /// Second (`s`).
    #[serde(rename = "s")]
    Second,
}

impl DateDimension {
    /// All dimensions in canonical order.
    pub const ALL: [Self; 7] = [
        Self::Year,
        Self::Month,
        Self::Weekday,
        Self::Day,
        Self::Hour,
        Self::Minute,
        Self::Second,
    ];

    /// Parses a single key character.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'Y' => Some(Self::Year),
            'M' => Some(Self::Month),
            'W' => Some(Self::Weekday),
            'D' => Some(Self::Day),
            'h' => Some(Self::Hour),
            'm' => Some(Self::Minute),
            's' => Some(Self::Second),
            _ => None,
        }
    }

    /// Returns the key character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Year => 'Y',
            Self::Month => 'M',
            Self::Weekday => 'W',
            Self::Day => 'D',
            Self::Hour => 'h',
            Self::Minute => 'm',
            Self::Second => 's',
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Parses a slice key such as `"YMD"`, preserving request order.
    ///
    /// Fails with a type error on an empty key, an unknown character or a
    /// dimension requested twice.
    pub fn parse_key(key: &str) -> Result<SmallVec<[Self; 7]>> {
        if key.is_empty() {
            return Err(Error::type_error("Empty date slice."));
        }
        let mut seen = DateDimensions::EMPTY;
        let mut dims = SmallVec::new();
        for c in key.chars() {
            let dim = Self::from_char(c).ok_or_else(|| {
                Error::type_error(format!(
                    "\"{c}\" is not a date dimension, expected one of Y, M, W, D, h, m, s."
                ))
            })?;
            if seen.contains(dim) {
                return Err(Error::type_error(format!(
                    "Date dimension \"{c}\" is repeated in \"{key}\"."
                )));
            }
            seen.insert(dim);
            dims.push(dim);
        }
        Ok(dims)
    }
}

impl fmt::Display for DateDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A set of calendar dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateDimensions(u8);

impl DateDimensions {
    /// The empty set.
    pub const EMPTY: Self = Self(0);
    /// Every dimension.
    pub const ALL: Self = Self(0b111_1111);

    /// Returns whether `dim` is in the set.
    #[must_use]
    pub const fn contains(self, dim: DateDimension) -> bool {
        self.0 & dim.bit() != 0
    }

    /// Adds `dim` to the set.
    pub fn insert(&mut self, dim: DateDimension) {
        self.0 |= dim.bit();
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates members in canonical order.
    pub fn iter(self) -> impl Iterator<Item = DateDimension> {
        DateDimension::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<DateDimension> for DateDimensions {
    fn from_iter<I: IntoIterator<Item = DateDimension>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for dim in iter {
            set.insert(dim);
        }
        set
    }
}

impl fmt::Display for DateDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dim in self.iter() {
            write!(f, "{dim}")?;
        }
        Ok(())
    }
}

impl Serialize for DateDimensions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateDimensions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "all" {
            return Ok(Self::ALL);
        }
        raw.chars()
            .map(|c| {
                DateDimension::from_char(c)
                    .ok_or_else(|| serde::de::Error::custom(format!("unknown date dimension {c}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::QueryErrorKind;

    #[test]
    fn test_parse_key_keeps_request_order() {
        let dims = DateDimension::parse_key("MY").unwrap();
        assert_eq!(dims.as_slice(), &[DateDimension::Month, DateDimension::Year]);
    }

    #[test]
    fn test_parse_key_rejects_duplicates() {
        let err = DateDimension::parse_key("YY").unwrap_err();
        assert_eq!(err.kind(), Some(QueryErrorKind::Type));
    }

    #[test]
    fn test_parse_key_rejects_unknown_dimension() {
        assert!(DateDimension::parse_key("H").is_err());
        assert!(DateDimension::parse_key("").is_err());
    }

    #[test]
    fn test_dimension_set() {
        let set: DateDimensions = [DateDimension::Day, DateDimension::Year].into_iter().collect();
        assert!(set.contains(DateDimension::Year));
        assert!(!set.contains(DateDimension::Hour));
        assert_eq!(set.to_string(), "YD");
        assert_eq!(DateDimensions::ALL.to_string(), "YMWDhms");
    }
}
