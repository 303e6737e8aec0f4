//! Canonical length units.
//!
//! Records that carry geometric quantities tag them with one of these
//! tokens. Each unit has a canonical token (what goes on the wire), a set of
//! case-insensitive aliases accepted on input, a stable integer encoding and
//! a scale factor relative to the metre.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A recognised length unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Units {
    Millimeters,
    Centimeters,
    Meters,
    Kilometers,
    Inches,
    Feet,
    Yards,
    Miles,
    None,
}

impl Units {
    /// Every unit, in encoding order.
    pub const ALL: [Units; 9] = [
        Self::None,
        Self::Millimeters,
        Self::Centimeters,
        Self::Meters,
        Self::Kilometers,
        Self::Inches,
        Self::Feet,
        Self::Yards,
        Self::Miles,
    ];

    /// The canonical wire token.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Millimeters => "mm",
            Self::Centimeters => "cm",
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Inches => "in",
            Self::Feet => "ft",
            Self::Yards => "yd",
            Self::Miles => "mi",
            Self::None => "none",
        }
    }

    /// Lowercase spellings accepted by [`Units::parse`].
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Millimeters => &["mm", "millimeter", "millimeters", "millimetre", "millimetres"],
            Self::Centimeters => &["cm", "centimeter", "centimeters", "centimetre", "centimetres"],
            Self::Meters => &["m", "meter", "meters", "metre", "metres"],
            Self::Kilometers => &["km", "kilometer", "kilometers", "kilometre", "kilometres"],
            Self::Inches => &["in", "inch", "inches"],
            Self::Feet => &["ft", "foot", "feet"],
            Self::Yards => &["yd", "yard", "yards"],
            Self::Miles => &["mi", "mile", "miles"],
            Self::None => &["none", "null"],
        }
    }

    /// Parse a unit from any of its case-insensitive aliases.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|unit| unit.aliases().contains(&lower.as_str()))
            .ok_or_else(|| TypeError::InvalidUnit(s.to_string()))
    }

    /// Stable integer encoding (`none = 0`, `mm = 1`, ... `mi = 8`).
    pub fn encoding(&self) -> i64 {
        match self {
            Self::None => 0,
            Self::Millimeters => 1,
            Self::Centimeters => 2,
            Self::Meters => 3,
            Self::Kilometers => 4,
            Self::Inches => 5,
            Self::Feet => 6,
            Self::Yards => 7,
            Self::Miles => 8,
        }
    }

    /// Decode from the integer encoding.
    pub fn from_encoding(code: i64) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.encoding() == code)
            .ok_or(TypeError::InvalidUnitEncoding(code))
    }

    /// Length of one of this unit in metres. `None` is treated as unitless (1.0).
    pub fn meters_per_unit(&self) -> f64 {
        match self {
            Self::Millimeters => 0.001,
            Self::Centimeters => 0.01,
            Self::Meters | Self::None => 1.0,
            Self::Kilometers => 1000.0,
            Self::Inches => 0.0254,
            Self::Feet => 0.3048,
            Self::Yards => 0.9144,
            Self::Miles => 1609.344,
        }
    }

    /// Multiplier converting a quantity expressed in `from` into `to`.
    pub fn scale_factor(from: Units, to: Units) -> f64 {
        if from == to {
            return 1.0;
        }
        from.meters_per_unit() / to.meters_per_unit()
    }
}

/// [`Units::scale_factor`] over unparsed unit strings.
pub fn scale_factor_from_strings(from: &str, to: &str) -> Result<f64, TypeError> {
    Ok(Units::scale_factor(Units::parse(from)?, Units::parse(to)?))
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Units {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Units {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

impl<'de> Deserialize<'de> for Units {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
