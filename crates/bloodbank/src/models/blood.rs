use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{parse_closed, ParseEnumError};

/// ABO/Rh blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BloodGroup {
    /// A positive.
    #[serde(rename = "A+")]
    APositive,
    /// A negative.
    #[serde(rename = "A-")]
    ANegative,
    /// B positive.
    #[serde(rename = "B+")]
    BPositive,
    /// B negative.
    #[serde(rename = "B-")]
    BNegative,
    /// AB positive.
    #[serde(rename = "AB+")]
    AbPositive,
    /// AB negative.
    #[serde(rename = "AB-")]
    AbNegative,
    /// O positive.
    #[serde(rename = "O+")]
    OPositive,
    /// O negative.
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    /// Every blood group, in inventory display order.
    pub const ALL: [Self; 8] = [
        Self::APositive,
        Self::ANegative,
        Self::BPositive,
        Self::BNegative,
        Self::AbPositive,
        Self::AbNegative,
        Self::OPositive,
        Self::ONegative,
    ];

    /// The stored form, e.g. `"AB-"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }

    /// Long form used in listings, e.g. `"AB Negative"`.
    #[must_use]
    pub fn long_name(self) -> &'static str {
        match self {
            Self::APositive => "A Positive",
            Self::ANegative => "A Negative",
            Self::BPositive => "B Positive",
            Self::BNegative => "B Negative",
            Self::AbPositive => "AB Positive",
            Self::AbNegative => "AB Negative",
            Self::OPositive => "O Positive",
            Self::ONegative => "O Negative",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_closed("blood group", s, &Self::ALL, Self::as_str)
    }
}

/// Donor gender as recorded at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male.
    #[serde(rename = "M")]
    Male,
    /// Female.
    #[serde(rename = "F")]
    Female,
    /// Other / not stated.
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    /// Every gender value.
    pub const ALL: [Self; 3] = [Self::Male, Self::Female, Self::Other];

    /// The stored single-letter code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Other => "O",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => parse_closed("gender", s, &Self::ALL, Self::as_str),
        }
    }
}
