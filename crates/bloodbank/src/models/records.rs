use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_closed, BloodGroup, ParseEnumError};

/// Outcome written on a screening record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreeningResult {
    /// Donor may proceed to collection.
    Passed,
    /// Donor may not proceed.
    Failed,
}

impl ScreeningResult {
    /// Every result value.
    pub const ALL: [Self; 2] = [Self::Passed, Self::Failed];

    /// The stored form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for ScreeningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ScreeningResult {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_closed("screening result", s, &Self::ALL, Self::as_str)
    }
}

/// Outcome written on a donation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DonationStatus {
    /// Blood was collected.
    Success,
    /// Collection was attempted and abandoned.
    Failed,
}

impl DonationStatus {
    /// Every status value.
    pub const ALL: [Self; 2] = [Self::Success, Self::Failed];

    /// The stored form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_closed("donation status", s, &Self::ALL, Self::as_str)
    }
}

/// Health checks taken before a collection. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    /// Row id.
    pub id: i64,
    /// The screened donor.
    pub donor_id: i64,
    /// Free text, usually `systolic/diastolic`.
    pub blood_pressure: String,
    /// Hemoglobin in g/dL.
    pub hemoglobin: f64,
    /// Weight in kg.
    pub weight: f64,
    /// Body temperature in °F.
    pub temperature: f64,
    /// Pulse in beats per minute.
    pub pulse: u32,
    /// Recorded outcome.
    pub result: ScreeningResult,
    /// Operator notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Username of the operator who screened.
    pub screened_by: String,
    /// When the screening was recorded.
    pub screened_at: DateTime<Utc>,
}

/// One collection from a donor. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    /// Row id.
    pub id: i64,
    /// The donor the blood came from.
    pub donor_id: i64,
    /// Copied from the donor at collection time.
    pub blood_group: BloodGroup,
    /// Volume collected in millilitres.
    pub quantity_ml: u32,
    /// Recorded outcome.
    pub status: DonationStatus,
    /// Operator notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// When the collection happened.
    pub donation_date: DateTime<Utc>,
}
