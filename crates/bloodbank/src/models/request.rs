use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_closed, BloodGroup, ParseEnumError};

/// How quickly a hospital needs the blood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    /// Within 2 hours.
    Emergency,
    /// Within 24 hours.
    Urgent,
    /// Within 3-5 days.
    #[default]
    Normal,
}

impl Urgency {
    /// Every urgency value.
    pub const ALL: [Self; 3] = [Self::Emergency, Self::Urgent, Self::Normal];

    /// The stored form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "Emergency",
            Self::Urgent => "Urgent",
            Self::Normal => "Normal",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_closed("urgency", s, &Self::ALL, Self::as_str)
    }
}

/// Processing state of a blood request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Submitted, not yet reviewed.
    #[default]
    Pending,
    /// Accepted by the blood bank.
    Approved,
    /// Declined by the blood bank.
    Rejected,
    /// Units delivered.
    Fulfilled,
}

impl RequestStatus {
    /// Every status value.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Fulfilled,
    ];

    /// The stored form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Fulfilled => "Fulfilled",
        }
    }

    /// The status `action` leads to from here, or `None` if not allowed.
    #[must_use]
    pub fn apply(self, action: RequestAction) -> Option<Self> {
        match (self, action) {
            (Self::Pending, RequestAction::Approve) => Some(Self::Approved),
            (Self::Pending, RequestAction::Reject) => Some(Self::Rejected),
            (Self::Approved, RequestAction::Fulfill) => Some(Self::Fulfilled),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_closed("request status", s, &Self::ALL, Self::as_str)
    }
}

/// A processing decision on a blood request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    /// Pending → Approved.
    Approve,
    /// Pending → Rejected.
    Reject,
    /// Approved → Fulfilled.
    Fulfill,
}

impl RequestAction {
    /// Verb used in messages and errors.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Fulfill => "fulfill",
        }
    }
}

/// A hospital's request for units of one blood group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodRequest {
    /// Row id.
    pub id: i64,
    /// Requesting hospital.
    pub hospital_name: String,
    /// Person to talk to at the hospital.
    pub contact_person: String,
    /// Phone number for the contact.
    pub contact: String,
    /// Optional email for the contact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Requested group.
    pub blood_group: BloodGroup,
    /// Number of units asked for.
    pub units_requested: u32,
    /// How soon the units are needed.
    pub urgency: Urgency,
    /// Optional description of the medical situation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Processing state.
    pub status: RequestStatus,
    /// Submission time.
    pub requested_at: DateTime<Utc>,
    /// When the request left `Pending`.
    pub processed_at: Option<DateTime<Utc>>,
}

/// A validated request, ready to insert. Always stored as `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBloodRequest {
    /// Requesting hospital.
    pub hospital_name: String,
    /// Person to talk to at the hospital.
    pub contact_person: String,
    /// Phone number for the contact.
    pub contact: String,
    /// Optional email for the contact.
    pub email: Option<String>,
    /// Requested group.
    pub blood_group: BloodGroup,
    /// Number of units asked for.
    pub units_requested: u32,
    /// How soon the units are needed.
    pub urgency: Urgency,
    /// Optional description of the medical situation.
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_default_is_normal() {
        assert_eq!(Urgency::default(), Urgency::Normal);
        assert_eq!("emergency".parse::<Urgency>(), Ok(Urgency::Emergency));
    }

    #[test]
    fn test_request_transitions() {
        use RequestAction::{Approve, Fulfill, Reject};
        use RequestStatus::{Approved, Fulfilled, Pending, Rejected};

        assert_eq!(Pending.apply(Approve), Some(Approved));
        assert_eq!(Pending.apply(Reject), Some(Rejected));
        assert_eq!(Approved.apply(Fulfill), Some(Fulfilled));

        assert_eq!(Pending.apply(Fulfill), None);
        assert_eq!(Approved.apply(Reject), None);
        assert_eq!(Rejected.apply(Approve), None);
        assert_eq!(Fulfilled.apply(Fulfill), None);
    }

    #[test]
    fn test_request_status_parse() {
        assert_eq!("pending".parse::<RequestStatus>(), Ok(RequestStatus::Pending));
        assert!("lost".parse::<RequestStatus>().is_err());
    }
}
