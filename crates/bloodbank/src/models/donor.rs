use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_closed, BloodGroup, Donation, Gender, ParseEnumError, ScreeningRecord};

/// Where a donor currently sits in the donation workflow.
///
/// Each status allows at most one next action (see [`DonorStatus::next_action`]).
/// `NotEligible` and `PermanentlyDefer` are only ever set administratively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DonorStatus {
    /// Registered and may be checked in.
    #[default]
    #[serde(rename = "Eligible")]
    Eligible,
    /// Checked in, waiting for screening.
    #[serde(rename = "In Screening Queue")]
    InScreeningQueue,
    /// Temporarily not allowed to donate.
    #[serde(rename = "Not Eligible")]
    NotEligible,
    /// Never allowed to donate.
    #[serde(rename = "Permanently Defer")]
    PermanentlyDefer,
    /// Passed screening, waiting for collection.
    #[serde(rename = "Ready for Collection")]
    ReadyForCollection,
    /// Collection attempted and failed.
    #[serde(rename = "Donation Failed")]
    DonationFailed,
    /// Collection completed.
    #[serde(rename = "Donation Success")]
    DonationSuccess,
}

impl DonorStatus {
    /// Every status value.
    pub const ALL: [Self; 7] = [
        Self::Eligible,
        Self::InScreeningQueue,
        Self::NotEligible,
        Self::PermanentlyDefer,
        Self::ReadyForCollection,
        Self::DonationFailed,
        Self::DonationSuccess,
    ];

    /// The stored form, e.g. `"Ready for Collection"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "Eligible",
            Self::InScreeningQueue => "In Screening Queue",
            Self::NotEligible => "Not Eligible",
            Self::PermanentlyDefer => "Permanently Defer",
            Self::ReadyForCollection => "Ready for Collection",
            Self::DonationFailed => "Donation Failed",
            Self::DonationSuccess => "Donation Success",
        }
    }

    /// The single action an operator may take next, if any.
    #[must_use]
    pub fn next_action(self) -> Option<WorkflowAction> {
        match self {
            Self::Eligible => Some(WorkflowAction::CheckIn),
            Self::InScreeningQueue => Some(WorkflowAction::Screen),
            Self::ReadyForCollection => Some(WorkflowAction::Collect),
            Self::DonationSuccess | Self::DonationFailed => Some(WorkflowAction::ViewDetails),
            Self::NotEligible | Self::PermanentlyDefer => None,
        }
    }

    /// Whether no workflow transition leads out of this status.
    #[must_use]
    pub fn is_absorbing(self) -> bool {
        matches!(self, Self::NotEligible | Self::PermanentlyDefer)
    }
}

impl fmt::Display for DonorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DonorStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept kebab/snake spellings from the command line as well.
        let normalized = s.trim().replace(['-', '_'], " ");
        parse_closed("donor status", &normalized, &Self::ALL, Self::as_str)
            .map_err(|_| ParseEnumError::new("donor status", s))
    }
}

/// The operator action a donor's status makes available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    /// Move an eligible donor into the screening queue.
    CheckIn,
    /// Record a screening for a queued donor.
    Screen,
    /// Record a collection for a screened donor.
    Collect,
    /// Nothing left to do but look at the history.
    ViewDetails,
}

impl WorkflowAction {
    /// Verb used in messages and errors.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::CheckIn => "check in",
            Self::Screen => "screen",
            Self::Collect => "collect from",
            Self::ViewDetails => "view",
        }
    }

    /// Label shown in the donor list.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::CheckIn => "Check-In",
            Self::Screen => "Start Screening",
            Self::Collect => "Collect Blood",
            Self::ViewDetails => "View Details",
        }
    }

    /// The `(from, to)` status pair this action moves a donor along.
    ///
    /// `ViewDetails` changes nothing and has no edge.
    #[must_use]
    pub fn edge(self) -> Option<(DonorStatus, DonorStatus)> {
        match self {
            Self::CheckIn => Some((DonorStatus::Eligible, DonorStatus::InScreeningQueue)),
            Self::Screen => Some((
                DonorStatus::InScreeningQueue,
                DonorStatus::ReadyForCollection,
            )),
            Self::Collect => Some((
                DonorStatus::ReadyForCollection,
                DonorStatus::DonationSuccess,
            )),
            Self::ViewDetails => None,
        }
    }
}

/// A registered donor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    /// Row id.
    pub id: i64,
    /// Full name.
    pub name: String,
    /// Age in years at registration.
    pub age: u8,
    /// Recorded gender.
    pub gender: Gender,
    /// ABO/Rh group.
    pub blood_group: BloodGroup,
    /// Phone number or other contact.
    pub contact: String,
    /// Optional email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Optional postal address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Current workflow status.
    pub status: DonorStatus,
    /// When the last successful collection happened.
    pub last_donation_date: Option<DateTime<Utc>>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Donor {
    /// Shortcut for `self.status.next_action()`.
    #[must_use]
    pub fn next_action(&self) -> Option<WorkflowAction> {
        self.status.next_action()
    }
}

/// A validated registration, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDonor {
    /// Full name.
    pub name: String,
    /// Age in years.
    pub age: u8,
    /// Recorded gender.
    pub gender: Gender,
    /// ABO/Rh group.
    pub blood_group: BloodGroup,
    /// Phone number or other contact.
    pub contact: String,
    /// Optional email address.
    pub email: Option<String>,
    /// Optional postal address.
    pub address: Option<String>,
}

/// A donor together with its history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorDetails {
    /// The donor row.
    pub donor: Donor,
    /// Donations ordered by `donation_date` descending.
    pub donations: Vec<Donation>,
    /// Screenings ordered by `screened_at` descending.
    pub screenings: Vec<ScreeningRecord>,
}
