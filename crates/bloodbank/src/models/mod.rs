//! Core record types for bloodbank.
//!
//! These mirror the persisted tables. Closed value sets (blood group, donor
//! status, gender, request status, ...) are enums that render and parse as
//! the exact strings stored in the database.

mod blood;
mod donor;
mod inventory;
mod records;
mod request;

pub use blood::{BloodGroup, Gender};
pub use donor::{Donor, DonorDetails, DonorStatus, NewDonor, WorkflowAction};
pub use inventory::{InventoryEntry, StockLevel};
pub use records::{Donation, DonationStatus, ScreeningRecord, ScreeningResult};
pub use request::{BloodRequest, NewBloodRequest, RequestAction, RequestStatus, Urgency};

use thiserror::Error;

/// A stored or typed-in value was not one of an enum's known strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    /// Which closed set was being parsed.
    pub kind: &'static str,
    /// The offending text.
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Look up `value` among `all` by its string form.
pub(crate) fn parse_closed<T: Copy>(
    kind: &'static str,
    value: &str,
    all: &[T],
    as_str: impl Fn(T) -> &'static str,
) -> Result<T, ParseEnumError> {
    let trimmed = value.trim();
    all.iter()
        .copied()
        .find(|v| as_str(*v).eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| ParseEnumError::new(kind, value))
}
