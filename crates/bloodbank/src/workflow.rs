//! The donor workflow: check-in, screening and collection.
//!
//! Each transition runs inside one immediate transaction. The status update
//! is guarded on the status the transition starts from, and the screening or
//! donation record is written in the same transaction, so a transition
//! either lands completely or not at all. A second attempt at the same
//! transition (a racing operator, a resubmitted form) finds the donor
//! already moved on and fails with [`Error::InvalidTransition`].

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{
    Donation, DonationStatus, Donor, DonorStatus, ScreeningRecord, ScreeningResult,
    WorkflowAction,
};
use crate::session::{Role, SessionContext};
use crate::storage::{current_timestamp, donors, Storage};

/// Validated screening measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningInput {
    /// Free text, e.g. `120/80`.
    pub blood_pressure: String,
    /// g/dL.
    pub hemoglobin: f64,
    /// kg.
    pub weight: f64,
    /// °C.
    pub temperature: f64,
    /// Beats per minute.
    pub pulse: u32,
    /// Optional remarks.
    pub notes: Option<String>,
}

/// Validated collection details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInput {
    /// Millilitres collected.
    pub quantity_ml: u32,
    /// Optional remarks.
    pub notes: Option<String>,
}

/// Result of a screening.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningOutcome {
    /// The donor after the transition.
    pub donor: Donor,
    /// The record written.
    pub record: ScreeningRecord,
}

/// Result of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionOutcome {
    /// The donor after the transition.
    pub donor: Donor,
    /// The donation written.
    pub donation: Donation,
}

/// Runs workflow transitions on behalf of an admin session.
#[derive(Debug)]
pub struct DonorWorkflow<'a> {
    storage: &'a Storage,
    session: &'a SessionContext,
}

impl<'a> DonorWorkflow<'a> {
    /// Bind the workflow to a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] unless the session is an admin's.
    pub fn new(storage: &'a Storage, session: &'a SessionContext) -> Result<Self> {
        session.require_role(Role::Admin, "the donor workflow")?;
        Ok(Self { storage, session })
    }

    /// `Eligible` → `In Screening Queue`. No record is written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown donor and
    /// [`Error::InvalidTransition`] if the donor is not `Eligible`.
    pub fn check_in(&self, donor_id: i64) -> Result<Donor> {
        let now = current_timestamp();
        let (donor, ()) =
            self.transition(donor_id, WorkflowAction::CheckIn, now, None, |_, _| Ok(()))?;
        Ok(donor)
    }

    /// `In Screening Queue` → `Ready for Collection`, writing one passed
    /// screening record signed by the session's operator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown donor and
    /// [`Error::InvalidTransition`] if the donor is not in the queue.
    pub fn screen(&self, donor_id: i64, input: &ScreeningInput) -> Result<ScreeningOutcome> {
        let now = current_timestamp();
        let screened_by = self.session.username();
        let (donor, record) =
            self.transition(donor_id, WorkflowAction::Screen, now, None, |conn, donor| {
                donors::insert_screening(
                    conn,
                    donor.id,
                    input,
                    ScreeningResult::Passed,
                    screened_by,
                    now,
                )
            })?;
        Ok(ScreeningOutcome { donor, record })
    }

    /// `Ready for Collection` → `Donation Success`, writing one successful
    /// donation and setting the donor's last donation date to the same
    /// instant as the donation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown donor and
    /// [`Error::InvalidTransition`] if the donor is not ready for collection.
    pub fn collect(&self, donor_id: i64, input: &CollectionInput) -> Result<CollectionOutcome> {
        let now = current_timestamp();
        let (donor, donation) = self.transition(
            donor_id,
            WorkflowAction::Collect,
            now,
            Some(now),
            |conn, donor| donors::insert_donation(conn, donor, input, DonationStatus::Success, now),
        )?;
        Ok(CollectionOutcome { donor, donation })
    }

    /// Set a donor's status directly.
    ///
    /// This is how a donor becomes `Not Eligible` or `Permanently Defer`,
    /// and how a donor is returned to `Eligible` for a later donation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown donor.
    pub fn set_status(&self, donor_id: i64, status: DonorStatus) -> Result<Donor> {
        let now = current_timestamp();
        let tx = self.storage.immediate_transaction()?;

        let previous = donors::require_donor(&tx, donor_id)?.status;
        if !donors::overwrite_status(&tx, donor_id, status, now)? {
            return Err(Error::not_found("donor", donor_id));
        }
        let donor = donors::require_donor(&tx, donor_id)?;
        tx.commit()?;

        info!(
            donor_id,
            from = %previous,
            to = %status,
            operator = %self.session.username(),
            "Donor status set administratively"
        );
        Ok(donor)
    }

    fn transition<T>(
        &self,
        donor_id: i64,
        action: WorkflowAction,
        now: DateTime<Utc>,
        last_donation: Option<DateTime<Utc>>,
        record: impl FnOnce(&Connection, &Donor) -> Result<T>,
    ) -> Result<(Donor, T)> {
        let (from, to) = action
            .edge()
            .ok_or_else(|| Error::internal(format!("'{}' is not a transition", action.verb())))?;

        let tx = self.storage.immediate_transaction()?;

        if !donors::advance_status(&tx, donor_id, from, to, now, last_donation)? {
            let current = donors::require_donor(&tx, donor_id)?;
            warn!(
                donor_id,
                action = action.verb(),
                status = %current.status,
                "Rejected workflow transition"
            );
            return Err(Error::InvalidTransition {
                donor_id,
                action: action.verb(),
                status: current.status,
            });
        }

        let donor = donors::require_donor(&tx, donor_id)?;
        let recorded = record(&tx, &donor)?;
        tx.commit()?;

        info!(
            donor_id,
            from = %from,
            to = %to,
            operator = %self.session.username(),
            "Donor workflow transition"
        );
        Ok((donor, recorded))
    }
}
