//! Donor registration and hospital request intake.

use tracing::info;

use crate::config::ValidationConfig;
use crate::error::Result;
use crate::forms::{BloodRequestForm, RegistrationForm};
use crate::models::{BloodRequest, Donor, RequestAction};
use crate::session::{Role, SessionContext};
use crate::storage::{current_timestamp, Storage};

/// Register a donor from a submitted form. Public: no session needed.
///
/// Duplicate registrations are accepted.
///
/// # Errors
///
/// Returns a validation error for a bad form, or an error if the database
/// operation fails.
pub fn register_donor(
    storage: &Storage,
    form: &RegistrationForm,
    rules: &ValidationConfig,
) -> Result<Donor> {
    let new_donor = form.validate(rules)?;
    let donor = storage.insert_donor(&new_donor, current_timestamp())?;
    info!(
        donor_id = donor.id,
        blood_group = %donor.blood_group,
        "Donor registered"
    );
    Ok(donor)
}

/// Submit a hospital request. Any signed-in operator may submit.
///
/// # Errors
///
/// Returns a validation error for a bad form, or an error if the database
/// operation fails.
pub fn submit_request(
    storage: &Storage,
    session: &SessionContext,
    form: &BloodRequestForm,
    rules: &ValidationConfig,
) -> Result<BloodRequest> {
    session.require_role(Role::Hospital, "request submission")?;
    let new_request = form.validate(rules)?;
    let request = storage.insert_request(&new_request, current_timestamp())?;
    info!(
        request_id = request.id,
        hospital = %request.hospital_name,
        blood_group = %request.blood_group,
        units = request.units_requested,
        urgency = %request.urgency,
        operator = %session.username(),
        "Blood request submitted"
    );
    Ok(request)
}

/// Approve, reject or fulfil a request. Admin only.
///
/// # Errors
///
/// Returns [`crate::Error::PermissionDenied`] for a non-admin session,
/// [`crate::Error::NotFound`] for an unknown request, and
/// [`crate::Error::InvalidRequestTransition`] when the action does not apply
/// to the request's status.
pub fn process_request(
    storage: &Storage,
    session: &SessionContext,
    request_id: i64,
    action: RequestAction,
) -> Result<BloodRequest> {
    session.require_role(Role::Admin, "request processing")?;
    let request = storage.process_request(request_id, action, current_timestamp())?;
    info!(
        request_id,
        status = %request.status,
        operator = %session.username(),
        "Blood request processed"
    );
    Ok(request)
}
