//! Hospital blood requests.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use super::{enum_column, format_timestamp, optional_timestamp_column, timestamp_column, Storage};
use crate::error::{Error, Result};
use crate::models::{BloodRequest, NewBloodRequest, RequestAction, RequestStatus};

const REQUEST_COLUMNS: &str = "id, hospital_name, contact_person, contact, email, blood_group, \
     units_requested, urgency, reason, status, requested_at, processed_at";

impl Storage {
    /// Record a hospital request. Requests always start out `Pending`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_request(
        &self,
        request: &NewBloodRequest,
        now: DateTime<Utc>,
    ) -> Result<BloodRequest> {
        self.conn.execute(
            r"
            INSERT INTO blood_requests (hospital_name, contact_person, contact, email,
                                        blood_group, units_requested, urgency, reason,
                                        status, requested_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                request.hospital_name,
                request.contact_person,
                request.contact,
                request.email,
                request.blood_group.as_str(),
                request.units_requested,
                request.urgency.as_str(),
                request.reason,
                RequestStatus::Pending.as_str(),
                format_timestamp(now),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted blood request with id {}", id);
        fetch_request(&self.conn, id)?.ok_or_else(|| Error::not_found("request", id))
    }

    /// Get a request by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_request(&self, id: i64) -> Result<Option<BloodRequest>> {
        fetch_request(&self.conn, id)
    }

    /// List requests newest first, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_requests(
        &self,
        status: Option<RequestStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<BloodRequest>> {
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let sql = format!(
            r"
            SELECT {REQUEST_COLUMNS} FROM blood_requests
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY requested_at DESC, id DESC
            LIMIT ?2
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let requests = stmt
            .query_map(params![status.map(RequestStatus::as_str), limit], row_to_request)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    /// Apply a processing decision to a request.
    ///
    /// The status update is guarded on the status the decision was made
    /// against, so two operators cannot both process the same request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown request and
    /// [`Error::InvalidRequestTransition`] when `action` is not allowed from
    /// the request's current status.
    pub fn process_request(
        &self,
        id: i64,
        action: RequestAction,
        now: DateTime<Utc>,
    ) -> Result<BloodRequest> {
        let tx = self.immediate_transaction()?;

        let current = fetch_request(&tx, id)?.ok_or_else(|| Error::not_found("request", id))?;
        let next = current
            .status
            .apply(action)
            .ok_or_else(|| Error::InvalidRequestTransition {
                request_id: id,
                action: action.verb(),
                status: current.status.to_string(),
            })?;

        // Only the move out of Pending is stamped.
        let processed_at = (current.status == RequestStatus::Pending).then_some(now);
        if !move_status(&tx, id, current.status, next, processed_at)? {
            let status = fetch_request(&tx, id)?.map_or(current.status, |r| r.status);
            warn!(
                request_id = id,
                action = action.verb(),
                %status,
                "Request changed while processing"
            );
            return Err(Error::InvalidRequestTransition {
                request_id: id,
                action: action.verb(),
                status: status.to_string(),
            });
        }

        let updated = fetch_request(&tx, id)?.ok_or_else(|| Error::not_found("request", id))?;
        tx.commit()?;
        Ok(updated)
    }
}

/// Move a request from `from` to `to`, only if it is still in `from`.
fn move_status(
    conn: &Connection,
    id: i64,
    from: RequestStatus,
    to: RequestStatus,
    processed_at: Option<DateTime<Utc>>,
) -> Result<bool> {
    let affected = conn.execute(
        r"
        UPDATE blood_requests
        SET status = ?1, processed_at = COALESCE(?2, processed_at)
        WHERE id = ?3 AND status = ?4
        ",
        params![to.as_str(), processed_at.map(format_timestamp), id, from.as_str()],
    )?;
    Ok(affected == 1)
}

fn fetch_request(conn: &Connection, id: i64) -> Result<Option<BloodRequest>> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM blood_requests WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], row_to_request).optional()?)
}

fn row_to_request(row: &Row<'_>) -> rusqlite::Result<BloodRequest> {
    Ok(BloodRequest {
        id: row.get(0)?,
        hospital_name: row.get(1)?,
        contact_person: row.get(2)?,
        contact: row.get(3)?,
        email: row.get(4)?,
        blood_group: enum_column(row, 5)?,
        units_requested: row.get(6)?,
        urgency: enum_column(row, 7)?,
        reason: row.get(8)?,
        status: enum_column(row, 9)?,
        requested_at: timestamp_column(row, 10)?,
        processed_at: optional_timestamp_column(row, 11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodGroup, Urgency};
    use chrono::Duration;

    fn new_request(hospital: &str) -> NewBloodRequest {
        NewBloodRequest {
            hospital_name: hospital.to_string(),
            contact_person: "Dr. Rao".to_string(),
            contact: "555-0300".to_string(),
            email: None,
            blood_group: BloodGroup::OPositive,
            units_requested: 4,
            urgency: Urgency::Urgent,
            reason: Some("surgery".to_string()),
        }
    }

    #[test]
    fn test_insert_request_is_pending() {
        let storage = Storage::open_in_memory().unwrap();
        let request = storage
            .insert_request(&new_request("St. Mary"), Utc::now())
            .unwrap();

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.units_requested, 4);
        assert_eq!(request.urgency, Urgency::Urgent);
        assert!(request.processed_at.is_none());
        assert_eq!(storage.get_request(request.id).unwrap(), Some(request));
    }

    #[test]
    fn test_list_requests_filter_and_order() {
        let storage = Storage::open_in_memory().unwrap();
        let t0 = Utc::now();
        let first = storage.insert_request(&new_request("First"), t0).unwrap();
        storage
            .insert_request(&new_request("Second"), t0 + Duration::minutes(5))
            .unwrap();
        storage
            .process_request(first.id, RequestAction::Reject, t0)
            .unwrap();

        let all = storage.list_requests(None, None).unwrap();
        let names: Vec<_> = all.iter().map(|r| r.hospital_name.as_str()).collect();
        assert_eq!(names, ["Second", "First"]);

        let pending = storage
            .list_requests(Some(RequestStatus::Pending), None)
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].hospital_name, "Second");
    }

    #[test]
    fn test_process_request_lifecycle() {
        let storage = Storage::open_in_memory().unwrap();
        let t0 = Utc::now();
        let request = storage.insert_request(&new_request("City"), t0).unwrap();

        let approved = storage
            .process_request(request.id, RequestAction::Approve, t0 + Duration::hours(1))
            .unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        let stamped = approved.processed_at.unwrap();

        let fulfilled = storage
            .process_request(request.id, RequestAction::Fulfill, t0 + Duration::hours(2))
            .unwrap();
        assert_eq!(fulfilled.status, RequestStatus::Fulfilled);
        assert_eq!(fulfilled.processed_at, Some(stamped));
    }

    #[test]
    fn test_process_request_rejects_invalid_move() {
        let storage = Storage::open_in_memory().unwrap();
        let request = storage
            .insert_request(&new_request("County"), Utc::now())
            .unwrap();

        let err = storage
            .process_request(request.id, RequestAction::Fulfill, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequestTransition { .. }));
        assert_eq!(
            storage.get_request(request.id).unwrap().unwrap().status,
            RequestStatus::Pending
        );
    }

    #[test]
    fn test_move_status_requires_expected_status() {
        let storage = Storage::open_in_memory().unwrap();
        let now = Utc::now();
        let request = storage.insert_request(&new_request("Lakeside"), now).unwrap();

        // A decision taken against a status the request already left.
        let moved = move_status(
            storage.conn(),
            request.id,
            RequestStatus::Approved,
            RequestStatus::Fulfilled,
            None,
        )
        .unwrap();
        assert!(!moved);
        let unchanged = storage.get_request(request.id).unwrap().unwrap();
        assert_eq!(unchanged.status, RequestStatus::Pending);
        assert_eq!(unchanged.processed_at, None);

        assert!(move_status(
            storage.conn(),
            request.id,
            RequestStatus::Pending,
            RequestStatus::Rejected,
            Some(now),
        )
        .unwrap());
        assert!(!move_status(
            storage.conn(),
            999,
            RequestStatus::Pending,
            RequestStatus::Approved,
            None,
        )
        .unwrap());
    }

    #[test]
    fn test_repeated_approval_is_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        let request = storage
            .insert_request(&new_request("Hilltop"), Utc::now())
            .unwrap();
        storage
            .process_request(request.id, RequestAction::Approve, Utc::now())
            .unwrap();

        let err = storage
            .process_request(request.id, RequestAction::Approve, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequestTransition { .. }));
        assert_eq!(
            storage.get_request(request.id).unwrap().unwrap().status,
            RequestStatus::Approved
        );
    }

    #[test]
    fn test_process_missing_request() {
        let storage = Storage::open_in_memory().unwrap();
        let err = storage
            .process_request(77, RequestAction::Approve, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "request", id: 77 }));
    }
}
