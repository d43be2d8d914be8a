//! Donor rows and the screening and donation records attached to them.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{
    enum_column, format_timestamp, optional_timestamp_column, timestamp_column, Storage,
};
use crate::error::{Error, Result};
use crate::models::{
    Donation, DonationStatus, Donor, DonorDetails, DonorStatus, NewDonor, ScreeningRecord,
    ScreeningResult,
};
use crate::workflow::{CollectionInput, ScreeningInput};

const DONOR_COLUMNS: &str = "id, name, age, gender, blood_group, contact, email, address, \
     status, last_donation_date, created_at, updated_at";

/// Filters for the donor list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonorQuery {
    /// Case-insensitive match on name or contact, or an exact donor id.
    pub search: Option<String>,
    /// Only donors in this status.
    pub status: Option<DonorStatus>,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
}

impl Storage {
    /// Register a donor. The donor always starts out `Eligible`.
    ///
    /// Duplicate names and contacts are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_donor(&self, donor: &NewDonor, now: DateTime<Utc>) -> Result<Donor> {
        let stamp = format_timestamp(now);
        self.conn.execute(
            r"
            INSERT INTO donors (name, age, gender, blood_group, contact, email, address,
                                status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ",
            params![
                donor.name,
                donor.age,
                donor.gender.as_str(),
                donor.blood_group.as_str(),
                donor.contact,
                donor.email,
                donor.address,
                DonorStatus::Eligible.as_str(),
                stamp,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted donor with id {}", id);
        require_donor(&self.conn, id)
    }

    /// Get a donor by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_donor(&self, id: i64) -> Result<Option<Donor>> {
        fetch_donor(&self.conn, id)
    }

    /// List donors, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_donors(&self, query: &DonorQuery) -> Result<Vec<Donor>> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let pattern = search.map(|s| format!("%{}%", escape_like(s)));
        let id_match = search.and_then(|s| s.parse::<i64>().ok());
        let status = query.status.map(DonorStatus::as_str);
        let limit = query
            .limit
            .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let sql = format!(
            r"
            SELECT {DONOR_COLUMNS} FROM donors
            WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR contact LIKE ?1 ESCAPE '\' OR id = ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY created_at DESC, id DESC
            LIMIT ?4
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let donors = stmt
            .query_map(params![pattern, id_match, status, limit], row_to_donor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(donors)
    }

    /// A donor with its full donation and screening history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the donor does not exist.
    pub fn donor_details(&self, id: i64) -> Result<DonorDetails> {
        let donor = require_donor(&self.conn, id)?;

        let mut stmt = self.conn.prepare(
            r"
            SELECT id, donor_id, blood_group, quantity_ml, status, notes, donation_date
            FROM donations WHERE donor_id = ?1
            ORDER BY donation_date DESC, id DESC
            ",
        )?;
        let donations = stmt
            .query_map([id], row_to_donation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            r"
            SELECT id, donor_id, blood_pressure, hemoglobin, weight, temperature, pulse,
                   screening_result, notes, screened_by, screened_at
            FROM screening_records WHERE donor_id = ?1
            ORDER BY screened_at DESC, id DESC
            ",
        )?;
        let screenings = stmt
            .query_map([id], row_to_screening)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(DonorDetails {
            donor,
            donations,
            screenings,
        })
    }
}

/// Escape `LIKE` wildcards so the term matches literally under `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn fetch_donor(conn: &Connection, id: i64) -> Result<Option<Donor>> {
    let sql = format!("SELECT {DONOR_COLUMNS} FROM donors WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], row_to_donor).optional()?)
}

pub(crate) fn require_donor(conn: &Connection, id: i64) -> Result<Donor> {
    fetch_donor(conn, id)?.ok_or_else(|| Error::not_found("donor", id))
}

/// Move a donor from `from` to `to`, only if it is still in `from`.
///
/// Returns `false` when no row matched, meaning the donor is missing or
/// already left `from`.
pub(crate) fn advance_status(
    conn: &Connection,
    id: i64,
    from: DonorStatus,
    to: DonorStatus,
    now: DateTime<Utc>,
    last_donation: Option<DateTime<Utc>>,
) -> Result<bool> {
    let affected = conn.execute(
        r"
        UPDATE donors
        SET status = ?1,
            updated_at = ?2,
            last_donation_date = COALESCE(?3, last_donation_date)
        WHERE id = ?4 AND status = ?5
        ",
        params![
            to.as_str(),
            format_timestamp(now),
            last_donation.map(format_timestamp),
            id,
            from.as_str(),
        ],
    )?;
    Ok(affected == 1)
}

/// Set a donor's status unconditionally.
pub(crate) fn overwrite_status(
    conn: &Connection,
    id: i64,
    status: DonorStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE donors SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), format_timestamp(now), id],
    )?;
    Ok(affected == 1)
}

pub(crate) fn insert_screening(
    conn: &Connection,
    donor_id: i64,
    input: &ScreeningInput,
    result: ScreeningResult,
    screened_by: &str,
    now: DateTime<Utc>,
) -> Result<ScreeningRecord> {
    conn.execute(
        r"
        INSERT INTO screening_records (donor_id, blood_pressure, hemoglobin, weight,
                                       temperature, pulse, screening_result, notes,
                                       screened_by, screened_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ",
        params![
            donor_id,
            input.blood_pressure,
            input.hemoglobin,
            input.weight,
            input.temperature,
            input.pulse,
            result.as_str(),
            input.notes,
            screened_by,
            format_timestamp(now),
        ],
    )?;

    Ok(ScreeningRecord {
        id: conn.last_insert_rowid(),
        donor_id,
        blood_pressure: input.blood_pressure.clone(),
        hemoglobin: input.hemoglobin,
        weight: input.weight,
        temperature: input.temperature,
        pulse: input.pulse,
        result,
        notes: input.notes.clone(),
        screened_by: screened_by.to_string(),
        screened_at: now,
    })
}

pub(crate) fn insert_donation(
    conn: &Connection,
    donor: &Donor,
    input: &CollectionInput,
    status: DonationStatus,
    now: DateTime<Utc>,
) -> Result<Donation> {
    conn.execute(
        r"
        INSERT INTO donations (donor_id, blood_group, quantity_ml, status, notes,
                               donation_date, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ",
        params![
            donor.id,
            donor.blood_group.as_str(),
            input.quantity_ml,
            status.as_str(),
            input.notes,
            format_timestamp(now),
        ],
    )?;

    Ok(Donation {
        id: conn.last_insert_rowid(),
        donor_id: donor.id,
        blood_group: donor.blood_group,
        quantity_ml: input.quantity_ml,
        status,
        notes: input.notes.clone(),
        donation_date: now,
    })
}

fn row_to_donor(row: &Row<'_>) -> rusqlite::Result<Donor> {
    Ok(Donor {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: enum_column(row, 3)?,
        blood_group: enum_column(row, 4)?,
        contact: row.get(5)?,
        email: row.get(6)?,
        address: row.get(7)?,
        status: enum_column(row, 8)?,
        last_donation_date: optional_timestamp_column(row, 9)?,
        created_at: timestamp_column(row, 10)?,
        updated_at: timestamp_column(row, 11)?,
    })
}

fn row_to_donation(row: &Row<'_>) -> rusqlite::Result<Donation> {
    Ok(Donation {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        blood_group: enum_column(row, 2)?,
        quantity_ml: row.get(3)?,
        status: enum_column(row, 4)?,
        notes: row.get(5)?,
        donation_date: timestamp_column(row, 6)?,
    })
}

fn row_to_screening(row: &Row<'_>) -> rusqlite::Result<ScreeningRecord> {
    Ok(ScreeningRecord {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        blood_pressure: row.get(2)?,
        hemoglobin: row.get(3)?,
        weight: row.get(4)?,
        temperature: row.get(5)?,
        pulse: row.get(6)?,
        result: enum_column(row, 7)?,
        notes: row.get(8)?,
        screened_by: row.get(9)?,
        screened_at: timestamp_column(row, 10)?,
    })
}
