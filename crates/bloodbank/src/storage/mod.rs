//! Storage layer for bloodbank.
//!
//! This module provides `SQLite`-based persistent storage for donors, their
//! screening and donation records, hospital requests, the blood inventory,
//! and the operator accounts and sessions that guard them.

pub(crate) mod donors;
mod inventory;
pub mod migrations;
pub(crate) mod operators;
mod requests;
pub mod schema;

pub use donors::DonorQuery;
pub use operators::OperatorCredentials;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, SubsecRound, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{DonationStatus, DonorStatus, ParseEnumError, RequestStatus};

/// Storage engine for the blood bank.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Donor registration, search and history
/// - Workflow transitions inside immediate transactions
/// - Hospital request intake and processing
/// - Per-group inventory counts
/// - Operator accounts and expiring sessions
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction that takes the database write lock up front.
    ///
    /// A second writer blocks (up to the busy timeout) instead of reading
    /// state that is about to change underneath it.
    pub(crate) fn immediate_transaction(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Aggregate counts for the admin dashboard.
    ///
    /// The monthly figure counts successful donations since the first day of
    /// `now`'s calendar month (UTC).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };
        let donors_in = |status: DonorStatus| -> Result<i64> {
            Ok(self.conn.query_row(
                "SELECT COUNT(*) FROM donors WHERE status = ?1",
                [status.as_str()],
                |row| row.get(0),
            )?)
        };

        let pending_requests: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM blood_requests WHERE status = ?1",
            [RequestStatus::Pending.as_str()],
            |row| row.get(0),
        )?;

        let donations_this_month: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM donations WHERE status = ?1 AND donation_date >= ?2",
            params![
                DonationStatus::Success.as_str(),
                format_timestamp(start_of_month(now)?)
            ],
            |row| row.get(0),
        )?;

        Ok(DashboardStats {
            total_donors: count("SELECT COUNT(*) FROM donors")?,
            eligible_donors: donors_in(DonorStatus::Eligible)?,
            in_screening_queue: donors_in(DonorStatus::InScreeningQueue)?,
            ready_for_collection: donors_in(DonorStatus::ReadyForCollection)?,
            total_donations: count("SELECT COUNT(*) FROM donations")?,
            donations_this_month,
            total_collected_ml: count("SELECT COALESCE(SUM(quantity_ml), 0) FROM donations")?,
            pending_requests,
            total_units_available: count(
                "SELECT COALESCE(SUM(units_available), 0) FROM blood_inventory",
            )?,
        })
    }
}

/// Figures shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Registered donors in any status.
    pub total_donors: i64,
    /// Donors currently `Eligible`.
    pub eligible_donors: i64,
    /// Donors waiting for screening.
    pub in_screening_queue: i64,
    /// Donors waiting for collection.
    pub ready_for_collection: i64,
    /// Recorded donations.
    pub total_donations: i64,
    /// Successful donations in the current calendar month.
    pub donations_this_month: i64,
    /// Sum of recorded donation volumes.
    pub total_collected_ml: i64,
    /// Hospital requests not yet processed.
    pub pending_requests: i64,
    /// Units across all blood groups.
    pub total_units_available: i64,
}

/// The current time at the precision timestamp columns keep.
///
/// Values built from it compare equal to what a later read returns.
#[must_use]
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Midnight UTC on the first day of `now`'s month.
fn start_of_month(now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| Error::internal(format!("no month start for {now}")))
}

/// Format a timestamp the way every timestamp column stores it.
///
/// Fixed-width microsecond precision keeps text ordering equal to time ordering.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read a timestamp column.
pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

/// Read a nullable timestamp column.
pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

/// Read a column holding the display string of a model enum.
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodGroup, Gender, NewDonor};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_open_in_memory() {
        let storage = create_test_storage();
        assert_eq!(storage.path(), Path::new(":memory:"));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!(
            "bloodbank-storage-test-{}",
            std::process::id()
        ));
        let db_path = dir.join("nested").join("bank.db");
        let _ = std::fs::remove_dir_all(&dir);

        {
            let storage = Storage::open(&db_path).unwrap();
            assert_eq!(storage.path(), db_path.as_path());
            assert_eq!(storage.list_inventory().unwrap().len(), 8);
        }
        assert!(db_path.exists());

        // Reopening keeps data and does not reseed.
        let storage = Storage::open(&db_path).unwrap();
        assert_eq!(storage.list_inventory().unwrap().len(), 8);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_dashboard_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.dashboard_stats(Utc::now()).unwrap();
        assert_eq!(stats, DashboardStats::default());
    }

    #[test]
    fn test_dashboard_stats_counts_donors() {
        let storage = create_test_storage();
        let now = Utc::now();
        for name in ["Ann", "Bob"] {
            storage
                .insert_donor(
                    &NewDonor {
                        name: name.to_string(),
                        age: 30,
                        gender: Gender::Other,
                        blood_group: BloodGroup::ONegative,
                        contact: "555-0100".to_string(),
                        email: None,
                        address: None,
                    },
                    now,
                )
                .unwrap();
        }
        storage
            .set_inventory_units(BloodGroup::APositive, 7, now)
            .unwrap();

        let stats = storage.dashboard_stats(Utc::now()).unwrap();
        assert_eq!(stats.total_donors, 2);
        assert_eq!(stats.eligible_donors, 2);
        assert_eq!(stats.in_screening_queue, 0);
        assert_eq!(stats.total_units_available, 7);
    }

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_dashboard_counts_donations_this_month() {
        let storage = create_test_storage();
        let registered = at("2024-01-02T08:00:00Z");
        let donor = storage
            .insert_donor(
                &NewDonor {
                    name: "Cleo".to_string(),
                    age: 40,
                    gender: Gender::Female,
                    blood_group: BloodGroup::BPositive,
                    contact: "555-0101".to_string(),
                    email: None,
                    address: None,
                },
                registered,
            )
            .unwrap();

        for (status, date) in [
            ("Success", "2024-02-29T23:59:59.999999Z"),
            ("Success", "2024-03-01T00:00:00.000000Z"),
            ("Success", "2024-03-14T12:00:00.000000Z"),
            ("Failed", "2024-03-15T12:00:00.000000Z"),
        ] {
            storage
                .conn()
                .execute(
                    "INSERT INTO donations (donor_id, blood_group, quantity_ml, status, donation_date)
                     VALUES (?1, 'B+', 450, ?2, ?3)",
                    params![donor.id, status, date],
                )
                .unwrap();
        }

        let stats = storage.dashboard_stats(at("2024-03-20T09:00:00Z")).unwrap();
        assert_eq!(stats.total_donations, 4);
        assert_eq!(stats.donations_this_month, 2);
        assert_eq!(stats.total_collected_ml, 1800);
    }

    #[test]
    fn test_start_of_month() {
        assert_eq!(
            start_of_month(at("2024-12-31T23:59:59Z")).unwrap(),
            at("2024-12-01T00:00:00Z")
        );
    }

    #[test]
    fn test_format_timestamp_round_trips() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T10:15:30.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let text = format_timestamp(ts);
        assert_eq!(text, "2024-03-01T10:15:30.123456Z");

        let conn = Connection::open_in_memory().unwrap();
        let parsed = conn
            .query_row("SELECT ?1", [&text], |row| timestamp_column(row, 0))
            .unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_enum_column_rejects_unknown_value() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 'Lost'", [], |row| {
            enum_column::<DonorStatus>(row, 0)
        });
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(0, Type::Text, _))
        ));
    }

    #[test]
    fn test_optional_timestamp_column_null() {
        let conn = Connection::open_in_memory().unwrap();
        let parsed = conn
            .query_row("SELECT NULL", [], |row| optional_timestamp_column(row, 0))
            .unwrap();
        assert!(parsed.is_none());
    }
}
