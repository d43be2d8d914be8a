//! `SQLite` schema definitions for bloodbank.
//!
//! Enum-valued columns hold the display strings of the matching model enums.
//! Timestamps are RFC 3339 text in UTC.

/// SQL statement to create the donors table.
pub const CREATE_DONORS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS donors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    gender TEXT NOT NULL,
    blood_group TEXT NOT NULL,
    contact TEXT NOT NULL,
    email TEXT,
    address TEXT,
    status TEXT NOT NULL DEFAULT 'Eligible',
    last_donation_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the donations table.
pub const CREATE_DONATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS donations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    donor_id INTEGER NOT NULL REFERENCES donors(id),
    blood_group TEXT NOT NULL,
    quantity_ml INTEGER NOT NULL,
    status TEXT NOT NULL,
    notes TEXT,
    donation_date TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the screening records table.
pub const CREATE_SCREENING_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS screening_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    donor_id INTEGER NOT NULL REFERENCES donors(id),
    blood_pressure TEXT NOT NULL,
    hemoglobin REAL NOT NULL,
    weight REAL NOT NULL,
    temperature REAL NOT NULL,
    pulse INTEGER NOT NULL,
    screening_result TEXT NOT NULL,
    notes TEXT,
    screened_by TEXT NOT NULL,
    screened_at TEXT NOT NULL
)
";

/// SQL statement to create the blood inventory table.
pub const CREATE_BLOOD_INVENTORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS blood_inventory (
    blood_group TEXT PRIMARY KEY,
    units_available INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT
)
";

/// SQL statement to create the blood requests table.
pub const CREATE_BLOOD_REQUESTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS blood_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hospital_name TEXT NOT NULL,
    contact_person TEXT NOT NULL,
    contact TEXT NOT NULL,
    email TEXT,
    blood_group TEXT NOT NULL,
    units_requested INTEGER NOT NULL,
    urgency TEXT NOT NULL DEFAULT 'Normal',
    reason TEXT,
    status TEXT NOT NULL DEFAULT 'Pending',
    requested_at TEXT NOT NULL,
    processed_at TEXT
)
";

/// SQL statement to create the operators table.
pub const CREATE_OPERATORS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS operators (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the sessions table.
pub const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    operator_id INTEGER NOT NULL REFERENCES operators(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
)
";

/// Index for the donor list's status filter.
pub const CREATE_DONOR_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_donors_status ON donors(status)
";

/// Index for a donor's donation history.
pub const CREATE_DONATION_DONOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_donations_donor ON donations(donor_id, donation_date DESC)
";

/// Index for a donor's screening history.
pub const CREATE_SCREENING_DONOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_screenings_donor ON screening_records(donor_id, screened_at DESC)
";

/// Index for the request list's status filter.
pub const CREATE_REQUEST_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_requests_status ON blood_requests(status)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DONORS_TABLE,
    CREATE_DONATIONS_TABLE,
    CREATE_SCREENING_RECORDS_TABLE,
    CREATE_BLOOD_INVENTORY_TABLE,
    CREATE_BLOOD_REQUESTS_TABLE,
    CREATE_OPERATORS_TABLE,
    CREATE_SESSIONS_TABLE,
    CREATE_DONOR_STATUS_INDEX,
    CREATE_DONATION_DONOR_INDEX,
    CREATE_SCREENING_DONOR_INDEX,
    CREATE_REQUEST_STATUS_INDEX,
    CREATE_METADATA_TABLE,
];
