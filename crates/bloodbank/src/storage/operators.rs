//! Operator accounts and their sessions.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::debug;

use super::{enum_column, format_timestamp, timestamp_column, Storage};
use crate::error::{Error, Result};
use crate::session::{Operator, Role, Session};

/// An operator together with the stored password material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorCredentials {
    /// The account.
    pub operator: Operator,
    /// PHC-format password hash.
    pub password_hash: String,
}

impl Storage {
    /// Number of operator accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn operator_count(&self) -> Result<i64> {
        count_operators(&self.conn)
    }

    /// Create an operator account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperatorExists`] if the username is taken.
    pub fn insert_operator(
        &self,
        username: &str,
        role: Role,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Operator> {
        insert_operator(&self.conn, username, role, password_hash, now)
    }

    /// Look up an operator and its password material by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_operator_credentials(&self, username: &str) -> Result<Option<OperatorCredentials>> {
        Ok(self
            .conn
            .query_row(
                r"
                SELECT id, username, role, created_at, password_hash
                FROM operators WHERE username = ?1
                ",
                [username],
                |row| {
                    Ok(OperatorCredentials {
                        operator: row_to_operator(row)?,
                        password_hash: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (token, operator_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                session.operator.id,
                format_timestamp(session.created_at),
                format_timestamp(session.expires_at),
            ],
        )?;
        Ok(())
    }

    /// Load a session and its operator by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        Ok(self
            .conn
            .query_row(
                r"
                SELECT o.id, o.username, o.role, o.created_at,
                       s.token, s.created_at, s.expires_at
                FROM sessions s JOIN operators o ON o.id = s.operator_id
                WHERE s.token = ?1
                ",
                [token],
                |row| {
                    Ok(Session {
                        operator: row_to_operator(row)?,
                        token: row.get(4)?,
                        created_at: timestamp_column(row, 5)?,
                        expires_at: timestamp_column(row, 6)?,
                    })
                },
            )
            .optional()?)
    }

    /// Move a session's expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn extend_session(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE sessions SET expires_at = ?1 WHERE token = ?2",
            params![format_timestamp(expires_at), token],
        )?;
        Ok(())
    }

    /// Delete a session. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM sessions WHERE token = ?1", [token])?;
        Ok(affected > 0)
    }

    /// Delete every session that expired at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [format_timestamp(now)],
        )?;
        if affected > 0 {
            debug!("Purged {} expired sessions", affected);
        }
        Ok(affected)
    }
}

pub(crate) fn count_operators(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM operators", [], |row| row.get(0))?)
}

pub(crate) fn insert_operator(
    conn: &Connection,
    username: &str,
    role: Role,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<Operator> {
    let inserted = conn.execute(
        r"
        INSERT INTO operators (username, role, password_hash, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ",
        params![username, role.as_str(), password_hash, format_timestamp(now)],
    );

    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            return Err(Error::OperatorExists {
                username: username.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    debug!("Inserted operator {} with id {}", username, id);
    Ok(Operator {
        id,
        username: username.to_string(),
        role,
        created_at: now,
    })
}

fn row_to_operator(row: &Row<'_>) -> rusqlite::Result<Operator> {
    Ok(Operator {
        id: row.get(0)?,
        username: row.get(1)?,
        role: enum_column(row, 2)?,
        created_at: timestamp_column(row, 3)?,
    })
}
