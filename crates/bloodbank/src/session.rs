//! Operator accounts, sign-in and expiring sessions.
//!
//! Every operation that needs an identity takes a [`SessionContext`]. A
//! context only exists after [`SessionContext::sign_in`] or
//! [`SessionContext::resume`] succeeded, so holding one means the session
//! was valid when the command started.

use std::fmt;
use std::str::FromStr;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::forms::Credentials;
use crate::models::{parse_closed, ParseEnumError};
use crate::storage::{operators, Storage};

/// Shortest password accepted for a new operator.
pub const MIN_PASSWORD_LEN: usize = 8;

/// What an operator is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Blood bank staff: workflow, inventory, request processing, operators.
    Admin,
    /// Hospital staff: request submission.
    Hospital,
}

impl Role {
    /// Every role.
    pub const ALL: [Self; 2] = [Self::Admin, Self::Hospital];

    /// The stored form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Hospital => "hospital",
        }
    }

    /// Whether this role may perform something that needs `required`.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self == Self::Admin || self == required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_closed("role", s, &Self::ALL, Self::as_str)
    }
}

/// An operator account, without its password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Row id.
    pub id: i64,
    /// Unique sign-in name.
    pub username: String,
    /// Granted role.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// A stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token.
    pub token: String,
    /// Who signed in.
    pub operator: Operator,
    /// Sign-in time.
    pub created_at: DateTime<Utc>,
    /// The session is rejected from this instant on.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is no longer usable at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Lifetime rules for sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// How long a fresh or refreshed session lasts.
    pub ttl: Duration,
    /// A session used this close to its expiry is extended.
    pub refresh_window: Duration,
}

impl SessionPolicy {
    /// Build the policy from the `[session]` configuration section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            ttl: config.session_ttl(),
            refresh_window: config.session_refresh_window(),
        }
    }
}

/// The identity an operation runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    session: Session,
}

impl SessionContext {
    /// Check credentials and open a new session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] for an unknown user or a wrong
    /// password; the two cases are not distinguished.
    pub fn sign_in(
        storage: &Storage,
        credentials: &Credentials,
        policy: SessionPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        storage.purge_expired_sessions(now)?;

        let Some(stored) = storage.find_operator_credentials(&credentials.username)? else {
            warn!(username = %credentials.username, "Sign-in for unknown operator");
            return Err(Error::InvalidCredentials);
        };
        if !verify_password(&credentials.password, &stored.password_hash) {
            warn!(username = %credentials.username, "Sign-in with wrong password");
            return Err(Error::InvalidCredentials);
        }

        let session = Session {
            token: Uuid::new_v4().to_string(),
            operator: stored.operator,
            created_at: now,
            expires_at: now + policy.ttl,
        };
        storage.insert_session(&session)?;

        info!(
            username = %session.operator.username,
            role = %session.operator.role,
            expires_at = %session.expires_at,
            "Signed in"
        );
        Ok(Self { session })
    }

    /// Pick up an existing session by token.
    ///
    /// An expired session is deleted. A session inside the refresh window
    /// has its expiry pushed to `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionMissing`] for an unknown token and
    /// [`Error::SessionExpired`] for one past its expiry.
    pub fn resume(
        storage: &Storage,
        token: &str,
        policy: SessionPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let Some(mut session) = storage.get_session(token)? else {
            return Err(Error::SessionMissing);
        };

        if session.is_expired(now) {
            storage.delete_session(token)?;
            info!(username = %session.operator.username, "Session expired");
            return Err(Error::SessionExpired);
        }

        if session.expires_at - now <= policy.refresh_window {
            session.expires_at = now + policy.ttl;
            storage.extend_session(token, session.expires_at)?;
            debug!(
                username = %session.operator.username,
                expires_at = %session.expires_at,
                "Session refreshed"
            );
        }

        Ok(Self { session })
    }

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn sign_out(self, storage: &Storage) -> Result<()> {
        storage.delete_session(&self.session.token)?;
        info!(username = %self.session.operator.username, "Signed out");
        Ok(())
    }

    /// Fail with [`Error::PermissionDenied`] unless the session's role
    /// covers `required`.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn require_role(&self, required: Role, operation: &'static str) -> Result<()> {
        if self.role().satisfies(required) {
            Ok(())
        } else {
            warn!(
                username = %self.username(),
                role = %self.role(),
                operation,
                "Permission denied"
            );
            Err(Error::permission_denied(operation, required))
        }
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The signed-in operator.
    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.session.operator
    }

    /// The signed-in operator's username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.session.operator.username
    }

    /// The signed-in operator's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.session.operator.role
    }

    /// The bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.session.token
    }

    /// When the session stops being accepted.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.session.expires_at
    }
}

/// Create an operator account.
///
/// While no operators exist, the first account may be created without a
/// session and must be an admin. After that an admin session is required.
///
/// # Errors
///
/// Returns a validation error for a blank username, a short password, or a
/// non-admin first account; an auth error when the caller may not create
/// operators; [`Error::OperatorExists`] for a taken username.
pub fn register_operator(
    storage: &Storage,
    session: Option<&SessionContext>,
    credentials: &Credentials,
    role: Role,
    now: DateTime<Utc>,
) -> Result<Operator> {
    if credentials.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    // Hash before taking the write lock.
    let hash = hash_password(&credentials.password)?;

    // The bootstrap check and the insert run under one write lock.
    let tx = storage.immediate_transaction()?;
    if operators::count_operators(&tx)? == 0 {
        if role != Role::Admin {
            return Err(Error::validation("role", "the first operator must be an admin"));
        }
        info!("Creating initial admin operator");
    } else {
        session
            .ok_or(Error::SessionMissing)?
            .require_role(Role::Admin, "operator management")?;
    }
    let operator = operators::insert_operator(&tx, &credentials.username, role, &hash, now)?;
    tx.commit()?;

    info!(username = %operator.username, role = %operator.role, "Operator created");
    Ok(operator)
}

/// Argon2id hash of `password` as a PHC string.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}
