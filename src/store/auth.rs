use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::Store;
use super::models::{Session, User};
use crate::backend::{AuthError, BackendResult};

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let valid = EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email));
    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl Store {
    /// The persisted session, if any and not yet expired.
    pub fn read_session(&self) -> BackendResult<Option<Session>> {
        let row = self
            .conn
            .query_row(
                "SELECT s.user_id, u.email, s.access_token, s.expires_at
                 FROM auth_sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, email, access_token, expires_at)) = row else {
            return Ok(None);
        };
        let Ok(expires_at) = DateTime::parse_from_rfc3339(&expires_at) else {
            tracing::warn!(%expires_at, "discarding session with unreadable expiry");
            return Ok(None);
        };
        let session = Session {
            user: User { id: user_id, email },
            access_token,
            expires_at: expires_at.with_timezone(&Utc),
        };
        if session.is_expired(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn register_user(&self, email: &str, password: &str) -> BackendResult<Session> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_password(password)?;

        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        if exists {
            return Err(AuthError::EmailTaken(email).into());
        }

        let id = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO users (id, email, password_hash, salt) VALUES (?1, ?2, ?3, ?4)",
            params![id, email, hash_password(&salt, password), salt],
        )?;
        tracing::info!(user = %id, "registered user");

        self.issue_session(User { id, email })
    }

    pub fn authenticate(&self, email: &str, password: &str) -> BackendResult<Session> {
        let email = normalize_email(email);
        let row = self
            .conn
            .query_row(
                "SELECT id, password_hash, salt FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, stored, salt)) if hash_password(&salt, password) == stored => {
                self.issue_session(User { id, email })
            }
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    pub fn clear_session(&self) -> BackendResult<()> {
        self.conn.execute("DELETE FROM auth_sessions", [])?;
        Ok(())
    }

    /// Rotate the access token and push the expiry out by one TTL.
    pub fn extend_session(&self) -> BackendResult<Option<Session>> {
        match self.read_session()? {
            Some(session) => self.issue_session(session.user).map(Some),
            None => Ok(None),
        }
    }

    fn issue_session(&self, user: User) -> BackendResult<Session> {
        let session = Session {
            user,
            access_token: Uuid::new_v4().simple().to_string(),
            expires_at: Utc::now() + self.session_ttl,
        };
        self.conn.execute(
            "INSERT INTO auth_sessions (id, user_id, access_token, expires_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                access_token = excluded.access_token,
                expires_at = excluded.expires_at",
            params![
                session.user.id,
                session.access_token,
                session.expires_at.to_rfc3339()
            ],
        )?;
        Ok(session)
    }
}
