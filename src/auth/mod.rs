//! Session mirror and the sign-in/sign-up form.

use chrono::{DateTime, Duration, Utc};

use crate::backend::{AuthEventKind, AuthSubscription, Backend, BackendResult};
use crate::store::{self, Session, User};

/// Refresh the token once it is this close to expiring.
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Shortest session lifetime accepted. Anything at or below the refresh
/// margin would rotate the token on every loop turn.
pub const MIN_SESSION_TTL_MINUTES: i64 = 2 * REFRESH_MARGIN_MINUTES;

/// Mirrors the backend's session and owns the one auth subscription.
pub struct AuthGate {
    session: Option<Session>,
    events: AuthSubscription,
    refresh_margin: Duration,
}

impl AuthGate {
    pub fn new(backend: &dyn Backend) -> BackendResult<Self> {
        let events = backend.on_auth_state_change();
        let session = backend.current_session()?;
        tracing::debug!(signed_in = session.is_some(), "auth gate ready");
        Ok(AuthGate {
            session,
            events,
            refresh_margin: Duration::minutes(REFRESH_MARGIN_MINUTES),
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    /// Apply pending auth events. Returns true when the signed-in user changed.
    pub fn poll(&mut self) -> bool {
        let before = self.user().map(|u| u.id.clone());
        for event in self.events.drain() {
            match event.kind {
                AuthEventKind::SignedIn | AuthEventKind::TokenRefreshed => {
                    self.session = event.session;
                }
                AuthEventKind::SignedOut => self.session = None,
            }
        }
        before != self.user().map(|u| u.id.clone())
    }

    /// Keep the session alive: refresh near expiry, drop it once expired.
    pub fn maintain(&mut self, backend: &dyn Backend, now: DateTime<Utc>) {
        let Some(ref session) = self.session else {
            return;
        };
        if session.is_expired(now) {
            tracing::info!(user = %session.user.id, "session expired");
            self.session = None;
            return;
        }
        if session.expires_at - now > self.refresh_margin {
            return;
        }
        match backend.refresh_session() {
            Ok(refreshed) => self.session = refreshed,
            Err(e) => tracing::warn!("session refresh failed: {e}"),
        }
    }

    pub fn sign_out(&mut self, backend: &dyn Backend) {
        if let Err(e) = backend.sign_out() {
            tracing::error!("sign out failed: {e}");
        }
        self.session = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthField {
    #[default]
    Email,
    Password,
}

/// Login/register form. Errors are shown inline and keep the form open.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub field: AuthField,
    pub email: String,
    pub password: String,
    pub error: Option<String>,
}

impl AuthForm {
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.error = None;
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            AuthField::Email => AuthField::Password,
            AuthField::Password => AuthField::Email,
        };
    }

    pub fn active_input(&mut self) -> &mut String {
        match self.field {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    pub fn submit(&mut self, backend: &dyn Backend) -> Option<Session> {
        let email = self.email.trim().to_string();
        if email.is_empty() || self.password.is_empty() {
            self.error = Some("Email and password are required".into());
            return None;
        }
        if self.mode == AuthMode::Register {
            let checked = store::validate_email(&email)
                .and_then(|()| store::validate_password(&self.password));
            if let Err(e) = checked {
                self.error = Some(e.to_string());
                return None;
            }
        }

        let result = match self.mode {
            AuthMode::Login => backend.sign_in(&email, &self.password),
            AuthMode::Register => backend.sign_up(&email, &self.password),
        };
        match result {
            Ok(session) => {
                *self = AuthForm::default();
                Some(session)
            }
            Err(e) => {
                tracing::warn!(mode = ?self.mode, "authentication failed: {e}");
                self.error = Some(e.to_string());
                self.password.clear();
                None
            }
        }
    }
}
