//! The contract the client core relies on: auth, record CRUD against the
//! `tasks` and `task_checklists` collections, and a per-user change channel.
//!
//! Every call is one synchronous round-trip. The client never assumes more than
//! what is written here; [`crate::store::Store`] is the implementation shipped
//! with the binary.

pub mod feed;
#[cfg(test)]
pub mod testing;

use thiserror::Error;

use crate::store::{
    ChecklistItem, ChecklistPatch, NewTask, Session, Task, TaskPatch,
};

pub use feed::{Feed, Subscription};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("an account already exists for {0}")]
    EmailTaken(String),
    #[error("invalid email or password")]
    InvalidCredentials,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{what} '{id}' not found")]
    NotFound { what: &'static str, id: String },
    #[error("not signed in")]
    Unauthenticated,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn not_found(what: &'static str, id: &str) -> Self {
        BackendError::NotFound {
            what,
            id: id.to_string(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Tasks,
    Checklist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Another connection committed; the exact rows are unknown.
    External,
}

/// A realtime notification. Only used as a refetch trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: Table,
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

pub type ChangeSubscription = Subscription<ChangeEvent>;
pub type AuthSubscription = Subscription<AuthEvent>;

pub trait Backend {
    // ── Auth ──

    fn current_session(&self) -> BackendResult<Option<Session>>;
    fn sign_up(&self, email: &str, password: &str) -> BackendResult<Session>;
    fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session>;
    fn sign_out(&self) -> BackendResult<()>;
    /// Extend the current session. `None` when nobody is signed in.
    fn refresh_session(&self) -> BackendResult<Option<Session>>;
    fn on_auth_state_change(&self) -> AuthSubscription;

    // ── Tasks ──

    /// All tasks owned by `user_id`, ordered by `order` ascending.
    fn list_tasks(&self, user_id: &str) -> BackendResult<Vec<Task>>;
    fn get_task(&self, id: &str) -> BackendResult<Option<Task>>;
    fn insert_task(&self, user_id: &str, task: &NewTask) -> BackendResult<Task>;
    fn update_task(&self, id: &str, patch: &TaskPatch) -> BackendResult<()>;
    fn delete_task(&self, id: &str) -> BackendResult<()>;

    // ── Checklist items ──

    fn list_checklist(&self, task_id: &str) -> BackendResult<Vec<ChecklistItem>>;
    fn insert_checklist_item(
        &self,
        task_id: &str,
        title: &str,
        order: i64,
    ) -> BackendResult<ChecklistItem>;
    fn update_checklist_item(&self, id: &str, patch: &ChecklistPatch) -> BackendResult<()>;
    fn delete_checklist_item(&self, id: &str) -> BackendResult<()>;

    // ── Realtime ──

    /// Change notifications for every row owned by `user_id`.
    fn subscribe_tasks(&self, user_id: &str) -> BackendResult<ChangeSubscription>;

    /// Surface commits made outside this handle as change events.
    fn poll_remote_changes(&self) -> BackendResult<()> {
        Ok(())
    }
}
