mod auth;
mod models;
mod queries;

pub use auth::{MIN_PASSWORD_LEN, validate_email, validate_password};
pub use models::*;
pub use queries::TaskStats;

use std::cell::{Cell, RefCell};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Duration;
use rusqlite::Connection;

use crate::auth::MIN_SESSION_TTL_MINUTES;
use crate::backend::{
    AuthEvent, AuthEventKind, AuthSubscription, Backend, BackendResult, ChangeEvent, ChangeKind,
    ChangeSubscription, Feed, Table,
};

/// SQLite-backed implementation of the backend contract.
///
/// Several processes may open the same database file (the TUI and one-shot CLI
/// commands); commits from the others surface through
/// [`Backend::poll_remote_changes`].
pub struct Store {
    conn: Connection,
    session_ttl: Duration,
    changes: Feed<ChangeEvent>,
    auth_events: Feed<AuthEvent>,
    data_version: Cell<i64>,
    last_session: RefCell<Option<Session>>,
}

impl Store {
    pub fn open(db_path: &Path, session_ttl: Duration) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn, session_ttl)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self::with_connection(conn, Duration::minutes(60))?;
        store.migrate()?;
        Ok(store)
    }

    fn with_connection(conn: Connection, session_ttl: Duration) -> Result<Self> {
        let floor = Duration::minutes(MIN_SESSION_TTL_MINUTES);
        let session_ttl = if session_ttl < floor {
            tracing::warn!(
                requested = session_ttl.num_minutes(),
                "session ttl must exceed the refresh margin, using {MIN_SESSION_TTL_MINUTES} minutes"
            );
            floor
        } else {
            session_ttl
        };
        Ok(Store {
            conn,
            session_ttl,
            changes: Feed::new(),
            auth_events: Feed::new(),
            data_version: Cell::new(0),
            last_session: RefCell::new(None),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS auth_sessions (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                access_token TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT,
                due_date TEXT,
                priority INTEGER NOT NULL DEFAULT 2,
                completed INTEGER NOT NULL DEFAULT 0,
                "order" INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_user_order ON tasks (user_id, "order");

            CREATE TABLE IF NOT EXISTS task_checklists (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                "order" INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        self.data_version.set(self.read_data_version()?);
        *self.last_session.borrow_mut() = self.read_session()?;
        Ok(())
    }

    pub fn change_subscriber_count(&self) -> usize {
        self.changes.subscriber_count()
    }

    pub fn auth_subscriber_count(&self) -> usize {
        self.auth_events.subscriber_count()
    }

    fn read_data_version(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))
    }

    fn notify_change(&self, user_id: &str, kind: ChangeKind, table: Table, record_id: &str) {
        self.changes.publish(
            user_id,
            &ChangeEvent {
                kind,
                table,
                record_id: Some(record_id.to_string()),
            },
        );
    }

    fn notify_auth(&self, kind: AuthEventKind, session: Option<Session>) {
        self.last_session.replace(session.clone());
        tracing::info!(event = ?kind, "auth state changed");
        self.auth_events.broadcast(&AuthEvent { kind, session });
    }
}

impl Backend for Store {
    fn current_session(&self) -> BackendResult<Option<Session>> {
        Ok(self.read_session()?)
    }

    fn sign_up(&self, email: &str, password: &str) -> BackendResult<Session> {
        let session = self.register_user(email, password)?;
        self.notify_auth(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let session = self.authenticate(email, password)?;
        self.notify_auth(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    fn sign_out(&self) -> BackendResult<()> {
        self.clear_session()?;
        self.notify_auth(AuthEventKind::SignedOut, None);
        Ok(())
    }

    fn refresh_session(&self) -> BackendResult<Option<Session>> {
        let refreshed = self.extend_session()?;
        if let Some(ref session) = refreshed {
            self.notify_auth(AuthEventKind::TokenRefreshed, Some(session.clone()));
        }
        Ok(refreshed)
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.auth_events.subscribe(None)
    }

    fn list_tasks(&self, user_id: &str) -> BackendResult<Vec<Task>> {
        Ok(self.list_tasks_for_user(user_id)?)
    }

    fn get_task(&self, id: &str) -> BackendResult<Option<Task>> {
        Ok(self.find_task(id)?)
    }

    fn insert_task(&self, user_id: &str, task: &NewTask) -> BackendResult<Task> {
        let created = self.create_task(user_id, task)?;
        self.notify_change(user_id, ChangeKind::Insert, Table::Tasks, &created.id);
        Ok(created)
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> BackendResult<()> {
        let owner = self.task_owner(id)?;
        self.apply_task_patch(id, patch)?;
        self.notify_change(&owner, ChangeKind::Update, Table::Tasks, id);
        Ok(())
    }

    fn delete_task(&self, id: &str) -> BackendResult<()> {
        let owner = self.task_owner(id)?;
        self.remove_task(id)?;
        self.notify_change(&owner, ChangeKind::Delete, Table::Tasks, id);
        Ok(())
    }

    fn list_checklist(&self, task_id: &str) -> BackendResult<Vec<ChecklistItem>> {
        Ok(self.list_checklist_for_task(task_id)?)
    }

    fn insert_checklist_item(
        &self,
        task_id: &str,
        title: &str,
        order: i64,
    ) -> BackendResult<ChecklistItem> {
        let owner = self.task_owner(task_id)?;
        let item = self.create_checklist_item(task_id, title, order)?;
        self.notify_change(&owner, ChangeKind::Insert, Table::Checklist, &item.id);
        Ok(item)
    }

    fn update_checklist_item(&self, id: &str, patch: &ChecklistPatch) -> BackendResult<()> {
        let owner = self.checklist_owner(id)?;
        self.apply_checklist_patch(id, patch)?;
        self.notify_change(&owner, ChangeKind::Update, Table::Checklist, id);
        Ok(())
    }

    fn delete_checklist_item(&self, id: &str) -> BackendResult<()> {
        let owner = self.checklist_owner(id)?;
        self.remove_checklist_item(id)?;
        self.notify_change(&owner, ChangeKind::Delete, Table::Checklist, id);
        Ok(())
    }

    fn subscribe_tasks(&self, user_id: &str) -> BackendResult<ChangeSubscription> {
        Ok(self.changes.subscribe(Some(user_id)))
    }

    fn poll_remote_changes(&self) -> BackendResult<()> {
        let version = self.read_data_version()?;
        if version == self.data_version.get() {
            return Ok(());
        }
        self.data_version.set(version);
        tracing::debug!(version, "external commit detected");

        self.changes.broadcast(&ChangeEvent {
            kind: ChangeKind::External,
            table: Table::Tasks,
            record_id: None,
        });

        // Sign-in/out performed by another process shows up as a token change.
        let session = self.read_session()?;
        let kind = {
            let previous = self.last_session.borrow();
            match (previous.as_ref(), session.as_ref()) {
                (None, None) => None,
                (Some(_), None) => Some(AuthEventKind::SignedOut),
                (Some(old), Some(new)) if old.access_token == new.access_token => None,
                (Some(old), Some(new)) if old.user.id == new.user.id => {
                    Some(AuthEventKind::TokenRefreshed)
                }
                (_, Some(_)) => Some(AuthEventKind::SignedIn),
            }
        };
        if let Some(kind) = kind {
            self.notify_auth(kind, session);
        }
        Ok(())
    }
}
