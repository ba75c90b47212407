//! Failure injection for exercising the client's error paths.

use std::cell::Cell;

use super::{AuthSubscription, Backend, BackendError, BackendResult, ChangeSubscription};
use crate::store::{ChecklistItem, ChecklistPatch, NewTask, Session, Store, Task, TaskPatch};

/// Wraps a [`Store`] and fails selected calls on demand.
pub struct FlakyBackend {
    pub inner: Store,
    /// `update_task` succeeds this many more times, then fails. `None` = never fails.
    pub updates_before_failure: Cell<Option<usize>>,
    pub fail_list: Cell<bool>,
    pub fail_writes: Cell<bool>,
    pub update_calls: Cell<usize>,
    pub list_calls: Cell<usize>,
}

impl FlakyBackend {
    pub fn new(inner: Store) -> Self {
        FlakyBackend {
            inner,
            updates_before_failure: Cell::new(None),
            fail_list: Cell::new(false),
            fail_writes: Cell::new(false),
            update_calls: Cell::new(0),
            list_calls: Cell::new(0),
        }
    }

    pub fn fail_updates_after(&self, n: usize) {
        self.updates_before_failure.set(Some(n));
    }

    fn unavailable() -> BackendError {
        BackendError::Unavailable("injected failure".into())
    }

    fn check_writes(&self) -> BackendResult<()> {
        if self.fail_writes.get() {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

impl Backend for FlakyBackend {
    fn current_session(&self) -> BackendResult<Option<Session>> {
        self.inner.current_session()
    }

    fn sign_up(&self, email: &str, password: &str) -> BackendResult<Session> {
        self.inner.sign_up(email, password)
    }

    fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        self.inner.sign_in(email, password)
    }

    fn sign_out(&self) -> BackendResult<()> {
        self.inner.sign_out()
    }

    fn refresh_session(&self) -> BackendResult<Option<Session>> {
        self.inner.refresh_session()
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.inner.on_auth_state_change()
    }

    fn list_tasks(&self, user_id: &str) -> BackendResult<Vec<Task>> {
        self.list_calls.set(self.list_calls.get() + 1);
        if self.fail_list.get() {
            return Err(Self::unavailable());
        }
        self.inner.list_tasks(user_id)
    }

    fn get_task(&self, id: &str) -> BackendResult<Option<Task>> {
        self.inner.get_task(id)
    }

    fn insert_task(&self, user_id: &str, task: &NewTask) -> BackendResult<Task> {
        self.check_writes()?;
        self.inner.insert_task(user_id, task)
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> BackendResult<()> {
        self.update_calls.set(self.update_calls.get() + 1);
        self.check_writes()?;
        match self.updates_before_failure.get() {
            Some(0) => return Err(Self::unavailable()),
            Some(n) => self.updates_before_failure.set(Some(n - 1)),
            None => {}
        }
        self.inner.update_task(id, patch)
    }

    fn delete_task(&self, id: &str) -> BackendResult<()> {
        self.check_writes()?;
        self.inner.delete_task(id)
    }

    fn list_checklist(&self, task_id: &str) -> BackendResult<Vec<ChecklistItem>> {
        if self.fail_list.get() {
            return Err(Self::unavailable());
        }
        self.inner.list_checklist(task_id)
    }

    fn insert_checklist_item(
        &self,
        task_id: &str,
        title: &str,
        order: i64,
    ) -> BackendResult<ChecklistItem> {
        self.check_writes()?;
        self.inner.insert_checklist_item(task_id, title, order)
    }

    fn update_checklist_item(&self, id: &str, patch: &ChecklistPatch) -> BackendResult<()> {
        self.check_writes()?;
        self.inner.update_checklist_item(id, patch)
    }

    fn delete_checklist_item(&self, id: &str) -> BackendResult<()> {
        self.check_writes()?;
        self.inner.delete_checklist_item(id)
    }

    fn subscribe_tasks(&self, user_id: &str) -> BackendResult<ChangeSubscription> {
        self.inner.subscribe_tasks(user_id)
    }
}
