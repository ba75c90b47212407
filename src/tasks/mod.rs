pub mod checklist;
pub mod editor;
pub mod filter;
pub mod ordering;

pub use checklist::Checklist;
pub use editor::{Field, TaskDraft, ValidationErrors};
pub use filter::Filter;
pub use ordering::ReorderOutcome;

use chrono::{DateTime, Utc};

use crate::backend::{Backend, BackendResult, ChangeSubscription};
use crate::store::{Task, TaskPatch, TaskStats};

/// The signed-in user's tasks: always a complete snapshot from the last
/// successful fetch, ordered by `order`.
#[derive(Debug)]
pub struct TaskList {
    user_id: String,
    tasks: Vec<Task>,
    filter: Filter,
    loading: bool,
    changes: ChangeSubscription,
}

impl TaskList {
    /// Subscribe to the user's changes, then fetch.
    pub fn open(backend: &dyn Backend, user_id: &str) -> BackendResult<Self> {
        let changes = backend.subscribe_tasks(user_id)?;
        let mut list = TaskList {
            user_id: user_id.to_string(),
            tasks: Vec::new(),
            filter: Filter::default(),
            loading: true,
            changes,
        };
        list.refresh(backend);
        Ok(list)
    }

    /// Replace the snapshot with a fresh fetch. On failure the last snapshot
    /// stays.
    pub fn refresh(&mut self, backend: &dyn Backend) {
        self.loading = true;
        match backend.list_tasks(&self.user_id) {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "tasks fetched");
                self.tasks = tasks;
            }
            Err(e) => tracing::error!("failed to fetch tasks: {e}"),
        }
        self.loading = false;
    }

    /// Drain realtime notifications. Any event triggers one refetch.
    pub fn pump(&mut self, backend: &dyn Backend) -> bool {
        let events = self.changes.drain();
        if events.is_empty() {
            return false;
        }
        tracing::debug!(events = events.len(), "refetching after change events");
        self.refresh(backend);
        true
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn visible(&self) -> Vec<&Task> {
        self.filter.project(&self.tasks)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    pub fn create(
        &mut self,
        backend: &dyn Backend,
        draft: &TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, ValidationErrors> {
        let new_task = draft.validate(now)?;
        let created = match backend.insert_task(&self.user_id, &new_task) {
            Ok(task) => {
                tracing::info!(task = %task.id, "task created");
                Some(task)
            }
            Err(e) => {
                tracing::error!("failed to create task: {e}");
                None
            }
        };
        self.refresh(backend);
        Ok(created)
    }

    /// Validate and save an edit. `Ok(false)` means the write failed.
    pub fn update(
        &mut self,
        backend: &dyn Backend,
        id: &str,
        draft: &TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<bool, ValidationErrors> {
        let Some(original) = self.get(id) else {
            tracing::warn!(task = %id, "edit of a task not in the snapshot");
            return Ok(false);
        };
        let patch = draft.validate_edit(now, original)?;
        let saved = self.write(backend, id, &patch, "update");
        self.refresh(backend);
        Ok(saved)
    }

    /// Flip `completed` and nothing else.
    pub fn toggle_complete(&mut self, backend: &dyn Backend, id: &str) -> bool {
        let Some(task) = self.get(id) else {
            return false;
        };
        let patch = TaskPatch::completed(!task.completed);
        if !self.write(backend, id, &patch, "toggle") {
            return false;
        }
        self.refresh(backend);
        true
    }

    pub fn delete(&mut self, backend: &dyn Backend, id: &str) -> bool {
        if let Err(e) = backend.delete_task(id) {
            tracing::error!(task = %id, "failed to delete task: {e}");
            return false;
        }
        tracing::info!(task = %id, "task deleted");
        self.refresh(backend);
        true
    }

    /// Move the visible task at `source` onto the visible slot `destination`
    /// and persist the new order of the whole list.
    pub fn reorder(
        &mut self,
        backend: &dyn Backend,
        source: usize,
        destination: Option<usize>,
    ) -> ReorderOutcome {
        let visible: Vec<&str> = self.visible().into_iter().map(|t| t.id.as_str()).collect();
        let Some(planned) = ordering::plan_move(&self.tasks, &visible, source, destination) else {
            return ReorderOutcome::Unchanged;
        };

        let total = planned.len();
        match ordering::persist_orders(backend, &planned) {
            Ok(()) => {
                tracing::debug!(total, "reorder persisted");
                self.tasks = planned;
                ReorderOutcome::Persisted { total }
            }
            Err((persisted, e)) => {
                tracing::error!(persisted, total, "reorder failed: {e}");
                self.refresh(backend);
                ReorderOutcome::Failed { persisted, total }
            }
        }
    }

    fn write(&self, backend: &dyn Backend, id: &str, patch: &TaskPatch, what: &str) -> bool {
        match backend.update_task(id, patch) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(task = %id, "failed to {what} task: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FlakyBackend;
    use crate::store::{Priority, Store};
    use chrono::Duration;

    fn setup() -> (FlakyBackend, String) {
        let store = Store::open_in_memory().unwrap();
        let session = store.sign_up("alice@example.com", "secret1").unwrap();
        (FlakyBackend::new(store), session.user.id)
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            description: format!("{title} details"),
            due_date: None,
            priority: None,
        }
    }

    fn seeded(titles: &[&str]) -> (FlakyBackend, TaskList) {
        let (backend, user) = setup();
        let mut list = TaskList::open(&backend, &user).unwrap();
        for title in titles {
            list.create(&backend, &draft(title), Utc::now()).unwrap();
        }
        (backend, list)
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn create_with_future_due_date() {
        let (backend, user) = setup();
        let mut list = TaskList::open(&backend, &user).unwrap();
        let now = Utc::now();
        let mut d = draft("Write report");
        d.due_date = Some((now + Duration::days(1)).to_rfc3339());

        let created = list.create(&backend, &d, now).unwrap().unwrap();
        assert_eq!(created.user_id, user);
        assert_eq!(created.priority, Priority::Medium);
        assert_eq!(list.all().len(), 1);
        assert_eq!(backend.inner.list_tasks(&user).unwrap().len(), 1);
    }

    #[test]
    fn past_due_date_writes_nothing() {
        let (backend, user) = setup();
        let mut list = TaskList::open(&backend, &user).unwrap();
        let now = Utc::now();
        let mut d = draft("Late");
        d.due_date = Some((now - Duration::days(1)).to_rfc3339());

        let errors = list.create(&backend, &d, now).unwrap_err();
        assert!(errors.message_for(Field::DueDate).is_some());
        assert!(backend.inner.list_tasks(&user).unwrap().is_empty());
    }

    #[test]
    fn toggle_flips_only_completed() {
        let (backend, mut list) = seeded(&["a", "b"]);
        let before = list.all()[0].clone();
        assert!(list.toggle_complete(&backend, &before.id));

        let after = list.get(&before.id).unwrap().clone();
        assert!(after.completed);
        assert_eq!(after.title, before.title);
        assert_eq!(after.description, before.description);
        assert_eq!(after.priority, before.priority);
        assert_eq!(after.order, before.order);
        assert_eq!(after.due_date, before.due_date);

        list.set_filter(Filter::Completed);
        assert_eq!(titles(&list.visible()), ["a"]);
        list.set_filter(Filter::Active);
        assert_eq!(titles(&list.visible()), ["b"]);

        assert!(list.toggle_complete(&backend, &before.id));
        assert_eq!(titles(&list.visible()), ["a", "b"]);
    }

    #[test]
    fn delete_removes_from_every_projection() {
        let (backend, mut list) = seeded(&["a", "b"]);
        let id = list.all()[0].id.clone();
        list.toggle_complete(&backend, &id);
        assert!(list.delete(&backend, &id));

        for filter in Filter::ALL {
            list.set_filter(filter);
            assert!(list.visible().iter().all(|t| t.id != id));
        }
        assert!(backend.inner.get_task(&id).unwrap().is_none());
    }

    #[test]
    fn reorder_persists_dense_orders() {
        let (backend, mut list) = seeded(&["a", "b", "c", "d"]);
        let outcome = list.reorder(&backend, 3, Some(1));
        assert_eq!(outcome, ReorderOutcome::Persisted { total: 4 });
        assert_eq!(titles(&list.visible()), ["a", "d", "b", "c"]);
        assert_eq!(backend.update_calls.get(), 4);

        // A fresh fetch reproduces the same order.
        list.refresh(&backend);
        assert_eq!(titles(&list.visible()), ["a", "d", "b", "c"]);
        let orders: Vec<i64> = list.all().iter().map(|t| t.order).collect();
        assert_eq!(orders, [0, 1, 2, 3]);
    }

    #[test]
    fn reorder_in_filtered_view() {
        let (backend, mut list) = seeded(&["a", "b", "c", "d"]);
        let b = list.all()[1].id.clone();
        list.toggle_complete(&backend, &b);
        list.set_filter(Filter::Active);
        assert_eq!(titles(&list.visible()), ["a", "c", "d"]);

        list.reorder(&backend, 2, Some(0));
        assert_eq!(titles(&list.visible()), ["d", "a", "c"]);
        list.set_filter(Filter::All);
        assert_eq!(titles(&list.visible()), ["d", "a", "b", "c"]);
    }

    #[test]
    fn cancelled_or_same_slot_reorder_writes_nothing() {
        let (backend, mut list) = seeded(&["a", "b"]);
        assert_eq!(list.reorder(&backend, 0, None), ReorderOutcome::Unchanged);
        assert_eq!(list.reorder(&backend, 1, Some(1)), ReorderOutcome::Unchanged);
        assert_eq!(list.reorder(&backend, 0, Some(9)), ReorderOutcome::Unchanged);
        assert_eq!(backend.update_calls.get(), 0);
    }

    #[test]
    fn failed_reorder_reports_partial_write_and_refetches() {
        let (backend, mut list) = seeded(&["a", "b", "c"]);
        backend.fail_updates_after(1);

        let outcome = list.reorder(&backend, 2, Some(0));
        assert_eq!(
            outcome,
            ReorderOutcome::Failed {
                persisted: 1,
                total: 3
            }
        );
        // The view shows what the backend holds, not the intended order.
        let stored: Vec<String> = backend
            .inner
            .list_tasks(list.user_id())
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles(&list.visible()), stored);
        assert_eq!(backend.update_calls.get(), 2);
    }

    #[test]
    fn failed_fetch_keeps_last_snapshot() {
        let (backend, mut list) = seeded(&["a", "b"]);
        backend.fail_list.set(true);
        list.refresh(&backend);
        assert_eq!(titles(&list.visible()), ["a", "b"]);
        assert!(!list.is_loading());
    }

    #[test]
    fn failed_toggle_leaves_view_unchanged() {
        let (backend, mut list) = seeded(&["a"]);
        let id = list.all()[0].id.clone();
        backend.fail_writes.set(true);
        assert!(!list.toggle_complete(&backend, &id));
        assert!(!list.get(&id).unwrap().completed);
    }

    #[test]
    fn pump_refetches_on_changes_from_elsewhere() {
        let (backend, mut list) = seeded(&["a"]);
        // Drain the events produced by our own writes.
        list.pump(&backend);
        assert!(!list.pump(&backend));

        backend
            .inner
            .insert_task(
                list.user_id(),
                &crate::store::NewTask {
                    title: "from elsewhere".into(),
                    description: None,
                    due_date: None,
                    priority: Priority::Low,
                },
            )
            .unwrap();
        assert!(list.pump(&backend));
        assert_eq!(titles(&list.visible()), ["a", "from elsewhere"]);
    }

    #[test]
    fn update_saves_edit() {
        let (backend, mut list) = seeded(&["a"]);
        let id = list.all()[0].id.clone();
        let mut d = TaskDraft::from_task(list.get(&id).unwrap());
        d.title = "renamed".into();
        d.priority = Some(Priority::High);
        assert!(list.update(&backend, &id, &d, Utc::now()).unwrap());
        let task = list.get(&id).unwrap();
        assert_eq!(task.title, "renamed");
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn stats_follow_snapshot() {
        let (backend, mut list) = seeded(&["a", "b", "c"]);
        let id = list.all()[0].id.clone();
        list.toggle_complete(&backend, &id);
        let stats = list.stats();
        assert_eq!((stats.total, stats.completed, stats.pending()), (3, 1, 2));
    }

    #[test]
    fn dropping_list_unsubscribes() {
        let (backend, list) = seeded(&["a"]);
        assert_eq!(backend.inner.change_subscriber_count(), 1);
        drop(list);
        assert_eq!(backend.inner.change_subscriber_count(), 0);
    }
}
